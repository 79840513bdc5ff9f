//! Configuration loading from TOML with environment variable resolution.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. Secrets are referenced by env-var name and resolved at
//! runtime, never stored in the file.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::control::LoopSettings;
use crate::strategy::RiskConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub risk: RiskSection,
    pub ledger: LedgerConfig,
    pub scanner: ScannerConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub tick_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "HELM-001".into(),
            tick_interval_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RiskSection {
    pub max_position_fraction: Decimal,
    pub min_edge_fraction: Decimal,
    pub stop_loss_fraction: Decimal,
    pub kelly_multiplier: Decimal,
}

impl Default for RiskSection {
    fn default() -> Self {
        let risk = RiskConfig::default();
        Self {
            max_position_fraction: risk.max_position_fraction,
            min_edge_fraction: risk.min_edge_fraction,
            stop_loss_fraction: risk.stop_loss_fraction,
            kelly_multiplier: risk.kelly_multiplier,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    Paper,
    Rpc,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    pub mode: LedgerMode,
    /// Starting balance for the paper ledger.
    pub initial_balance: Decimal,
    pub rpc_url: String,
    pub address: Option<String>,
    /// Env var holding the signing credential.
    pub credential_env: String,
    pub execute_method: String,
    pub execution_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: LedgerMode::Paper,
            initial_balance: dec!(1000),
            rpc_url: "http://127.0.0.1:8545".into(),
            address: None,
            credential_env: "HELM_PRIVATE_KEY".into(),
            execute_method: "helm_execute".into(),
            execution_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScannerSource {
    #[default]
    Idle,
    File,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    pub source: ScannerSource,
    pub candidates_path: PathBuf,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            source: ScannerSource::Idle,
            candidates_path: PathBuf::from("candidates.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate a TOML document.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.agent.tick_interval_secs == 0 {
            bail!("agent.tick_interval_secs must be greater than zero");
        }
        if self.ledger.execution_timeout_secs == 0 {
            bail!("ledger.execution_timeout_secs must be greater than zero");
        }
        self.risk_config().validate()?;
        Ok(())
    }

    pub fn risk_config(&self) -> RiskConfig {
        RiskConfig {
            max_position_fraction: self.risk.max_position_fraction,
            min_edge_fraction: self.risk.min_edge_fraction,
            stop_loss_fraction: self.risk.stop_loss_fraction,
            kelly_multiplier: self.risk.kelly_multiplier,
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            tick_interval: Duration::from_secs(self.agent.tick_interval_secs),
            execution_timeout: Duration::from_secs(self.ledger.execution_timeout_secs),
        }
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
