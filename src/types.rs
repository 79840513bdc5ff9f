//! Shared types for the HELM agent.
//!
//! These types form the data model used across all modules.
//! Strategy, engine, and venue modules depend on them without
//! depending on each other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// A proposed trade produced by a market scanner.
///
/// Consumed once by the sizer and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Instrument identifier, e.g. "MON/USDC".
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub target_price: Decimal,
    /// Expected fractional move in the favourable direction.
    pub edge: Decimal,
    /// Win probability estimate in [0, 1].
    pub confidence: Decimal,
    /// Where the candidate came from ("dex_scan", "file", ...).
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} @ {} → {} (edge: {:.1}% | conf: {:.0}%)",
            self.source,
            self.direction,
            self.instrument,
            self.entry_price,
            self.target_price,
            self.edge * Decimal::ONE_HUNDRED,
            self.confidence * Decimal::ONE_HUNDRED,
        )
    }
}

impl Candidate {
    /// Check the fields the sizer relies on. Returns a description of the
    /// first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.instrument.trim().is_empty() {
            return Err("empty instrument".into());
        }
        if self.confidence < Decimal::ZERO || self.confidence > Decimal::ONE {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        if self.edge < Decimal::ZERO {
            return Err(format!("negative edge {}", self.edge));
        }
        if self.entry_price <= Decimal::ZERO {
            return Err(format!("non-positive entry price {}", self.entry_price));
        }
        Ok(())
    }

    /// Helper to build a test candidate with sensible defaults.
    #[cfg(test)]
    pub fn sample(edge: Decimal, confidence: Decimal) -> Self {
        use rust_decimal_macros::dec;
        Candidate {
            instrument: "MON/USDC".to_string(),
            direction: Direction::Long,
            entry_price: dec!(1.50),
            target_price: dec!(1.65),
            edge,
            confidence,
            source: "test".to_string(),
            observed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// What to do with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Execute,
    Skip,
}

/// Why a candidate was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NegativeExpectedValue,
    EdgeBelowFloor,
    NoCapital,
    ZeroSize,
    /// The sizing arithmetic left the representable range.
    Overflow,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NegativeExpectedValue => write!(f, "negative expected value"),
            SkipReason::EdgeBelowFloor => write!(f, "edge below floor"),
            SkipReason::NoCapital => write!(f, "no capital"),
            SkipReason::ZeroSize => write!(f, "zero position size"),
            SkipReason::Overflow => write!(f, "sizing overflow"),
        }
    }
}

/// Output of the risk sizer for a single candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    /// Set whenever `action` is `Skip`.
    pub reason: Option<SkipReason>,
    /// Raw Kelly fraction.
    pub kelly_fraction: Decimal,
    /// After multiplier and cap.
    pub adjusted_fraction: Decimal,
    /// Notional size in capital units. Zero on skip.
    pub size: Decimal,
    pub edge: Decimal,
    pub confidence: Decimal,
}

impl Decision {
    pub fn is_execute(&self) -> bool {
        self.action == Action::Execute
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Some(reason) => write!(
                f,
                "SKIP ({reason}) kelly={:.4} adjusted={:.4}",
                self.kelly_fraction, self.adjusted_fraction
            ),
            None => write!(
                f,
                "EXECUTE size={:.4} kelly={:.4} adjusted={:.4}",
                self.size, self.kelly_fraction, self.adjusted_fraction
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Order handed to the ledger client for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOrder {
    pub instrument: String,
    pub direction: Direction,
    pub size: Decimal,
}

/// Receipt returned after an order is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    /// Venue order id or transaction hash.
    pub reference: String,
    pub instrument: String,
    pub direction: Direction,
    pub size: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for ExecutionReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.4} [{}]",
            self.direction, self.instrument, self.size, self.reference
        )
    }
}

/// Immutable record of an executed decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub direction: Direction,
    pub size: Decimal,
    pub edge: Decimal,
    pub reference: String,
}

// ---------------------------------------------------------------------------
// Agent state
// ---------------------------------------------------------------------------

/// Mutable agent bookkeeping. Written only by the control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// Venue identity (wallet address or paper account name).
    pub identity: Option<String>,
    /// Balance read at the last completed tick, less what that tick committed.
    pub capital: Decimal,
    pub last_scan: Option<DateTime<Utc>>,
    pub tick_count: u64,
    pub failed_ticks: u64,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capital={:.4} | ticks={} (failed {}) | last_scan={}",
            self.capital,
            self.tick_count,
            self.failed_ticks,
            self.last_scan
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".into()),
        )
    }
}

impl AgentState {
    pub fn new(identity: Option<String>, initial_capital: Decimal) -> Self {
        Self {
            identity,
            capital: initial_capital,
            last_scan: None,
            tick_count: 0,
            failed_ticks: 0,
        }
    }
}

/// Point-in-time status served to operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub address: Option<String>,
    pub balance: Decimal,
    /// Distinct instruments with at least one recorded trade.
    pub positions: usize,
    pub total_trades: usize,
    pub last_scan: Option<DateTime<Utc>>,
    pub tick_count: u64,
    pub failed_ticks: u64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for HELM.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Scanner error ({scanner}): {message}")]
    Scan { scanner: String, message: String },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Execution failed for {instrument}: {message}")]
    Execution { instrument: String, message: String },

    #[error("Execution timed out for {instrument} after {secs}s")]
    ExecutionTimeout { instrument: String, secs: u64 },

    #[error("Insufficient balance: need {needed:.4}, have {available:.4}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error("Invalid candidate {instrument}: {message}")]
    InvalidCandidate { instrument: String, message: String },

    #[error("Tick panicked: {0}")]
    Panic(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credentials: {0}")]
    Credentials(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
