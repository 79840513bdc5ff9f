//! HELM — Autonomous risk-sized trading agent
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the scanner and ledger client, and drives the control loop
//! until Ctrl+C.

use anyhow::Result;
use clap::Parser;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use helm::config::{AppConfig, LedgerMode, ScannerSource};
use helm::dashboard;
use helm::engine::scanner::{FileScanner, IdleScanner, MarketScanner};
use helm::engine::scheduler::TokioScheduler;
use helm::engine::ControlLoop;
use helm::venue::paper::PaperLedger;
use helm::venue::rpc::{RpcLedgerClient, RpcSettings};
use helm::venue::LedgerClient;

const BANNER: &str = r#"
 _   _ _____ _     __  __
| | | | ____| |   |  \/  |
| |_| |  _| | |   | |\/| |
|  _  | |___| |___| |  | |
|_| |_|_____|_____|_|  |_|

  Kelly-sized execution loop
  v0.1.0 — Autonomous Agent
"#;

#[derive(Parser, Debug)]
#[command(name = "helm")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Print the current status as JSON and exit.
    #[arg(long)]
    status: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load(&cli.config)?;

    init_logging();

    let scanner = build_scanner(&cfg);
    let client = build_client(&cfg)?;
    let control = ControlLoop::new(
        scanner,
        client,
        cfg.risk_config(),
        Arc::new(TokioScheduler),
        cfg.loop_settings(),
    )?;

    if cli.status {
        control.prime().await?;
        let status = control.status().await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        tick_interval_secs = cfg.agent.tick_interval_secs,
        ledger = ?cfg.ledger.mode,
        scanner = ?cfg.scanner.source,
        "HELM starting up"
    );

    if let Err(e) = control.prime().await {
        warn!(error = %e, "Initial balance read failed — ticks will retry");
    }

    let handle = control.handle();

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(handle.clone(), cfg.dashboard.port).await?;
    }

    // Ctrl+C stops the loop at the next tick boundary, then exits.
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received."),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
            }
            handle.stop();
            let _ = shutdown_tx.send(true);
        });
    }

    handle.start();
    info!("Entering main loop. Press Ctrl+C to stop.");

    loop {
        control.run().await;

        if *shutdown_rx.borrow() {
            break;
        }

        info!("Agent stopped — waiting for start");
        tokio::select! {
            _ = handle.wait_until_running() => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    let status = handle.status().await;
    info!(
        balance = %status.balance,
        ticks = status.tick_count,
        failed = status.failed_ticks,
        trades = status.total_trades,
        "HELM shut down cleanly."
    );

    Ok(())
}

fn build_scanner(cfg: &AppConfig) -> Arc<dyn MarketScanner> {
    match cfg.scanner.source {
        ScannerSource::Idle => Arc::new(IdleScanner),
        ScannerSource::File => {
            info!(path = %cfg.scanner.candidates_path.display(), "Using file scanner");
            Arc::new(FileScanner::new(cfg.scanner.candidates_path.clone()))
        }
    }
}

fn build_client(cfg: &AppConfig) -> Result<Arc<dyn LedgerClient>> {
    match cfg.ledger.mode {
        LedgerMode::Paper => {
            let account = format!("paper-{}", cfg.agent.name.to_lowercase());
            info!(
                account = %account,
                balance = %cfg.ledger.initial_balance,
                "Using paper ledger"
            );
            Ok(Arc::new(PaperLedger::new(account, cfg.ledger.initial_balance)))
        }
        LedgerMode::Rpc => {
            let credential = AppConfig::resolve_env(&cfg.ledger.credential_env)
                .ok()
                .map(SecretString::new);
            let client = RpcLedgerClient::new(
                RpcSettings {
                    rpc_url: cfg.ledger.rpc_url.clone(),
                    address: cfg.ledger.address.clone().unwrap_or_default(),
                    execute_method: cfg.ledger.execute_method.clone(),
                },
                credential,
            )?;
            info!(rpc_url = %cfg.ledger.rpc_url, "Using RPC ledger");
            Ok(Arc::new(client))
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("helm=info"));

    if std::env::var("HELM_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
