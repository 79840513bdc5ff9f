//! Control loop — the scan → size → execute → record cycle.
//!
//! Ticks run strictly one at a time on a fixed cadence. Every failure
//! inside a tick (scanner error, malformed candidate, ledger outage, even
//! a panic) degrades to "this tick did nothing useful"; only an explicit
//! stop ends the loop.
//!
//! State is shared with the operator surface through [`AgentHandle`].
//! The loop is the only writer: `last_scan` is written as soon as the
//! scanner returns, everything else in one critical section when the
//! tick completes. A tick that panics after some fills still commits
//! those fills before reporting the failure.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use rust_decimal::Decimal;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use super::ledger::TradeLedger;
use super::scanner::MarketScanner;
use super::scheduler::Scheduler;
use crate::strategy::{RiskConfig, RiskSizer};
use crate::types::{
    AgentError, AgentState, Candidate, ExecutionOrder, ExecutionReceipt, StatusSnapshot,
    TradeRecord,
};
use crate::venue::LedgerClient;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Suspension between ticks.
    pub tick_interval: Duration,
    /// Upper bound on each ledger round-trip.
    pub execution_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            execution_timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// Summary of a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub scanned: usize,
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub committed: Decimal,
    /// Balance read this tick; `None` when the scan came back empty.
    pub balance: Option<Decimal>,
}

impl TickReport {
    fn log(&self, tick: u64) {
        info!(
            tick,
            scanned = self.scanned,
            executed = self.executed,
            skipped = self.skipped,
            failed = self.failed,
            committed = %self.committed,
            balance = ?self.balance,
            "Tick complete"
        );
    }
}

// ---------------------------------------------------------------------------
// Shared state + handle
// ---------------------------------------------------------------------------

struct SharedState {
    agent: RwLock<AgentState>,
    ledger: RwLock<TradeLedger>,
    running: watch::Sender<bool>,
}

/// Cloneable operator handle: start/stop and read-only status.
#[derive(Clone)]
pub struct AgentHandle {
    shared: Arc<SharedState>,
}

impl AgentHandle {
    fn new(state: AgentState) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            shared: Arc::new(SharedState {
                agent: RwLock::new(state),
                ledger: RwLock::new(TradeLedger::new()),
                running,
            }),
        }
    }

    /// Enter `Running`. No-op if already running.
    pub fn start(&self) {
        let changed = self.shared.running.send_if_modified(|running| {
            let was = *running;
            *running = true;
            !was
        });
        if changed {
            info!("Agent started");
        }
    }

    /// Enter `Stopped`. Takes effect at the next tick boundary; no-op if
    /// already stopped.
    pub fn stop(&self) {
        let changed = self.shared.running.send_if_modified(|running| {
            let was = *running;
            *running = false;
            was
        });
        if changed {
            info!("Agent stopping...");
        }
    }

    pub fn is_running(&self) -> bool {
        *self.shared.running.borrow()
    }

    /// Resolve once the agent is running.
    pub async fn wait_until_running(&self) {
        let mut rx = self.shared.running.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|running| *running).await;
    }

    /// Consistent point-in-time status.
    pub async fn status(&self) -> StatusSnapshot {
        let agent = self.shared.agent.read().await;
        let ledger = self.shared.ledger.read().await;
        StatusSnapshot {
            running: self.is_running(),
            address: agent.identity.clone(),
            balance: agent.capital,
            positions: ledger.instruments(),
            total_trades: ledger.count(),
            last_scan: agent.last_scan,
            tick_count: agent.tick_count,
            failed_ticks: agent.failed_ticks,
        }
    }

    /// All recorded trades, oldest first.
    pub async fn trades(&self) -> Vec<TradeRecord> {
        self.shared.ledger.read().await.all().to_vec()
    }

    pub async fn trade_count(&self) -> usize {
        self.shared.ledger.read().await.count()
    }

    // -- Loop-side writers -------------------------------------------------

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.running.subscribe()
    }

    async fn set_capital(&self, capital: Decimal) {
        self.shared.agent.write().await.capital = capital;
    }

    async fn record_scan(&self, at: DateTime<Utc>) {
        self.shared.agent.write().await.last_scan = Some(at);
    }

    async fn record_failure(&self) {
        self.shared.agent.write().await.failed_ticks += 1;
    }

    /// Publish a tick. Capital and trades land together; only a completed
    /// tick advances `tick_count`.
    async fn commit_tick(
        &self,
        capital: Option<Decimal>,
        records: Vec<TradeRecord>,
        completed: bool,
    ) -> u64 {
        let mut agent = self.shared.agent.write().await;
        let mut ledger = self.shared.ledger.write().await;
        if let Some(capital) = capital {
            agent.capital = capital;
        }
        for record in records {
            ledger.append(record);
        }
        if completed {
            agent.tick_count += 1;
        }
        agent.tick_count
    }
}

// ---------------------------------------------------------------------------
// Control loop
// ---------------------------------------------------------------------------

pub struct ControlLoop {
    scanner: Arc<dyn MarketScanner>,
    client: Arc<dyn LedgerClient>,
    sizer: RiskSizer,
    scheduler: Arc<dyn Scheduler>,
    settings: LoopSettings,
    handle: AgentHandle,
}

impl ControlLoop {
    /// Build a stopped loop. Invalid risk limits are fatal here.
    pub fn new(
        scanner: Arc<dyn MarketScanner>,
        client: Arc<dyn LedgerClient>,
        risk: RiskConfig,
        scheduler: Arc<dyn Scheduler>,
        settings: LoopSettings,
    ) -> Result<Self, AgentError> {
        risk.validate()?;
        if settings.tick_interval.is_zero() {
            return Err(AgentError::Config("tick interval must be non-zero".into()));
        }
        let handle = AgentHandle::new(AgentState::new(client.identity(), Decimal::ZERO));
        Ok(Self {
            scanner,
            client,
            sizer: RiskSizer::new(risk),
            scheduler,
            settings,
            handle,
        })
    }

    pub fn handle(&self) -> AgentHandle {
        self.handle.clone()
    }

    pub fn start(&self) {
        self.handle.start();
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.handle.status().await
    }

    /// Read the balance once so status has a capital figure before the
    /// first non-empty tick.
    pub async fn prime(&self) -> Result<Decimal, AgentError> {
        let balance = self.read_balance().await?;
        self.handle.set_capital(balance).await;
        info!(balance = %balance, "Initial balance");
        Ok(balance)
    }

    /// Drive ticks until stopped. Returns immediately if not running.
    pub async fn run(&self) {
        let mut running = self.handle.subscribe();
        if !*running.borrow_and_update() {
            return;
        }
        info!(
            interval_secs = self.settings.tick_interval.as_secs(),
            scanner = self.scanner.name(),
            "Control loop running"
        );

        loop {
            match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Tick failed — continuing to next");
                    self.handle.record_failure().await;
                }
                Err(panic) => {
                    let e = AgentError::Panic(panic_message(&*panic));
                    error!(error = %e, "Tick failed — continuing to next");
                    self.handle.record_failure().await;
                }
            }

            if !*running.borrow_and_update() {
                break;
            }

            if !self.suspend(&mut running).await {
                break;
            }
        }

        info!("Control loop stopped");
    }

    /// Wait out the tick interval. Returns `false` as soon as a stop is
    /// observed; a stop followed by a start keeps the original interval.
    async fn suspend(&self, running: &mut watch::Receiver<bool>) -> bool {
        let sleep = self.scheduler.sleep(self.settings.tick_interval);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return *running.borrow_and_update(),
                changed = running.changed() => {
                    if changed.is_err() || !*running.borrow_and_update() {
                        return false;
                    }
                }
            }
        }
    }

    /// One scan → size → execute → record iteration.
    pub async fn tick(&self) -> Result<TickReport, AgentError> {
        let started = Utc::now();

        // 1. Scan
        let candidates = self.scanner.scan().await?;
        self.handle.record_scan(Utc::now()).await;

        let mut report = TickReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        // 2. Nothing to do
        if candidates.is_empty() {
            debug!("No candidates found");
            let tick = self.handle.commit_tick(None, Vec::new(), true).await;
            report.log(tick);
            return Ok(report);
        }

        for candidate in &candidates {
            candidate
                .validate()
                .map_err(|message| AgentError::InvalidCandidate {
                    instrument: candidate.instrument.clone(),
                    message,
                })?;
        }

        // 3. Capital, read fresh every tick
        let balance = self.read_balance().await?;
        report.balance = Some(balance);

        // 4. Size and execute in scan order
        let mut available = balance;
        let mut records = Vec::new();
        let outcome = AssertUnwindSafe(self.process_candidates(
            &candidates,
            started,
            &mut available,
            &mut records,
            &mut report,
        ))
        .catch_unwind()
        .await;

        // Fills made before a panic are still on the venue's books.
        match outcome {
            Ok(()) => {
                let tick = self.handle.commit_tick(Some(available), records, true).await;
                report.log(tick);
                Ok(report)
            }
            Err(panic) => {
                self.handle.commit_tick(Some(available), records, false).await;
                Err(AgentError::Panic(panic_message(&*panic)))
            }
        }
    }

    async fn process_candidates(
        &self,
        candidates: &[Candidate],
        started: DateTime<Utc>,
        available: &mut Decimal,
        records: &mut Vec<TradeRecord>,
        report: &mut TickReport,
    ) {
        for candidate in candidates {
            let decision = self.sizer.evaluate(candidate, *available);
            if !decision.is_execute() {
                debug!(
                    instrument = %candidate.instrument,
                    decision = %decision,
                    "Candidate skipped"
                );
                report.skipped += 1;
                continue;
            }

            info!(
                instrument = %candidate.instrument,
                direction = %candidate.direction,
                size = %decision.size,
                edge = %decision.edge,
                kelly = %decision.kelly_fraction,
                "Executing"
            );

            let order = ExecutionOrder {
                instrument: candidate.instrument.clone(),
                direction: candidate.direction,
                size: decision.size,
            };

            // 5. No retry: a failure costs this candidate only
            match self.execute(order).await {
                Ok(receipt) => {
                    *available -= decision.size;
                    report.executed += 1;
                    report.committed += decision.size;
                    records.push(TradeRecord {
                        timestamp: started,
                        instrument: candidate.instrument.clone(),
                        direction: candidate.direction,
                        size: decision.size,
                        edge: decision.edge,
                        reference: receipt.reference,
                    });
                }
                Err(e) => {
                    warn!(
                        instrument = %candidate.instrument,
                        error = %e,
                        "Execution failed"
                    );
                    report.failed += 1;
                }
            }
        }
    }

    async fn read_balance(&self) -> Result<Decimal, AgentError> {
        match tokio::time::timeout(self.settings.execution_timeout, self.client.get_balance()).await
        {
            Ok(result) => result,
            Err(_) => Err(AgentError::Ledger(format!(
                "balance lookup timed out after {}s",
                self.settings.execution_timeout.as_secs()
            ))),
        }
    }

    async fn execute(&self, order: ExecutionOrder) -> Result<ExecutionReceipt, AgentError> {
        let instrument = order.instrument.clone();
        match tokio::time::timeout(self.settings.execution_timeout, self.client.execute(order)).await
        {
            Ok(result) => result,
            Err(_) => Err(AgentError::ExecutionTimeout {
                instrument,
                secs: self.settings.execution_timeout.as_secs(),
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
