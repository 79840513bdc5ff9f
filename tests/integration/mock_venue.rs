//! Mock venue for integration testing.
//!
//! One deterministic in-memory object that plays both sides of the loop:
//! it serves a scripted candidate feed per scan and fills orders against
//! a tracked balance. Failures can be injected per instrument or for
//! every call.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use helm::engine::scanner::MarketScanner;
use helm::engine::scheduler::Scheduler;
use helm::engine::AgentHandle;
use helm::types::*;
use helm::venue::LedgerClient;

pub fn candidate(instrument: &str, direction: Direction, edge: Decimal, confidence: Decimal) -> Candidate {
    Candidate {
        instrument: instrument.to_string(),
        direction,
        entry_price: dec!(1.50),
        target_price: dec!(1.65),
        edge,
        confidence,
        source: "mock".to_string(),
        observed_at: Utc::now(),
    }
}

/// Scan results, one entry per scan. Runs dry into empty scans.
pub enum Feed {
    Candidates(Vec<Candidate>),
    Fail(&'static str),
}

pub struct MockVenue {
    feeds: Mutex<VecDeque<Feed>>,
    balance: Mutex<Decimal>,
    fills: Mutex<Vec<ExecutionOrder>>,
    reject: Mutex<HashSet<String>>,
    balance_error: Mutex<Option<String>>,
    scans: AtomicUsize,
}

impl MockVenue {
    pub fn new(balance: Decimal) -> Arc<Self> {
        Arc::new(Self {
            feeds: Mutex::new(VecDeque::new()),
            balance: Mutex::new(balance),
            fills: Mutex::new(Vec::new()),
            reject: Mutex::new(HashSet::new()),
            balance_error: Mutex::new(None),
            scans: AtomicUsize::new(0),
        })
    }

    pub fn push_feed(&self, feed: Feed) {
        self.feeds.lock().unwrap().push_back(feed);
    }

    /// Reject every order for this instrument.
    pub fn reject(&self, instrument: &str) {
        self.reject.lock().unwrap().insert(instrument.to_string());
    }

    pub fn fail_balance(&self, msg: &str) {
        *self.balance_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn restore_balance(&self) {
        *self.balance_error.lock().unwrap() = None;
    }

    pub fn balance(&self) -> Decimal {
        *self.balance.lock().unwrap()
    }

    pub fn fills(&self) -> Vec<ExecutionOrder> {
        self.fills.lock().unwrap().clone()
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketScanner for MockVenue {
    async fn scan(&self) -> Result<Vec<Candidate>, AgentError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        match self.feeds.lock().unwrap().pop_front() {
            Some(Feed::Candidates(c)) => Ok(c),
            Some(Feed::Fail(msg)) => Err(AgentError::Scan {
                scanner: "mock".into(),
                message: msg.into(),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[async_trait]
impl LedgerClient for MockVenue {
    async fn get_balance(&self) -> Result<Decimal, AgentError> {
        if let Some(err) = self.balance_error.lock().unwrap().as_ref() {
            return Err(AgentError::Ledger(err.clone()));
        }
        Ok(self.balance())
    }

    async fn execute(&self, order: ExecutionOrder) -> Result<ExecutionReceipt, AgentError> {
        if self.reject.lock().unwrap().contains(&order.instrument) {
            return Err(AgentError::Execution {
                instrument: order.instrument,
                message: "rejected by venue".into(),
            });
        }

        let mut balance = self.balance.lock().unwrap();
        if order.size > *balance {
            return Err(AgentError::InsufficientBalance {
                needed: order.size,
                available: *balance,
            });
        }
        *balance -= order.size;

        let mut fills = self.fills.lock().unwrap();
        fills.push(order.clone());

        Ok(ExecutionReceipt {
            reference: format!("mock-{}", fills.len()),
            instrument: order.instrument,
            direction: order.direction,
            size: order.size,
            timestamp: Utc::now(),
        })
    }

    fn identity(&self) -> Option<String> {
        Some("0xmock".to_string())
    }
}

/// Scheduler that never waits; stops the agent after a fixed number of
/// suspensions so `run` terminates deterministically.
pub struct ManualScheduler {
    sleeps: AtomicUsize,
    stop_after: usize,
    handle: Mutex<Option<AgentHandle>>,
    intervals: Mutex<Vec<Duration>>,
}

impl ManualScheduler {
    pub fn new(stop_after: usize) -> Arc<Self> {
        Arc::new(Self {
            sleeps: AtomicUsize::new(0),
            stop_after,
            handle: Mutex::new(None),
            intervals: Mutex::new(Vec::new()),
        })
    }

    pub fn attach(&self, handle: AgentHandle) {
        *self.handle.lock().unwrap() = Some(handle);
    }

    pub fn intervals(&self) -> Vec<Duration> {
        self.intervals.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    async fn sleep(&self, duration: Duration) {
        self.intervals.lock().unwrap().push(duration);
        let n = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.stop_after {
            if let Some(handle) = self.handle.lock().unwrap().as_ref() {
                handle.stop();
            }
        }
        tokio::task::yield_now().await;
    }
}
