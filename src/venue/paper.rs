//! Paper ledger.
//!
//! In-memory venue for dry runs. Executions debit the balance and
//! return `paper-` receipts; nothing leaves the process.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::info;

use super::LedgerClient;
use crate::types::{AgentError, ExecutionOrder, ExecutionReceipt};

pub struct PaperLedger {
    account: String,
    balance: Mutex<Decimal>,
}

impl PaperLedger {
    pub fn new(account: impl Into<String>, initial_balance: Decimal) -> Self {
        Self {
            account: account.into(),
            balance: Mutex::new(initial_balance),
        }
    }
}

#[async_trait]
impl LedgerClient for PaperLedger {
    async fn get_balance(&self) -> Result<Decimal, AgentError> {
        Ok(*self.balance.lock().await)
    }

    async fn execute(&self, order: ExecutionOrder) -> Result<ExecutionReceipt, AgentError> {
        let mut balance = self.balance.lock().await;
        if order.size <= Decimal::ZERO {
            return Err(AgentError::Execution {
                instrument: order.instrument,
                message: format!("non-positive size {}", order.size),
            });
        }
        if order.size > *balance {
            return Err(AgentError::InsufficientBalance {
                needed: order.size,
                available: *balance,
            });
        }
        *balance -= order.size;

        let receipt = ExecutionReceipt {
            reference: format!("paper-{}", uuid::Uuid::new_v4()),
            instrument: order.instrument,
            direction: order.direction,
            size: order.size,
            timestamp: Utc::now(),
        };
        info!(
            account = %self.account,
            receipt = %receipt,
            balance = %*balance,
            "[PAPER] Order filled"
        );
        Ok(receipt)
    }

    fn identity(&self) -> Option<String> {
        Some(self.account.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
