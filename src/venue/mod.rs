//! Venue integrations.
//!
//! Defines the `LedgerClient` trait the control loop executes against,
//! with two implementations:
//! - Paper — in-memory balance for dry runs and validation
//! - RPC — JSON-RPC balance lookup plus relay-delegated execution

pub mod paper;
pub mod rpc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{AgentError, ExecutionOrder, ExecutionReceipt};

/// Abstraction over the ledger-backed venue.
///
/// Confirmation and finality semantics are the implementor's concern;
/// a returned receipt means the order is done as far as the agent cares.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Available balance in capital units.
    async fn get_balance(&self) -> Result<Decimal, AgentError>;

    /// Execute an order.
    async fn execute(&self, order: ExecutionOrder) -> Result<ExecutionReceipt, AgentError>;

    /// Account identity (wallet address or paper account name).
    fn identity(&self) -> Option<String>;
}
