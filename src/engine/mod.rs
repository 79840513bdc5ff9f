//! Core engine — the scan → size → execute → record loop.

pub mod control;
pub mod ledger;
pub mod scanner;
pub mod scheduler;

pub use control::{AgentHandle, ControlLoop, LoopSettings, TickReport};
