//! Strategy engine — Kelly sizing and risk limits.

pub mod kelly;
pub mod risk;

pub use kelly::{evaluate, RiskSizer};
pub use risk::RiskConfig;
