//! Risk configuration.
//!
//! Loaded once at startup and read-only thereafter.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::AgentError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sizing and risk limits.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Hard cap on the sized fraction of capital per trade.
    pub max_position_fraction: Decimal,
    /// Candidates with a smaller edge are always skipped.
    pub min_edge_fraction: Decimal,
    /// Assumed loss leg; denominator of the Kelly payoff ratio.
    pub stop_loss_fraction: Decimal,
    /// Fractional Kelly multiplier (0.5 = half-Kelly).
    pub kelly_multiplier: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_fraction: dec!(0.10), // Max 10% of capital per trade
            min_edge_fraction: dec!(0.05),     // 5% minimum expected edge
            stop_loss_fraction: dec!(0.02),    // 2% assumed stop loss
            kelly_multiplier: dec!(0.5),       // Half-Kelly
        }
    }
}

impl RiskConfig {
    /// Reject values that would make sizing meaningless.
    pub fn validate(&self) -> Result<(), AgentError> {
        let unit = |name: &str, v: Decimal| -> Result<(), AgentError> {
            if v <= Decimal::ZERO || v > Decimal::ONE {
                return Err(AgentError::Config(format!(
                    "{name} must be in (0, 1], got {v}"
                )));
            }
            Ok(())
        };
        unit("max_position_fraction", self.max_position_fraction)?;
        unit("stop_loss_fraction", self.stop_loss_fraction)?;
        unit("kelly_multiplier", self.kelly_multiplier)?;
        if self.min_edge_fraction < Decimal::ZERO || self.min_edge_fraction > Decimal::ONE {
            return Err(AgentError::Config(format!(
                "min_edge_fraction must be in [0, 1], got {}",
                self.min_edge_fraction
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
