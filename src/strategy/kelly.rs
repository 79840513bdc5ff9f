//! Kelly criterion position sizing.
//!
//! Turns a candidate plus the capital available at decision time into an
//! execute/skip decision with a bounded size. Pure: no I/O, no state.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::risk::RiskConfig;
use crate::types::{Action, Candidate, Decision, SkipReason};

// ---------------------------------------------------------------------------
// Risk sizer
// ---------------------------------------------------------------------------

pub struct RiskSizer {
    config: RiskConfig,
}

impl RiskSizer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Size a candidate using fractional Kelly.
    ///
    /// Kelly formula: f* = (p*b - q) / b
    /// where:
    ///   p = candidate confidence (win probability)
    ///   q = 1 - p
    ///   b = edge / stop_loss (payoff ratio against the assumed loss leg)
    pub fn evaluate(&self, candidate: &Candidate, capital: Decimal) -> Decision {
        evaluate(candidate, capital, &self.config)
    }
}

/// Free-function form of [`RiskSizer::evaluate`].
pub fn evaluate(candidate: &Candidate, capital: Decimal, config: &RiskConfig) -> Decision {
    let Some((kelly, adjusted)) = fractions(candidate, config) else {
        warn!(
            instrument = %candidate.instrument,
            edge = %candidate.edge,
            confidence = %candidate.confidence,
            "Sizing overflow — skip"
        );
        return Decision {
            action: Action::Skip,
            reason: Some(SkipReason::Overflow),
            kelly_fraction: Decimal::ZERO,
            adjusted_fraction: Decimal::ZERO,
            size: Decimal::ZERO,
            edge: candidate.edge,
            confidence: candidate.confidence,
        };
    };

    let skip = |reason: SkipReason| Decision {
        action: Action::Skip,
        reason: Some(reason),
        kelly_fraction: kelly,
        adjusted_fraction: adjusted,
        size: Decimal::ZERO,
        edge: candidate.edge,
        confidence: candidate.confidence,
    };

    if adjusted < Decimal::ZERO {
        debug!(
            instrument = %candidate.instrument,
            kelly = %kelly,
            "Negative Kelly — skip"
        );
        return skip(SkipReason::NegativeExpectedValue);
    }

    if candidate.edge < config.min_edge_fraction {
        debug!(
            instrument = %candidate.instrument,
            edge = %candidate.edge,
            floor = %config.min_edge_fraction,
            "Edge below floor — skip"
        );
        return skip(SkipReason::EdgeBelowFloor);
    }

    if capital <= Decimal::ZERO {
        debug!(instrument = %candidate.instrument, capital = %capital, "No capital — skip");
        return skip(SkipReason::NoCapital);
    }

    let Some(size) = capital.checked_mul(adjusted) else {
        warn!(instrument = %candidate.instrument, capital = %capital, "Sizing overflow — skip");
        return skip(SkipReason::Overflow);
    };
    if adjusted == Decimal::ZERO || size <= Decimal::ZERO {
        return skip(SkipReason::ZeroSize);
    }

    debug!(
        instrument = %candidate.instrument,
        raw_kelly = %kelly,
        adjusted = %adjusted,
        size = %size,
        "Candidate sized"
    );

    Decision {
        action: Action::Execute,
        reason: None,
        kelly_fraction: kelly,
        adjusted_fraction: adjusted,
        size,
        edge: candidate.edge,
        confidence: candidate.confidence,
    }
}

/// Raw and adjusted Kelly fractions; `None` if any step overflows.
fn fractions(candidate: &Candidate, config: &RiskConfig) -> Option<(Decimal, Decimal)> {
    let p = candidate.confidence;
    let q = Decimal::ONE.checked_sub(p)?;

    // A zero stop loss or zero edge leaves no payoff ratio to work with.
    let b = if candidate.edge > Decimal::ZERO && config.stop_loss_fraction > Decimal::ZERO {
        candidate.edge.checked_div(config.stop_loss_fraction)?
    } else {
        Decimal::ZERO
    };

    let kelly = if b > Decimal::ZERO {
        p.checked_mul(b)?.checked_sub(q)?.checked_div(b)?
    } else {
        Decimal::ZERO
    };

    let adjusted = kelly
        .checked_mul(config.kelly_multiplier)?
        .min(config.max_position_fraction);
    Some((kelly, adjusted))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
