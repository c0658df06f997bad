//! Urgency pre-gate.
//!
//! Runs before any I/O. A critically low or low tank short-circuits the
//! whole engine: no sources are queried and no fusion is performed.

use super::config::UrgencyThresholds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    LowTank,
}

/// Gate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Proceed to full signal computation.
    Proceed,
    /// Answer immediately with a fixed `order_now` response.
    Urgent(Urgency),
}

/// Decide from the tank-fill fraction (`None` when unknown).
///
/// Fractions outside [0, 1] are clamped; NaN is treated as unknown.
pub fn evaluate(tank_fraction: Option<f64>, thresholds: &UrgencyThresholds) -> GateDecision {
    let fraction = match tank_fraction {
        Some(f) if !f.is_nan() => f.clamp(0.0, 1.0),
        _ => return GateDecision::Proceed,
    };
    if fraction < thresholds.critical {
        GateDecision::Urgent(Urgency::Critical)
    } else if fraction < thresholds.low_tank {
        GateDecision::Urgent(Urgency::LowTank)
    } else {
        GateDecision::Proceed
    }
}
