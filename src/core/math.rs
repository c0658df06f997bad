//! Small numeric helpers for price-signal calculations.
//!
//! This module provides:
//! - Percent change between averaging windows
//! - Clamping into the unit interval
//! - The staleness decay factor shared by strength and weight decay

/// Clamp a value to the range [0.0, 1.0]. NaN maps to 0.0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.max(0.0).min(1.0)
}

/// Percent change from `old_value` to `new_value` (e.g. 4.00 -> 3.80 is -5.0).
/// Returns 0.0 when the base is zero or either value is missing.
pub fn pct_change(old_value: Option<f64>, new_value: Option<f64>) -> f64 {
    match (old_value, new_value) {
        (Some(old), Some(new)) if old != 0.0 && old.is_finite() && new.is_finite() => {
            (new - old) / old * 100.0
        }
        _ => 0.0,
    }
}

/// Linear staleness decay: `max(minimum, 1 - stale_hours / 24 * rate_per_24h)`.
///
/// Infinite staleness (no data) yields `minimum`. The result never exceeds 1.0.
pub fn staleness_decay(stale_hours: f64, rate_per_24h: f64, minimum: f64) -> f64 {
    let hours = if stale_hours.is_nan() { f64::INFINITY } else { stale_hours.max(0.0) };
    let raw = 1.0 - hours / 24.0 * rate_per_24h;
    raw.max(minimum).min(1.0)
}
