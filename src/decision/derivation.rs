//! Signal derivation.
//!
//! Reduces a set of timestamped prices to a [`Signal`]: week-over-week
//! direction, a coverage bucket, staleness, and a strength that combines
//! sample size, staleness decay and cross-observation consistency.
//! Pure and synchronous; the caller supplies `now`.

use super::config::SignalConfig;
use crate::core::math::{clamp01, pct_change, staleness_decay};
use crate::core::types::{Coverage, Direction, PriceObservation, Scope, Signal, SignalDiagnostics, SourceKind};
use crate::utils::metrics::{mean, std_dev};
use chrono::{DateTime, Duration, Utc};

/// Length of each averaging window.
pub const WINDOW_DAYS: i64 = 7;

/// Price standard deviation (dollars) at which consistency reaches zero.
pub const DISPERSION_REFERENCE: f64 = 0.20;

/// Sample count at which base strength saturates.
pub const SATURATION_SAMPLES: usize = 20;

/// Base strength as a step function of sample count.
pub fn base_strength(sample_count: usize) -> f64 {
    match sample_count {
        0 => 0.0,
        1..=4 => 0.3,
        5..=9 => 0.6,
        n if n >= SATURATION_SAMPLES => 1.0,
        _ => 0.8,
    }
}

pub fn classify_direction(pct: f64, cfg: &SignalConfig) -> Direction {
    let t = &cfg.thresholds.direction;
    if pct >= t.rising {
        Direction::Rising
    } else if pct <= t.falling {
        Direction::Falling
    } else {
        Direction::Stable
    }
}

pub fn classify_coverage(sample_count: usize, cfg: &SignalConfig) -> Coverage {
    let t = &cfg.thresholds.coverage;
    if sample_count >= t.good {
        Coverage::Good
    } else if sample_count >= t.adequate {
        Coverage::Adequate
    } else {
        Coverage::Sparse
    }
}

/// Hours between `now` and the freshest observation, or infinity when empty.
pub fn stale_hours(observations: &[PriceObservation], now: DateTime<Utc>) -> f64 {
    observations
        .iter()
        .map(|o| o.observed_at)
        .max()
        .map(|freshest| ((now - freshest).num_milliseconds() as f64 / 3_600_000.0).max(0.0))
        .unwrap_or(f64::INFINITY)
}

/// `1 - stddev / DISPERSION_REFERENCE`, floored at zero. Empty input is
/// fully consistent (nothing disagrees).
pub fn consistency(prices: &[f64]) -> f64 {
    std_dev(prices)
        .map(|sd| (1.0 - sd / DISPERSION_REFERENCE).max(0.0))
        .unwrap_or(1.0)
}

/// Mean price of the current window (last 7 days) and the prior window (7 to 14 days ago).
pub fn window_means(observations: &[PriceObservation], now: DateTime<Utc>) -> (Option<f64>, Option<f64>) {
    let current_start = now - Duration::days(WINDOW_DAYS);
    let prior_start = now - Duration::days(WINDOW_DAYS * 2);

    let mut current = Vec::new();
    let mut prior = Vec::new();
    for o in observations {
        if o.observed_at > current_start {
            current.push(o.price);
        } else if o.observed_at > prior_start {
            prior.push(o.price);
        }
    }
    (mean(&current), mean(&prior))
}

/// Build the signal for one source from its observations.
pub fn derive_signal(
    source: SourceKind,
    observations: &[PriceObservation],
    scope: Scope,
    cfg: &SignalConfig,
    now: DateTime<Utc>,
) -> Signal {
    let observations: Vec<PriceObservation> = observations
        .iter()
        .copied()
        .filter(|o| o.price.is_finite() && o.price > 0.0)
        .collect();
    if observations.is_empty() {
        return Signal::empty(source, scope);
    }

    let (current_avg, prior_avg) = window_means(&observations, now);
    let pct = pct_change(prior_avg, current_avg);
    let direction = classify_direction(pct, cfg);

    let sample_count = observations.len();
    let coverage = classify_coverage(sample_count, cfg);
    let stale = stale_hours(&observations, now);

    let prices: Vec<f64> = observations.iter().map(|o| o.price).collect();
    let consistency = consistency(&prices);

    let decay = staleness_decay(stale, cfg.staleness_decay.rate_per_24h, cfg.staleness_decay.minimum_weight);
    let mut strength = clamp01(base_strength(sample_count) * decay * consistency);
    if source == SourceKind::Aggregator {
        strength = strength.min(cfg.aggregator_caps.max_strength);
    }

    Signal {
        source,
        direction,
        strength,
        coverage,
        stale_hours: stale,
        scope,
        sample_count,
        diagnostics: SignalDiagnostics { pct_change: pct, current_avg, prior_avg, consistency },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn obs(price: f64, hours_ago: i64) -> PriceObservation {
        PriceObservation::new(price, now() - Duration::hours(hours_ago))
    }

    /// `n` prices in each window, current at `cur`, prior at `prior`.
    fn two_windows(cur: f64, prior: f64, n: usize) -> Vec<PriceObservation> {
        let mut v = Vec::new();
        for i in 0..n {
            v.push(obs(cur, 1 + i as i64));
            v.push(obs(prior, 24 * 8 + i as i64));
        }
        v
    }

    #[test]
    fn falling_week_over_week() {
        let cfg = SignalConfig::default();
        let s = derive_signal(SourceKind::Scraped, &two_windows(3.80, 4.00, 5), Scope::ExactArea, &cfg, now());
        assert!((s.diagnostics.pct_change + 5.0).abs() < 1e-9);
        assert_eq!(s.direction, Direction::Falling);
        assert!((s.diagnostics.current_avg.unwrap() - 3.80).abs() < 1e-9);
        assert!((s.diagnostics.prior_avg.unwrap() - 4.00).abs() < 1e-9);
    }

    #[test]
    fn rising_and_stable_thresholds() {
        let cfg = SignalConfig::default();
        let rising = derive_signal(SourceKind::Scraped, &two_windows(4.10, 4.00, 3), Scope::ExactArea, &cfg, now());
        assert_eq!(rising.direction, Direction::Rising);
        let stable = derive_signal(SourceKind::Scraped, &two_windows(4.04, 4.00, 3), Scope::ExactArea, &cfg, now());
        assert_eq!(stable.direction, Direction::Stable);
    }

    #[test]
    fn missing_prior_window_is_stable() {
        let cfg = SignalConfig::default();
        let data: Vec<_> = (0..6).map(|i| obs(3.50, i)).collect();
        let s = derive_signal(SourceKind::Community, &data, Scope::Radius20Mi, &cfg, now());
        assert_eq!(s.diagnostics.pct_change, 0.0);
        assert_eq!(s.diagnostics.prior_avg, None);
        assert_eq!(s.direction, Direction::Stable);
        assert_eq!(s.scope, Scope::Radius20Mi);
    }

    #[test]
    fn empty_input_yields_empty_signal() {
        let cfg = SignalConfig::default();
        let s = derive_signal(SourceKind::Scraped, &[], Scope::Region, &cfg, now());
        assert_eq!(s, Signal::empty(SourceKind::Scraped, Scope::Region));
    }

    #[test]
    fn coverage_buckets() {
        let cfg = SignalConfig::default();
        assert_eq!(classify_coverage(0, &cfg), Coverage::Sparse);
        assert_eq!(classify_coverage(4, &cfg), Coverage::Sparse);
        assert_eq!(classify_coverage(5, &cfg), Coverage::Adequate);
        assert_eq!(classify_coverage(10, &cfg), Coverage::Good);
    }

    #[test]
    fn staleness_is_measured_from_freshest_point() {
        let data = vec![obs(3.0, 30), obs(3.0, 6), obs(3.0, 100)];
        assert!((stale_hours(&data, now()) - 6.0).abs() < 1e-9);
        assert!(stale_hours(&[], now()).is_infinite());
    }

    #[test]
    fn scattered_prices_lower_consistency() {
        assert_eq!(consistency(&[3.0, 3.0, 3.0]), 1.0);
        assert!(consistency(&[3.0, 3.2]) < 1.0);
        assert_eq!(consistency(&[2.0, 4.0]), 0.0);
    }

    #[test]
    fn fresh_consistent_saturated_strength_is_one() {
        let cfg = SignalConfig::default();
        let data: Vec<_> = (0..20).map(|_| obs(3.50, 0)).collect();
        let s = derive_signal(SourceKind::Scraped, &data, Scope::ExactArea, &cfg, now());
        assert_eq!(s.strength, 1.0);
        assert_eq!(s.coverage, Coverage::Good);
    }

    #[test]
    fn aggregator_strength_is_capped() {
        let cfg = SignalConfig::default();
        let data: Vec<_> = (0..100).map(|_| obs(3.50, 0)).collect();
        let s = derive_signal(SourceKind::Aggregator, &data, Scope::ExactArea, &cfg, now());
        assert!(s.strength <= cfg.aggregator_caps.max_strength);
        assert_eq!(s.strength, 0.60);

        for n in [0usize, 1, 5, 10, 20, 50] {
            let data: Vec<_> = (0..n).map(|i| obs(3.50, i as i64 % 3)).collect();
            let s = derive_signal(SourceKind::Aggregator, &data, Scope::ExactArea, &cfg, now());
            assert!(s.strength <= cfg.aggregator_caps.max_strength, "n={n}");
        }
    }

    #[test]
    fn strength_non_increasing_in_staleness() {
        let cfg = SignalConfig::default();
        let mut previous = f64::MAX;
        for hours in [0i64, 1, 6, 12, 24, 48, 96, 168, 300] {
            let data: Vec<_> = (0..12).map(|i| obs(3.40 + (i % 3) as f64 * 0.01, hours + i)).collect();
            let s = derive_signal(SourceKind::Scraped, &data, Scope::ExactArea, &cfg, now());
            assert!(s.strength <= previous, "hours={hours}");
            previous = s.strength;
        }
    }

    #[test]
    fn base_strength_steps_and_saturates() {
        assert_eq!(base_strength(0), 0.0);
        assert!(base_strength(4) < base_strength(5));
        assert!(base_strength(9) < base_strength(10));
        assert_eq!(base_strength(SATURATION_SAMPLES - 1), 0.8);
        assert_eq!(base_strength(SATURATION_SAMPLES), 1.0);
        assert_eq!(base_strength(500), 1.0);
    }
}
