//! Fusion and classification.
//!
//! Blends the four signals with their final weights into a single signed
//! direction and an overall confidence, then buckets both and derives a
//! data-quality tier.

use super::config::SignalConfig;
use super::types::{ConfidenceLevel, DataQuality, FusedResult, MarketState};
use super::weighting::{compute_weights, FinalWeights, SignalSet};
use crate::core::math::clamp01;
use crate::core::types::{Coverage, SourceKind};
use tracing::debug;

/// Market data younger than this counts as fresh for `high` quality.
const MARKET_FRESH_HOURS: f64 = 24.0;
/// Market data younger than this still lifts quality to `medium`.
const MARKET_RECENT_HOURS: f64 = 48.0;

/// `Σ(direction × strength × weight) / Σ(strength × weight)`, or 0 when no
/// source carries any strength.
pub fn weighted_direction(signals: &SignalSet, weights: &FinalWeights) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for signal in signals.iter() {
        let effective = signal.strength * weights.weights.get(signal.source);
        numerator += signal.direction.value() * effective;
        denominator += effective;
    }
    if denominator > 0.0 {
        (numerator / denominator).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// `Σ(strength × weight) / Σ(weight)`.
pub fn overall_confidence(signals: &SignalSet, weights: &FinalWeights) -> f64 {
    let total_weight = weights.weights.sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = signals
        .iter()
        .map(|s| s.strength * weights.weights.get(s.source))
        .sum();
    clamp01(weighted / total_weight)
}

pub fn classify_confidence(confidence: f64, cfg: &SignalConfig) -> ConfidenceLevel {
    let t = &cfg.thresholds.confidence;
    if confidence >= t.high {
        ConfidenceLevel::High
    } else if confidence >= t.medium {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

pub fn classify_market_state(direction: f64, cfg: &SignalConfig) -> MarketState {
    let t = &cfg.thresholds.market_state;
    if direction <= t.favorable {
        MarketState::Favorable
    } else if direction >= t.elevated {
        MarketState::Elevated
    } else {
        MarketState::Typical
    }
}

pub fn classify_data_quality(signals: &SignalSet) -> DataQuality {
    let scraped = &signals.scraped;
    let market = &signals.market;
    if scraped.coverage == Coverage::Good && market.is_fresher_than(MARKET_FRESH_HOURS) {
        DataQuality::High
    } else if scraped.coverage >= Coverage::Adequate || market.is_fresher_than(MARKET_RECENT_HOURS) {
        DataQuality::Medium
    } else {
        DataQuality::Low
    }
}

/// Blend already-weighted signals.
pub fn fuse_with_weights(signals: &SignalSet, weights: FinalWeights, cfg: &SignalConfig) -> FusedResult {
    let direction = weighted_direction(signals, &weights);
    let confidence = overall_confidence(signals, &weights);
    let result = FusedResult {
        weighted_direction: direction,
        confidence,
        confidence_level: classify_confidence(confidence, cfg),
        market_state: classify_market_state(direction, cfg),
        data_quality: classify_data_quality(signals),
        weights,
    };
    debug!(
        direction = result.weighted_direction,
        confidence = result.confidence,
        state = ?result.market_state,
        quality = ?result.data_quality,
        aggregator_weight = weights.weights.get(SourceKind::Aggregator),
        "signals fused"
    );
    result
}

/// Weight and blend the four signals.
pub fn fuse(signals: &SignalSet, cfg: &SignalConfig) -> FusedResult {
    let weights = compute_weights(signals, cfg);
    fuse_with_weights(signals, weights, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Direction, Scope, Signal};
    use crate::decision::config::SourceWeights;

    fn sig(source: SourceKind, direction: Direction, strength: f64) -> Signal {
        let mut s = Signal::empty(source, Scope::ExactArea);
        s.direction = direction;
        s.strength = strength;
        s.stale_hours = 1.0;
        s.sample_count = 12;
        s.coverage = Coverage::Good;
        s
    }

    fn empty_set() -> SignalSet {
        SignalSet {
            scraped: Signal::empty(SourceKind::Scraped, Scope::Region),
            aggregator: Signal::empty(SourceKind::Aggregator, Scope::Region),
            community: Signal::empty(SourceKind::Community, Scope::Region),
            market: Signal::empty(SourceKind::Market, Scope::National),
        }
    }

    fn fixed(scraped: f64, aggregator: f64, community: f64, market: f64) -> FinalWeights {
        FinalWeights {
            weights: SourceWeights { scraped, aggregator, community, market },
            sparse_override: false,
        }
    }

    #[test]
    fn four_empty_signals() {
        let cfg = SignalConfig::default();
        let r = fuse(&empty_set(), &cfg);
        assert_eq!(r.weighted_direction, 0.0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.market_state, MarketState::Typical);
        assert_eq!(r.data_quality, DataQuality::Low);
        assert_eq!(r.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn all_stable_signals_are_typical() {
        let cfg = SignalConfig::default();
        let set = SignalSet {
            scraped: sig(SourceKind::Scraped, Direction::Stable, 0.8),
            aggregator: sig(SourceKind::Aggregator, Direction::Stable, 0.3),
            community: sig(SourceKind::Community, Direction::Stable, 0.5),
            market: sig(SourceKind::Market, Direction::Stable, 0.6),
        };
        let r = fuse_with_weights(&set, fixed(0.45, 0.15, 0.15, 0.25), &cfg);
        assert_eq!(r.weighted_direction, 0.0);
        assert_eq!(r.market_state, MarketState::Typical);
        // 0.8*0.45 + 0.3*0.15 + 0.5*0.15 + 0.6*0.25 = 0.63
        assert!((r.confidence - 0.63).abs() < 1e-9);
        assert_eq!(r.confidence_level, ConfidenceLevel::Medium);
    }

    #[test]
    fn falling_majority_is_favorable() {
        let cfg = SignalConfig::default();
        let set = SignalSet {
            scraped: sig(SourceKind::Scraped, Direction::Falling, 0.9),
            aggregator: sig(SourceKind::Aggregator, Direction::Stable, 0.3),
            community: sig(SourceKind::Community, Direction::Falling, 0.5),
            market: sig(SourceKind::Market, Direction::Falling, 0.8),
        };
        let r = fuse_with_weights(&set, fixed(0.45, 0.15, 0.15, 0.25), &cfg);
        assert!(r.weighted_direction < -0.3);
        assert_eq!(r.market_state, MarketState::Favorable);
    }

    #[test]
    fn rising_majority_is_elevated() {
        let cfg = SignalConfig::default();
        let set = SignalSet {
            scraped: sig(SourceKind::Scraped, Direction::Rising, 0.9),
            aggregator: sig(SourceKind::Aggregator, Direction::Rising, 0.3),
            community: sig(SourceKind::Community, Direction::Stable, 0.5),
            market: sig(SourceKind::Market, Direction::Rising, 0.8),
        };
        let r = fuse_with_weights(&set, fixed(0.45, 0.15, 0.15, 0.25), &cfg);
        assert!(r.weighted_direction >= 0.3);
        assert_eq!(r.market_state, MarketState::Elevated);
    }

    #[test]
    fn data_quality_tiers() {
        let mut set = empty_set();
        assert_eq!(classify_data_quality(&set), DataQuality::Low);

        set.market = sig(SourceKind::Market, Direction::Stable, 0.5);
        set.market.stale_hours = 36.0;
        assert_eq!(classify_data_quality(&set), DataQuality::Medium);

        set.market.stale_hours = 10.0;
        set.scraped = sig(SourceKind::Scraped, Direction::Stable, 0.5);
        assert_eq!(classify_data_quality(&set), DataQuality::High);

        set.scraped.coverage = Coverage::Adequate;
        set.market.stale_hours = 100.0;
        assert_eq!(classify_data_quality(&set), DataQuality::Medium);
    }

    #[test]
    fn confidence_buckets() {
        let cfg = SignalConfig::default();
        assert_eq!(classify_confidence(0.70, &cfg), ConfidenceLevel::High);
        assert_eq!(classify_confidence(0.40, &cfg), ConfidenceLevel::Medium);
        assert_eq!(classify_confidence(0.39, &cfg), ConfidenceLevel::Low);
    }
}
