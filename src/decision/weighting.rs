//! Weighting engine.
//!
//! Final per-source weights are computed in four steps:
//! 1. start from the configured base map;
//! 2. swap in the `sparse_scraped` map when the scraped signal is sparse;
//! 3. multiply each weight by the staleness decay of its signal;
//! 4. renormalize to 1.0, then clamp the aggregator to its weight cap and
//!    hand the excess to the other sources proportionally.
//!
//! Step 3 compounds with the strength decay already applied during
//! derivation. Both are kept; `WEIGHT_DECAY_ENABLED` switches step 3.

use super::config::{SignalConfig, SourceWeights};
use crate::core::math::staleness_decay;
use crate::core::types::{Coverage, Signal, SourceKind};
use tracing::debug;

/// Apply staleness decay to weights as well as to strengths.
pub const WEIGHT_DECAY_ENABLED: bool = true;

/// Signals for the four sources, one slot each.
#[derive(Debug, Clone)]
pub struct SignalSet {
    pub scraped: Signal,
    pub aggregator: Signal,
    pub community: Signal,
    pub market: Signal,
}

impl SignalSet {
    pub fn get(&self, source: SourceKind) -> &Signal {
        match source {
            SourceKind::Scraped => &self.scraped,
            SourceKind::Aggregator => &self.aggregator,
            SourceKind::Community => &self.community,
            SourceKind::Market => &self.market,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        [&self.scraped, &self.aggregator, &self.community, &self.market].into_iter()
    }
}

/// Weights after override, decay and normalization, plus which map was used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalWeights {
    pub weights: SourceWeights,
    pub sparse_override: bool,
}

/// The configured map to start from for these signals.
pub fn select_base(signals: &SignalSet, cfg: &SignalConfig) -> (SourceWeights, bool) {
    if signals.scraped.coverage == Coverage::Sparse {
        (cfg.coverage_adjustments.sparse_scraped, true)
    } else {
        (cfg.weights, false)
    }
}

/// Scale weights so they sum to 1.0. A zero or non-finite total falls back
/// to equal weights.
pub fn normalize(weights: SourceWeights) -> SourceWeights {
    let total = weights.sum();
    let mut out = SourceWeights::default();
    for source in SourceKind::ALL {
        let w = if total > 0.0 && total.is_finite() {
            weights.get(source) / total
        } else {
            1.0 / SourceKind::ALL.len() as f64
        };
        out.set(source, w);
    }
    out
}

/// Limit the aggregator share to `max_weight`, redistributing the excess
/// over the other sources by their current proportions.
pub fn cap_aggregator(weights: SourceWeights, max_weight: f64) -> SourceWeights {
    let agg = weights.aggregator;
    if agg <= max_weight {
        return weights;
    }
    let excess = agg - max_weight;
    let mut out = weights;
    out.aggregator = max_weight;

    let others: Vec<SourceKind> = SourceKind::ALL.into_iter().filter(|s| *s != SourceKind::Aggregator).collect();
    let others_total: f64 = others.iter().map(|s| weights.get(*s)).sum();
    for source in &others {
        let share = if others_total > 0.0 {
            weights.get(*source) / others_total
        } else {
            1.0 / others.len() as f64
        };
        out.set(*source, weights.get(*source) + excess * share);
    }
    out
}

/// Compute the weights used for fusion.
pub fn compute_weights(signals: &SignalSet, cfg: &SignalConfig) -> FinalWeights {
    let (base, sparse_override) = select_base(signals, cfg);
    let decay = &cfg.staleness_decay;

    let mut decayed = base;
    if WEIGHT_DECAY_ENABLED {
        for source in SourceKind::ALL {
            let factor = staleness_decay(signals.get(source).stale_hours, decay.rate_per_24h, decay.minimum_weight);
            decayed.set(source, base.get(source) * factor);
        }
    }

    let weights = cap_aggregator(normalize(decayed), cfg.aggregator_caps.max_weight);
    debug!(?weights, sparse_override, "final source weights");
    FinalWeights { weights, sparse_override }
}
