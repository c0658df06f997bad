//! Snapshot assembler and the externally visible response type.
//!
//! This is the one place where internal data is shaped for callers:
//! diagnostics, the weight map and the gate outcome stay behind, and the
//! aggregator signal has no slot in [`SnapshotSignals`] at all.

use super::types::{ConfidenceLevel, DataQuality, FusedResult, MarketState};
use super::urgency::Urgency;
use super::weighting::SignalSet;
use crate::core::types::{Coverage, Direction, Scope, Signal};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Public view of one source's signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalView {
    pub direction: Direction,
    pub strength: f64,
    pub coverage: Coverage,
    /// `None` when the source had no data at all.
    pub stale_hours: Option<f64>,
    pub scope: Scope,
    pub sample_count: usize,
}

impl From<&Signal> for SignalView {
    fn from(s: &Signal) -> Self {
        Self {
            direction: s.direction,
            strength: s.strength,
            coverage: s.coverage,
            stale_hours: s.stale_hours.is_finite().then_some(s.stale_hours),
            scope: s.scope,
            sample_count: s.sample_count,
        }
    }
}

/// User-visible signals. The aggregator only ever contributes to the fused
/// score and is deliberately absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSignals {
    pub scraped: SignalView,
    pub community: SignalView,
    pub market: SignalView,
}

impl From<&SignalSet> for SnapshotSignals {
    fn from(set: &SignalSet) -> Self {
        Self {
            scraped: SignalView::from(&set.scraped),
            community: SignalView::from(&set.community),
            market: SignalView::from(&set.market),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub market_state: MarketState,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    /// Fused signed trend in [-1, 1].
    pub direction: f64,
    /// `None` for urgency-gated responses.
    pub signals: Option<SnapshotSignals>,
    pub explanation: String,
    pub urgency: Option<Urgency>,
    pub data_quality: DataQuality,
    pub next_update: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn is_urgent(&self) -> bool {
        self.urgency.is_some()
    }
}

/// How soon callers should ask again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    /// Used for urgency-gated or data-sparse responses.
    pub urgent: Duration,
    pub normal: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self { urgent: Duration::minutes(5), normal: Duration::hours(1) }
    }
}

impl RefreshPolicy {
    pub fn interval(&self, urgent_or_sparse: bool) -> Duration {
        if urgent_or_sparse {
            self.urgent
        } else {
            self.normal
        }
    }
}

/// Fixed `order_now` response. No signal data is attached.
pub fn assemble_urgent(urgency: Urgency, explanation: String, policy: &RefreshPolicy, now: DateTime<Utc>) -> MarketSnapshot {
    MarketSnapshot {
        market_state: MarketState::OrderNow,
        confidence: 1.0,
        confidence_level: ConfidenceLevel::High,
        direction: 0.0,
        signals: None,
        explanation,
        urgency: Some(urgency),
        data_quality: DataQuality::NotApplicable,
        next_update: now + policy.interval(true),
    }
}

/// Shape a fused result into the public snapshot.
pub fn assemble(
    signals: &SignalSet,
    fused: &FusedResult,
    explanation: String,
    policy: &RefreshPolicy,
    now: DateTime<Utc>,
) -> MarketSnapshot {
    let sparse = signals.scraped.coverage == Coverage::Sparse;
    MarketSnapshot {
        market_state: fused.market_state,
        confidence: fused.confidence,
        confidence_level: fused.confidence_level,
        direction: fused.weighted_direction,
        signals: Some(SnapshotSignals::from(signals)),
        explanation,
        urgency: None,
        data_quality: fused.data_quality,
        next_update: now + policy.interval(sparse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceKind;
    use crate::decision::config::SignalConfig;
    use crate::decision::fusion::fuse;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn set_with_secret_aggregator() -> SignalSet {
        let mut aggregator = Signal::empty(SourceKind::Aggregator, Scope::ExactArea);
        aggregator.sample_count = 987654;
        aggregator.strength = 0.6;
        aggregator.stale_hours = 2.0;
        let mut scraped = Signal::empty(SourceKind::Scraped, Scope::ExactArea);
        scraped.coverage = Coverage::Good;
        scraped.sample_count = 14;
        scraped.strength = 0.9;
        scraped.stale_hours = 3.0;
        scraped.diagnostics.current_avg = Some(7.654321);
        SignalSet {
            scraped,
            aggregator,
            community: Signal::empty(SourceKind::Community, Scope::Region),
            market: Signal::empty(SourceKind::Market, Scope::National),
        }
    }

    #[test]
    fn urgent_snapshot_has_no_signals() {
        let snap = assemble_urgent(Urgency::Critical, "x".into(), &RefreshPolicy::default(), now());
        assert!(snap.is_urgent());
        assert_eq!(snap.market_state, MarketState::OrderNow);
        assert_eq!(snap.confidence, 1.0);
        assert_eq!(snap.direction, 0.0);
        assert!(snap.signals.is_none());
        assert_eq!(snap.data_quality, DataQuality::NotApplicable);
        assert_eq!(snap.next_update, now() + Duration::minutes(5));
    }

    #[test]
    fn serialized_snapshot_omits_aggregator_and_diagnostics() {
        let set = set_with_secret_aggregator();
        let fused = fuse(&set, &SignalConfig::default());
        let snap = assemble(&set, &fused, "ok".into(), &RefreshPolicy::default(), now());
        let json = serde_json::to_value(&snap).unwrap();

        let signals = json["signals"].as_object().unwrap();
        assert!(signals.contains_key("scraped"));
        assert!(!signals.contains_key("aggregator"));
        let text = json.to_string();
        assert!(!text.contains("987654"));
        assert!(!text.contains("7.654321"));
        assert!(!text.contains("weights"));
        assert!(!snap.is_urgent());
        assert_eq!(json["marketState"], "typical");
        assert_eq!(json["urgency"], serde_json::Value::Null);
    }

    #[test]
    fn infinite_staleness_serializes_as_null() {
        let view = SignalView::from(&Signal::empty(SourceKind::Community, Scope::Region));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["staleHours"], serde_json::Value::Null);
        assert_eq!(json["sampleCount"], 0);
    }

    #[test]
    fn next_update_depends_on_scraped_coverage() {
        let policy = RefreshPolicy::default();
        let set = set_with_secret_aggregator();
        let fused = fuse(&set, &SignalConfig::default());
        let snap = assemble(&set, &fused, String::new(), &policy, now());
        assert_eq!(snap.next_update, now() + Duration::hours(1));

        let mut sparse = set.clone();
        sparse.scraped = Signal::empty(SourceKind::Scraped, Scope::Region);
        let fused = fuse(&sparse, &SignalConfig::default());
        let snap = assemble(&sparse, &fused, String::new(), &policy, now());
        assert_eq!(snap.next_update, now() + Duration::minutes(5));
    }

    #[test]
    fn urgency_serializes_snake_case() {
        let snap = assemble_urgent(Urgency::LowTank, String::new(), &RefreshPolicy::default(), now());
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["urgency"], "low_tank");
        assert_eq!(json["marketState"], "order_now");
        assert_eq!(json["dataQuality"], "n/a");
        assert_eq!(json["signals"], serde_json::Value::Null);
    }
}
