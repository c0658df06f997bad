//! Weighting and threshold configuration.
//!
//! [`SignalConfig`] mirrors the JSON document in `config/market_signals.json`.
//! Every field carries a serde default, so a partial document is merged with
//! the built-in values. [`ConfigStore`] owns the currently active config and
//! swaps it wholesale on [`ConfigStore::reload`]; readers always see a
//! complete, immutable [`Arc<SignalConfig>`].

use crate::core::types::SourceKind;
use crate::error::{MarketSignalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// One weight per signal source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceWeights {
    pub scraped: f64,
    pub aggregator: f64,
    pub community: f64,
    pub market: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self { scraped: 0.45, aggregator: 0.15, community: 0.15, market: 0.25 }
    }
}

impl SourceWeights {
    pub fn get(&self, source: SourceKind) -> f64 {
        match source {
            SourceKind::Scraped => self.scraped,
            SourceKind::Aggregator => self.aggregator,
            SourceKind::Community => self.community,
            SourceKind::Market => self.market,
        }
    }

    pub fn set(&mut self, source: SourceKind, weight: f64) {
        match source {
            SourceKind::Scraped => self.scraped = weight,
            SourceKind::Aggregator => self.aggregator = weight,
            SourceKind::Community => self.community = weight,
            SourceKind::Market => self.market = weight,
        }
    }

    pub fn sum(&self) -> f64 {
        SourceKind::ALL.iter().map(|s| self.get(*s)).sum()
    }

    fn validate(&self, name: &str) -> Result<()> {
        for source in SourceKind::ALL {
            let w = self.get(source);
            if !w.is_finite() || w < 0.0 {
                return Err(MarketSignalError::Config(format!(
                    "{name}.{source} must be a finite non-negative number, got {w}"
                )));
            }
        }
        if self.sum() <= 0.0 {
            return Err(MarketSignalError::Config(format!("{name} must have a positive sum")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageAdjustments {
    /// Weight map used instead of the base map when the scraped source is sparse.
    pub sparse_scraped: SourceWeights,
}

impl Default for CoverageAdjustments {
    fn default() -> Self {
        Self {
            sparse_scraped: SourceWeights { scraped: 0.15, aggregator: 0.15, community: 0.20, market: 0.50 },
        }
    }
}

/// Percent-change thresholds for direction classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionThresholds {
    pub rising: f64,
    pub falling: f64,
}

impl Default for DirectionThresholds {
    fn default() -> Self {
        Self { rising: 2.0, falling: -2.0 }
    }
}

/// Sample-count cutoffs for coverage buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageThresholds {
    pub good: usize,
    pub adequate: usize,
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self { good: 10, adequate: 5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self { high: 0.70, medium: 0.40 }
    }
}

/// Tank-fill fractions below which the urgency gate fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyThresholds {
    pub critical: f64,
    pub low_tank: f64,
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self { critical: 0.15, low_tank: 0.25 }
    }
}

/// Weighted-direction cutoffs for market state classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketStateThresholds {
    pub favorable: f64,
    pub elevated: f64,
}

impl Default for MarketStateThresholds {
    fn default() -> Self {
        Self { favorable: -0.3, elevated: 0.3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub direction: DirectionThresholds,
    pub coverage: CoverageThresholds,
    pub confidence: ConfidenceThresholds,
    pub urgency: UrgencyThresholds,
    pub market_state: MarketStateThresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessDecay {
    /// Fraction of strength/weight lost per 24 hours of staleness.
    pub rate_per_24h: f64,
    /// Floor for the decay multiplier.
    pub minimum_weight: f64,
}

impl Default for StalenessDecay {
    fn default() -> Self {
        Self { rate_per_24h: 0.10, minimum_weight: 0.25 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorCaps {
    pub max_strength: f64,
    pub max_weight: f64,
}

impl Default for AggregatorCaps {
    fn default() -> Self {
        Self { max_strength: 0.60, max_weight: 0.20 }
    }
}

/// The complete weighting/threshold configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub weights: SourceWeights,
    pub coverage_adjustments: CoverageAdjustments,
    pub thresholds: Thresholds,
    pub staleness_decay: StalenessDecay,
    pub aggregator_caps: AggregatorCaps,
}

impl SignalConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: SignalConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// Check internal consistency of weights and thresholds.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate("weights")?;
        self.coverage_adjustments.sparse_scraped.validate("coverage_adjustments.sparse_scraped")?;

        let t = &self.thresholds;
        if !(t.direction.falling < t.direction.rising) {
            return Err(invalid("thresholds.direction.falling must be below rising"));
        }
        if t.coverage.adequate > t.coverage.good {
            return Err(invalid("thresholds.coverage.adequate must not exceed good"));
        }
        if !(t.confidence.medium <= t.confidence.high) {
            return Err(invalid("thresholds.confidence.medium must not exceed high"));
        }
        if !(t.urgency.critical <= t.urgency.low_tank) {
            return Err(invalid("thresholds.urgency.critical must not exceed low_tank"));
        }
        if !(t.market_state.favorable < t.market_state.elevated) {
            return Err(invalid("thresholds.market_state.favorable must be below elevated"));
        }

        let d = &self.staleness_decay;
        if !d.rate_per_24h.is_finite() || d.rate_per_24h < 0.0 {
            return Err(invalid("staleness_decay.rate_per_24h must be non-negative"));
        }
        if !(0.0..=1.0).contains(&d.minimum_weight) {
            return Err(invalid("staleness_decay.minimum_weight must be within [0, 1]"));
        }

        let caps = &self.aggregator_caps;
        if !(0.0..=1.0).contains(&caps.max_strength) {
            return Err(invalid("aggregator_caps.max_strength must be within [0, 1]"));
        }
        if !(caps.max_weight > 0.0 && caps.max_weight <= 1.0) {
            return Err(invalid("aggregator_caps.max_weight must be within (0, 1]"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> MarketSignalError {
    MarketSignalError::Config(msg.to_string())
}

/// Holder for the active [`SignalConfig`].
///
/// Loaded once at startup and shared by reference. `reload` replaces the
/// whole config atomically; requests already holding the previous `Arc`
/// finish with it.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<SignalConfig>>,
}

impl ConfigStore {
    /// Store holding a fixed config, with nothing to reload from.
    pub fn from_config(cfg: SignalConfig) -> Self {
        Self { path: None, current: RwLock::new(Arc::new(cfg)) }
    }

    /// Load from `path`. A missing, unparsable or invalid file falls back to
    /// the built-in defaults with a warning.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cfg = match SignalConfig::from_file(&path) {
            Ok(cfg) => {
                info!(path = %path.display(), "loaded signal config");
                cfg
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "signal config unavailable, using defaults");
                SignalConfig::default()
            }
        };
        Self { path: Some(path), current: RwLock::new(Arc::new(cfg)) }
    }

    /// The active config.
    pub fn current(&self) -> Arc<SignalConfig> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    /// Re-read the backing file and swap it in. On failure the previous
    /// config stays active and the error is returned.
    pub fn reload(&self) -> Result<Arc<SignalConfig>> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| MarketSignalError::Config("config store has no backing file".into()))?;
        let fresh = Arc::new(SignalConfig::from_file(path)?);
        self.replace(Arc::clone(&fresh));
        info!(path = %path.display(), "signal config reloaded");
        Ok(fresh)
    }

    /// Swap in an explicit config.
    pub fn replace(&self, cfg: Arc<SignalConfig>) {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = cfg;
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::from_config(SignalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("oil_market_signal_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn defaults_are_valid_and_sum_to_one() {
        let cfg = SignalConfig::default();
        cfg.validate().unwrap();
        assert!((cfg.weights.sum() - 1.0).abs() < 1e-9);
        assert!((cfg.coverage_adjustments.sparse_scraped.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_document_merges_with_defaults() {
        let cfg = SignalConfig::from_json(r#"{"aggregator_caps": {"max_strength": 0.5}}"#).unwrap();
        assert_eq!(cfg.aggregator_caps.max_strength, 0.5);
        assert_eq!(cfg.aggregator_caps.max_weight, 0.20);
        assert_eq!(cfg.thresholds.urgency.critical, 0.15);
    }

    #[test]
    fn full_contract_document_parses() {
        let doc = r#"{
            "weights": {"scraped": 0.4, "aggregator": 0.1, "community": 0.2, "market": 0.3},
            "coverage_adjustments": {"sparse_scraped": {"scraped": 0.1, "aggregator": 0.1, "community": 0.3, "market": 0.5}},
            "thresholds": {
                "direction": {"rising": 3.0, "falling": -3.0},
                "coverage": {"good": 12, "adequate": 6},
                "confidence": {"high": 0.8, "medium": 0.5},
                "urgency": {"critical": 0.1, "low_tank": 0.2},
                "market_state": {"favorable": -0.25, "elevated": 0.25}
            },
            "staleness_decay": {"rate_per_24h": 0.2, "minimum_weight": 0.1},
            "aggregator_caps": {"max_strength": 0.5, "max_weight": 0.15}
        }"#;
        let cfg = SignalConfig::from_json(doc).unwrap();
        assert_eq!(cfg.thresholds.coverage.good, 12);
        assert_eq!(cfg.coverage_adjustments.sparse_scraped.market, 0.5);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let err = SignalConfig::from_json(r#"{"thresholds": {"urgency": {"critical": 0.4, "low_tank": 0.2}}}"#);
        assert!(matches!(err, Err(MarketSignalError::Config(_))));
        let err = SignalConfig::from_json(r#"{"weights": {"scraped": -1.0}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let store = ConfigStore::load(temp_path("missing"));
        assert_eq!(*store.current(), SignalConfig::default());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{ not json").unwrap();
        let store = ConfigStore::load(&path);
        assert_eq!(*store.current(), SignalConfig::default());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn reload_swaps_whole_config_and_keeps_old_on_failure() {
        let path = temp_path("reload");
        std::fs::write(&path, r#"{"aggregator_caps": {"max_strength": 0.4}}"#).unwrap();
        let store = ConfigStore::load(&path);
        let before = store.current();
        assert_eq!(before.aggregator_caps.max_strength, 0.4);

        std::fs::write(&path, r#"{"aggregator_caps": {"max_strength": 0.3}}"#).unwrap();
        let after = store.reload().unwrap();
        assert_eq!(after.aggregator_caps.max_strength, 0.3);
        // readers holding the old Arc are unaffected
        assert_eq!(before.aggregator_caps.max_strength, 0.4);

        std::fs::write(&path, "garbage").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.current().aggregator_caps.max_strength, 0.3);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn reload_without_path_is_an_error() {
        let store = ConfigStore::default();
        assert!(store.reload().is_err());
    }
}
