//! Classification types produced by the decision engine.
//!
//! These are serialisable via [`serde`] because they appear verbatim in
//! the externally visible [`MarketSnapshot`](super::snapshot::MarketSnapshot).

use super::weighting::FinalWeights;
use serde::{Deserialize, Serialize};

/// End-user-facing classification of the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    /// Prices trending down.
    Favorable,
    Typical,
    /// Prices trending up.
    Elevated,
    /// Urgency-gated: the tank needs filling regardless of the market.
    OrderNow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    High,
    Medium,
    Low,
    /// No data was consulted (urgency-gated response).
    #[serde(rename = "n/a")]
    NotApplicable,
}

/// Output of fusion, before explanation and response shaping.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    /// Signed trend in [-1, 1].
    pub weighted_direction: f64,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub market_state: MarketState,
    pub data_quality: DataQuality,
    /// Internal only; dropped by the snapshot assembler.
    pub weights: FinalWeights,
}
