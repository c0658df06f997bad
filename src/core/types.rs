//! Core data types shared by the data and decision layers.
//!
//! These describe a single price observation, the four signal sources and
//! the normalized [`Signal`] each source is reduced to before blending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four independent origins of price information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Retail prices scraped directly from supplier websites.
    Scraped,
    /// Masked third-party aggregator feed. Never user-visible.
    Aggregator,
    /// User-submitted community delivery prices.
    Community,
    /// National wholesale index converted to a retail equivalent.
    Market,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Scraped,
        SourceKind::Aggregator,
        SourceKind::Community,
        SourceKind::Market,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Scraped => "scraped",
            SourceKind::Aggregator => "aggregator",
            SourceKind::Community => "community",
            SourceKind::Market => "market",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scraped" => Ok(SourceKind::Scraped),
            "aggregator" => Ok(SourceKind::Aggregator),
            "community" => Ok(SourceKind::Community),
            "market" => Ok(SourceKind::Market),
            other => Err(format!("unknown signal source: {other}")),
        }
    }
}

/// Week-over-week price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Falling,
    Stable,
    Rising,
}

impl Direction {
    /// Signed value used in fusion: -1, 0 or +1.
    pub fn value(&self) -> f64 {
        match self {
            Direction::Falling => -1.0,
            Direction::Stable => 0.0,
            Direction::Rising => 1.0,
        }
    }
}

/// Sample-count bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Sparse,
    Adequate,
    Good,
}

/// Geographic granularity at which a source actually found its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The requested postal code itself.
    ExactArea,
    /// Postal codes within roughly 20 miles.
    Radius20Mi,
    /// Postal codes within roughly 30 miles.
    Radius30Mi,
    /// Same state/region as the requested postal code.
    Region,
    National,
}

impl Scope {
    /// Search radius in miles for the radius tiers.
    pub fn radius_miles(&self) -> Option<f64> {
        match self {
            Scope::Radius20Mi => Some(20.0),
            Scope::Radius30Mi => Some(30.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::ExactArea => "exact_area",
            Scope::Radius20Mi => "radius_20mi",
            Scope::Radius30Mi => "radius_30mi",
            Scope::Region => "region",
            Scope::National => "national",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single timestamped price point in dollars per gallon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(price: f64, observed_at: DateTime<Utc>) -> Self {
        Self { price, observed_at }
    }
}

/// Internal-only numbers behind a signal. Used for explanation text and
/// never serialized across the crate boundary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalDiagnostics {
    /// Week-over-week change in percent.
    pub pct_change: f64,
    pub current_avg: Option<f64>,
    pub prior_avg: Option<f64>,
    /// 1.0 when observations agree, falling towards 0.0 as they scatter.
    pub consistency: f64,
}

/// Normalized per-source summary. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub source: SourceKind,
    pub direction: Direction,
    /// Confidence in this source's own reading, in [0, 1].
    pub strength: f64,
    pub coverage: Coverage,
    /// Hours since the freshest observation; infinite when there is no data.
    pub stale_hours: f64,
    pub scope: Scope,
    pub sample_count: usize,
    pub diagnostics: SignalDiagnostics,
}

impl Signal {
    /// The neutral signal returned when a source has no data or is unavailable.
    pub fn empty(source: SourceKind, scope: Scope) -> Self {
        Self {
            source,
            direction: Direction::Stable,
            strength: 0.0,
            coverage: Coverage::Sparse,
            stale_hours: f64::INFINITY,
            scope,
            sample_count: 0,
            diagnostics: SignalDiagnostics::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// True when the freshest data point is younger than `hours`.
    pub fn is_fresher_than(&self, hours: f64) -> bool {
        self.stale_hours < hours
    }
}
