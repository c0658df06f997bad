//! HTTP client for the external wholesale heating-oil index.
//!
//! The index is a daily time series of wholesale prices in dollars per
//! gallon, published by a third-party REST API. Every request is bounded
//! by an explicit timeout, separate from the database query timeout, and
//! there is no retry: a failed fetch is reported to the caller, which
//! degrades to an empty signal.

use crate::error::{MarketSignalError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

/// One point of the wholesale series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
    /// Wholesale price, dollars per gallon.
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

/// Source of the wholesale index series.
#[async_trait::async_trait]
pub trait WholesaleIndex: Send + Sync {
    /// Most recent points, newest first.
    async fn fetch_series(&self) -> Result<Vec<IndexPoint>>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct WholesaleClientConfig {
    /// Base URL for the API
    pub base_url: String,
    pub api_key: Option<String>,
    /// Series identifier, e.g. the New York Harbor No. 2 heating oil spot price.
    pub series_id: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of most recent points to request.
    pub lookback_points: u32,
    /// User agent string
    pub user_agent: String,
}

impl Default for WholesaleClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.eia.gov".to_string(),
            api_key: None,
            series_id: "EER_EPD2F_PF4_Y35NY_DPG".to_string(),
            timeout_ms: 8_000,
            lookback_points: 30,
            user_agent: "oil-market-signal/0.1".to_string(),
        }
    }
}

/// Raw row as returned by the API. `value` arrives as a number or a string.
#[derive(Debug, Clone, Deserialize)]
struct ApiPoint {
    period: String,
    value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    response: Option<ApiData>,
    data: Option<Vec<ApiPoint>>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    data: Vec<ApiPoint>,
}

/// Wholesale index client over reqwest.
pub struct WholesaleHttpClient {
    config: WholesaleClientConfig,
    client: Client,
}

impl WholesaleHttpClient {
    pub fn new(config: WholesaleClientConfig) -> Result<Self> {
        // the request deadline is enforced in fetch_series, not by reqwest
        let client = ClientBuilder::new().user_agent(&config.user_agent).build()?;
        Ok(Self { config, client })
    }

    /// Build the series URL with query parameters.
    fn build_api_url(&self) -> Result<Url> {
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| MarketSignalError::Config(format!("invalid wholesale base_url: {e}")))?;
        let mut url = base
            .join("/v2/petroleum/pri/spt/data/")
            .map_err(|e| MarketSignalError::Config(format!("invalid wholesale base_url: {e}")))?;
        {
            let mut q = url.query_pairs_mut();
            if let Some(key) = &self.config.api_key {
                q.append_pair("api_key", key);
            }
            q.append_pair("frequency", "daily")
                .append_pair("data[0]", "value")
                .append_pair("facets[series][]", &self.config.series_id)
                .append_pair("sort[0][column]", "period")
                .append_pair("sort[0][direction]", "desc")
                .append_pair("length", &self.config.lookback_points.to_string());
        }
        Ok(url)
    }
}

/// Parse a response body into index points, newest first. Rows without a
/// usable value or date are skipped.
pub fn parse_series(body: &str) -> Result<Vec<IndexPoint>> {
    let envelope: ApiEnvelope = serde_json::from_str(body)
        .map_err(|e| MarketSignalError::Wholesale(format!("malformed response: {e}")))?;
    let rows = envelope
        .response
        .map(|r| r.data)
        .or(envelope.data)
        .ok_or_else(|| MarketSignalError::Wholesale("response carries no data array".into()))?;

    let mut points: Vec<IndexPoint> = rows
        .into_iter()
        .filter_map(|row| {
            let value = match row.value? {
                serde_json::Value::Number(n) => n.as_f64()?,
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            let observed_at = parse_period(&row.period)?;
            (value.is_finite() && value > 0.0).then_some(IndexPoint { value, observed_at })
        })
        .collect();
    points.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
    Ok(points)
}

/// `YYYY-MM-DD` (taken as midnight UTC) or an RFC 3339 timestamp.
fn parse_period(period: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(period) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(period, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[async_trait::async_trait]
impl WholesaleIndex for WholesaleHttpClient {
    async fn fetch_series(&self) -> Result<Vec<IndexPoint>> {
        let url = self.build_api_url()?;
        let after_ms = self.config.timeout_ms;

        let response = timeout(Duration::from_millis(after_ms), self.client.get(url).send())
            .await
            .map_err(|_| MarketSignalError::Timeout { what: "wholesale index request", after_ms })??;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketSignalError::Wholesale(format!("HTTP {status}")));
        }
        let body = timeout(Duration::from_millis(after_ms), response.text())
            .await
            .map_err(|_| MarketSignalError::Timeout { what: "wholesale index body", after_ms })??;

        let points = parse_series(&body)?;
        debug!(points = points.len(), "wholesale series fetched");
        Ok(points)
    }
}

/// Fixed series, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticWholesaleIndex {
    points: Vec<IndexPoint>,
    fail: bool,
}

impl StaticWholesaleIndex {
    pub fn new(points: Vec<IndexPoint>) -> Self {
        Self { points, fail: false }
    }

    /// An index whose every fetch fails.
    pub fn unavailable() -> Self {
        Self { points: Vec::new(), fail: true }
    }
}

#[async_trait::async_trait]
impl WholesaleIndex for StaticWholesaleIndex {
    async fn fetch_series(&self) -> Result<Vec<IndexPoint>> {
        if self.fail {
            return Err(MarketSignalError::Wholesale("index unavailable".into()));
        }
        Ok(self.points.clone())
    }
}
