//! Wholesale market source.
//!
//! Reads the national wholesale index and lifts each point to an estimated
//! retail price by adding a fixed per-gallon markup, so its percent change
//! is on the same footing as the local sources.

use crate::core::types::{PriceObservation, Scope, SourceKind};
use crate::data::http_client::WholesaleIndex;
use crate::data::provider::{ScopedObservations, SignalSource};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DEFAULT_RETAIL_MARKUP: f64 = 1.40;

pub struct MarketSource {
    index: Arc<dyn WholesaleIndex>,
    retail_markup: f64,
}

impl MarketSource {
    pub fn new(index: Arc<dyn WholesaleIndex>) -> Self {
        Self { index, retail_markup: DEFAULT_RETAIL_MARKUP }
    }

    pub fn with_markup(mut self, retail_markup: f64) -> Self {
        self.retail_markup = retail_markup;
        self
    }
}

#[async_trait::async_trait]
impl SignalSource for MarketSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Market
    }

    fn fallback_scope(&self) -> Scope {
        Scope::National
    }

    #[instrument(skip_all, fields(source = "market"))]
    async fn observations(&self, _postal_code: &str, since: DateTime<Utc>) -> Result<ScopedObservations> {
        let series = self.index.fetch_series().await?;
        let observations: Vec<PriceObservation> = series
            .into_iter()
            .filter(|p| p.observed_at > since)
            .map(|p| PriceObservation::new(p.value + self.retail_markup, p.observed_at))
            .collect();
        debug!(points = observations.len(), "wholesale points in lookback");
        Ok(ScopedObservations { scope: Scope::National, observations })
    }
}
