//! Source adapters registry.
//!
//! Three sources read from the observation store and differ only in their
//! scope ladder and plausibility bounds, so they share [`StoreSource`]. The
//! wholesale market source talks to the external index instead.

pub mod aggregator;
pub mod community;
pub mod market;
pub mod scraped;

use crate::core::types::{Scope, SourceKind};
use crate::data::provider::{ScopeLadder, ScopedObservations, SignalSource};
use crate::data::store::PriceObservationStore;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

pub use market::MarketSource;

/// Retail prices outside this range (dollars per gallon) are discarded as bad rows.
pub const PLAUSIBLE_RETAIL_RANGE: (f64, f64) = (1.50, 9.00);

/// A signal source backed by the price observation store.
pub struct StoreSource {
    kind: SourceKind,
    ladder: ScopeLadder,
    store: Arc<dyn PriceObservationStore>,
    bounds: (f64, f64),
}

impl StoreSource {
    pub fn new(kind: SourceKind, ladder: ScopeLadder, store: Arc<dyn PriceObservationStore>) -> Self {
        Self { kind, ladder, store, bounds: PLAUSIBLE_RETAIL_RANGE }
    }
}

#[async_trait::async_trait]
impl SignalSource for StoreSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn fallback_scope(&self) -> Scope {
        self.ladder.widest()
    }

    #[instrument(skip_all, fields(source = %self.kind, postal_code = %postal_code))]
    async fn observations(&self, postal_code: &str, since: DateTime<Utc>) -> Result<ScopedObservations> {
        let (low, high) = self.bounds;
        self.ladder
            .walk(|scope| {
                let store = Arc::clone(&self.store);
                let kind = self.kind;
                let postal_code = postal_code.to_string();
                async move {
                    let rows = store.observations(kind, &postal_code, scope, since).await?;
                    Ok(rows.into_iter().filter(|o| o.price >= low && o.price <= high).collect())
                }
            })
            .await
    }
}
