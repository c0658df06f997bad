//! Market signal engine.
//!
//! [`MarketSignalEngine`] is the entry point of the crate. For each request
//! it runs the urgency gate, fans out to the four signal sources
//! concurrently, weights and fuses their signals and shapes the result into
//! a [`MarketSnapshot`]. A source that fails contributes the empty signal;
//! the engine itself never fails a snapshot.

use super::cache::{CacheKey, SnapshotCache};
use super::config::{ConfigStore, SignalConfig};
use super::explain::{explain, explain_urgency};
use super::fusion::fuse;
use super::snapshot::{assemble, assemble_urgent, MarketSnapshot, RefreshPolicy};
use super::urgency::{self, GateDecision};
use super::weighting::SignalSet;
use crate::core::types::{Signal, SourceKind};
use crate::data::http_client::WholesaleIndex;
use crate::data::provider::{signal_or_empty, SignalSource};
use crate::data::sources::aggregator::aggregator_source;
use crate::data::sources::community::community_source;
use crate::data::sources::scraped::scraped_source;
use crate::data::sources::MarketSource;
use crate::data::store::PriceObservationStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Blends the four price sources into a per-postal-code market snapshot.
pub struct MarketSignalEngine {
    config: Arc<ConfigStore>,
    scraped: Arc<dyn SignalSource>,
    aggregator: Arc<dyn SignalSource>,
    community: Arc<dyn SignalSource>,
    market: Arc<dyn SignalSource>,
    refresh: RefreshPolicy,
    cache: Option<SnapshotCache>,
}

impl MarketSignalEngine {
    /// Create an engine from four explicit sources.
    pub fn new(
        config: Arc<ConfigStore>,
        scraped: Arc<dyn SignalSource>,
        aggregator: Arc<dyn SignalSource>,
        community: Arc<dyn SignalSource>,
        market: Arc<dyn SignalSource>,
    ) -> Self {
        Self {
            config,
            scraped,
            aggregator,
            community,
            market,
            refresh: RefreshPolicy::default(),
            cache: None,
        }
    }

    /// Create an engine whose local sources read `store` and whose market
    /// source reads `index`, lifted to retail by `retail_markup`.
    pub fn from_backends(
        config: Arc<ConfigStore>,
        store: Arc<dyn PriceObservationStore>,
        index: Arc<dyn WholesaleIndex>,
        retail_markup: f64,
    ) -> Self {
        Self::new(
            config,
            Arc::new(scraped_source(Arc::clone(&store))),
            Arc::new(aggregator_source(Arc::clone(&store))),
            Arc::new(community_source(store)),
            Arc::new(MarketSource::new(index).with_markup(retail_markup)),
        )
    }

    pub fn with_refresh_policy(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// Serve repeated requests from `cache` until each snapshot's `next_update`.
    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// The config in effect for new requests.
    pub fn config(&self) -> Arc<SignalConfig> {
        self.config.current()
    }

    fn source(&self, kind: SourceKind) -> &dyn SignalSource {
        match kind {
            SourceKind::Scraped => self.scraped.as_ref(),
            SourceKind::Aggregator => self.aggregator.as_ref(),
            SourceKind::Community => self.community.as_ref(),
            SourceKind::Market => self.market.as_ref(),
        }
    }

    /// Compute the snapshot for `postal_code` now.
    pub async fn compute_market_snapshot(&self, postal_code: &str, tank_fraction: Option<f64>) -> MarketSnapshot {
        self.compute_market_snapshot_at(postal_code, tank_fraction, Utc::now()).await
    }

    /// Compute the snapshot for `postal_code` as of `now`.
    #[instrument(skip_all, fields(postal_code = %postal_code, tank_fraction = ?tank_fraction))]
    pub async fn compute_market_snapshot_at(
        &self,
        postal_code: &str,
        tank_fraction: Option<f64>,
        now: DateTime<Utc>,
    ) -> MarketSnapshot {
        // one config for the whole request, even if a reload lands midway
        let cfg = self.config.current();
        let gate = urgency::evaluate(tank_fraction, &cfg.thresholds.urgency);

        let key = CacheKey::new(postal_code, gate);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key, now).await {
                debug!("snapshot served from cache");
                return hit;
            }
        }

        let snapshot = match gate {
            GateDecision::Urgent(level) => {
                info!(?level, "urgency gate tripped, skipping market analysis");
                assemble_urgent(level, explain_urgency(level), &self.refresh, now)
            }
            GateDecision::Proceed => {
                let signals = self.gather(postal_code, &cfg, now).await;
                let fused = fuse(&signals, &cfg);
                let explanation = explain(&fused, &signals.scraped);
                info!(
                    market_state = ?fused.market_state,
                    confidence = fused.confidence,
                    data_quality = ?fused.data_quality,
                    "market snapshot computed"
                );
                assemble(&signals, &fused, explanation, &self.refresh, now)
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(key, snapshot.clone(), now).await;
        }
        snapshot
    }

    /// All four signals for `postal_code` as of `now`, fetched concurrently.
    pub async fn compute_signals_at(&self, postal_code: &str, now: DateTime<Utc>) -> SignalSet {
        let cfg = self.config.current();
        self.gather(postal_code, &cfg, now).await
    }

    async fn gather(&self, postal_code: &str, cfg: &SignalConfig, now: DateTime<Utc>) -> SignalSet {
        let (scraped, aggregator, community, market) = tokio::join!(
            signal_or_empty(self.scraped.as_ref(), postal_code, cfg, now),
            signal_or_empty(self.aggregator.as_ref(), postal_code, cfg, now),
            signal_or_empty(self.community.as_ref(), postal_code, cfg, now),
            signal_or_empty(self.market.as_ref(), postal_code, cfg, now),
        );
        SignalSet { scraped, aggregator, community, market }
    }

    /// One source's signal, with diagnostics, for in-process callers.
    #[instrument(skip_all, fields(source = %kind, postal_code = %postal_code))]
    pub async fn compute_signal(&self, kind: SourceKind, postal_code: &str) -> Signal {
        let cfg = self.config.current();
        signal_or_empty(self.source(kind), postal_code, &cfg, Utc::now()).await
    }

    pub async fn compute_scraped_signal(&self, postal_code: &str) -> Signal {
        self.compute_signal(SourceKind::Scraped, postal_code).await
    }

    pub async fn compute_aggregator_signal(&self, postal_code: &str) -> Signal {
        self.compute_signal(SourceKind::Aggregator, postal_code).await
    }

    pub async fn compute_community_signal(&self, postal_code: &str) -> Signal {
        self.compute_signal(SourceKind::Community, postal_code).await
    }

    /// The wholesale signal is national and takes no location.
    pub async fn compute_market_signal(&self) -> Signal {
        self.compute_signal(SourceKind::Market, "").await
    }
}
