use crate::config::{self, AppConfig};
use crate::data::http_client::{StaticWholesaleIndex, WholesaleHttpClient, WholesaleIndex};
use crate::data::store::{MemoryObservationStore, PgObservationStore, PriceObservationStore};
use crate::decision::cache::SnapshotCache;
use crate::decision::config::ConfigStore;
use crate::decision::signal_engine::MarketSignalEngine;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load `config/base.toml` (or `path`), falling back to an empty config
/// with environment overrides when the file is absent.
pub fn load_app_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(p) => config::load_from(p),
        None => match config::load_base() {
            Ok(cfg) => Ok(cfg),
            Err(e) => {
                warn!(error = %e, "base config unavailable, using defaults");
                let mut cfg = AppConfig::default();
                cfg.apply_env(|k| std::env::var(k).ok());
                Ok(cfg)
            }
        },
    }
}

/// Wire the engine from process config: Postgres-backed local sources, the
/// HTTP wholesale index and the weighting config file.
pub fn build_engine(cfg: &AppConfig) -> anyhow::Result<MarketSignalEngine> {
    let signals = Arc::new(ConfigStore::load(cfg.signals_path()));

    let store: Arc<dyn PriceObservationStore> = match cfg.store_config() {
        Some(store_cfg) => {
            let store = PgObservationStore::connect_lazy(&store_cfg).context("creating Postgres pool")?;
            info!(max_connections = store_cfg.max_connections, "observation store configured");
            Arc::new(store)
        }
        None => {
            warn!("no database configured, local sources will be empty");
            Arc::new(MemoryObservationStore::new())
        }
    };

    let index: Arc<dyn WholesaleIndex> = match WholesaleHttpClient::new(cfg.wholesale_client_config()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "wholesale client unavailable, market signal will be empty");
            Arc::new(StaticWholesaleIndex::unavailable())
        }
    };

    let engine = MarketSignalEngine::from_backends(signals, store, index, cfg.retail_markup())
        .with_refresh_policy(cfg.refresh_policy())
        .with_cache(SnapshotCache::default());
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn engine_without_database_still_answers() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [wholesale]
            base_url = "http://127.0.0.1:9"
            timeout_ms = 300

            [signals]
            path = "does/not/exist.json"
            "#,
        )
        .unwrap();
        let engine = build_engine(&cfg).unwrap();
        let snap = engine.compute_market_snapshot("06101", None).await;
        assert!(snap.signals.is_some());
        assert_eq!(snap.confidence, 0.0);
    }
}
