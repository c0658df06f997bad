use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::data::http_client::WholesaleClientConfig;
use crate::data::sources::market::DEFAULT_RETAIL_MARKUP;
use crate::data::store::PgStoreConfig;
use crate::decision::snapshot::RefreshPolicy;

pub const DEFAULT_BASE_PATH: &str = "config/base.toml";
pub const DEFAULT_SIGNALS_PATH: &str = "config/market_signals.json";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub wholesale: Option<WholesaleConfig>,
    pub signals: Option<SignalsConfig>,
    pub snapshot: Option<SnapshotConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub query_timeout_ms: Option<u64>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WholesaleConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub series_id: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retail_markup_per_gallon: Option<f64>,
    pub lookback_points: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SignalsConfig {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SnapshotConfig {
    pub urgent_refresh_secs: Option<i64>,
    pub normal_refresh_secs: Option<i64>,
}

pub fn load_base() -> Result<AppConfig> {
    load_from(DEFAULT_BASE_PATH)
}

pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut cfg: AppConfig = toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    cfg.apply_env(|k| std::env::var(k).ok());
    Ok(cfg)
}

impl AppConfig {
    /// `DATABASE_URL` and `WHOLESALE_API_KEY` win over the file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("DATABASE_URL") {
            self.database.get_or_insert_with(Default::default).url = Some(url);
        }
        if let Some(key) = var("WHOLESALE_API_KEY") {
            self.wholesale.get_or_insert_with(Default::default).api_key = Some(key);
        }
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database.as_ref().and_then(|d| d.url.as_deref())
    }

    pub fn store_config(&self) -> Option<PgStoreConfig> {
        let db = self.database.as_ref()?;
        Some(PgStoreConfig {
            url: db.url.clone()?,
            max_connections: db.max_connections.unwrap_or(5),
            query_timeout_ms: db.query_timeout_ms.unwrap_or(3_000),
        })
    }

    pub fn wholesale_client_config(&self) -> WholesaleClientConfig {
        let mut out = WholesaleClientConfig::default();
        if let Some(w) = &self.wholesale {
            if let Some(v) = &w.base_url {
                out.base_url = v.clone();
            }
            out.api_key = w.api_key.clone();
            if let Some(v) = &w.series_id {
                out.series_id = v.clone();
            }
            if let Some(v) = w.timeout_ms {
                out.timeout_ms = v;
            }
            if let Some(v) = w.lookback_points {
                out.lookback_points = v;
            }
        }
        out
    }

    pub fn retail_markup(&self) -> f64 {
        self.wholesale
            .as_ref()
            .and_then(|w| w.retail_markup_per_gallon)
            .unwrap_or(DEFAULT_RETAIL_MARKUP)
    }

    pub fn signals_path(&self) -> String {
        self.signals
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(|| DEFAULT_SIGNALS_PATH.to_string())
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        let default = RefreshPolicy::default();
        let snap = self.snapshot.clone().unwrap_or_default();
        RefreshPolicy {
            urgent: snap
                .urgent_refresh_secs
                .map(chrono::Duration::seconds)
                .unwrap_or(default.urgent),
            normal: snap
                .normal_refresh_secs
                .map(chrono::Duration::seconds)
                .unwrap_or(default.normal),
        }
    }
}
