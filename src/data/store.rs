//! Price observation store.
//!
//! The engine reads raw `(price, observed_at)` rows through the
//! [`PriceObservationStore`] trait. [`PgObservationStore`] is the production
//! implementation over the shared Postgres pool; [`MemoryObservationStore`]
//! serves tests and local development.

use crate::core::types::{PriceObservation, Scope, SourceKind};
use crate::error::{MarketSignalError, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Read access to price observations by source and geographic scope.
#[async_trait::async_trait]
pub trait PriceObservationStore: Send + Sync {
    /// Observations for `source` at `scope` around `postal_code`, newer than `since`.
    async fn observations(
        &self,
        source: SourceKind,
        postal_code: &str,
        scope: Scope,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>>;
}

/// Table and column names per source.
struct SourceTable {
    table: &'static str,
    price_col: &'static str,
    time_col: &'static str,
    extra_filter: &'static str,
}

fn source_table(source: SourceKind) -> Option<SourceTable> {
    match source {
        SourceKind::Scraped => Some(SourceTable {
            table: "supplier_prices",
            price_col: "price_per_gallon",
            time_col: "scraped_at",
            extra_filter: "AND p.is_valid",
        }),
        SourceKind::Aggregator => Some(SourceTable {
            table: "aggregator_prices",
            price_col: "price_per_gallon",
            time_col: "captured_at",
            extra_filter: "",
        }),
        SourceKind::Community => Some(SourceTable {
            table: "community_deliveries",
            price_col: "price_per_gallon",
            time_col: "delivered_at",
            extra_filter: "AND p.validation_status = 'valid'",
        }),
        // the wholesale index comes over HTTP, not from the database
        SourceKind::Market => None,
    }
}

/// Geographic filter for a scope. `$1` is the postal code, `$3` the radius in miles.
fn scope_filter(scope: Scope) -> &'static str {
    match scope {
        Scope::ExactArea => "p.zip_code = $1",
        Scope::Radius20Mi | Scope::Radius30Mi => {
            "p.zip_code IN (
                SELECT z.zip_code FROM zip_centroids z, zip_centroids o
                WHERE o.zip_code = $1
                  AND 3959.0 * acos(LEAST(1.0,
                        cos(radians(o.latitude)) * cos(radians(z.latitude)) * cos(radians(z.longitude) - radians(o.longitude))
                        + sin(radians(o.latitude)) * sin(radians(z.latitude)))) <= $3
            )"
        }
        Scope::Region => {
            "p.zip_code IN (
                SELECT z.zip_code FROM zip_centroids z
                WHERE z.state = (SELECT o.state FROM zip_centroids o WHERE o.zip_code = $1)
            )"
        }
        Scope::National => "$1::text IS NOT NULL",
    }
}

fn build_query(t: &SourceTable, scope: Scope) -> String {
    format!(
        "SELECT p.{price}::float8, p.{time} FROM {table} p \
         WHERE {filter} AND p.{time} > $2 AND $3::float8 >= 0 {extra} \
         ORDER BY p.{time} DESC",
        price = t.price_col,
        time = t.time_col,
        table = t.table,
        filter = scope_filter(scope),
        extra = t.extra_filter,
    )
}

/// Connection settings for [`PgObservationStore`].
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    pub url: String,
    pub max_connections: u32,
    pub query_timeout_ms: u64,
}

/// Postgres-backed observation store.
#[derive(Clone)]
pub struct PgObservationStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgObservationStore {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self { pool, query_timeout }
    }

    /// Build a lazily connecting pool; no connection is attempted until the first query.
    pub fn connect_lazy(cfg: &PgStoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_millis(cfg.query_timeout_ms))
            .connect_lazy(&cfg.url)?;
        Ok(Self::new(pool, Duration::from_millis(cfg.query_timeout_ms)))
    }
}

#[async_trait::async_trait]
impl PriceObservationStore for PgObservationStore {
    async fn observations(
        &self,
        source: SourceKind,
        postal_code: &str,
        scope: Scope,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>> {
        let table = source_table(source)
            .ok_or_else(|| MarketSignalError::Config(format!("{source} has no observation table")))?;
        let sql = build_query(&table, scope);
        let radius = scope.radius_miles().unwrap_or(0.0);

        let query = sqlx::query_as::<_, (f64, DateTime<Utc>)>(&sql)
            .bind(postal_code)
            .bind(since)
            .bind(radius)
            .fetch_all(&self.pool);
        let rows = timeout(self.query_timeout, query)
            .await
            .map_err(|_| MarketSignalError::Timeout {
                what: "observation query",
                after_ms: self.query_timeout.as_millis() as u64,
            })??;

        debug!(%source, %scope, rows = rows.len(), "observations loaded");
        Ok(rows.into_iter().map(|(price, at)| PriceObservation::new(price, at)).collect())
    }
}

/// In-memory store keyed by source and scope.
#[derive(Default)]
pub struct MemoryObservationStore {
    rows: RwLock<HashMap<(SourceKind, Scope), Vec<PriceObservation>>>,
    failing: RwLock<HashSet<SourceKind>>,
}

impl MemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the observations returned for `source` at `scope`, for any postal code.
    pub fn insert(&self, source: SourceKind, scope: Scope, observations: Vec<PriceObservation>) {
        let mut rows = self.rows.write().unwrap_or_else(|p| p.into_inner());
        rows.insert((source, scope), observations);
    }

    /// Make every query for `source` fail, as if the database were unreachable.
    pub fn fail_source(&self, source: SourceKind) {
        let mut failing = self.failing.write().unwrap_or_else(|p| p.into_inner());
        failing.insert(source);
    }
}

#[async_trait::async_trait]
impl PriceObservationStore for MemoryObservationStore {
    async fn observations(
        &self,
        source: SourceKind,
        _postal_code: &str,
        scope: Scope,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>> {
        if self.failing.read().unwrap_or_else(|p| p.into_inner()).contains(&source) {
            return Err(MarketSignalError::SourceUnavailable(source));
        }
        let rows = self.rows.read().unwrap_or_else(|p| p.into_inner());
        Ok(rows
            .get(&(source, scope))
            .map(|v| v.iter().copied().filter(|o| o.observed_at > since).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn market_has_no_table() {
        assert!(source_table(SourceKind::Market).is_none());
        assert!(source_table(SourceKind::Scraped).is_some());
    }

    #[test]
    fn query_binds_scope_specific_filters() {
        let t = source_table(SourceKind::Community).unwrap();
        let exact = build_query(&t, Scope::ExactArea);
        assert!(exact.contains("community_deliveries"));
        assert!(exact.contains("p.zip_code = $1"));
        assert!(exact.contains("validation_status"));
        let radius = build_query(&t, Scope::Radius20Mi);
        assert!(radius.contains("<= $3"));
        let region = build_query(&t, Scope::Region);
        assert!(region.contains("z.state"));
    }

    #[tokio::test]
    async fn memory_store_filters_by_since() {
        let store = MemoryObservationStore::new();
        let now = Utc::now();
        store.insert(
            SourceKind::Scraped,
            Scope::ExactArea,
            vec![
                PriceObservation::new(3.5, now - ChronoDuration::days(1)),
                PriceObservation::new(3.6, now - ChronoDuration::days(20)),
            ],
        );
        let rows = store
            .observations(SourceKind::Scraped, "01234", Scope::ExactArea, now - ChronoDuration::days(14))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let none = store
            .observations(SourceKind::Scraped, "01234", Scope::Region, now - ChronoDuration::days(14))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn memory_store_can_simulate_outage() {
        let store = MemoryObservationStore::new();
        store.fail_source(SourceKind::Aggregator);
        let res = store
            .observations(SourceKind::Aggregator, "01234", Scope::ExactArea, Utc::now())
            .await;
        assert!(matches!(res, Err(MarketSignalError::SourceUnavailable(SourceKind::Aggregator))));
    }
}
