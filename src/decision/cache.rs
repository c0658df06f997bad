//! Snapshot cache.
//!
//! Entries live until the snapshot's own `next_update`, so urgency-gated
//! and data-sparse answers expire after the short refresh interval and
//! the rest after the normal one.

use super::snapshot::MarketSnapshot;
use super::urgency::{GateDecision, Urgency};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Default maximum number of cached snapshots.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Postal code plus the gate outcome. Any two tank fractions that pass the
/// gate produce the same snapshot, so only the outcome is keyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub postal_code: String,
    pub urgency: Option<Urgency>,
}

impl CacheKey {
    pub fn new(postal_code: &str, gate: GateDecision) -> Self {
        let urgency = match gate {
            GateDecision::Proceed => None,
            GateDecision::Urgent(u) => Some(u),
        };
        Self { postal_code: postal_code.to_string(), urgency }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: MarketSnapshot,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.snapshot.next_update
    }
}

pub struct SnapshotCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl SnapshotCache {
    pub fn new(max_entries: usize) -> Self {
        Self { entries: RwLock::new(HashMap::new()), max_entries: max_entries.max(1) }
    }

    /// A live snapshot for `key`, if any.
    pub async fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<MarketSnapshot> {
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| !e.is_expired(now)).map(|e| e.snapshot.clone())
    }

    pub async fn insert(&self, key: CacheKey, snapshot: MarketSnapshot, now: DateTime<Utc>) {
        let mut entries = self.entries.write().await;

        // Remove expired entries if cache is full
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            entries.retain(|_, e| !e.is_expired(now));

            // If still full, drop the entries closest to expiry
            if entries.len() >= self.max_entries {
                let mut by_expiry: Vec<(CacheKey, DateTime<Utc>)> =
                    entries.iter().map(|(k, e)| (k.clone(), e.snapshot.next_update)).collect();
                by_expiry.sort_by_key(|(_, at)| *at);
                let evict = (entries.len() / 4).max(1);
                for (k, _) in by_expiry.into_iter().take(evict) {
                    entries.remove(&k);
                }
            }
            debug!(remaining = entries.len(), "snapshot cache purged");
        }
        entries.insert(key, CacheEntry { snapshot });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
