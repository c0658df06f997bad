//! Signal source abstraction and progressive scope widening.
//!
//! Each source adapter fetches observations at the narrowest geographic
//! scope it supports and widens along its [`ScopeLadder`] until enough
//! samples are found or the ladder is exhausted. Adapters report failures
//! as errors; [`signal_or_empty`] turns those into the neutral signal so
//! one unavailable source never fails a snapshot.

use crate::core::types::{PriceObservation, Scope, Signal, SourceKind};
use crate::decision::config::SignalConfig;
use crate::decision::derivation::derive_signal;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use tracing::{debug, warn};

/// Samples needed before a scope is accepted without widening further.
pub const MIN_SAMPLES: usize = 5;

/// How far back adapters look: the current and prior weekly windows.
pub const LOOKBACK_DAYS: i64 = 14;

/// Observations together with the scope they were found at.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedObservations {
    pub scope: Scope,
    pub observations: Vec<PriceObservation>,
}

/// Ordered scope tiers, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopeLadder {
    tiers: &'static [Scope],
    min_samples: usize,
}

impl ScopeLadder {
    pub const fn new(tiers: &'static [Scope], min_samples: usize) -> Self {
        Self { tiers, min_samples }
    }

    pub fn tiers(&self) -> &'static [Scope] {
        self.tiers
    }

    pub fn widest(&self) -> Scope {
        self.tiers.last().copied().unwrap_or(Scope::National)
    }

    /// Query each tier in order, stopping at the first with enough samples.
    /// Returns the widest tier's result when none qualifies. The first
    /// error aborts the walk.
    pub async fn walk<F, Fut>(&self, mut fetch: F) -> Result<ScopedObservations>
    where
        F: FnMut(Scope) -> Fut,
        Fut: Future<Output = Result<Vec<PriceObservation>>>,
    {
        let mut last = ScopedObservations { scope: self.widest(), observations: Vec::new() };
        for &scope in self.tiers {
            let observations = fetch(scope).await?;
            debug!(%scope, samples = observations.len(), "scope tier tried");
            let enough = observations.len() >= self.min_samples;
            last = ScopedObservations { scope, observations };
            if enough {
                break;
            }
        }
        Ok(last)
    }
}

/// A producer of raw observations for one signal source.
#[async_trait::async_trait]
pub trait SignalSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// The scope reported when the source yields nothing.
    fn fallback_scope(&self) -> Scope;

    /// Fetch observations newer than `since`, widening scope as needed.
    async fn observations(&self, postal_code: &str, since: DateTime<Utc>) -> Result<ScopedObservations>;
}

/// Start of the observation window for `now`.
pub fn lookback_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(LOOKBACK_DAYS)
}

/// Fetch from `source` and derive its signal, degrading any failure to the
/// empty signal.
pub async fn signal_or_empty(
    source: &dyn SignalSource,
    postal_code: &str,
    cfg: &SignalConfig,
    now: DateTime<Utc>,
) -> Signal {
    let kind = source.kind();
    match source.observations(postal_code, lookback_start(now)).await {
        Ok(found) => derive_signal(kind, &found.observations, found.scope, cfg, now),
        Err(e) => {
            warn!(source = %kind, postal_code, error = %e, "signal source unavailable, using empty signal");
            Signal::empty(kind, source.fallback_scope())
        }
    }
}
