//! Third-party aggregator prices.
//!
//! Used only inside fusion; the snapshot never exposes aggregator figures.
//! The ladder skips the 20 mile tier since aggregator listings are already
//! regional in nature.

use super::StoreSource;
use crate::core::types::{Scope, SourceKind};
use crate::data::provider::{ScopeLadder, MIN_SAMPLES};
use crate::data::store::PriceObservationStore;
use std::sync::Arc;

pub const AGGREGATOR_LADDER: ScopeLadder =
    ScopeLadder::new(&[Scope::ExactArea, Scope::Radius30Mi, Scope::Region], MIN_SAMPLES);

pub fn aggregator_source(store: Arc<dyn PriceObservationStore>) -> StoreSource {
    StoreSource::new(SourceKind::Aggregator, AGGREGATOR_LADDER, store)
}
