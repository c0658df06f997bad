//! Supplier website prices, the primary local signal.

use super::StoreSource;
use crate::core::types::{Scope, SourceKind};
use crate::data::provider::{ScopeLadder, MIN_SAMPLES};
use crate::data::store::PriceObservationStore;
use std::sync::Arc;

pub const SCRAPED_LADDER: ScopeLadder =
    ScopeLadder::new(&[Scope::ExactArea, Scope::Radius20Mi, Scope::Radius30Mi, Scope::Region], MIN_SAMPLES);

pub fn scraped_source(store: Arc<dyn PriceObservationStore>) -> StoreSource {
    StoreSource::new(SourceKind::Scraped, SCRAPED_LADDER, store)
}
