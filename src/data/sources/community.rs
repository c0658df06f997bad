//! User-reported delivery prices. Only validated reports reach the store query.

use super::StoreSource;
use crate::core::types::{Scope, SourceKind};
use crate::data::provider::{ScopeLadder, MIN_SAMPLES};
use crate::data::store::PriceObservationStore;
use std::sync::Arc;

pub const COMMUNITY_LADDER: ScopeLadder =
    ScopeLadder::new(&[Scope::ExactArea, Scope::Radius20Mi, Scope::Radius30Mi, Scope::Region], MIN_SAMPLES);

pub fn community_source(store: Arc<dyn PriceObservationStore>) -> StoreSource {
    StoreSource::new(SourceKind::Community, COMMUNITY_LADDER, store)
}
