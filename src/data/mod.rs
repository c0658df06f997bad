//! Data access: the observation store, the wholesale index client and the
//! four signal source adapters built on them.

pub mod http_client;
pub mod provider;
pub mod sources;
pub mod store;
