//! Heating-oil market signal blending engine.
//!
//! Blends four price sources (supplier websites, a third-party aggregator,
//! community delivery reports and the wholesale index) into a per-ZIP
//! [`decision::snapshot::MarketSnapshot`] telling a homeowner whether now is
//! a good time to order. See [`decision::signal_engine::MarketSignalEngine`].

#[path = "../config/config.rs"]
pub mod config;

pub mod bootstrap;
pub mod core;
pub mod data;
pub mod decision;
pub mod error;
pub mod utils;

pub use decision::signal_engine::MarketSignalEngine;
pub use decision::snapshot::MarketSnapshot;
pub use error::{MarketSignalError, Result};
