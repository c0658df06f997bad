//! Decision layer module index.
//!
//! Everything between raw observations and the public snapshot:
//!
//! - [`config`]: weighting and threshold configuration plus the reloadable
//!   [`config::ConfigStore`].
//! - [`urgency`]: the tank-level pre-gate.
//! - [`derivation`]: observations to [`crate::core::types::Signal`].
//! - [`weighting`], [`fusion`]: per-source weights and the blended result.
//! - [`explain`], [`snapshot`]: user-facing text and the redacted response.
//! - [`cache`]: TTL cache of snapshots.
//! - [`signal_engine`]: the coordinator tying the stages together.

pub mod cache;
pub mod config;
pub mod derivation;
pub mod explain;
pub mod fusion;
pub mod signal_engine;
pub mod snapshot;
pub mod types;
pub mod urgency;
pub mod weighting;
