//! Statistical helpers.

pub mod metrics;
