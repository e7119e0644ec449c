//! Storage utilization domain logic.
//!
//! Everything here is free of HTTP concerns: usage snapshots, naming
//! convention classification, critical selection, report building and
//! the privileged mount-refresh runner. The `api` crate wires these
//! into routes.

pub mod classify;
pub mod critical;
pub mod error;
pub mod refresh;
pub mod report;
pub mod snapshot;
pub mod volume;
