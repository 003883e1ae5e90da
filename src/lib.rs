//! Per-route transit schedule serving.
//!
//! Two GTFS-style tables (trips, stop times) are decoded once at startup,
//! inner-joined on trip id, and grouped by route into a read-only index that
//! is shared across all request workers. Several backends materialize the
//! index at different points, from no precomputation at all to fully
//! serialized per-route payloads.

pub mod backend;
pub mod decode;
pub mod export;
pub mod index;
pub mod metrics;
pub mod model;
pub mod server;
