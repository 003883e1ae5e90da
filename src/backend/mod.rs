//! Serving backends: one per precomputation policy.
//!
//! Every backend answers the same question (the serialized schedules for a
//! route) but materializes the answer at a different point: never, at
//! startup into structured entries, at startup into final bytes, or inside
//! an embedded query engine. All of them share the join+group implementation
//! in [`crate::index`].

mod engine;
mod live;
mod precomputed;

pub use engine::EngineBackend;
pub use live::LiveBackend;
pub use precomputed::{ByteBackend, StructuredBackend};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use bytes::Bytes;
use clap::ValueEnum;
use tracing::info;

use crate::decode::{read_stop_times, read_trips};
use crate::index::ScheduleIndex;
use crate::model::{StopTimeRow, TripRow};

/// A read-only schedule lookup, shared across all request workers.
///
/// `lookup` is total: any string is a valid route identifier, and a route
/// with no schedules yields the canonical `[]` payload. Implementations
/// never mutate themselves after construction, so concurrent calls need no
/// synchronization.
pub trait ScheduleBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn lookup(&self, route_id: &str) -> Bytes;
}

/// Which serving policy to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Re-run the join+group for the requested route on every request.
    Live,
    /// Join+group once at startup; serialize per request.
    Precompute,
    /// Serialize every route's payload at startup; a request is a key lookup.
    PrecomputeBytes,
    /// Evaluate a query-engine join per request.
    Engine,
    /// Evaluate the query-engine join once and cache the payloads.
    EngineBytes,
}

/// Builds the selected backend from the two source tables.
///
/// All decoding and validation happens here; once this returns, the backend
/// is immutable and the lookup path has no failure mode other than an empty
/// result.
pub fn build(
    kind: BackendKind,
    trips_path: &Path,
    stop_times_path: &Path,
) -> Result<Arc<dyn ScheduleBackend>> {
    let backend: Arc<dyn ScheduleBackend> = match kind {
        BackendKind::Live => {
            let (trips, stop_times) = decode_tables(trips_path, stop_times_path)?;
            Arc::new(LiveBackend::new(trips, stop_times))
        }
        BackendKind::Precompute => {
            let (trips, stop_times) = decode_tables(trips_path, stop_times_path)?;
            Arc::new(StructuredBackend::new(build_index(&trips, &stop_times)))
        }
        BackendKind::PrecomputeBytes => {
            let (trips, stop_times) = decode_tables(trips_path, stop_times_path)?;
            let index = build_index(&trips, &stop_times);
            // Raw rows and structured entries are released here; only the
            // final bytes stay resident.
            drop((trips, stop_times));
            let started = Instant::now();
            let backend = ByteBackend::from_index(index);
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "serialized route payloads"
            );
            Arc::new(backend)
        }
        BackendKind::Engine => Arc::new(EngineBackend::load(trips_path, stop_times_path)?),
        BackendKind::EngineBytes => {
            Arc::new(engine::build_cached(trips_path, stop_times_path)?)
        }
    };

    Ok(backend)
}

/// Decodes both tables, logging per-stage timings.
pub fn decode_tables(
    trips_path: &Path,
    stop_times_path: &Path,
) -> Result<(Vec<TripRow>, Vec<StopTimeRow>)> {
    let started = Instant::now();
    let stop_times = read_stop_times(stop_times_path)?;
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "parsed stop times"
    );

    let started = Instant::now();
    let trips = read_trips(trips_path)?;
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "parsed trips"
    );

    Ok((trips, stop_times))
}

fn build_index(trips: &[TripRow], stop_times: &[StopTimeRow]) -> ScheduleIndex {
    let started = Instant::now();
    let index = ScheduleIndex::build(trips, stop_times);
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        routes = index.route_count(),
        "joined and grouped schedules"
    );
    index
}
