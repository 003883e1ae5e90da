//! Query-engine-backed serving via polars.
//!
//! The two tables are loaded into in-memory data frames with every column
//! read as a string. The join is expressed as a lazy polars query; a row
//! index added to the stop-time table at load restores source stop order
//! after the join, since the engine does not guarantee it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use bytes::Bytes;
use polars::prelude::*;
use tracing::{error, info};

use super::ScheduleBackend;
use super::precomputed::ByteBackend;
use crate::index::{empty_payload, to_payload};
use crate::model::{ScheduleEntry, StopTime};

const SOURCE_ORDER: &str = "source_order";

/// Evaluates the join for the requested route on every lookup.
pub struct EngineBackend {
    trips: DataFrame,
    stop_times: DataFrame,
}

impl EngineBackend {
    pub fn load(trips_path: &Path, stop_times_path: &Path) -> Result<Self> {
        let started = Instant::now();
        let stop_times = load_table(stop_times_path)?
            .select([
                col("trip_id"),
                col("stop_id"),
                col("arrival_time"),
                col("departure_time"),
            ])
            .with_row_index(SOURCE_ORDER, None)
            .collect()?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            rows = stop_times.height(),
            "loaded stop times into engine"
        );

        let started = Instant::now();
        let trips = load_table(trips_path)?
            .select([col("route_id"), col("service_id"), col("trip_id")])
            .collect()?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            rows = trips.height(),
            "loaded trips into engine"
        );

        Ok(Self { trips, stop_times })
    }

    /// Inner-joins the tables, optionally restricted to one route, and
    /// restores source stop-time order.
    fn joined(&self, route_id: Option<&str>) -> PolarsResult<DataFrame> {
        let mut trips = self.trips.clone().lazy();
        if let Some(route_id) = route_id {
            trips = trips.filter(col("route_id").eq(lit(route_id)));
        }

        trips
            .join(
                self.stop_times.clone().lazy(),
                [col("trip_id")],
                [col("trip_id")],
                JoinArgs::new(JoinType::Inner),
            )
            .sort([SOURCE_ORDER], SortMultipleOptions::default())
            .collect()
    }

    fn query(&self, route_id: &str) -> PolarsResult<Bytes> {
        let frame = self.joined(Some(route_id))?;
        let mut grouped = frame_to_entries(&frame)?;
        Ok(match grouped.remove(route_id) {
            Some(entries) => to_payload(&entries),
            None => empty_payload(),
        })
    }
}

impl ScheduleBackend for EngineBackend {
    fn name(&self) -> &'static str {
        "engine"
    }

    fn lookup(&self, route_id: &str) -> Bytes {
        match self.query(route_id) {
            Ok(payload) => payload,
            Err(error) => {
                // An engine failure is served as "no schedules"; the request
                // path never surfaces a fault to the client.
                error!(route_id, %error, "engine query failed");
                empty_payload()
            }
        }
    }
}

/// Evaluates the full join once, serializes every route, and serves from the
/// cached bytes.
pub fn build_cached(trips_path: &Path, stop_times_path: &Path) -> Result<ByteBackend> {
    let engine = EngineBackend::load(trips_path, stop_times_path)?;

    let started = Instant::now();
    let frame = engine.joined(None)?;
    let grouped = frame_to_entries(&frame)?;
    let payloads: HashMap<String, Bytes> = grouped
        .into_iter()
        .map(|(route_id, entries)| (route_id, to_payload(&entries)))
        .collect();
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        routes = payloads.len(),
        "preaggregated route payloads"
    );

    Ok(ByteBackend::from_payloads(payloads, "engine-bytes"))
}

fn load_table(path: &Path) -> PolarsResult<LazyFrame> {
    // infer_schema_length of zero reads every column as a string, matching
    // the positional decoder's treatment of times as opaque text.
    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
}

/// Folds the joined frame into per-route entries with the same
/// `(service_id, trip_id)` ordering the in-process index produces.
fn frame_to_entries(frame: &DataFrame) -> PolarsResult<HashMap<String, Vec<ScheduleEntry>>> {
    let route_ids = frame.column("route_id")?.str()?;
    let service_ids = frame.column("service_id")?.str()?;
    let trip_ids = frame.column("trip_id")?.str()?;
    let stop_ids = frame.column("stop_id")?.str()?;
    let arrival_times = frame.column("arrival_time")?.str()?;
    let departure_times = frame.column("departure_time")?.str()?;

    let mut grouped: HashMap<String, BTreeMap<(String, String), ScheduleEntry>> = HashMap::new();
    for i in 0..frame.height() {
        let route_id = route_ids.get(i).unwrap_or("");
        let service_id = service_ids.get(i).unwrap_or("");
        let trip_id = trip_ids.get(i).unwrap_or("");

        let entry = grouped
            .entry(route_id.to_owned())
            .or_default()
            .entry((service_id.to_owned(), trip_id.to_owned()))
            .or_insert_with(|| ScheduleEntry {
                trip_id: trip_id.to_owned(),
                route_id: route_id.to_owned(),
                service_id: service_id.to_owned(),
                schedules: Vec::new(),
            });
        entry.schedules.push(StopTime {
            stop_id: stop_ids.get(i).unwrap_or("").to_owned(),
            arrival_time: arrival_times.get(i).unwrap_or("").to_owned(),
            departure_time: departure_times.get(i).unwrap_or("").to_owned(),
        });
    }

    Ok(grouped
        .into_iter()
        .map(|(route_id, by_key)| {
            (
                route_id,
                by_key.into_values().collect::<Vec<ScheduleEntry>>(),
            )
        })
        .collect())
}
