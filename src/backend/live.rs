//! The no-precomputation baseline: raw rows in memory, join+group per request.

use bytes::Bytes;

use super::ScheduleBackend;
use crate::index::{empty_payload, group_entries, to_payload};
use crate::model::{StopTimeRow, TripRow};

/// Stores the decoded tables as-is and re-executes the join+group restricted
/// to the requested route on every lookup. Cheapest startup, most expensive
/// request path; the other backends are measured against this one.
pub struct LiveBackend {
    trips: Vec<TripRow>,
    stop_times: Vec<StopTimeRow>,
}

impl LiveBackend {
    pub fn new(trips: Vec<TripRow>, stop_times: Vec<StopTimeRow>) -> Self {
        Self { trips, stop_times }
    }
}

impl ScheduleBackend for LiveBackend {
    fn name(&self) -> &'static str {
        "live"
    }

    fn lookup(&self, route_id: &str) -> Bytes {
        let matched = self.trips.iter().filter(|trip| trip.route_id == route_id);
        let mut grouped = group_entries(matched, &self.stop_times);
        match grouped.remove(route_id) {
            Some(entries) => to_payload(&entries),
            None => empty_payload(),
        }
    }
}
