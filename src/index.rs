//! Join-and-group engine and the read-only schedule index.
//!
//! One pass over the stop-time rows with a hashed trip lookup joins the two
//! tables in O(n); the result is grouped route -> (service, trip). Entries
//! within a route are ordered by `(service_id, trip_id)` so the same input
//! always produces byte-identical payloads, whichever backend serves them.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

use crate::model::{ScheduleEntry, StopTime, StopTimeRow, TripRow};

/// The canonical payload for a route with no schedules.
pub fn empty_payload() -> Bytes {
    Bytes::from_static(b"[]")
}

/// Serializes entries into the wire payload.
///
/// Serialization of these plain string records cannot fail; an empty slice
/// yields the canonical `[]`.
pub fn to_payload(entries: &[ScheduleEntry]) -> Bytes {
    Bytes::from(serde_json::to_vec(entries).expect("schedule entries serialize to JSON"))
}

/// Inner-joins stop times to trips and groups the result by route.
///
/// Duplicate `trip_id` values in the trip table resolve last-write-wins.
/// Stop times without a matching trip, and trips without any stop time,
/// produce nothing. Stop order within a trip is the encounter order of the
/// stop-time rows.
pub fn group_entries<'a, I>(
    trips: I,
    stop_times: &[StopTimeRow],
) -> HashMap<String, Vec<ScheduleEntry>>
where
    I: IntoIterator<Item = &'a TripRow>,
{
    let mut trips_by_id: HashMap<&str, &TripRow> = HashMap::new();
    for trip in trips {
        trips_by_id.insert(trip.trip_id.as_str(), trip);
    }

    let mut stops_by_trip: HashMap<&str, Vec<&StopTimeRow>> = HashMap::new();
    for stop_time in stop_times {
        if trips_by_id.contains_key(stop_time.trip_id.as_str()) {
            stops_by_trip
                .entry(stop_time.trip_id.as_str())
                .or_default()
                .push(stop_time);
        }
    }

    let mut grouped: HashMap<String, BTreeMap<(String, String), ScheduleEntry>> = HashMap::new();
    for (trip_id, stops) in stops_by_trip {
        let trip = trips_by_id[trip_id];
        let entry = ScheduleEntry {
            trip_id: trip.trip_id.clone(),
            route_id: trip.route_id.clone(),
            service_id: trip.service_id.clone(),
            schedules: stops
                .into_iter()
                .map(|s| StopTime {
                    stop_id: s.stop_id.clone(),
                    arrival_time: s.arrival_time.clone(),
                    departure_time: s.departure_time.clone(),
                })
                .collect(),
        };
        grouped.entry(trip.route_id.clone()).or_default().insert(
            (trip.service_id.clone(), trip.trip_id.clone()),
            entry,
        );
    }

    grouped
        .into_iter()
        .map(|(route_id, by_key)| (route_id, by_key.into_values().collect()))
        .collect()
}

/// Read-only mapping from route to its schedule entries, built once at
/// startup and shared across all requests.
#[derive(Debug, Default)]
pub struct ScheduleIndex {
    routes: HashMap<String, Vec<ScheduleEntry>>,
}

impl ScheduleIndex {
    pub fn build(trips: &[TripRow], stop_times: &[StopTimeRow]) -> Self {
        Self {
            routes: group_entries(trips.iter(), stop_times),
        }
    }

    /// Entries for a route; an unknown route yields an empty slice.
    pub fn get(&self, route_id: &str) -> &[ScheduleEntry] {
        self.routes.get(route_id).map_or(&[], Vec::as_slice)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, &[ScheduleEntry])> {
        self.routes
            .iter()
            .map(|(route_id, entries)| (route_id.as_str(), entries.as_slice()))
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Serializes every route's payload, consuming the structured entries.
    pub fn into_payloads(self) -> HashMap<String, Bytes> {
        self.routes
            .into_iter()
            .map(|(route_id, entries)| (route_id, to_payload(&entries)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(route_id: &str, service_id: &str, trip_id: &str) -> TripRow {
        TripRow {
            route_id: route_id.into(),
            service_id: service_id.into(),
            trip_id: trip_id.into(),
        }
    }

    fn stop_time(trip_id: &str, stop_id: &str, arrival: &str, departure: &str) -> StopTimeRow {
        StopTimeRow {
            trip_id: trip_id.into(),
            stop_id: stop_id.into(),
            arrival_time: arrival.into(),
            departure_time: departure.into(),
        }
    }

    #[test]
    fn test_single_trip_preserves_stop_order() {
        let trips = vec![trip("A", "S1", "T1")];
        let stop_times = vec![
            stop_time("T1", "ST1", "08:00:00", "08:01:00"),
            stop_time("T1", "ST2", "08:10:00", "08:10:00"),
        ];

        let index = ScheduleIndex::build(&trips, &stop_times);
        let entries = index.get("A");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].trip_id, "T1");
        assert_eq!(entries[0].service_id, "S1");
        assert_eq!(entries[0].schedules.len(), 2);
        assert_eq!(entries[0].schedules[0].stop_id, "ST1");
        assert_eq!(entries[0].schedules[1].stop_id, "ST2");
        assert_eq!(entries[0].schedules[1].arrival_time, "08:10:00");
    }

    #[test]
    fn test_unknown_route_is_empty() {
        let index = ScheduleIndex::build(&[trip("A", "S1", "T1")], &[]);
        assert!(index.get("B").is_empty());
        // T1 has no stop times, so even its own route is empty.
        assert!(index.get("A").is_empty());
        assert_eq!(index.route_count(), 0);
    }

    #[test]
    fn test_inner_join_drops_unmatched_rows() {
        let trips = vec![trip("A", "S1", "T1"), trip("A", "S1", "T2")];
        let stop_times = vec![
            stop_time("T1", "ST1", "08:00:00", "08:00:00"),
            // No trip T9 exists; this row is dropped.
            stop_time("T9", "ST1", "09:00:00", "09:00:00"),
        ];

        let index = ScheduleIndex::build(&trips, &stop_times);
        let entries = index.get("A");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].trip_id, "T1");
    }

    #[test]
    fn test_entries_sorted_by_service_then_trip() {
        let trips = vec![
            trip("A", "S2", "T3"),
            trip("A", "S1", "T2"),
            trip("A", "S1", "T1"),
        ];
        let stop_times = vec![
            stop_time("T3", "ST1", "07:00:00", "07:00:00"),
            stop_time("T2", "ST1", "08:00:00", "08:00:00"),
            stop_time("T1", "ST1", "09:00:00", "09:00:00"),
        ];

        let index = ScheduleIndex::build(&trips, &stop_times);
        let ids: Vec<&str> = index
            .get("A")
            .iter()
            .map(|e| e.trip_id.as_str())
            .collect();
        assert_eq!(ids, ["T1", "T2", "T3"]);
    }

    #[test]
    fn test_duplicate_trip_id_last_write_wins() {
        let trips = vec![trip("A", "S1", "T1"), trip("B", "S2", "T1")];
        let stop_times = vec![stop_time("T1", "ST1", "08:00:00", "08:00:00")];

        let index = ScheduleIndex::build(&trips, &stop_times);
        assert!(index.get("A").is_empty());
        let entries = index.get("B");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].service_id, "S2");
    }

    #[test]
    fn test_grouping_splits_routes() {
        let trips = vec![trip("A", "S1", "T1"), trip("B", "S1", "T2")];
        let stop_times = vec![
            stop_time("T1", "ST1", "08:00:00", "08:00:00"),
            stop_time("T2", "ST2", "09:00:00", "09:00:00"),
        ];

        let index = ScheduleIndex::build(&trips, &stop_times);
        assert_eq!(index.route_count(), 2);
        assert_eq!(index.get("A")[0].trip_id, "T1");
        assert_eq!(index.get("B")[0].trip_id, "T2");
    }

    #[test]
    fn test_rebuild_is_payload_identical() {
        let trips = vec![trip("A", "S1", "T2"), trip("A", "S1", "T1")];
        let stop_times = vec![
            stop_time("T1", "ST1", "08:00:00", "08:01:00"),
            stop_time("T2", "ST1", "09:00:00", "09:01:00"),
            stop_time("T1", "ST2", "08:10:00", "08:10:00"),
        ];

        let first = to_payload(ScheduleIndex::build(&trips, &stop_times).get("A"));
        let second = to_payload(ScheduleIndex::build(&trips, &stop_times).get("A"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_payload_shape() {
        let trips = vec![trip("A", "S1", "T1")];
        let stop_times = vec![stop_time("T1", "ST1", "08:00:00", "08:01:00")];

        let index = ScheduleIndex::build(&trips, &stop_times);
        let payload = to_payload(index.get("A"));
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "trip_id": "T1",
                "route_id": "A",
                "service_id": "S1",
                "schedules": [{
                    "stop_id": "ST1",
                    "arrival_time": "08:00:00",
                    "departure_time": "08:01:00",
                }],
            }])
        );
    }

    #[test]
    fn test_empty_payload_matches_serialized_empty_slice() {
        assert_eq!(to_payload(&[]), empty_payload());
    }
}
