//! Record types for the schedule pipeline.
//!
//! `TripRow` and `StopTimeRow` are the raw table rows; they exist only
//! between decoding and index construction. `ScheduleEntry` is the wire
//! object served per trip, with serde field order matching the wire format.

use serde::{Deserialize, Serialize};

/// One row of the trip table. `trip_id` is assumed unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRow {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
}

/// One row of the stop-time table. Row order within a `trip_id` encodes
/// the stop sequence and must be preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub stop_id: String,
    pub arrival_time: String,
    pub departure_time: String,
}

/// One stop visit inside a served schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTime {
    pub stop_id: String,
    pub arrival_time: String,
    pub departure_time: String,
}

/// The served object: one trip with its ordered stop visits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    pub schedules: Vec<StopTime>,
}
