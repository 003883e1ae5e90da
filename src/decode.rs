//! Positional CSV decoding for the trip and stop-time tables.
//!
//! Both tables carry a fixed, known header. The header is compared against
//! the expected column list before any row is decoded; a mismatch or a
//! malformed row aborts startup, since the index built from these rows is
//! relied upon by every future request.

use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::model::{StopTimeRow, TripRow};

/// Expected header of `trips.txt`. Only the first three columns are decoded;
/// the rest are ignored but must be present in this exact order.
pub const TRIP_HEADER: &[&str] = &[
    "route_id",
    "service_id",
    "trip_id",
    "trip_headsign",
    "trip_short_name",
    "direction_id",
    "block_id",
    "shape_id",
    "wheelchair_accessible",
    "trip_route_type",
    "route_pattern_id",
    "bikes_allowed",
];

/// Expected header of `stop_times.txt`. Only the first four columns are
/// decoded.
pub const STOP_TIME_HEADER: &[&str] = &[
    "trip_id",
    "arrival_time",
    "departure_time",
    "stop_id",
    "stop_sequence",
    "stop_headsign",
    "pickup_type",
    "drop_off_type",
    "timepoint",
    "checkpoint_id",
    "continuous_pickup",
    "continuous_drop_off",
];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("unknown format of {path}: header is {found:?}")]
    HeaderMismatch { path: PathBuf, found: Vec<String> },

    #[error("malformed row at line {line} of {path}: {source}")]
    Row {
        path: PathBuf,
        line: u64,
        source: csv::Error,
    },

    #[error("row at line {line} of {path} is missing columns")]
    ShortRow { path: PathBuf, line: u64 },
}

/// Reads and decodes the trip table.
pub fn read_trips(path: &Path) -> Result<Vec<TripRow>, DecodeError> {
    read_rows(path, TRIP_HEADER, |record| {
        Some(TripRow {
            route_id: record.get(0)?.to_owned(),
            service_id: record.get(1)?.to_owned(),
            trip_id: record.get(2)?.to_owned(),
        })
    })
}

/// Reads and decodes the stop-time table, preserving row order.
pub fn read_stop_times(path: &Path) -> Result<Vec<StopTimeRow>, DecodeError> {
    read_rows(path, STOP_TIME_HEADER, |record| {
        Some(StopTimeRow {
            trip_id: record.get(0)?.to_owned(),
            arrival_time: record.get(1)?.to_owned(),
            departure_time: record.get(2)?.to_owned(),
            stop_id: record.get(3)?.to_owned(),
        })
    })
}

/// Opens `path`, verifies the header, and decodes every row positionally.
///
/// The reader is strict about field counts, so a ragged row surfaces as a
/// [`DecodeError::Row`] rather than being silently truncated.
fn read_rows<T>(
    path: &Path,
    expected_header: &[&str],
    decode: impl Fn(&csv::StringRecord) -> Option<T>,
) -> Result<Vec<T>, DecodeError> {
    let mut reader = open_checked(path, expected_header)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // Line 1 is the header, so data rows start at line 2.
        let line = i as u64 + 2;
        let record = record.map_err(|source| DecodeError::Row {
            path: path.to_owned(),
            line,
            source,
        })?;
        let row = decode(&record).ok_or_else(|| DecodeError::ShortRow {
            path: path.to_owned(),
            line,
        })?;
        rows.push(row);
    }

    info!(path = %path.display(), rows = rows.len(), "table decoded");
    Ok(rows)
}

fn open_checked(
    path: &Path,
    expected_header: &[&str],
) -> Result<csv::Reader<File>, DecodeError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| DecodeError::Open {
        path: path.to_owned(),
        source,
    })?;

    let headers = reader.headers().map_err(|source| DecodeError::Row {
        path: path.to_owned(),
        line: 1,
        source,
    })?;

    if !headers.iter().eq(expected_header.iter().copied()) {
        return Err(DecodeError::HeaderMismatch {
            path: path.to_owned(),
            found: headers.iter().map(String::from).collect(),
        });
    }

    Ok(reader)
}
