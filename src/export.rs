//! Static export: one JSON file per route, for fronting with a plain file
//! server instead of this process.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::index::{ScheduleIndex, to_payload};

/// Writes `<route_id>.json` for every route in the index and returns the
/// number of files written.
///
/// Route identifiers that cannot form a safe file name are skipped with a
/// warning rather than escaping the output directory.
pub fn export_routes(index: &ScheduleIndex, out_dir: &Path) -> Result<usize> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut written = 0;
    for (route_id, entries) in index.routes() {
        if route_id.is_empty() || route_id.contains(['/', '\\']) || route_id.starts_with('.') {
            warn!(route_id, "route id is not a safe file name, skipping");
            continue;
        }

        let path = out_dir.join(format!("{route_id}.json"));
        fs::write(&path, to_payload(entries))
            .with_context(|| format!("failed to write {}", path.display()))?;
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StopTimeRow, TripRow};
    use std::env;

    fn index_for(trips: &[TripRow], stop_times: &[StopTimeRow]) -> ScheduleIndex {
        ScheduleIndex::build(trips, stop_times)
    }

    fn trip(route_id: &str, trip_id: &str) -> TripRow {
        TripRow {
            route_id: route_id.into(),
            service_id: "S1".into(),
            trip_id: trip_id.into(),
        }
    }

    fn stop_time(trip_id: &str) -> StopTimeRow {
        StopTimeRow {
            trip_id: trip_id.into(),
            stop_id: "ST1".into(),
            arrival_time: "08:00:00".into(),
            departure_time: "08:00:00".into(),
        }
    }

    #[test]
    fn test_export_writes_one_file_per_route() {
        let out_dir = env::temp_dir().join("export_test_routes");
        let _ = fs::remove_dir_all(&out_dir);

        let index = index_for(
            &[trip("A", "T1"), trip("B", "T2")],
            &[stop_time("T1"), stop_time("T2")],
        );
        let written = export_routes(&index, &out_dir).unwrap();

        assert_eq!(written, 2);
        let payload = fs::read_to_string(out_dir.join("A.json")).unwrap();
        let entries: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(entries[0]["route_id"], "A");

        fs::remove_dir_all(&out_dir).unwrap();
    }

    #[test]
    fn test_export_skips_unsafe_route_ids() {
        let out_dir = env::temp_dir().join("export_test_unsafe");
        let _ = fs::remove_dir_all(&out_dir);

        let index = index_for(&[trip("../evil", "T1")], &[stop_time("T1")]);
        let written = export_routes(&index, &out_dir).unwrap();

        assert_eq!(written, 0);
        assert!(fs::read_dir(&out_dir).unwrap().next().is_none());

        fs::remove_dir_all(&out_dir).unwrap();
    }
}
