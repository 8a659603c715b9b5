/// Database-backed integration tests for the ingestion pipeline.
///
/// Prerequisites:
/// - PostgreSQL running with the hydromet schema applied
///   (sql/001_initial_schema.sql)
/// - DATABASE_URL set in the environment or .env
///
/// All tests are #[ignore]d so the default test run stays hermetic.
/// Run with: cargo test --test ingestion_db -- --ignored --test-threads=1

use chrono::NaiveDateTime;
use hydromet_service::audit;
use hydromet_service::catalog::{self, StationTable};
use hydromet_service::db;
use hydromet_service::model::{
    CurrentReading, DatasetKind, ForecastRecord, RunStatus, StationKind, StationRecord,
};
use hydromet_service::sync::{current, forecast};
use postgres::Client;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup_test_db() -> Client {
    db::connect_and_verify().expect("DATABASE_URL must point at a prepared hydromet database")
}

fn cleanup_test_data(client: &mut Client) {
    let _ = client.execute(
        "DELETE FROM hydromet.hydro_readings WHERE station_id LIKE 'TEST%'",
        &[],
    );
    let _ = client.execute(
        "DELETE FROM hydromet.virtual_station_readings WHERE station_id LIKE 'TEST%'",
        &[],
    );
    let _ = client.execute(
        "DELETE FROM hydromet.weather_forecasts WHERE station_id LIKE 'TEST%'",
        &[],
    );
    let _ = client.execute("DELETE FROM hydromet.hydro_stations WHERE id LIKE 'TEST%'", &[]);
    let _ = client.execute("DELETE FROM hydromet.virtual_stations WHERE id LIKE 'TEST%'", &[]);
    let _ = client.execute("DELETE FROM hydromet.import_log WHERE provider = 'TEST'", &[]);
}

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("test timestamp")
}

fn test_forecast(station_id: &str, time: &str, temp: f64) -> ForecastRecord {
    ForecastRecord {
        station_kind: StationKind::Virtual,
        station_id: station_id.to_string(),
        forecast_time: ts(time),
        temperature_c: Some(temp),
        apparent_temperature_c: None,
        pressure_hpa: Some(1011.0),
        wind_speed_kmh: None,
        wind_gusts_kmh: None,
        wind_direction_deg: None,
        rain_mm: None,
        cloud_cover_pct: None,
        weather_code: None,
        uv_index: None,
        sunrise: None,
        sunset: None,
        uv_index_max: None,
    }
}

fn seed_virtual_station(client: &mut Client, id: &str) {
    client
        .execute(
            "INSERT INTO hydromet.virtual_stations (id, name, latitude, longitude)
             VALUES ($1, $2, 53.0, 20.0)
             ON CONFLICT (id) DO NOTHING",
            &[&id, &format!("Test spot {}", id)],
        )
        .expect("seeding a virtual station must work");
}

// ---------------------------------------------------------------------------
// Station provisioning
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Only run when database is available
fn test_station_is_provisioned_exactly_once() {
    let mut client = setup_test_db();
    cleanup_test_data(&mut client);

    let station = StationRecord::new("TEST-H1".to_string(), "Test Gauge".to_string());

    for _ in 0..2 {
        let mut tx = client.transaction().expect("transaction starts");
        catalog::provision(&mut tx, StationTable::Hydro, &[station.clone()])
            .expect("provisioning must work");
        tx.commit().expect("commit");
    }

    let row = client
        .query_one(
            "SELECT COUNT(*) FROM hydromet.hydro_stations WHERE id = 'TEST-H1'",
            &[],
        )
        .expect("count query");
    let count: i64 = row.get(0);
    assert_eq!(count, 1, "re-provisioning a known id must be a no-op");

    cleanup_test_data(&mut client);
}

#[test]
#[ignore] // Only run when database is available
fn test_rediscovery_never_mutates_station_metadata() {
    let mut client = setup_test_db();
    cleanup_test_data(&mut client);

    let original = StationRecord::new("TEST-H2".to_string(), "Original Name".to_string());
    let mut renamed = original.clone();
    renamed.name = "Renamed".to_string();

    let mut tx = client.transaction().expect("transaction starts");
    catalog::provision(&mut tx, StationTable::Hydro, &[original]).expect("first insert");
    tx.commit().expect("commit");

    let mut tx = client.transaction().expect("transaction starts");
    catalog::provision(&mut tx, StationTable::Hydro, &[renamed]).expect("second insert");
    tx.commit().expect("commit");

    let row = client
        .query_one("SELECT name FROM hydromet.hydro_stations WHERE id = 'TEST-H2'", &[])
        .expect("name query");
    let name: String = row.get(0);
    assert_eq!(name, "Original Name");

    cleanup_test_data(&mut client);
}

// ---------------------------------------------------------------------------
// Forecast upserts
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Only run when database is available
fn test_forecast_revision_updates_in_place() {
    let mut client = setup_test_db();
    cleanup_test_data(&mut client);

    let first = vec![test_forecast("TEST-V1", "2025-01-01 06:00:00", 1.5)];
    forecast::persist_batch(&mut client, first).expect("first persist");

    let revised = vec![test_forecast("TEST-V1", "2025-01-01 06:00:00", -0.5)];
    forecast::persist_batch(&mut client, revised).expect("revision persist");

    let row = client
        .query_one(
            "SELECT COUNT(*), MIN(temp_c) FROM hydromet.weather_forecasts
             WHERE station_id = 'TEST-V1' AND forecast_time = $1",
            &[&ts("2025-01-01 06:00:00")],
        )
        .expect("forecast query");
    let count: i64 = row.get(0);
    let temp: Option<f64> = row.get(1);

    assert_eq!(count, 1, "row count per (station, hour) key stays 1 across revisions");
    assert_eq!(temp, Some(-0.5), "the revision overwrites the stored fields");

    cleanup_test_data(&mut client);
}

// ---------------------------------------------------------------------------
// Current conditions
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Only run when database is available
fn test_current_conditions_are_insert_new_only() {
    let mut client = setup_test_db();
    cleanup_test_data(&mut client);
    seed_virtual_station(&mut client, "TEST-V2");

    let reading = CurrentReading {
        station_id: "TEST-V2".to_string(),
        measurement_time: ts("2025-01-01 06:00:00"),
        temperature_c: Some(0.8),
        apparent_temperature_c: None,
        pressure_hpa: None,
        wind_speed_kmh: None,
        wind_gusts_kmh: None,
        wind_direction_deg: None,
        rain_mm: None,
        relative_humidity_pct: None,
        weather_code: None,
    };

    let first = current::persist_batch(&mut client, vec![reading.clone()]).expect("first persist");
    let second = current::persist_batch(&mut client, vec![reading]).expect("replay persist");

    assert_eq!(first, 1);
    assert_eq!(second, 0, "an already-stored hour is dropped, not updated");

    cleanup_test_data(&mut client);
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Only run when database is available
fn test_audit_rows_are_appended_per_run() {
    let mut client = setup_test_db();
    cleanup_test_data(&mut client);

    // The audit writer swallows its own failures, so the only observable
    // contract is the row content on success.
    audit::record_import(&mut client, DatasetKind::Hydro, RunStatus::Success, 42, None);

    let row = client
        .query_one(
            "SELECT provider, status, records_count FROM hydromet.import_log
             WHERE dataset = 'HYDRO' ORDER BY id DESC LIMIT 1",
            &[],
        )
        .expect("audit row query");
    let provider: String = row.get(0);
    let status: String = row.get(1);
    let count: i32 = row.get(2);

    assert_eq!(provider, "IMGW");
    assert_eq!(status, "SUCCESS");
    assert_eq!(count, 42);
}
