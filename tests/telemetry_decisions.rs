/// End-to-end merge decisions over real payload shapes, in memory.
///
/// Drives the public pipeline pieces — payload parsing, mapping, station
/// resolution, and the bulk selection step — against inline provider
/// payloads, without a database or network.

use hydromet_service::catalog;
use hydromet_service::ingest::imgw::{self, RawHydro};
use hydromet_service::merge;
use hydromet_service::model::{HydroReading, StationRecord};
use hydromet_service::sync::bulk::select_new_readings;
use std::collections::{HashMap, HashSet};

/// One hydro station with water level, temperature, ice and overgrowth
/// observations; no discharge sensor.
const HYDRO_PAYLOAD: &str = r#"[
  {
    "id_stacji": "151140030",
    "stacja": "Przewoźniki",
    "rzeka": "Skroda",
    "wojewodztwo": "lubuskie",
    "lat": "51.517222",
    "lon": "14.737222",
    "stan_wody": "182",
    "stan_wody_data_pomiaru": "2025-01-01 10:10:00",
    "temperatura_wody": "3,2",
    "temperatura_wody_data_pomiaru": "2025-01-01 10:10:00",
    "przelyw": null,
    "przeplyw_data": null,
    "zjawisko_lodowe": "0",
    "zjawisko_lodowe_data_pomiaru": "2025-01-01 10:10:00",
    "zjawisko_zarastania": "0",
    "zjawisko_zarastania_data_pomiaru": "2025-01-01 10:10:00"
  }
]"#;

fn mapped(payload: &str) -> Vec<(String, HydroReading)> {
    let raws: Vec<RawHydro> = imgw::parse_array(payload).expect("payload parses");
    raws.iter()
        .map(|raw| {
            let id = raw.station_id.clone().expect("fixture has station ids");
            (id, imgw::hydro_reading(raw))
        })
        .collect()
}

#[test]
fn test_first_sighting_selects_everything() {
    let items = mapped(HYDRO_PAYLOAD);
    let selected = select_new_readings(items, &HashMap::new(), merge::hydro_is_newer);
    assert_eq!(selected.len(), 1);
}

#[test]
fn test_replaying_an_identical_payload_selects_nothing() {
    // First run: everything is new. Second run: the latest stored reading
    // per station is exactly what the payload carries, so zero inserts.
    let first_run = mapped(HYDRO_PAYLOAD);
    let latest: HashMap<String, HydroReading> = first_run.into_iter().collect();

    let second_run = mapped(HYDRO_PAYLOAD);
    let selected = select_new_readings(second_run, &latest, merge::hydro_is_newer);

    assert!(selected.is_empty(), "replaying a bulk payload must persist nothing");
}

#[test]
fn test_one_sub_field_timestamp_change_selects_the_full_record() {
    let first_run = mapped(HYDRO_PAYLOAD);
    let latest: HashMap<String, HydroReading> = first_run.into_iter().collect();

    // The provider re-measures only water temperature; every other
    // timestamp is unchanged.
    let revised = HYDRO_PAYLOAD.replace(
        "\"temperatura_wody_data_pomiaru\": \"2025-01-01 10:10:00\"",
        "\"temperatura_wody_data_pomiaru\": \"2025-01-01 11:10:00\"",
    );
    let selected = select_new_readings(mapped(&revised), &latest, merge::hydro_is_newer);

    assert_eq!(selected.len(), 1);
    let (_, reading) = &selected[0];
    assert_eq!(
        reading.water_level_cm,
        Some(182),
        "the selected record carries all incoming fields, not just the changed one"
    );
}

#[test]
fn test_regressed_timestamp_is_still_selected() {
    // Inequality semantics: a timestamp moving backwards is a change.
    let first_run = mapped(HYDRO_PAYLOAD);
    let latest: HashMap<String, HydroReading> = first_run.into_iter().collect();

    let regressed = HYDRO_PAYLOAD.replace(
        "\"stan_wody_data_pomiaru\": \"2025-01-01 10:10:00\"",
        "\"stan_wody_data_pomiaru\": \"2025-01-01 08:10:00\"",
    );
    let selected = select_new_readings(mapped(&regressed), &latest, merge::hydro_is_newer);

    assert_eq!(selected.len(), 1, "an earlier timestamp still counts as news");
}

#[test]
fn test_station_resolution_from_payload() {
    let raws: Vec<RawHydro> = imgw::parse_array(HYDRO_PAYLOAD).expect("payload parses");
    let stations: Vec<StationRecord> = raws
        .iter()
        .map(|raw| imgw::hydro_station(raw, raw.station_id.as_deref().unwrap()))
        .collect();

    // Unknown id: provisioned once, with the payload's metadata.
    let to_create = catalog::collect_unknown(&stations, &HashSet::new());
    assert_eq!(to_create.len(), 1);
    assert_eq!(to_create[0].name, "Przewoźniki");
    assert_eq!(to_create[0].river.as_deref(), Some("Skroda"));

    // Known id: nothing to create, metadata untouched.
    let known: HashSet<String> = ["151140030".to_string()].into_iter().collect();
    assert!(catalog::collect_unknown(&stations, &known).is_empty());
}

#[test]
fn test_defensive_parsing_survives_garbage_fields() {
    let broken = HYDRO_PAYLOAD
        .replace("\"stan_wody\": \"182\"", "\"stan_wody\": \"N/A\"")
        .replace("\"temperatura_wody\": \"3,2\"", "\"temperatura_wody\": \"\"");

    let items = mapped(&broken);
    assert_eq!(items.len(), 1, "the record itself must survive");
    let (_, reading) = &items[0];
    assert_eq!(reading.water_level_cm, None);
    assert_eq!(reading.water_temperature_c, None);
    assert!(reading.water_level_at.is_some());
}
