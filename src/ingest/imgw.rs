/// IMGW public data API client.
///
/// Handles the bulk telemetry endpoints:
///   https://danepubliczne.imgw.pl/api/data/{synop,hydro,meteo}
///
/// Each endpoint returns one JSON array covering every station the
/// provider operates. Every field — including numbers, dates, and station
/// ids — is transmitted as a string and parsed defensively here: decimal
/// separators may be `.` or `,`, integers may arrive decimal-formatted,
/// timestamps use `yyyy-MM-dd HH:mm:ss`, dates `yyyy-MM-dd`. An
/// unparsable field becomes NULL for that field; it never fails the fetch.

use crate::model::{HydroReading, IngestError, MeteoReading, StationRecord, SynopReading};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Raw payload structures (all fields strings, all optional)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawSynop {
    #[serde(rename = "id_stacji")]
    pub station_id: Option<String>,
    #[serde(rename = "stacja")]
    pub station_name: Option<String>,
    #[serde(rename = "data_pomiaru")]
    pub measurement_date: Option<String>,
    #[serde(rename = "godzina_pomiaru")]
    pub measurement_hour: Option<String>,
    #[serde(rename = "temperatura")]
    pub temperature: Option<String>,
    #[serde(rename = "predkosc_wiatru")]
    pub wind_speed: Option<String>,
    #[serde(rename = "kierunek_wiatru")]
    pub wind_direction: Option<String>,
    #[serde(rename = "wilgotnosc_wzgledna")]
    pub relative_humidity: Option<String>,
    #[serde(rename = "suma_opadu")]
    pub total_precipitation: Option<String>,
    #[serde(rename = "cisnienie")]
    pub pressure: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHydro {
    #[serde(rename = "id_stacji")]
    pub station_id: Option<String>,
    #[serde(rename = "stacja")]
    pub station_name: Option<String>,
    #[serde(rename = "rzeka")]
    pub river: Option<String>,
    #[serde(rename = "wojewodztwo")]
    pub province: Option<String>,
    #[serde(rename = "lat")]
    pub latitude: Option<String>,
    #[serde(rename = "lon")]
    pub longitude: Option<String>,
    #[serde(rename = "stan_wody")]
    pub water_level: Option<String>,
    #[serde(rename = "stan_wody_data_pomiaru")]
    pub water_level_date: Option<String>,
    #[serde(rename = "temperatura_wody")]
    pub water_temperature: Option<String>,
    #[serde(rename = "temperatura_wody_data_pomiaru")]
    pub water_temperature_date: Option<String>,
    // The provider really does misspell this key.
    #[serde(rename = "przelyw")]
    pub discharge: Option<String>,
    #[serde(rename = "przeplyw_data")]
    pub discharge_date: Option<String>,
    #[serde(rename = "zjawisko_lodowe")]
    pub ice_phenomenon: Option<String>,
    #[serde(rename = "zjawisko_lodowe_data_pomiaru")]
    pub ice_phenomenon_date: Option<String>,
    #[serde(rename = "zjawisko_zarastania")]
    pub overgrowth_phenomenon: Option<String>,
    #[serde(rename = "zjawisko_zarastania_data_pomiaru")]
    pub overgrowth_phenomenon_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMeteo {
    #[serde(rename = "kod_stacji")]
    pub station_id: Option<String>,
    #[serde(rename = "nazwa_stacji")]
    pub station_name: Option<String>,
    #[serde(rename = "lat")]
    pub latitude: Option<String>,
    #[serde(rename = "lon")]
    pub longitude: Option<String>,
    #[serde(rename = "temperatura_powietrza")]
    pub air_temp: Option<String>,
    #[serde(rename = "temperatura_powietrza_data")]
    pub air_temp_time: Option<String>,
    #[serde(rename = "temperatura_gruntu")]
    pub ground_temp: Option<String>,
    #[serde(rename = "temperatura_gruntu_data")]
    pub ground_temp_time: Option<String>,
    #[serde(rename = "wiatr_kierunek")]
    pub wind_direction: Option<String>,
    #[serde(rename = "wiatr_srednia_predkosc")]
    pub wind_avg_speed: Option<String>,
    #[serde(rename = "wiatr_predkosc_maksymalna")]
    pub wind_max_speed: Option<String>,
    #[serde(rename = "wiatr_srednia_predkosc_data")]
    pub wind_measurement_time: Option<String>,
    #[serde(rename = "wiatr_poryw_10min")]
    pub wind_gust_10min: Option<String>,
    #[serde(rename = "wiatr_poryw_10min_data")]
    pub wind_gust_10min_time: Option<String>,
    #[serde(rename = "wilgotnosc_wzgledna")]
    pub relative_humidity: Option<String>,
    #[serde(rename = "wilgotnosc_wzgledna_data")]
    pub relative_humidity_time: Option<String>,
    #[serde(rename = "opad_10min")]
    pub precipitation_10min: Option<String>,
    #[serde(rename = "opad_10min_data")]
    pub precipitation_10min_time: Option<String>,
}

// ---------------------------------------------------------------------------
// Fetching and payload parsing
// ---------------------------------------------------------------------------

pub fn synop_url(base: &str) -> String {
    format!("{}/synop", base.trim_end_matches('/'))
}

pub fn hydro_url(base: &str) -> String {
    format!("{}/hydro", base.trim_end_matches('/'))
}

pub fn meteo_url(base: &str) -> String {
    format!("{}/meteo", base.trim_end_matches('/'))
}

fn fetch_array<T: serde::de::DeserializeOwned>(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<T>, IngestError> {
    let body = client
        .get(url)
        .header("Accept", "application/json")
        .send()?
        .error_for_status()?
        .text()?;
    parse_array(&body)
}

/// Parse one bulk payload body. Split from the HTTP call so the parser is
/// testable against fixture strings.
pub fn parse_array<T: serde::de::DeserializeOwned>(json: &str) -> Result<Vec<T>, IngestError> {
    serde_json::from_str(json).map_err(|e| IngestError::Parse(format!("telemetry array: {}", e)))
}

pub fn fetch_synop(
    client: &reqwest::blocking::Client,
    base: &str,
) -> Result<Vec<RawSynop>, IngestError> {
    fetch_array(client, &synop_url(base))
}

pub fn fetch_hydro(
    client: &reqwest::blocking::Client,
    base: &str,
) -> Result<Vec<RawHydro>, IngestError> {
    fetch_array(client, &hydro_url(base))
}

pub fn fetch_meteo(
    client: &reqwest::blocking::Client,
    base: &str,
) -> Result<Vec<RawMeteo>, IngestError> {
    fetch_array(client, &meteo_url(base))
}

// ---------------------------------------------------------------------------
// Defensive field parsers
// ---------------------------------------------------------------------------

/// Parse a decimal that may use `.` or `,` as separator. Blank or
/// malformed input yields None, never an error.
pub fn parse_decimal(value: Option<&str>) -> Option<Decimal> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(&trimmed.replace(',', ".")).ok()
}

/// Parse an integer that may arrive decimal-formatted ("12.0" or "12,0").
pub fn parse_integer(value: Option<&str>) -> Option<i32> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('.') || trimmed.contains(',') {
        return Decimal::from_str(&trimmed.replace(',', "."))
            .ok()
            .and_then(|d| d.to_i32());
    }
    trimmed.parse().ok()
}

/// Parse the provider's fixed `yyyy-MM-dd HH:mm:ss` timestamp pattern.
pub fn parse_datetime(value: Option<&str>) -> Option<NaiveDateTime> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").ok()
}

/// Parse the provider's fixed `yyyy-MM-dd` date pattern.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

fn clean_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Mapping to domain types
// ---------------------------------------------------------------------------

/// Station name fallback: a payload may omit the display name, the id is
/// still a valid (if ugly) label.
fn name_or_id(name: &Option<String>, id: &str) -> String {
    clean_text(name).unwrap_or_else(|| id.to_string())
}

pub fn synop_station(raw: &RawSynop, id: &str) -> StationRecord {
    // Synop payloads carry no coordinates; they stay NULL until an
    // operator fills them in.
    StationRecord::new(id.to_string(), name_or_id(&raw.station_name, id))
}

pub fn synop_reading(raw: &RawSynop) -> SynopReading {
    SynopReading {
        measurement_date: parse_date(raw.measurement_date.as_deref()),
        measurement_hour: parse_integer(raw.measurement_hour.as_deref()),
        temperature_c: parse_decimal(raw.temperature.as_deref()),
        wind_speed_ms: parse_integer(raw.wind_speed.as_deref()),
        wind_direction_deg: parse_integer(raw.wind_direction.as_deref()),
        relative_humidity_pct: parse_decimal(raw.relative_humidity.as_deref()),
        total_precipitation_mm: parse_decimal(raw.total_precipitation.as_deref()),
        pressure_hpa: parse_decimal(raw.pressure.as_deref()),
    }
}

pub fn hydro_station(raw: &RawHydro, id: &str) -> StationRecord {
    let mut station = StationRecord::new(id.to_string(), name_or_id(&raw.station_name, id));
    station.river = clean_text(&raw.river);
    station.province = clean_text(&raw.province);
    station.latitude = parse_decimal(raw.latitude.as_deref());
    station.longitude = parse_decimal(raw.longitude.as_deref());
    station
}

pub fn hydro_reading(raw: &RawHydro) -> HydroReading {
    HydroReading {
        water_level_cm: parse_integer(raw.water_level.as_deref()),
        water_level_at: parse_datetime(raw.water_level_date.as_deref()),
        water_temperature_c: parse_decimal(raw.water_temperature.as_deref()),
        water_temperature_at: parse_datetime(raw.water_temperature_date.as_deref()),
        discharge_m3s: parse_decimal(raw.discharge.as_deref()),
        discharge_at: parse_datetime(raw.discharge_date.as_deref()),
        ice_phenomenon: parse_integer(raw.ice_phenomenon.as_deref()),
        ice_phenomenon_at: parse_datetime(raw.ice_phenomenon_date.as_deref()),
        overgrowth_phenomenon: parse_integer(raw.overgrowth_phenomenon.as_deref()),
        overgrowth_phenomenon_at: parse_datetime(raw.overgrowth_phenomenon_date.as_deref()),
    }
}

pub fn meteo_station(raw: &RawMeteo, id: &str) -> StationRecord {
    let mut station = StationRecord::new(id.to_string(), name_or_id(&raw.station_name, id));
    station.latitude = parse_decimal(raw.latitude.as_deref());
    station.longitude = parse_decimal(raw.longitude.as_deref());
    station
}

pub fn meteo_reading(raw: &RawMeteo) -> MeteoReading {
    MeteoReading {
        air_temp_c: parse_decimal(raw.air_temp.as_deref()),
        air_temp_at: parse_datetime(raw.air_temp_time.as_deref()),
        ground_temp_c: parse_decimal(raw.ground_temp.as_deref()),
        ground_temp_at: parse_datetime(raw.ground_temp_time.as_deref()),
        wind_direction_deg: parse_integer(raw.wind_direction.as_deref()),
        wind_avg_speed_ms: parse_decimal(raw.wind_avg_speed.as_deref()),
        wind_max_speed_ms: parse_decimal(raw.wind_max_speed.as_deref()),
        wind_at: parse_datetime(raw.wind_measurement_time.as_deref()),
        wind_gust_10min_ms: parse_decimal(raw.wind_gust_10min.as_deref()),
        wind_gust_10min_at: parse_datetime(raw.wind_gust_10min_time.as_deref()),
        relative_humidity_pct: parse_decimal(raw.relative_humidity.as_deref()),
        relative_humidity_at: parse_datetime(raw.relative_humidity_time.as_deref()),
        precipitation_10min_mm: parse_decimal(raw.precipitation_10min.as_deref()),
        precipitation_10min_at: parse_datetime(raw.precipitation_10min_time.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("test decimal literal")
    }

    // --- URL construction ---------------------------------------------------

    #[test]
    fn test_dataset_urls_append_to_base() {
        let base = "https://danepubliczne.imgw.pl/api/data";
        assert_eq!(synop_url(base), "https://danepubliczne.imgw.pl/api/data/synop");
        assert_eq!(hydro_url(base), "https://danepubliczne.imgw.pl/api/data/hydro");
        assert_eq!(meteo_url(base), "https://danepubliczne.imgw.pl/api/data/meteo");
    }

    #[test]
    fn test_trailing_slash_in_base_is_tolerated() {
        assert_eq!(
            synop_url("https://danepubliczne.imgw.pl/api/data/"),
            "https://danepubliczne.imgw.pl/api/data/synop"
        );
    }

    // --- defensive parsers --------------------------------------------------

    #[test]
    fn test_parse_decimal_accepts_comma_separator() {
        assert_eq!(parse_decimal(Some("1012,3")), Some(dec("1012.3")));
        assert_eq!(parse_decimal(Some("1012.3")), Some(dec("1012.3")));
        assert_eq!(parse_decimal(Some(" 4,7 ")), Some(dec("4.7")));
    }

    #[test]
    fn test_parse_decimal_blank_and_garbage_yield_null() {
        assert_eq!(parse_decimal(Some("")), None);
        assert_eq!(parse_decimal(Some("   ")), None);
        assert_eq!(parse_decimal(Some("N/A")), None);
        assert_eq!(parse_decimal(None), None);
    }

    #[test]
    fn test_parse_integer_accepts_decimal_formatted_strings() {
        assert_eq!(parse_integer(Some("250")), Some(250));
        assert_eq!(parse_integer(Some("250.0")), Some(250));
        assert_eq!(parse_integer(Some("250,0")), Some(250));
        assert_eq!(parse_integer(Some("brak")), None);
    }

    #[test]
    fn test_parse_datetime_uses_provider_pattern() {
        let parsed = parse_datetime(Some("2025-01-01 10:10:00")).expect("valid timestamp");
        assert_eq!(parsed.to_string(), "2025-01-01 10:10:00");
        assert_eq!(parse_datetime(Some("2025-01-01T10:10:00")), None, "ISO form is not the contract");
        assert_eq!(parse_datetime(Some("")), None);
    }

    #[test]
    fn test_parse_date_uses_provider_pattern() {
        assert!(parse_date(Some("2025-01-01")).is_some());
        assert_eq!(parse_date(Some("01.01.2025")), None);
    }

    // --- payload parsing and mapping ----------------------------------------

    #[test]
    fn test_synop_payload_parses_with_comma_decimals() {
        let raws: Vec<RawSynop> = parse_array(fixture_synop_json()).expect("fixture parses");
        assert_eq!(raws.len(), 2);

        let reading = synop_reading(&raws[0]);
        assert_eq!(reading.pressure_hpa, Some(dec("1012.3")), "comma decimal must parse");
        assert_eq!(reading.measurement_hour, Some(10));
        assert_eq!(
            reading.wind_direction_deg, None,
            "empty wind direction is stored as NULL, record still usable"
        );
        assert_eq!(reading.temperature_c, Some(dec("4.7")));
    }

    #[test]
    fn test_hydro_payload_maps_station_metadata() {
        let raws: Vec<RawHydro> = parse_array(fixture_hydro_json()).expect("fixture parses");
        let raw = &raws[0];

        let station = hydro_station(raw, raw.station_id.as_deref().unwrap());
        assert_eq!(station.id, "151140030");
        assert_eq!(station.name, "Przewoźniki");
        assert_eq!(station.river.as_deref(), Some("Skroda"));
        assert_eq!(station.province.as_deref(), Some("lubuskie"));
        assert!(station.latitude.is_some());
        assert!(station.active);
    }

    #[test]
    fn test_hydro_reading_keeps_per_metric_timestamps() {
        let raws: Vec<RawHydro> = parse_array(fixture_hydro_json()).expect("fixture parses");
        let reading = hydro_reading(&raws[0]);

        assert_eq!(reading.water_level_cm, Some(182));
        assert!(reading.water_level_at.is_some());
        assert!(reading.water_temperature_at.is_some());
        assert_eq!(reading.discharge_m3s, None, "lake station lacks a discharge sensor");
        assert_eq!(reading.discharge_at, None);
    }

    #[test]
    fn test_unparsable_numeric_field_yields_null_not_failure() {
        let raws: Vec<RawHydro> =
            parse_array(fixture_hydro_unparsable_fields_json()).expect("record must survive bad fields");
        let reading = hydro_reading(&raws[0]);

        assert_eq!(reading.water_level_cm, None);
        assert_eq!(reading.water_temperature_c, None);
        assert!(reading.water_level_at.is_some(), "good fields still parse");
    }

    #[test]
    fn test_meteo_mapping_covers_paired_timestamps() {
        let raws: Vec<RawMeteo> = parse_array(fixture_meteo_json()).expect("fixture parses");
        let reading = meteo_reading(&raws[0]);

        assert!(reading.air_temp_c.is_some());
        assert!(reading.air_temp_at.is_some());
        assert!(reading.wind_gust_10min_at.is_some());
        assert_eq!(reading.precipitation_10min_mm, Some(dec("0.00")));
    }

    #[test]
    fn test_station_without_name_falls_back_to_id() {
        let raw = RawSynop {
            station_id: Some("12500".to_string()),
            station_name: Some("  ".to_string()),
            measurement_date: None,
            measurement_hour: None,
            temperature: None,
            wind_speed: None,
            wind_direction: None,
            relative_humidity: None,
            total_precipitation: None,
            pressure: None,
        };
        assert_eq!(synop_station(&raw, "12500").name, "12500");
    }

    #[test]
    fn test_malformed_payload_is_a_parse_error() {
        let result: Result<Vec<RawSynop>, _> = parse_array("{ not json ]");
        assert!(matches!(result, Err(IngestError::Parse(_))));
    }

    #[test]
    fn test_empty_array_parses_to_no_records() {
        let raws: Vec<RawSynop> = parse_array("[]").expect("empty array is valid");
        assert!(raws.is_empty());
    }
}
