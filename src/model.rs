/// Core data types for the hydromet ingestion service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and no persistence logic — only types and the error
/// taxonomy of the ingestion pipeline.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Dataset identification
// ---------------------------------------------------------------------------

/// The five datasets the service synchronizes, used for audit rows,
/// trigger routing, and log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Synop,
    Hydro,
    Meteo,
    Forecast,
    Current,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Synop => "SYNOP",
            DatasetKind::Hydro => "HYDRO",
            DatasetKind::Meteo => "METEO",
            DatasetKind::Forecast => "FORECAST",
            DatasetKind::Current => "CURRENT",
        }
    }

    /// Provider that serves this dataset, as recorded in the audit log.
    pub fn provider(&self) -> &'static str {
        match self {
            DatasetKind::Synop | DatasetKind::Hydro | DatasetKind::Meteo => "IMGW",
            DatasetKind::Forecast | DatasetKind::Current => "OPEN_METEO",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stations
// ---------------------------------------------------------------------------

/// A provider-issued station as stored in one of the station tables.
///
/// `id` is the provider's natural key and is immutable once created.
/// Synop payloads carry no coordinates, so `latitude`/`longitude` may be
/// absent; `river` and `province` are populated for hydro stations only.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    pub river: Option<String>,
    pub province: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub active: bool,
}

impl StationRecord {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            river: None,
            province: None,
            latitude: None,
            longitude: None,
            active: true,
        }
    }
}

/// Which station table a forecast target or forecast row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    Synop,
    Virtual,
}

impl StationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationKind::Synop => "synop",
            StationKind::Virtual => "virtual",
        }
    }

    /// Inverse of `as_str`, for rows read back from the forecast table.
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "synop" => Some(StationKind::Synop),
            "virtual" => Some(StationKind::Virtual),
            _ => None,
        }
    }
}

/// One target of a fan-out run: a station with usable coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTarget {
    pub kind: StationKind,
    pub id: String,
    pub name: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
}

// ---------------------------------------------------------------------------
// Telemetry readings (append-only)
// ---------------------------------------------------------------------------

/// One synoptic observation. The provider reports a single measurement
/// date + hour for the whole record; all metrics are independently nullable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynopReading {
    pub measurement_date: Option<NaiveDate>,
    pub measurement_hour: Option<i32>,
    pub temperature_c: Option<Decimal>,
    pub wind_speed_ms: Option<i32>,
    pub wind_direction_deg: Option<i32>,
    pub relative_humidity_pct: Option<Decimal>,
    pub total_precipitation_mm: Option<Decimal>,
    pub pressure_hpa: Option<Decimal>,
}

/// One river-gauge observation. Each metric carries its own measurement
/// timestamp because gauge sensor suites are partial — a lake station may
/// report water temperature but no discharge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydroReading {
    pub water_level_cm: Option<i32>,
    pub water_level_at: Option<NaiveDateTime>,
    pub water_temperature_c: Option<Decimal>,
    pub water_temperature_at: Option<NaiveDateTime>,
    pub discharge_m3s: Option<Decimal>,
    pub discharge_at: Option<NaiveDateTime>,
    pub ice_phenomenon: Option<i32>,
    pub ice_phenomenon_at: Option<NaiveDateTime>,
    pub overgrowth_phenomenon: Option<i32>,
    pub overgrowth_phenomenon_at: Option<NaiveDateTime>,
}

/// One automated weather-station observation, per-metric timestamps as
/// reported by the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeteoReading {
    pub air_temp_c: Option<Decimal>,
    pub air_temp_at: Option<NaiveDateTime>,
    pub ground_temp_c: Option<Decimal>,
    pub ground_temp_at: Option<NaiveDateTime>,
    pub wind_direction_deg: Option<i32>,
    pub wind_avg_speed_ms: Option<Decimal>,
    pub wind_max_speed_ms: Option<Decimal>,
    pub wind_at: Option<NaiveDateTime>,
    pub wind_gust_10min_ms: Option<Decimal>,
    pub wind_gust_10min_at: Option<NaiveDateTime>,
    pub relative_humidity_pct: Option<Decimal>,
    pub relative_humidity_at: Option<NaiveDateTime>,
    pub precipitation_10min_mm: Option<Decimal>,
    pub precipitation_10min_at: Option<NaiveDateTime>,
}

// ---------------------------------------------------------------------------
// Forecast rows (mutable) and current conditions
// ---------------------------------------------------------------------------

/// One hourly forecast row for a station and a future instant.
///
/// Unlike telemetry readings these are revised in place when the provider
/// re-issues a forecast for the same (station, hour) key.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub station_kind: StationKind,
    pub station_id: String,
    pub forecast_time: NaiveDateTime,
    pub temperature_c: Option<f64>,
    pub apparent_temperature_c: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub wind_gusts_kmh: Option<f64>,
    pub wind_direction_deg: Option<i32>,
    pub rain_mm: Option<f64>,
    pub cloud_cover_pct: Option<i32>,
    pub weather_code: Option<i32>,
    pub uv_index: Option<f64>,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
    pub uv_index_max: Option<f64>,
}

/// Current conditions at a virtual station, keyed by the provider's
/// observation time truncated to the hour. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentReading {
    pub station_id: String,
    pub measurement_time: NaiveDateTime,
    pub temperature_c: Option<f64>,
    pub apparent_temperature_c: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub wind_gusts_kmh: Option<f64>,
    pub wind_direction_deg: Option<i32>,
    pub rain_mm: Option<f64>,
    pub relative_humidity_pct: Option<f64>,
    pub weather_code: Option<i32>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching or persisting provider data.
///
/// Field-level parse failures never surface here — an unparsable field is
/// stored as NULL and the record is still processed. `Parse` covers a
/// payload whose envelope is unusable as a whole.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Transport failure, timeout, or non-2xx response from a provider.
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body could not be deserialized into the expected shape.
    #[error("malformed provider payload: {0}")]
    Parse(String),
    /// A database statement failed.
    #[error("database error: {0}")]
    Database(#[from] postgres::Error),
}

/// Outcome of one orchestrator run, as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Error => "ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_kind_maps_to_provider() {
        assert_eq!(DatasetKind::Synop.provider(), "IMGW");
        assert_eq!(DatasetKind::Hydro.provider(), "IMGW");
        assert_eq!(DatasetKind::Meteo.provider(), "IMGW");
        assert_eq!(DatasetKind::Forecast.provider(), "OPEN_METEO");
        assert_eq!(DatasetKind::Current.provider(), "OPEN_METEO");
    }

    #[test]
    fn test_station_record_defaults_to_active() {
        let station = StationRecord::new("12295".to_string(), "Białystok".to_string());
        assert!(station.active);
        assert!(station.latitude.is_none(), "synop stations provision without coordinates");
    }

    #[test]
    fn test_run_status_strings_match_audit_contract() {
        assert_eq!(RunStatus::Success.as_str(), "SUCCESS");
        assert_eq!(RunStatus::Error.as_str(), "ERROR");
    }
}
