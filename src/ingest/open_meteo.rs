/// Open-Meteo forecast API client.
///
/// Queried once per station with the station's coordinates:
///   https://api.open-meteo.com/v1/forecast?latitude=..&longitude=..
///
/// The response carries `hourly` and `daily` blocks whose metric arrays
/// align by index with an ISO-8601 `time` array of equal nominal length —
/// index `i` across all arrays describes one instant. Arrays can be ragged
/// or contain nulls; a missing entry becomes a NULL field, never a failure.

use crate::merge::truncate_to_hour;
use crate::model::{CurrentReading, ForecastRecord, IngestError, StationKind};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Hourly metrics requested for the forecast timeline.
const HOURLY_PARAMS: &str = "temperature_2m,apparent_temperature,rain,weather_code,\
cloud_cover,wind_speed_10m,wind_direction_10m,wind_gusts_10m,\
surface_pressure,uv_index";

/// Daily metrics folded onto each hourly row of the same calendar day.
const DAILY_PARAMS: &str = "sunrise,sunset,uv_index_max";

/// Metrics requested for the current-conditions variant.
const CURRENT_PARAMS: &str = "temperature_2m,apparent_temperature,rain,weather_code,\
wind_speed_10m,wind_direction_10m,wind_gusts_10m,\
surface_pressure,relative_humidity_2m";

// ---------------------------------------------------------------------------
// Response structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub hourly: Option<HourlyBlock>,
    pub daily: Option<DailyBlock>,
    pub current: Option<CurrentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub apparent_temperature: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub rain: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub weather_code: Option<Vec<Option<i32>>>,
    #[serde(default)]
    pub cloud_cover: Option<Vec<Option<i32>>>,
    #[serde(default)]
    pub wind_speed_10m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub wind_direction_10m: Option<Vec<Option<i32>>>,
    #[serde(default)]
    pub wind_gusts_10m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub surface_pressure: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub uv_index: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
pub struct DailyBlock {
    pub time: Vec<String>,
    #[serde(default)]
    pub sunrise: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub sunset: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub uv_index_max: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentBlock {
    pub time: Option<String>,
    pub temperature_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub surface_pressure: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    pub wind_direction_10m: Option<i32>,
    pub wind_gusts_10m: Option<f64>,
    pub rain: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub weather_code: Option<i32>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Forecast request for one station: hourly + daily blocks, one day of
/// history so revised near-past forecasts are re-fetched too.
pub fn build_forecast_url(base: &str, latitude: Decimal, longitude: Decimal, timezone: &str) -> String {
    format!(
        "{}?latitude={}&longitude={}&past_days=1&hourly={}&daily={}&timezone={}",
        base,
        latitude,
        longitude,
        HOURLY_PARAMS,
        DAILY_PARAMS,
        urlencoding::encode(timezone)
    )
}

/// Current-conditions request for one virtual station.
pub fn build_current_url(base: &str, latitude: Decimal, longitude: Decimal, timezone: &str) -> String {
    format!(
        "{}?latitude={}&longitude={}&current={}&timezone={}",
        base,
        latitude,
        longitude,
        CURRENT_PARAMS,
        urlencoding::encode(timezone)
    )
}

// ---------------------------------------------------------------------------
// Fetching and parsing
// ---------------------------------------------------------------------------

pub fn fetch(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<ForecastResponse, IngestError> {
    let body = client
        .get(url)
        .header("Accept", "application/json")
        .send()?
        .error_for_status()?
        .text()?;
    parse_response(&body)
}

pub fn parse_response(json: &str) -> Result<ForecastResponse, IngestError> {
    serde_json::from_str(json).map_err(|e| IngestError::Parse(format!("forecast response: {}", e)))
}

/// Open-Meteo timestamps are local to the requested timezone and come
/// without seconds ("2025-01-01T06:00"); some deployments add them.
fn parse_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn value_at<T: Copy>(list: &Option<Vec<Option<T>>>, index: usize) -> Option<T> {
    list.as_ref().and_then(|v| v.get(index).copied().flatten())
}

fn text_at(list: &Option<Vec<Option<String>>>, index: usize) -> Option<&str> {
    list.as_ref()
        .and_then(|v| v.get(index))
        .and_then(|entry| entry.as_deref())
}

// ---------------------------------------------------------------------------
// Mapping to domain types
// ---------------------------------------------------------------------------

/// Flatten one forecast response into per-hour records for the given
/// station. Hours whose timestamp fails to parse are skipped; every other
/// missing value degrades to a NULL field.
pub fn forecast_records(
    response: &ForecastResponse,
    kind: StationKind,
    station_id: &str,
) -> Vec<ForecastRecord> {
    let Some(hourly) = response.hourly.as_ref() else {
        return Vec::new();
    };

    let mut records = Vec::with_capacity(hourly.time.len());

    for (i, time_str) in hourly.time.iter().enumerate() {
        let Some(forecast_time) = parse_time(time_str) else {
            continue;
        };
        let forecast_time = truncate_to_hour(forecast_time);

        // Daily metrics join on the calendar day of the hourly instant.
        let day_index = response.daily.as_ref().and_then(|daily| {
            let day = forecast_time.date().to_string();
            daily.time.iter().position(|d| *d == day)
        });

        let (sunrise, sunset, uv_index_max) = match (response.daily.as_ref(), day_index) {
            (Some(daily), Some(di)) => (
                text_at(&daily.sunrise, di).and_then(parse_time),
                text_at(&daily.sunset, di).and_then(parse_time),
                value_at(&daily.uv_index_max, di),
            ),
            _ => (None, None, None),
        };

        records.push(ForecastRecord {
            station_kind: kind,
            station_id: station_id.to_string(),
            forecast_time,
            temperature_c: value_at(&hourly.temperature_2m, i),
            apparent_temperature_c: value_at(&hourly.apparent_temperature, i),
            pressure_hpa: value_at(&hourly.surface_pressure, i),
            wind_speed_kmh: value_at(&hourly.wind_speed_10m, i),
            wind_gusts_kmh: value_at(&hourly.wind_gusts_10m, i),
            wind_direction_deg: value_at(&hourly.wind_direction_10m, i),
            rain_mm: value_at(&hourly.rain, i),
            cloud_cover_pct: value_at(&hourly.cloud_cover, i),
            weather_code: value_at(&hourly.weather_code, i),
            uv_index: value_at(&hourly.uv_index, i),
            sunrise,
            sunset,
            uv_index_max,
        });
    }

    records
}

/// Map the `current` block to one reading for the given virtual station.
/// The storage key is the observation time truncated to the hour; if the
/// provider omits the time, the wall clock stands in.
pub fn current_reading(response: &ForecastResponse, station_id: &str) -> Option<CurrentReading> {
    let current = response.current.as_ref()?;

    let measurement_time = current
        .time
        .as_deref()
        .and_then(parse_time)
        .unwrap_or_else(|| chrono::Local::now().naive_local());

    Some(CurrentReading {
        station_id: station_id.to_string(),
        measurement_time: truncate_to_hour(measurement_time),
        temperature_c: current.temperature_2m,
        apparent_temperature_c: current.apparent_temperature,
        pressure_hpa: current.surface_pressure,
        wind_speed_kmh: current.wind_speed_10m,
        wind_gusts_kmh: current.wind_gusts_10m,
        wind_direction_deg: current.wind_direction_10m,
        rain_mm: current.rain,
        relative_humidity_pct: current.relative_humidity_2m,
        weather_code: current.weather_code,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
