/// Merge engine: decides what fetched data is actually new.
///
/// Two families of rules, pure logic with no I/O:
///
/// - **is-newer** predicates for the append-only telemetry readings. An
///   incoming record counts as newer when any tracked sub-field timestamp
///   is present and *differs* from the stored one. The comparison is
///   inequality, not "strictly after": a provider that regresses a
///   timestamp is still reporting a change, and the record is kept.
/// - **upsert planning** for forecast rows and the insert-new-only filter
///   for current conditions, keyed by timestamps truncated to the hour so
///   providers with different native resolutions align onto one timeline.

use crate::model::{CurrentReading, ForecastRecord, HydroReading, MeteoReading, StationKind, SynopReading};
use chrono::{NaiveDateTime, Timelike};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Field-change primitive
// ---------------------------------------------------------------------------

/// True when `incoming` is present and differs from `stored`.
///
/// A missing incoming value is never a change; a stored NULL against any
/// present incoming value always is.
pub fn field_changed<T: PartialEq>(stored: &Option<T>, incoming: &Option<T>) -> bool {
    match (stored, incoming) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(old), Some(new)) => old != new,
    }
}

/// Merge decision for one entity: no stored reading means unconditionally
/// new; otherwise the dataset's predicate decides.
pub fn is_new_information<R>(
    last: Option<&R>,
    incoming: &R,
    newer: impl Fn(&R, &R) -> bool,
) -> bool {
    match last {
        None => true,
        Some(stored) => newer(stored, incoming),
    }
}

// ---------------------------------------------------------------------------
// Per-dataset is-newer predicates
// ---------------------------------------------------------------------------

/// Synop records carry one (date, hour) stamp for the whole observation.
pub fn synop_is_newer(stored: &SynopReading, incoming: &SynopReading) -> bool {
    field_changed(&stored.measurement_date, &incoming.measurement_date)
        || field_changed(&stored.measurement_hour, &incoming.measurement_hour)
}

pub fn hydro_is_newer(stored: &HydroReading, incoming: &HydroReading) -> bool {
    field_changed(&stored.water_level_at, &incoming.water_level_at)
        || field_changed(&stored.discharge_at, &incoming.discharge_at)
        || field_changed(&stored.water_temperature_at, &incoming.water_temperature_at)
        || field_changed(&stored.ice_phenomenon_at, &incoming.ice_phenomenon_at)
        || field_changed(&stored.overgrowth_phenomenon_at, &incoming.overgrowth_phenomenon_at)
}

pub fn meteo_is_newer(stored: &MeteoReading, incoming: &MeteoReading) -> bool {
    field_changed(&stored.air_temp_at, &incoming.air_temp_at)
        || field_changed(&stored.wind_at, &incoming.wind_at)
        || field_changed(&stored.precipitation_10min_at, &incoming.precipitation_10min_at)
        || field_changed(&stored.wind_gust_10min_at, &incoming.wind_gust_10min_at)
}

// ---------------------------------------------------------------------------
// Keyed upsert planning
// ---------------------------------------------------------------------------

/// Canonical granularity of the forecast/current-conditions timeline.
pub fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Natural key of a forecast row.
pub type ForecastKey = (StationKind, String, NaiveDateTime);

pub fn forecast_key(record: &ForecastRecord) -> ForecastKey {
    (
        record.station_kind,
        record.station_id.clone(),
        record.forecast_time,
    )
}

/// Inclusive time span covered by a batch of forecast rows; `None` for an
/// empty batch.
pub fn forecast_span(records: &[ForecastRecord]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let min = records.iter().map(|r| r.forecast_time).min()?;
    let max = records.iter().map(|r| r.forecast_time).max()?;
    Some((min, max))
}

/// Result of splitting a forecast batch against the rows already stored:
/// `updates` revise existing rows in place (surrogate id preserved),
/// `inserts` are genuinely new keys.
#[derive(Debug, Default)]
pub struct UpsertPlan {
    pub inserts: Vec<ForecastRecord>,
    pub updates: Vec<(i64, ForecastRecord)>,
}

pub fn plan_forecast_upserts(
    incoming: Vec<ForecastRecord>,
    existing: &HashMap<ForecastKey, i64>,
) -> UpsertPlan {
    let mut plan = UpsertPlan::default();
    for record in incoming {
        match existing.get(&forecast_key(&record)) {
            Some(&id) => plan.updates.push((id, record)),
            None => plan.inserts.push(record),
        }
    }
    plan
}

/// Insert-new-only filter for current conditions: drop every incoming
/// record whose (station, hour) key is already stored. Never updates.
pub fn filter_unseen_current(
    incoming: Vec<CurrentReading>,
    existing: &HashSet<(String, NaiveDateTime)>,
) -> Vec<CurrentReading> {
    incoming
        .into_iter()
        .filter(|r| !existing.contains(&(r.station_id.clone(), r.measurement_time)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
