/// Current-conditions dataset over the fan-out engine.
///
/// One lightweight provider call per active virtual station, storing the
/// `current` block as an append-only reading keyed by the observation
/// hour. Unlike forecasts these rows are never revised: a key that is
/// already stored makes the incoming record a duplicate, and duplicates
/// are dropped before the insert.

use crate::audit;
use crate::config::{ApiConfig, FanOutConfig};
use crate::ingest::open_meteo;
use crate::merge;
use crate::model::{CurrentReading, DatasetKind, ForecastTarget, IngestError, RunStatus, StationKind};
use crate::sync::fanout::{run_fan_out, FanOutDataset, FanOutOptions, FanOutReport};
use chrono::NaiveDateTime;
use postgres::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use threadpool::ThreadPool;

pub struct CurrentDataset {
    pub api_url: String,
    pub timezone: String,
}

impl FanOutDataset for CurrentDataset {
    type Target = ForecastTarget;
    type Item = CurrentReading;

    fn kind(&self) -> DatasetKind {
        DatasetKind::Current
    }

    fn label(target: &ForecastTarget) -> String {
        format!("virtual station {} ({})", target.id, target.name)
    }

    fn fetch_one(
        &self,
        http: &reqwest::blocking::Client,
        target: &ForecastTarget,
    ) -> Result<Vec<CurrentReading>, IngestError> {
        let url = open_meteo::build_current_url(
            &self.api_url,
            target.latitude,
            target.longitude,
            &self.timezone,
        );
        let response = open_meteo::fetch(http, &url)?;
        Ok(open_meteo::current_reading(&response, &target.id)
            .into_iter()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Targets and persistence
// ---------------------------------------------------------------------------

pub fn load_targets(client: &mut Client) -> Result<Vec<ForecastTarget>, postgres::Error> {
    let rows = client.query(
        "SELECT id, name, latitude, longitude
         FROM hydromet.virtual_stations
         WHERE is_active
         ORDER BY id",
        &[],
    )?;

    Ok(rows
        .into_iter()
        .map(|row| ForecastTarget {
            kind: StationKind::Virtual,
            id: row.get(0),
            name: row.get(1),
            latitude: row.get(2),
            longitude: row.get(3),
        })
        .collect())
}

/// Insert the batch's genuinely new (station, hour) keys in one
/// transaction; keys already stored are dropped, never updated.
pub fn persist_batch(
    client: &mut Client,
    readings: Vec<CurrentReading>,
) -> Result<usize, IngestError> {
    if readings.is_empty() {
        return Ok(0);
    }

    let mut station_ids: Vec<&str> = readings.iter().map(|r| r.station_id.as_str()).collect();
    station_ids.sort();
    station_ids.dedup();
    let mut times: Vec<NaiveDateTime> = readings.iter().map(|r| r.measurement_time).collect();
    times.sort();
    times.dedup();

    let rows = client.query(
        "SELECT station_id, measurement_time
         FROM hydromet.virtual_station_readings
         WHERE station_id = ANY($1) AND measurement_time = ANY($2)",
        &[&station_ids, &times],
    )?;

    let existing: HashSet<(String, NaiveDateTime)> = rows
        .into_iter()
        .map(|row| (row.get(0), row.get(1)))
        .collect();

    let to_insert = merge::filter_unseen_current(readings, &existing);
    if to_insert.is_empty() {
        log::info!("current conditions: nothing new this hour");
        return Ok(0);
    }

    let mut tx = client.transaction()?;
    for reading in &to_insert {
        tx.execute(
            "INSERT INTO hydromet.virtual_station_readings
                (station_id, measurement_time, temp_c, apparent_temp_c, pressure_hpa,
                 wind_speed_kmh, wind_gusts_kmh, wind_direction_deg, rain_mm,
                 humidity_pct, weather_code)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            &[
                &reading.station_id,
                &reading.measurement_time,
                &reading.temperature_c,
                &reading.apparent_temperature_c,
                &reading.pressure_hpa,
                &reading.wind_speed_kmh,
                &reading.wind_gusts_kmh,
                &reading.wind_direction_deg,
                &reading.rain_mm,
                &reading.relative_humidity_pct,
                &reading.weather_code,
            ],
        )?;
    }
    tx.commit()?;

    log::info!("current conditions: {} new readings", to_insert.len());
    Ok(to_insert.len())
}

// ---------------------------------------------------------------------------
// Run facade
// ---------------------------------------------------------------------------

pub fn run(
    client: &mut Client,
    http: &reqwest::blocking::Client,
    pool: &ThreadPool,
    config: &FanOutConfig,
    api: &ApiConfig,
) -> FanOutReport {
    let targets = match load_targets(client) {
        Ok(targets) => targets,
        Err(e) => {
            log::error!("current conditions: loading targets failed: {}", e);
            audit::record_import(
                client,
                DatasetKind::Current,
                RunStatus::Error,
                0,
                Some(&e.to_string()),
            );
            return FanOutReport {
                aborted: true,
                ..Default::default()
            };
        }
    };

    let dataset = Arc::new(CurrentDataset {
        api_url: api.forecast_url.clone(),
        timezone: api.timezone.clone(),
    });
    let options = FanOutOptions {
        batch_size: config.batch_size,
        pause: Duration::from_millis(config.rate_limit_pause_ms),
    };

    let report = run_fan_out(
        &dataset,
        http,
        pool,
        targets,
        &options,
        &mut |readings| persist_batch(client, readings),
    );

    let error_note = report
        .aborted
        .then(|| format!("aborted after {} of {} batches", report.batches_dispatched, report.batches_planned));
    audit::record_import(
        client,
        DatasetKind::Current,
        report.status(),
        report.persisted,
        error_note.as_deref(),
    );

    report
}
