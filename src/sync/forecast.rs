/// Hourly forecast dataset over the fan-out engine.
///
/// Targets are every active synop station with known coordinates plus
/// every active virtual station. Persistence is an upsert keyed by
/// (station kind, station id, forecast hour): providers legitimately
/// revise forecasts for the same future instant, so an existing row is
/// overwritten in place instead of appended to.

use crate::audit;
use crate::config::{ApiConfig, FanOutConfig};
use crate::ingest::open_meteo;
use crate::merge::{self, ForecastKey};
use crate::model::{DatasetKind, ForecastRecord, ForecastTarget, IngestError, RunStatus, StationKind};
use crate::sync::fanout::{run_fan_out, FanOutDataset, FanOutOptions, FanOutReport};
use postgres::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use threadpool::ThreadPool;

pub struct ForecastDataset {
    pub api_url: String,
    pub timezone: String,
}

impl FanOutDataset for ForecastDataset {
    type Target = ForecastTarget;
    type Item = ForecastRecord;

    fn kind(&self) -> DatasetKind {
        DatasetKind::Forecast
    }

    fn label(target: &ForecastTarget) -> String {
        format!("{} station {} ({})", target.kind.as_str(), target.id, target.name)
    }

    fn fetch_one(
        &self,
        http: &reqwest::blocking::Client,
        target: &ForecastTarget,
    ) -> Result<Vec<ForecastRecord>, IngestError> {
        let url = open_meteo::build_forecast_url(
            &self.api_url,
            target.latitude,
            target.longitude,
            &self.timezone,
        );
        let response = open_meteo::fetch(http, &url)?;
        Ok(open_meteo::forecast_records(&response, target.kind, &target.id))
    }
}

// ---------------------------------------------------------------------------
// Targets and persistence
// ---------------------------------------------------------------------------

/// Active stations the forecast run covers. Synop stations without
/// coordinates cannot be queried by the provider and are left out.
pub fn load_targets(client: &mut Client) -> Result<Vec<ForecastTarget>, postgres::Error> {
    let mut targets = Vec::new();

    let rows = client.query(
        "SELECT id, name, latitude, longitude
         FROM hydromet.synop_stations
         WHERE is_active AND latitude IS NOT NULL AND longitude IS NOT NULL
         ORDER BY id",
        &[],
    )?;
    for row in rows {
        targets.push(ForecastTarget {
            kind: StationKind::Synop,
            id: row.get(0),
            name: row.get(1),
            latitude: row.get(2),
            longitude: row.get(3),
        });
    }

    let rows = client.query(
        "SELECT id, name, latitude, longitude
         FROM hydromet.virtual_stations
         WHERE is_active
         ORDER BY id",
        &[],
    )?;
    for row in rows {
        targets.push(ForecastTarget {
            kind: StationKind::Virtual,
            id: row.get(0),
            name: row.get(1),
            latitude: row.get(2),
            longitude: row.get(3),
        });
    }

    Ok(targets)
}

/// Upsert one batch of forecast rows in a single transaction.
///
/// Existing rows inside the batch's time span are loaded once; the merge
/// engine splits the batch into in-place updates (row id preserved) and
/// fresh inserts. Row count per key stays 1 across revisions.
pub fn persist_batch(
    client: &mut Client,
    records: Vec<ForecastRecord>,
) -> Result<usize, IngestError> {
    let Some((span_start, span_end)) = merge::forecast_span(&records) else {
        return Ok(0);
    };

    let mut station_ids: Vec<&str> = records.iter().map(|r| r.station_id.as_str()).collect();
    station_ids.sort();
    station_ids.dedup();

    let rows = client.query(
        "SELECT id, station_kind, station_id, forecast_time
         FROM hydromet.weather_forecasts
         WHERE forecast_time >= $1 AND forecast_time <= $2 AND station_id = ANY($3)",
        &[&span_start, &span_end, &station_ids],
    )?;

    let mut existing: HashMap<ForecastKey, i64> = HashMap::with_capacity(rows.len());
    for row in rows {
        let kind_str: String = row.get(1);
        let Some(kind) = StationKind::from_db(&kind_str) else {
            log::error!("forecast row {} has unknown station kind '{}'", row.get::<_, i64>(0), kind_str);
            continue;
        };
        existing.insert((kind, row.get(2), row.get(3)), row.get(0));
    }

    let plan = merge::plan_forecast_upserts(records, &existing);
    let persisted = plan.inserts.len() + plan.updates.len();

    let mut tx = client.transaction()?;

    for (row_id, record) in &plan.updates {
        tx.execute(
            "UPDATE hydromet.weather_forecasts SET
                fetched_at = now(), temp_c = $1, apparent_temp_c = $2,
                pressure_hpa = $3, wind_speed_kmh = $4, wind_gusts_kmh = $5,
                wind_direction_deg = $6, rain_mm = $7, cloud_cover_pct = $8,
                weather_code = $9, uv_index = $10, sunrise = $11, sunset = $12,
                uv_index_max = $13
             WHERE id = $14",
            &[
                &record.temperature_c,
                &record.apparent_temperature_c,
                &record.pressure_hpa,
                &record.wind_speed_kmh,
                &record.wind_gusts_kmh,
                &record.wind_direction_deg,
                &record.rain_mm,
                &record.cloud_cover_pct,
                &record.weather_code,
                &record.uv_index,
                &record.sunrise,
                &record.sunset,
                &record.uv_index_max,
                row_id,
            ],
        )?;
    }

    for record in &plan.inserts {
        tx.execute(
            "INSERT INTO hydromet.weather_forecasts
                (station_kind, station_id, forecast_time, temp_c, apparent_temp_c,
                 pressure_hpa, wind_speed_kmh, wind_gusts_kmh, wind_direction_deg,
                 rain_mm, cloud_cover_pct, weather_code, uv_index, sunrise, sunset,
                 uv_index_max)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            &[
                &record.station_kind.as_str(),
                &record.station_id,
                &record.forecast_time,
                &record.temperature_c,
                &record.apparent_temperature_c,
                &record.pressure_hpa,
                &record.wind_speed_kmh,
                &record.wind_gusts_kmh,
                &record.wind_direction_deg,
                &record.rain_mm,
                &record.cloud_cover_pct,
                &record.weather_code,
                &record.uv_index,
                &record.sunrise,
                &record.sunset,
                &record.uv_index_max,
            ],
        )?;
    }

    tx.commit()?;

    log::info!(
        "forecast batch persisted: {} updated, {} inserted",
        plan.updates.len(),
        plan.inserts.len()
    );
    Ok(persisted)
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
            log::error!("forecast: loading targets failed: {}", e);
            audit::record_import(
                client,
                DatasetKind::Forecast,
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

    let dataset = Arc::new(ForecastDataset {
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
        &mut |records| persist_batch(client, records),
    );

    let error_note = report
        .aborted
        .then(|| format!("aborted after {} of {} batches", report.batches_dispatched, report.batches_planned));
    audit::record_import(
        client,
        DatasetKind::Forecast,
        report.status(),
        report.persisted,
        error_note.as_deref(),
    );

    report
}
