/// Bulk telemetry datasets: synop, hydro, meteo.
///
/// Each dataset wires the IMGW client, the mappers, the merge predicate,
/// and its table's SQL into the generic bulk engine. `run_all` is the
/// facade used by the scheduler: the three datasets in sequence, one
/// audit row each.

use crate::audit;
use crate::catalog::StationTable;
use crate::ingest::imgw::{self, RawHydro, RawMeteo, RawSynop};
use crate::merge;
use crate::model::{DatasetKind, HydroReading, IngestError, MeteoReading, StationRecord, SynopReading};
use crate::sync::bulk::{run_bulk, BulkDataset, BulkReport};
use postgres::{Client, Transaction};
use std::collections::HashMap;

fn id_refs(ids: &[String]) -> Vec<&str> {
    ids.iter().map(String::as_str).collect()
}

fn clean_id(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Synop
// ---------------------------------------------------------------------------

pub struct SynopDataset {
    pub base_url: String,
}

impl BulkDataset for SynopDataset {
    type Raw = RawSynop;
    type Reading = SynopReading;

    fn kind(&self) -> DatasetKind {
        DatasetKind::Synop
    }

    fn station_table(&self) -> StationTable {
        StationTable::Synop
    }

    fn fetch(&self, http: &reqwest::blocking::Client) -> Result<Vec<RawSynop>, IngestError> {
        imgw::fetch_synop(http, &self.base_url)
    }

    fn station_id(raw: &RawSynop) -> Option<String> {
        clean_id(&raw.station_id)
    }

    fn to_station(raw: &RawSynop, id: &str) -> StationRecord {
        imgw::synop_station(raw, id)
    }

    fn to_reading(raw: &RawSynop) -> SynopReading {
        imgw::synop_reading(raw)
    }

    fn is_newer(stored: &SynopReading, incoming: &SynopReading) -> bool {
        merge::synop_is_newer(stored, incoming)
    }

    fn load_latest(
        &self,
        client: &mut Client,
        ids: &[String],
    ) -> Result<HashMap<String, SynopReading>, postgres::Error> {
        let ids = id_refs(ids);
        let rows = client.query(
            "SELECT DISTINCT ON (station_id)
                station_id, measurement_date, measurement_hour, temperature_c,
                wind_speed_ms, wind_direction_deg, relative_humidity_pct,
                total_precipitation_mm, pressure_hpa
             FROM hydromet.synop_readings
             WHERE station_id = ANY($1)
             ORDER BY station_id, id DESC",
            &[&ids],
        )?;

        let mut latest = HashMap::with_capacity(rows.len());
        for row in rows {
            let station_id: String = row.get(0);
            latest.insert(
                station_id,
                SynopReading {
                    measurement_date: row.get(1),
                    measurement_hour: row.get(2),
                    temperature_c: row.get(3),
                    wind_speed_ms: row.get(4),
                    wind_direction_deg: row.get(5),
                    relative_humidity_pct: row.get(6),
                    total_precipitation_mm: row.get(7),
                    pressure_hpa: row.get(8),
                },
            );
        }
        Ok(latest)
    }

    fn insert_reading(
        &self,
        tx: &mut Transaction<'_>,
        station_id: &str,
        reading: &SynopReading,
    ) -> Result<(), postgres::Error> {
        tx.execute(
            "INSERT INTO hydromet.synop_readings
                (station_id, measurement_date, measurement_hour, temperature_c,
                 wind_speed_ms, wind_direction_deg, relative_humidity_pct,
                 total_precipitation_mm, pressure_hpa)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            &[
                &station_id,
                &reading.measurement_date,
                &reading.measurement_hour,
                &reading.temperature_c,
                &reading.wind_speed_ms,
                &reading.wind_direction_deg,
                &reading.relative_humidity_pct,
                &reading.total_precipitation_mm,
                &reading.pressure_hpa,
            ],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hydro
// ---------------------------------------------------------------------------

pub struct HydroDataset {
    pub base_url: String,
}

impl BulkDataset for HydroDataset {
    type Raw = RawHydro;
    type Reading = HydroReading;

    fn kind(&self) -> DatasetKind {
        DatasetKind::Hydro
    }

    fn station_table(&self) -> StationTable {
        StationTable::Hydro
    }

    fn fetch(&self, http: &reqwest::blocking::Client) -> Result<Vec<RawHydro>, IngestError> {
        imgw::fetch_hydro(http, &self.base_url)
    }

    fn station_id(raw: &RawHydro) -> Option<String> {
        clean_id(&raw.station_id)
    }

    fn to_station(raw: &RawHydro, id: &str) -> StationRecord {
        imgw::hydro_station(raw, id)
    }

    fn to_reading(raw: &RawHydro) -> HydroReading {
        imgw::hydro_reading(raw)
    }

    fn is_newer(stored: &HydroReading, incoming: &HydroReading) -> bool {
        merge::hydro_is_newer(stored, incoming)
    }

    fn load_latest(
        &self,
        client: &mut Client,
        ids: &[String],
    ) -> Result<HashMap<String, HydroReading>, postgres::Error> {
        let ids = id_refs(ids);
        let rows = client.query(
            "SELECT DISTINCT ON (station_id)
                station_id, water_level_cm, water_level_at, water_temperature_c,
                water_temperature_at, discharge_m3s, discharge_at, ice_phenomenon,
                ice_phenomenon_at, overgrowth_phenomenon, overgrowth_phenomenon_at
             FROM hydromet.hydro_readings
             WHERE station_id = ANY($1)
             ORDER BY station_id, id DESC",
            &[&ids],
        )?;

        let mut latest = HashMap::with_capacity(rows.len());
        for row in rows {
            let station_id: String = row.get(0);
            latest.insert(
                station_id,
                HydroReading {
                    water_level_cm: row.get(1),
                    water_level_at: row.get(2),
                    water_temperature_c: row.get(3),
                    water_temperature_at: row.get(4),
                    discharge_m3s: row.get(5),
                    discharge_at: row.get(6),
                    ice_phenomenon: row.get(7),
                    ice_phenomenon_at: row.get(8),
                    overgrowth_phenomenon: row.get(9),
                    overgrowth_phenomenon_at: row.get(10),
                },
            );
        }
        Ok(latest)
    }

    fn insert_reading(
        &self,
        tx: &mut Transaction<'_>,
        station_id: &str,
        reading: &HydroReading,
    ) -> Result<(), postgres::Error> {
        tx.execute(
            "INSERT INTO hydromet.hydro_readings
                (station_id, water_level_cm, water_level_at, water_temperature_c,
                 water_temperature_at, discharge_m3s, discharge_at, ice_phenomenon,
                 ice_phenomenon_at, overgrowth_phenomenon, overgrowth_phenomenon_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            &[
                &station_id,
                &reading.water_level_cm,
                &reading.water_level_at,
                &reading.water_temperature_c,
                &reading.water_temperature_at,
                &reading.discharge_m3s,
                &reading.discharge_at,
                &reading.ice_phenomenon,
                &reading.ice_phenomenon_at,
                &reading.overgrowth_phenomenon,
                &reading.overgrowth_phenomenon_at,
            ],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Meteo
// ---------------------------------------------------------------------------

pub struct MeteoDataset {
    pub base_url: String,
}

impl BulkDataset for MeteoDataset {
    type Raw = RawMeteo;
    type Reading = MeteoReading;

    fn kind(&self) -> DatasetKind {
        DatasetKind::Meteo
    }

    fn station_table(&self) -> StationTable {
        StationTable::Meteo
    }

    fn fetch(&self, http: &reqwest::blocking::Client) -> Result<Vec<RawMeteo>, IngestError> {
        imgw::fetch_meteo(http, &self.base_url)
    }

    fn station_id(raw: &RawMeteo) -> Option<String> {
        clean_id(&raw.station_id)
    }

    fn to_station(raw: &RawMeteo, id: &str) -> StationRecord {
        imgw::meteo_station(raw, id)
    }

    fn to_reading(raw: &RawMeteo) -> MeteoReading {
        imgw::meteo_reading(raw)
    }

    fn is_newer(stored: &MeteoReading, incoming: &MeteoReading) -> bool {
        merge::meteo_is_newer(stored, incoming)
    }

    fn load_latest(
        &self,
        client: &mut Client,
        ids: &[String],
    ) -> Result<HashMap<String, MeteoReading>, postgres::Error> {
        let ids = id_refs(ids);
        let rows = client.query(
            "SELECT DISTINCT ON (station_id)
                station_id, air_temp_c, air_temp_at, ground_temp_c, ground_temp_at,
                wind_direction_deg, wind_avg_speed_ms, wind_max_speed_ms, wind_at,
                wind_gust_10min_ms, wind_gust_10min_at, relative_humidity_pct,
                relative_humidity_at, precipitation_10min_mm, precipitation_10min_at
             FROM hydromet.meteo_readings
             WHERE station_id = ANY($1)
             ORDER BY station_id, id DESC",
            &[&ids],
        )?;

        let mut latest = HashMap::with_capacity(rows.len());
        for row in rows {
            let station_id: String = row.get(0);
            latest.insert(
                station_id,
                MeteoReading {
                    air_temp_c: row.get(1),
                    air_temp_at: row.get(2),
                    ground_temp_c: row.get(3),
                    ground_temp_at: row.get(4),
                    wind_direction_deg: row.get(5),
                    wind_avg_speed_ms: row.get(6),
                    wind_max_speed_ms: row.get(7),
                    wind_at: row.get(8),
                    wind_gust_10min_ms: row.get(9),
                    wind_gust_10min_at: row.get(10),
                    relative_humidity_pct: row.get(11),
                    relative_humidity_at: row.get(12),
                    precipitation_10min_mm: row.get(13),
                    precipitation_10min_at: row.get(14),
                },
            );
        }
        Ok(latest)
    }

    fn insert_reading(
        &self,
        tx: &mut Transaction<'_>,
        station_id: &str,
        reading: &MeteoReading,
    ) -> Result<(), postgres::Error> {
        tx.execute(
            "INSERT INTO hydromet.meteo_readings
                (station_id, air_temp_c, air_temp_at, ground_temp_c, ground_temp_at,
                 wind_direction_deg, wind_avg_speed_ms, wind_max_speed_ms, wind_at,
                 wind_gust_10min_ms, wind_gust_10min_at, relative_humidity_pct,
                 relative_humidity_at, precipitation_10min_mm, precipitation_10min_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            &[
                &station_id,
                &reading.air_temp_c,
                &reading.air_temp_at,
                &reading.ground_temp_c,
                &reading.ground_temp_at,
                &reading.wind_direction_deg,
                &reading.wind_avg_speed_ms,
                &reading.wind_max_speed_ms,
                &reading.wind_at,
                &reading.wind_gust_10min_ms,
                &reading.wind_gust_10min_at,
                &reading.relative_humidity_pct,
                &reading.relative_humidity_at,
                &reading.precipitation_10min_mm,
                &reading.precipitation_10min_at,
            ],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

fn run_and_audit<D: BulkDataset>(
    dataset: &D,
    http: &reqwest::blocking::Client,
    client: &mut Client,
) -> BulkReport {
    let report = run_bulk(dataset, http, client);
    audit::record_import(
        client,
        dataset.kind(),
        report.status(),
        report.persisted,
        report.error.as_deref(),
    );
    report
}

pub fn run_synop(client: &mut Client, http: &reqwest::blocking::Client, base_url: &str) -> BulkReport {
    run_and_audit(&SynopDataset { base_url: base_url.to_string() }, http, client)
}

pub fn run_hydro(client: &mut Client, http: &reqwest::blocking::Client, base_url: &str) -> BulkReport {
    run_and_audit(&HydroDataset { base_url: base_url.to_string() }, http, client)
}

pub fn run_meteo(client: &mut Client, http: &reqwest::blocking::Client, base_url: &str) -> BulkReport {
    run_and_audit(&MeteoDataset { base_url: base_url.to_string() }, http, client)
}

/// One telemetry sweep: all three bulk datasets in sequence. A failure in
/// one dataset is recorded in its audit row and does not stop the others.
pub fn run_all(client: &mut Client, http: &reqwest::blocking::Client, base_url: &str) {
    log::info!("telemetry sweep: start");
    run_meteo(client, http, base_url);
    run_hydro(client, http, base_url);
    run_synop(client, http, base_url);
    log::info!("telemetry sweep: done");
}
