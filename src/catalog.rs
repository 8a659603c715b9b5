/// Station catalog: batched resolution and lazy auto-provisioning.
///
/// Stations are created the first time an unknown provider id appears in a
/// fetch payload, inside the same transaction as — and strictly before —
/// any reading that references them. Re-discovery of a known id never
/// touches its stored metadata: provider payloads repeat station metadata
/// on every poll and it is not treated as a correction feed.

use crate::model::StationRecord;
use postgres::{Client, Transaction};
use std::collections::HashSet;

/// The station tables of the telemetry provider namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationTable {
    Synop,
    Hydro,
    Meteo,
}

impl StationTable {
    pub fn qualified_name(&self) -> &'static str {
        match self {
            StationTable::Synop => "hydromet.synop_stations",
            StationTable::Hydro => "hydromet.hydro_stations",
            StationTable::Meteo => "hydromet.meteo_stations",
        }
    }
}

/// One batched lookup of which of the observed ids already exist.
pub fn load_known_ids(
    client: &mut Client,
    table: StationTable,
    ids: &[String],
) -> Result<HashSet<String>, postgres::Error> {
    let sql = format!("SELECT id FROM {} WHERE id = ANY($1)", table.qualified_name());
    let ids: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
    let rows = client.query(&sql, &[&ids])?;
    Ok(rows.into_iter().map(|row| row.get(0)).collect())
}

/// From the stations present in one payload, pick those to create: the
/// first occurrence of every id not already known. Later duplicates of the
/// same id within the payload are dropped so each unknown station is
/// provisioned exactly once.
pub fn collect_unknown(incoming: &[StationRecord], known: &HashSet<String>) -> Vec<StationRecord> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut to_create = Vec::new();
    for station in incoming {
        if known.contains(&station.id) {
            continue;
        }
        if seen.insert(station.id.as_str()) {
            to_create.push(station.clone());
        }
    }
    to_create
}

/// Insert new stations inside the caller's transaction, before any reading
/// referencing them. `ON CONFLICT DO NOTHING` keeps a concurrently created
/// station from failing the run — and guarantees existing metadata is never
/// overwritten.
pub fn provision(
    tx: &mut Transaction<'_>,
    table: StationTable,
    stations: &[StationRecord],
) -> Result<u64, postgres::Error> {
    let mut created = 0;
    for station in stations {
        created += match table {
            StationTable::Hydro => tx.execute(
                "INSERT INTO hydromet.hydro_stations (id, name, river, province, latitude, longitude, is_active)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (id) DO NOTHING",
                &[
                    &station.id,
                    &station.name,
                    &station.river,
                    &station.province,
                    &station.latitude,
                    &station.longitude,
                    &station.active,
                ],
            )?,
            StationTable::Synop => tx.execute(
                "INSERT INTO hydromet.synop_stations (id, name, latitude, longitude, is_active)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO NOTHING",
                &[
                    &station.id,
                    &station.name,
                    &station.latitude,
                    &station.longitude,
                    &station.active,
                ],
            )?,
            StationTable::Meteo => tx.execute(
                "INSERT INTO hydromet.meteo_stations (id, name, latitude, longitude, is_active)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO NOTHING",
                &[
                    &station.id,
                    &station.name,
                    &station.latitude,
                    &station.longitude,
                    &station.active,
                ],
            )?,
        };
    }
    Ok(created)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
