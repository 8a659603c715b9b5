/// Bulk-poll ingestion engine.
///
/// One run: fetch the provider's full array, resolve/auto-provision the
/// stations it mentions, load each station's latest stored reading in one
/// batched query, keep only the items the merge engine considers new
/// information, and persist stations-then-readings in a single
/// transaction. The one network call is the bottleneck; no intra-run
/// concurrency is needed.
///
/// Datasets plug in through `BulkDataset` — a capability record (fetch,
/// identity, mapping, is-newer, storage) supplied per dataset by
/// composition.

use crate::catalog::{self, StationTable};
use crate::merge;
use crate::model::{DatasetKind, IngestError, RunStatus, StationRecord};
use postgres::{Client, Transaction};
use std::collections::HashMap;

/// Per-dataset capabilities of a bulk-poll source.
pub trait BulkDataset {
    type Raw;
    type Reading;

    fn kind(&self) -> DatasetKind;
    fn station_table(&self) -> StationTable;
    fn fetch(&self, http: &reqwest::blocking::Client) -> Result<Vec<Self::Raw>, IngestError>;

    /// Provider-issued station id; items without one are skipped.
    fn station_id(raw: &Self::Raw) -> Option<String>;
    fn to_station(raw: &Self::Raw, id: &str) -> StationRecord;
    fn to_reading(raw: &Self::Raw) -> Self::Reading;
    fn is_newer(stored: &Self::Reading, incoming: &Self::Reading) -> bool;

    /// Latest stored reading per station, one batched query.
    fn load_latest(
        &self,
        client: &mut Client,
        ids: &[String],
    ) -> Result<HashMap<String, Self::Reading>, postgres::Error>;

    fn insert_reading(
        &self,
        tx: &mut Transaction<'_>,
        station_id: &str,
        reading: &Self::Reading,
    ) -> Result<(), postgres::Error>;
}

/// Outcome of one bulk run, consumed by the audit log.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub fetched: usize,
    pub stations_created: u64,
    pub persisted: usize,
    pub error: Option<String>,
}

impl BulkReport {
    pub fn status(&self) -> RunStatus {
        if self.error.is_some() {
            RunStatus::Error
        } else {
            RunStatus::Success
        }
    }
}

/// Merge decision over a whole payload: keep items with no stored reading
/// or whose reading the dataset predicate marks as newer.
pub fn select_new_readings<R>(
    items: Vec<(String, R)>,
    latest: &HashMap<String, R>,
    newer: impl Fn(&R, &R) -> bool,
) -> Vec<(String, R)> {
    items
        .into_iter()
        .filter(|(id, reading)| merge::is_new_information(latest.get(id), reading, &newer))
        .collect()
}

pub fn run_bulk<D: BulkDataset>(
    dataset: &D,
    http: &reqwest::blocking::Client,
    client: &mut Client,
) -> BulkReport {
    match run_bulk_inner(dataset, http, client) {
        Ok(report) => report,
        Err(e) => {
            log::error!("{}: bulk run failed: {}", dataset.kind(), e);
            BulkReport {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}

fn run_bulk_inner<D: BulkDataset>(
    dataset: &D,
    http: &reqwest::blocking::Client,
    client: &mut Client,
) -> Result<BulkReport, IngestError> {
    let kind = dataset.kind();
    let raws = dataset.fetch(http)?;

    if raws.is_empty() {
        log::info!("{}: provider returned no records", kind);
        return Ok(BulkReport::default());
    }

    // Pair every usable item with its station id once, up front.
    let mut items: Vec<(String, &D::Raw)> = Vec::with_capacity(raws.len());
    for raw in &raws {
        match D::station_id(raw) {
            Some(id) => items.push((id, raw)),
            None => log::warn!("{}: skipping record without station id", kind),
        }
    }

    let mut ids: Vec<String> = items.iter().map(|(id, _)| id.clone()).collect();
    ids.sort();
    ids.dedup();

    let known = catalog::load_known_ids(client, dataset.station_table(), &ids)?;
    let latest = dataset.load_latest(client, &ids)?;

    let incoming_stations: Vec<StationRecord> = items
        .iter()
        .map(|(id, raw)| D::to_station(raw, id))
        .collect();
    let stations_to_create = catalog::collect_unknown(&incoming_stations, &known);

    let mapped: Vec<(String, D::Reading)> = items
        .into_iter()
        .map(|(id, raw)| (id, D::to_reading(raw)))
        .collect();
    let to_insert = select_new_readings(mapped, &latest, D::is_newer);

    let mut report = BulkReport {
        fetched: raws.len(),
        ..Default::default()
    };

    if stations_to_create.is_empty() && to_insert.is_empty() {
        log::info!("{}: no new data to persist", kind);
        return Ok(report);
    }

    // Stations first, readings second, one transaction: a reading can
    // never land before the station it references.
    let mut tx = client.transaction()?;
    report.stations_created = catalog::provision(&mut tx, dataset.station_table(), &stations_to_create)?;
    for (station_id, reading) in &to_insert {
        dataset.insert_reading(&mut tx, station_id, reading)?;
    }
    tx.commit()?;

    report.persisted = to_insert.len();
    if report.stations_created > 0 {
        log::info!("{}: provisioned {} new stations", kind, report.stations_created);
    }
    log::info!(
        "{}: persisted {} of {} fetched records",
        kind,
        report.persisted,
        report.fetched
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn items(pairs: &[(&str, u32)]) -> Vec<(String, u32)> {
        pairs.iter().map(|(id, v)| (id.to_string(), *v)).collect()
    }

    #[test]
    fn test_unknown_station_is_unconditionally_selected() {
        let latest = HashMap::new();
        let kept = select_new_readings(items(&[("A", 1)]), &latest, |_, _| false);
        assert_eq!(kept.len(), 1, "no stored reading means the item is always new");
    }

    #[test]
    fn test_predicate_filters_known_stations() {
        let mut latest = HashMap::new();
        latest.insert("A".to_string(), 1u32);
        latest.insert("B".to_string(), 2u32);

        let kept = select_new_readings(
            items(&[("A", 1), ("B", 5)]),
            &latest,
            |stored, incoming| stored != incoming,
        );

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].0, "B");
    }

    #[test]
    fn test_replayed_payload_selects_nothing() {
        // Idempotence at the decision layer: the latest map already holds
        // exactly what the payload carries.
        let mut latest = HashMap::new();
        latest.insert("A".to_string(), 7u32);
        latest.insert("B".to_string(), 9u32);

        let kept = select_new_readings(
            items(&[("A", 7), ("B", 9)]),
            &latest,
            |stored, incoming| stored != incoming,
        );

        assert!(kept.is_empty());
    }

    #[test]
    fn test_bulk_report_status_follows_error() {
        let ok = BulkReport::default();
        assert_eq!(ok.status(), RunStatus::Success);

        let failed = BulkReport {
            error: Some("connection reset".to_string()),
            ..Default::default()
        };
        assert_eq!(failed.status(), RunStatus::Error);
    }
}
