/// Import audit log: one durable row per orchestrator run.
///
/// The audit write happens after the ingest transaction(s) and outside any
/// of them. It is deliberately best-effort: a failed audit insert is logged
/// and swallowed so it can never undo or block ingested data. The pipeline
/// itself never reads this table; it exists for operators and dashboards.

use crate::model::{DatasetKind, RunStatus};
use postgres::Client;

pub fn record_import(
    client: &mut Client,
    dataset: DatasetKind,
    status: RunStatus,
    records_count: usize,
    error_message: Option<&str>,
) {
    let count = records_count as i32;
    let result = client.execute(
        "INSERT INTO hydromet.import_log (provider, dataset, status, records_count, error_message)
         VALUES ($1, $2, $3, $4, $5)",
        &[
            &dataset.provider(),
            &dataset.as_str(),
            &status.as_str(),
            &count,
            &error_message,
        ],
    );

    match result {
        Ok(_) => log::info!(
            "import log: {} {} {} ({} records)",
            dataset.provider(),
            dataset,
            status.as_str(),
            records_count
        ),
        Err(e) => log::error!("failed to write import log for {}: {}", dataset, e),
    }
}
