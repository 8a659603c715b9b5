/// Fan-out ingestion engine.
///
/// For providers that must be queried once per station. A run partitions
/// the target list into fixed-size batches and processes them strictly in
/// sequence: dispatch one task per target onto the category's bounded
/// worker pool, join the whole batch, persist its successful results in
/// one transaction, then pace the next dispatch through the rate limiter.
///
/// Failure semantics: the first task that errors or times out sets a
/// shared critical flag. Tasks already dispatched are never cancelled —
/// their results are still collected and persisted — but no further batch
/// is dispatched once the flag is up. Batches committed earlier are never
/// rolled back. The flag and the success/error counters live for exactly
/// one run.

use crate::model::{DatasetKind, IngestError, RunStatus};
use crate::ratelimit::RateLimiter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use threadpool::ThreadPool;

/// Per-dataset capabilities of a fan-out source. Only the fetch is run on
/// pool workers; persistence stays on the orchestrating thread.
pub trait FanOutDataset: Send + Sync + 'static {
    type Target: Clone + Send + 'static;
    type Item: Send + 'static;

    fn kind(&self) -> DatasetKind;

    /// Station identity for error logs.
    fn label(target: &Self::Target) -> String;

    /// One provider call for one station. The HTTP client's timeout is the
    /// per-call timeout of the run.
    fn fetch_one(
        &self,
        http: &reqwest::blocking::Client,
        target: &Self::Target,
    ) -> Result<Vec<Self::Item>, IngestError>;
}

#[derive(Debug, Clone)]
pub struct FanOutOptions {
    pub batch_size: usize,
    pub pause: Duration,
}

/// Outcome of one fan-out run.
#[derive(Debug, Default)]
pub struct FanOutReport {
    pub targets: usize,
    pub batches_planned: usize,
    pub batches_dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub persisted: usize,
    pub aborted: bool,
}

impl FanOutReport {
    pub fn status(&self) -> RunStatus {
        if self.aborted {
            RunStatus::Error
        } else {
            RunStatus::Success
        }
    }
}

/// Fixed-size partition preserving order: 10 targets at size 7 plan as
/// [7, 3].
pub fn split_into_batches<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    items.chunks(size).map(|chunk| chunk.to_vec()).collect()
}

/// Run one fan-out pass over `targets`. Each batch's successful results
/// are handed to `persist` as one unit; a persist failure loses that
/// batch's contribution but does not abort the run.
pub fn run_fan_out<D: FanOutDataset>(
    dataset: &Arc<D>,
    http: &reqwest::blocking::Client,
    pool: &ThreadPool,
    targets: Vec<D::Target>,
    options: &FanOutOptions,
    persist: &mut dyn FnMut(Vec<D::Item>) -> Result<usize, IngestError>,
) -> FanOutReport {
    let kind = dataset.kind();
    let mut report = FanOutReport {
        targets: targets.len(),
        ..Default::default()
    };

    if targets.is_empty() {
        log::info!("{}: no active stations, nothing to fetch", kind);
        return report;
    }

    let batches = split_into_batches(&targets, options.batch_size);
    report.batches_planned = batches.len();
    log::info!(
        "{}: plan: {} stations in {} batches of up to {}",
        kind,
        targets.len(),
        batches.len(),
        options.batch_size.max(1)
    );

    let limiter = RateLimiter::new(options.pause);
    let critical = Arc::new(AtomicBool::new(false));
    let ok_count = Arc::new(AtomicUsize::new(0));
    let err_count = Arc::new(AtomicUsize::new(0));

    for (i, batch) in batches.iter().enumerate() {
        if critical.load(Ordering::SeqCst) {
            log::warn!(
                "{}: critical error, skipping the remaining {} batches",
                kind,
                batches.len() - i
            );
            break;
        }

        report.batches_dispatched += 1;
        let batch_started = Instant::now();
        let (result_tx, result_rx) = mpsc::channel::<Option<Vec<D::Item>>>();

        for target in batch.iter().cloned() {
            let dataset = Arc::clone(dataset);
            let http = http.clone();
            let critical = Arc::clone(&critical);
            let ok_count = Arc::clone(&ok_count);
            let err_count = Arc::clone(&err_count);
            let result_tx = result_tx.clone();

            pool.execute(move || {
                // A sibling already failed: skip the network call but
                // still report in so the batch join completes.
                let outcome = if critical.load(Ordering::SeqCst) {
                    Some(Vec::new())
                } else {
                    match dataset.fetch_one(&http, &target) {
                        Ok(items) => {
                            ok_count.fetch_add(1, Ordering::SeqCst);
                            Some(items)
                        }
                        Err(e) => {
                            log::error!(
                                "{}: fetch failed for {}: {} - flagging run as critical",
                                dataset.kind(),
                                D::label(&target),
                                e
                            );
                            err_count.fetch_add(1, Ordering::SeqCst);
                            critical.store(true, Ordering::SeqCst);
                            None
                        }
                    }
                };
                let _ = result_tx.send(outcome);
            });
        }
        drop(result_tx);

        // Blocking join: every dispatched task reports exactly once, and
        // none is cancelled by a sibling's failure.
        let mut collected: Vec<D::Item> = Vec::new();
        for _ in 0..batch.len() {
            match result_rx.recv() {
                Ok(Some(items)) => collected.extend(items),
                Ok(None) => {}
                Err(_) => {
                    log::error!("{}: a worker died without reporting", kind);
                    critical.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }

        // Successful siblings of a failed task are still persisted.
        if !collected.is_empty() {
            match persist(collected) {
                Ok(n) => report.persisted += n,
                Err(e) => {
                    log::error!("{}: batch persist failed, batch contribution lost: {}", kind, e)
                }
            }
        }

        if i + 1 < batches.len() && !critical.load(Ordering::SeqCst) {
            limiter.pace(batch_started);
        }
    }

    report.aborted = critical.load(Ordering::SeqCst);
    report.succeeded = ok_count.load(Ordering::SeqCst);
    report.failed = err_count.load(Ordering::SeqCst);

    if report.aborted {
        log::warn!(
            "{}: run aborted after {} of {} batches ({} ok, {} failed, {} persisted)",
            kind,
            report.batches_dispatched,
            report.batches_planned,
            report.succeeded,
            report.failed,
            report.persisted
        );
    } else {
        log::info!(
            "{}: run complete ({} ok, {} persisted)",
            kind,
            report.succeeded,
            report.persisted
        );
    }

    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_plan_is_order_preserving() {
        let items: Vec<u32> = (1..=10).collect();
        let batches = split_into_batches(&items, 7);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(batches[1], vec![8, 9, 10]);
    }

    #[test]
    fn test_exact_multiple_has_no_rump_batch() {
        let items: Vec<u32> = (1..=14).collect();
        let batches = split_into_batches(&items, 7);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 7);
    }

    #[test]
    fn test_empty_target_list_plans_no_batches() {
        let batches = split_into_batches(&Vec::<u32>::new(), 7);
        assert!(batches.is_empty());
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let items = vec![1, 2, 3];
        let batches = split_into_batches(&items, 0);
        assert_eq!(batches.len(), 3, "size 0 degrades to one target per batch");
    }

    // Abort propagation and batch-level persistence are exercised through
    // the public API in tests/fan_out_engine.rs.
}
