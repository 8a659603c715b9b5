/// Run scheduling: dataset-category workers, interval tickers, and the
/// fire-and-forget trigger handle.
///
/// Each dataset category (telemetry, forecast, current conditions) gets
/// one dedicated worker thread that owns its database connection, its
/// HTTP client, and — for fan-out categories — its bounded fetch pool,
/// all built once at startup. Scheduled tickers and manual HTTP triggers
/// enqueue jobs onto the same per-category channel; the worker drains it
/// serially, so runs of one category never overlap and per-run state
/// (critical flag, counters) is never shared between invocations.
///
/// Submitting a job acknowledges only acceptance. The run's outcome is
/// observable through the audit log and process logs, never through the
/// submission.

use crate::config::ServiceConfig;
use crate::db;
use crate::ingest;
use crate::sync::{current, forecast, telemetry};
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use threadpool::ThreadPool;

// ---------------------------------------------------------------------------
// Jobs and routing
// ---------------------------------------------------------------------------

/// A manually or periodically triggered unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// All three bulk telemetry datasets in sequence.
    TelemetryAll,
    Synop,
    Hydro,
    Meteo,
    Forecast,
    Current,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Telemetry,
    Forecast,
    Current,
}

impl Job {
    fn category(&self) -> Category {
        match self {
            Job::TelemetryAll | Job::Synop | Job::Hydro | Job::Meteo => Category::Telemetry,
            Job::Forecast => Category::Forecast,
            Job::Current => Category::Current,
        }
    }
}

/// Submission failed because the category's worker is gone; the caller
/// gets a synchronous refusal instead of a silently dropped job.
#[derive(Debug)]
pub struct SubmitError;

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ingestion worker is not running")
    }
}

impl std::error::Error for SubmitError {}

/// Cloneable handle for enqueueing work; shared by the tickers and the
/// HTTP trigger endpoint.
#[derive(Clone)]
pub struct TriggerHandle {
    telemetry_tx: Sender<Job>,
    forecast_tx: Sender<Job>,
    current_tx: Sender<Job>,
}

impl TriggerHandle {
    /// Enqueue a job onto its category's queue and return immediately.
    pub fn submit(&self, job: Job) -> Result<(), SubmitError> {
        let tx = match job.category() {
            Category::Telemetry => &self.telemetry_tx,
            Category::Forecast => &self.forecast_tx,
            Category::Current => &self.current_tx,
        };
        tx.send(job).map_err(|_| SubmitError)
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

fn spawn_worker(
    name: &str,
    body: impl FnOnce() + Send + 'static,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .unwrap_or_else(|e| panic!("failed to spawn {} thread: {}", name, e))
}

fn telemetry_worker(rx: Receiver<Job>, config: ServiceConfig) {
    let mut client = match db::connect_and_verify() {
        Ok(client) => client,
        Err(e) => {
            log::error!("telemetry worker: database unavailable, worker exiting: {}", e);
            return;
        }
    };
    let http = match ingest::http_client(config.telemetry.request_timeout_secs) {
        Ok(http) => http,
        Err(e) => {
            log::error!("telemetry worker: HTTP client build failed, worker exiting: {}", e);
            return;
        }
    };

    for job in rx.iter() {
        let base = &config.api.telemetry_base_url;
        match job {
            Job::TelemetryAll => telemetry::run_all(&mut client, &http, base),
            Job::Synop => {
                telemetry::run_synop(&mut client, &http, base);
            }
            Job::Hydro => {
                telemetry::run_hydro(&mut client, &http, base);
            }
            Job::Meteo => {
                telemetry::run_meteo(&mut client, &http, base);
            }
            other => log::error!("telemetry worker received misrouted job {:?}", other),
        }
    }
}

fn forecast_worker(rx: Receiver<Job>, config: ServiceConfig) {
    let mut client = match db::connect_and_verify() {
        Ok(client) => client,
        Err(e) => {
            log::error!("forecast worker: database unavailable, worker exiting: {}", e);
            return;
        }
    };
    let http = match ingest::http_client(config.forecast.request_timeout_secs) {
        Ok(http) => http,
        Err(e) => {
            log::error!("forecast worker: HTTP client build failed, worker exiting: {}", e);
            return;
        }
    };
    let pool = ThreadPool::new(config.forecast.pool_workers);

    for job in rx.iter() {
        match job {
            Job::Forecast => {
                forecast::run(&mut client, &http, &pool, &config.forecast, &config.api);
            }
            other => log::error!("forecast worker received misrouted job {:?}", other),
        }
    }
}

fn current_worker(rx: Receiver<Job>, config: ServiceConfig) {
    let mut client = match db::connect_and_verify() {
        Ok(client) => client,
        Err(e) => {
            log::error!("current-conditions worker: database unavailable, worker exiting: {}", e);
            return;
        }
    };
    let http = match ingest::http_client(config.current.request_timeout_secs) {
        Ok(http) => http,
        Err(e) => {
            log::error!("current-conditions worker: HTTP client build failed, worker exiting: {}", e);
            return;
        }
    };
    let pool = ThreadPool::new(config.current.pool_workers);

    for job in rx.iter() {
        match job {
            Job::Current => {
                current::run(&mut client, &http, &pool, &config.current, &config.api);
            }
            other => log::error!("current-conditions worker received misrouted job {:?}", other),
        }
    }
}

// ---------------------------------------------------------------------------
// Tickers
// ---------------------------------------------------------------------------

/// Periodic trigger: submit the job, sleep the interval, repeat. The
/// first submission happens immediately so a freshly started daemon does
/// not wait a full interval for data.
fn spawn_ticker(name: &str, interval: Duration, job: Job, triggers: TriggerHandle) -> JoinHandle<()> {
    spawn_worker(name, move || loop {
        if triggers.submit(job).is_err() {
            log::warn!("ticker for {:?}: worker gone, stopping", job);
            return;
        }
        thread::sleep(interval);
    })
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub struct Scheduler {
    pub triggers: TriggerHandle,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Block until every worker thread exits (they normally never do).
    pub fn join(self) {
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

/// Start the three category workers and their interval tickers.
pub fn start(config: &ServiceConfig) -> Scheduler {
    let (telemetry_tx, telemetry_rx) = mpsc::channel();
    let (forecast_tx, forecast_rx) = mpsc::channel();
    let (current_tx, current_rx) = mpsc::channel();

    let triggers = TriggerHandle {
        telemetry_tx,
        forecast_tx,
        current_tx,
    };

    let mut workers = Vec::new();

    let worker_config = config.clone();
    workers.push(spawn_worker("telemetry-worker", move || {
        telemetry_worker(telemetry_rx, worker_config)
    }));
    let worker_config = config.clone();
    workers.push(spawn_worker("forecast-worker", move || {
        forecast_worker(forecast_rx, worker_config)
    }));
    let worker_config = config.clone();
    workers.push(spawn_worker("current-worker", move || {
        current_worker(current_rx, worker_config)
    }));

    workers.push(spawn_ticker(
        "telemetry-ticker",
        Duration::from_secs(config.telemetry.interval_minutes * 60),
        Job::TelemetryAll,
        triggers.clone(),
    ));
    workers.push(spawn_ticker(
        "forecast-ticker",
        Duration::from_secs(config.forecast.interval_minutes * 60),
        Job::Forecast,
        triggers.clone(),
    ));
    workers.push(spawn_ticker(
        "current-ticker",
        Duration::from_secs(config.current.interval_minutes * 60),
        Job::Current,
        triggers.clone(),
    ));

    Scheduler { triggers, workers }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handle() -> (TriggerHandle, Receiver<Job>, Receiver<Job>, Receiver<Job>) {
        let (telemetry_tx, telemetry_rx) = mpsc::channel();
        let (forecast_tx, forecast_rx) = mpsc::channel();
        let (current_tx, current_rx) = mpsc::channel();
        (
            TriggerHandle {
                telemetry_tx,
                forecast_tx,
                current_tx,
            },
            telemetry_rx,
            forecast_rx,
            current_rx,
        )
    }

    #[test]
    fn test_jobs_route_to_their_category_queue() {
        let (handle, telemetry_rx, forecast_rx, current_rx) = test_handle();

        handle.submit(Job::Hydro).expect("submit succeeds");
        handle.submit(Job::Forecast).expect("submit succeeds");
        handle.submit(Job::Current).expect("submit succeeds");
        handle.submit(Job::TelemetryAll).expect("submit succeeds");

        assert_eq!(telemetry_rx.try_recv().ok(), Some(Job::Hydro));
        assert_eq!(telemetry_rx.try_recv().ok(), Some(Job::TelemetryAll));
        assert_eq!(forecast_rx.try_recv().ok(), Some(Job::Forecast));
        assert_eq!(current_rx.try_recv().ok(), Some(Job::Current));
    }

    #[test]
    fn test_submit_fails_when_worker_is_gone() {
        let (handle, telemetry_rx, _forecast_rx, _current_rx) = test_handle();
        drop(telemetry_rx);

        assert!(
            handle.submit(Job::Synop).is_err(),
            "a dead worker must surface as a submission failure"
        );
        assert!(handle.submit(Job::Forecast).is_ok(), "other categories are unaffected");
    }

    #[test]
    fn test_queue_serializes_category_runs() {
        // Both trigger sources land on one queue; draining order is FIFO,
        // so two runs of one category can never interleave.
        let (handle, telemetry_rx, _f, _c) = test_handle();
        handle.submit(Job::Synop).unwrap();
        handle.submit(Job::Meteo).unwrap();

        let drained: Vec<Job> = telemetry_rx.try_iter().collect();
        assert_eq!(drained, vec![Job::Synop, Job::Meteo]);
    }
}
