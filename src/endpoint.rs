/// HTTP trigger endpoint.
///
/// A thin tiny_http server for operators and cron-like external tools:
///
/// - GET  /health            - service liveness check
/// - POST /ingest/telemetry  - run all three bulk telemetry datasets
/// - POST /ingest/synop      - run one bulk dataset
/// - POST /ingest/hydro
/// - POST /ingest/meteo
/// - POST /ingest/forecast   - run the forecast fan-out
/// - POST /ingest/current    - run the current-conditions fan-out
///
/// Triggers are submit-and-acknowledge: 202 means the job was enqueued,
/// nothing more. The run's success or failure is visible only in the
/// audit log and the process logs. 503 means the submission itself
/// failed because the category's worker is not running.

use crate::scheduler::{Job, TriggerHandle};
use tiny_http::Method;

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Health,
    Trigger(Job),
    MethodNotAllowed,
    NotFound,
}

fn trigger_job(path: &str) -> Option<Job> {
    match path {
        "/ingest/telemetry" => Some(Job::TelemetryAll),
        "/ingest/synop" => Some(Job::Synop),
        "/ingest/hydro" => Some(Job::Hydro),
        "/ingest/meteo" => Some(Job::Meteo),
        "/ingest/forecast" => Some(Job::Forecast),
        "/ingest/current" => Some(Job::Current),
        _ => None,
    }
}

fn job_name(job: Job) -> &'static str {
    match job {
        Job::TelemetryAll => "telemetry",
        Job::Synop => "synop",
        Job::Hydro => "hydro",
        Job::Meteo => "meteo",
        Job::Forecast => "forecast",
        Job::Current => "current",
    }
}

/// Resolve method + url to a route. Query strings are ignored.
pub fn route(method: &Method, url: &str) -> Route {
    let path = url.split('?').next().unwrap_or(url);

    if path == "/health" {
        return if *method == Method::Get {
            Route::Health
        } else {
            Route::MethodNotAllowed
        };
    }

    match trigger_job(path) {
        Some(job) => {
            if *method == Method::Post {
                Route::Trigger(job)
            } else {
                Route::MethodNotAllowed
            }
        }
        None => Route::NotFound,
    }
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

/// Start the endpoint server. Blocks the calling thread; run it in a
/// dedicated background thread.
pub fn start_endpoint_server(port: u16, triggers: TriggerHandle) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    log::info!("HTTP endpoint listening on http://0.0.0.0:{}", port);

    for request in server.incoming_requests() {
        let response = match route(request.method(), request.url()) {
            Route::Health => create_response(
                200,
                serde_json::json!({
                    "status": "ok",
                    "service": "hydromet_service",
                }),
            ),
            Route::Trigger(job) => match triggers.submit(job) {
                Ok(()) => create_response(
                    202,
                    serde_json::json!({
                        "status": "accepted",
                        "job": job_name(job),
                        "note": "outcome is reported via the import log",
                    }),
                ),
                Err(e) => create_response(
                    503,
                    serde_json::json!({
                        "error": e.to_string(),
                        "job": job_name(job),
                    }),
                ),
            },
            Route::MethodNotAllowed => create_response(
                405,
                serde_json::json!({
                    "error": "ingestion triggers require POST",
                }),
            ),
            Route::NotFound => create_response(
                404,
                serde_json::json!({
                    "error": "Not found",
                    "available_endpoints": [
                        "/health",
                        "/ingest/telemetry",
                        "/ingest/synop",
                        "/ingest/hydro",
                        "/ingest/meteo",
                        "/ingest/forecast",
                        "/ingest/current"
                    ],
                }),
            ),
        };

        if let Err(e) = request.respond(response) {
            log::error!("failed to send endpoint response: {}", e);
        }
    }

    Ok(())
}

fn create_response(
    status_code: u16,
    json: serde_json::Value,
) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let body = json.to_string();
    let bytes = body.into_bytes();

    tiny_http::Response::from_data(bytes)
        .with_status_code(tiny_http::StatusCode::from(status_code))
        .with_header(
            tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
        )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_is_a_get_route() {
        assert_eq!(route(&Method::Get, "/health"), Route::Health);
        assert_eq!(route(&Method::Post, "/health"), Route::MethodNotAllowed);
    }

    #[test]
    fn test_every_trigger_path_resolves_to_its_job() {
        assert_eq!(route(&Method::Post, "/ingest/telemetry"), Route::Trigger(Job::TelemetryAll));
        assert_eq!(route(&Method::Post, "/ingest/synop"), Route::Trigger(Job::Synop));
        assert_eq!(route(&Method::Post, "/ingest/hydro"), Route::Trigger(Job::Hydro));
        assert_eq!(route(&Method::Post, "/ingest/meteo"), Route::Trigger(Job::Meteo));
        assert_eq!(route(&Method::Post, "/ingest/forecast"), Route::Trigger(Job::Forecast));
        assert_eq!(route(&Method::Post, "/ingest/current"), Route::Trigger(Job::Current));
    }

    #[test]
    fn test_triggers_reject_get() {
        assert_eq!(route(&Method::Get, "/ingest/hydro"), Route::MethodNotAllowed);
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        assert_eq!(route(&Method::Post, "/ingest/unknown"), Route::NotFound);
        assert_eq!(route(&Method::Get, "/"), Route::NotFound);
    }

    #[test]
    fn test_query_string_is_ignored_for_routing() {
        assert_eq!(
            route(&Method::Post, "/ingest/forecast?source=manual"),
            Route::Trigger(Job::Forecast)
        );
    }
}
