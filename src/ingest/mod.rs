/// Provider API clients.
///
/// One file per upstream source: `imgw` for the bulk telemetry endpoints,
/// `open_meteo` for the per-coordinate forecast endpoint. `fixtures` holds
/// representative JSON payloads for the parser tests.

pub mod fixtures;
pub mod imgw;
pub mod open_meteo;

use std::time::Duration;

/// Build a blocking HTTP client with the category's connect/read timeout.
/// Each dataset category owns one client, constructed at worker startup.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("hydromet_service/", env!("CARGO_PKG_VERSION")))
        .build()
}
