/// Service configuration loader - parses service.toml
///
/// Separates tunables (poll intervals, batch sizes, rate-limit pauses,
/// provider URLs) from code so an operator can retune the service without
/// recompiling. Every knob has a default, so a missing file yields a
/// fully usable configuration.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Root configuration for the daemon.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub telemetry: TelemetryConfig,
    pub forecast: FanOutConfig,
    pub current: FanOutConfig,
    pub api: ApiConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            telemetry: TelemetryConfig::default(),
            forecast: FanOutConfig::forecast_defaults(),
            current: FanOutConfig::current_defaults(),
            api: ApiConfig::default(),
        }
    }
}

/// Bulk-poll telemetry category (synop + hydro + meteo).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// How often to poll the bulk telemetry endpoints, in minutes.
    pub interval_minutes: u64,
    /// Connect/read timeout for the bulk endpoints, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
            request_timeout_secs: 5,
        }
    }
}

/// A fan-out category (forecast or current conditions). The same shape
/// serves both; only the default values differ per section.
#[derive(Debug, Clone)]
pub struct FanOutConfig {
    /// How often to run this category, in minutes.
    pub interval_minutes: u64,
    /// Stations fetched concurrently per batch.
    pub batch_size: usize,
    /// Minimum wall-clock spacing between batch dispatches, in milliseconds.
    pub rate_limit_pause_ms: u64,
    /// Per-station request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Worker threads in this category's fetch pool.
    pub pool_workers: usize,
}

impl FanOutConfig {
    fn forecast_defaults() -> Self {
        Self {
            interval_minutes: 360,
            batch_size: 10,
            rate_limit_pause_ms: 1050,
            request_timeout_secs: 10,
            pool_workers: 4,
        }
    }

    fn current_defaults() -> Self {
        Self {
            interval_minutes: 60,
            batch_size: 7,
            rate_limit_pause_ms: 1100,
            request_timeout_secs: 8,
            pool_workers: 4,
        }
    }
}

/// Upstream provider endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the bulk telemetry API; the dataset name is appended.
    pub telemetry_base_url: String,
    /// Forecast API endpoint, queried once per station.
    pub forecast_url: String,
    /// Timezone requested from the forecast API; forecast timestamps are
    /// stored in this zone's local time.
    pub timezone: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            telemetry_base_url: "https://danepubliczne.imgw.pl/api/data".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timezone: "Europe/Warsaw".to_string(),
        }
    }
}

/// Loads service configuration from `service.toml` in the working
/// directory, falling back to defaults when the file is absent.
///
/// # Panics
/// Panics if the file exists but cannot be read or parsed. This is
/// intentional — a daemon started against a broken configuration must not
/// run with silently different tunables.
pub fn load() -> ServiceConfig {
    load_from(Path::new("service.toml"))
}

pub fn load_from(path: &Path) -> ServiceConfig {
    if !path.exists() {
        return ServiceConfig::default();
    }

    let contents = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));

    parse(&contents).unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e))
}

fn parse(contents: &str) -> Result<ServiceConfig, toml::de::Error> {
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct RawConfig {
        telemetry: TelemetryConfig,
        forecast: PartialFanOut,
        current: PartialFanOut,
        api: ApiConfig,
    }

    let raw: RawConfig = toml::from_str(contents)?;

    let mut forecast = FanOutConfig::forecast_defaults();
    raw.forecast.apply(&mut forecast);
    let mut current = FanOutConfig::current_defaults();
    raw.current.apply(&mut current);

    Ok(ServiceConfig {
        telemetry: raw.telemetry,
        forecast,
        current,
        api: raw.api,
    })
}

/// Per-section overrides; unset keys keep that section's defaults.
#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialFanOut {
    interval_minutes: Option<u64>,
    batch_size: Option<usize>,
    rate_limit_pause_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    pool_workers: Option<usize>,
}

impl PartialFanOut {
    fn apply(self, target: &mut FanOutConfig) {
        if let Some(v) = self.interval_minutes {
            target.interval_minutes = v;
        }
        if let Some(v) = self.batch_size {
            target.batch_size = v;
        }
        if let Some(v) = self.rate_limit_pause_ms {
            target.rate_limit_pause_ms = v;
        }
        if let Some(v) = self.request_timeout_secs {
            target.request_timeout_secs = v;
        }
        if let Some(v) = self.pool_workers {
            target.pool_workers = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
