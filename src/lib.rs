/// hydromet_service: weather and hydrological telemetry ingestion service.
///
/// # Module structure
///
/// ```text
/// hydromet_service
/// ├── model       — shared data types (StationRecord, readings, IngestError, …)
/// ├── config      — service tunables loader (service.toml)
/// ├── db          — PostgreSQL connectivity + schema verification
/// ├── catalog     — station registry: batched resolve + auto-provisioning
/// ├── merge       — is-newer predicates and upsert planning
/// ├── ratelimit   — inter-batch pacing for fan-out runs
/// ├── audit       — import_log writer (one row per run)
/// ├── ingest
/// │   ├── imgw       — IMGW bulk telemetry API: DTOs + defensive parsing
/// │   ├── open_meteo — Open-Meteo forecast API: URLs + array mapping
/// │   └── fixtures (test only) — representative API response payloads
/// ├── sync
/// │   ├── bulk      — generic bulk-poll engine (one call, all stations)
/// │   ├── telemetry — synop/hydro/meteo datasets over bulk
/// │   ├── fanout    — generic batched fan-out engine (one call per station)
/// │   ├── forecast  — hourly forecast upserts over fanout
/// │   └── current   — virtual-station current conditions over fanout
/// ├── scheduler   — category workers, interval tickers, trigger handle
/// └── endpoint    — HTTP health + fire-and-forget ingestion triggers
/// ```

/// Public modules
pub mod audit;
pub mod catalog;
pub mod config;
pub mod db;
pub mod endpoint;
pub mod ingest;
pub mod merge;
pub mod model;
pub mod ratelimit;
pub mod scheduler;
pub mod sync;
