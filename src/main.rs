//! Hydromet Service - Main Daemon
//!
//! A server-side daemon that continuously:
//! 1. Ingests bulk weather/hydro telemetry (IMGW synop, hydro, meteo)
//! 2. Auto-provisions stations on first sighting
//! 3. Fetches per-station forecasts and current conditions (Open-Meteo)
//!    under per-provider rate limits
//! 4. Persists only genuinely new data into PostgreSQL
//! 5. Provides HTTP endpoints to trigger any dataset on demand
//!
//! Usage:
//!   cargo run --release                    # Start daemon without HTTP endpoint
//!   cargo run --release -- --endpoint 8080 # Start with HTTP endpoint on port 8080
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string
//!   RUST_LOG     - log filter (default: info)

use hydromet_service::{config, db, endpoint, scheduler};
use std::env;

fn main() {
    println!("🌦  Hydromet Ingestion Service");
    println!("==============================\n");

    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut endpoint_port: Option<u16> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--endpoint" => {
                if i + 1 < args.len() {
                    endpoint_port = args[i + 1].parse().ok();
                    i += 2;
                } else {
                    eprintln!("Error: --endpoint requires a port number");
                    std::process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Usage: {} [--endpoint PORT]", args[0]);
                std::process::exit(1);
            }
        }
    }

    // Validate database connectivity and schema before spawning anything;
    // each worker opens its own connection later.
    println!("📊 Validating database...");
    match db::connect_and_verify() {
        Ok(_) => println!("✓ Database schema verified\n"),
        Err(e) => {
            eprintln!("\n❌ Database validation failed: {}\n", e);
            std::process::exit(1);
        }
    }

    let service_config = config::load();
    println!("⚙  Configuration:");
    println!(
        "   Telemetry: every {} min (timeout {}s)",
        service_config.telemetry.interval_minutes, service_config.telemetry.request_timeout_secs
    );
    println!(
        "   Forecast:  every {} min, batches of {}, pause {} ms",
        service_config.forecast.interval_minutes,
        service_config.forecast.batch_size,
        service_config.forecast.rate_limit_pause_ms
    );
    println!(
        "   Current:   every {} min, batches of {}, pause {} ms\n",
        service_config.current.interval_minutes,
        service_config.current.batch_size,
        service_config.current.rate_limit_pause_ms
    );

    // Start category workers and interval tickers
    println!("🔄 Starting ingestion workers...");
    let sched = scheduler::start(&service_config);
    println!("✓ Workers running\n");

    // Start HTTP endpoint if requested (in background thread)
    if let Some(port) = endpoint_port {
        println!("🚀 Starting HTTP endpoint server...");
        let triggers = sched.triggers.clone();
        std::thread::spawn(move || {
            if let Err(e) = endpoint::start_endpoint_server(port, triggers) {
                eprintln!("❌ Endpoint server error: {}", e);
            }
        });
        println!("   Endpoint running on http://0.0.0.0:{}", port);
        println!("   POST /ingest/{{telemetry|synop|hydro|meteo|forecast|current}}");
        println!("   GET  /health\n");
    }

    println!("   Press Ctrl+C to stop\n");

    // Workers run until the process is killed.
    sched.join();
}
