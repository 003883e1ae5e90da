//! CLI entry point for the schedule server.
//!
//! Provides subcommands for serving per-route schedules over HTTP with a
//! selectable index backend, and for exporting one JSON file per route for a
//! static file server.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gtfs_schedule_server::backend::{self, BackendKind};
use gtfs_schedule_server::export::export_routes;
use gtfs_schedule_server::index::ScheduleIndex;
use gtfs_schedule_server::metrics::RequestMetrics;
use gtfs_schedule_server::server::{self, AppState};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_schedule_server")]
#[command(about = "Serve per-route transit schedules from GTFS tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve schedules over HTTP
    Serve {
        /// Path to the trip table
        #[arg(long, default_value = "data/trips.txt")]
        trips: PathBuf,

        /// Path to the stop-time table
        #[arg(long, default_value = "data/stop_times.txt")]
        stop_times: PathBuf,

        /// Index backend to serve from
        #[arg(short, long, value_enum, default_value = "precompute-bytes")]
        backend: BackendKind,

        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:4000")]
        bind: String,

        /// Number of request worker threads
        #[arg(short, long, default_value_t = 6)]
        workers: usize,
    },
    /// Write one JSON file per route for a static file server
    Export {
        /// Path to the trip table
        #[arg(long, default_value = "data/trips.txt")]
        trips: PathBuf,

        /// Path to the stop-time table
        #[arg(long, default_value = "data/stop_times.txt")]
        stop_times: PathBuf,

        /// Directory to write the per-route JSON files into
        #[arg(short, long, default_value = "schedules")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            trips,
            stop_times,
            backend,
            bind,
            workers,
        } => {
            // The backend is fully built before the listener binds; requests
            // are never accepted against a partially built index.
            let started = Instant::now();
            let backend = backend::build(backend, &trips, &stop_times)?;
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                backend = backend.name(),
                "total startup time"
            );

            let state = AppState {
                backend,
                metrics: Arc::new(RequestMetrics::default()),
            };

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(workers)
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(&bind, state))
        }
        Commands::Export {
            trips,
            stop_times,
            output_dir,
        } => {
            let started = Instant::now();
            let (trips, stop_times) = backend::decode_tables(&trips, &stop_times)?;
            let index = ScheduleIndex::build(&trips, &stop_times);
            let written = export_routes(&index, &output_dir)?;
            info!(
                written,
                elapsed_ms = started.elapsed().as_millis() as u64,
                output_dir = %output_dir.display(),
                "total generation time"
            );
            Ok(())
        }
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gtfs_schedule_server.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_schedule_server.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}
