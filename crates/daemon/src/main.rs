// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ferry Daemon (ferryd)
//!
//! Background process that mirrors repositories and synchronizes issues on
//! a schedule, and serves the HTTP control surface.

use std::path::{Path, PathBuf};

use ferry_daemon::lifecycle::{self, LifecycleError};
use ferry_daemon::server;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{error, info};

/// Log file name under the configured `log_path`
const LOG_FILE: &str = "ferryd.log";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ferry.toml"));

    // Load configuration (fatal at startup)
    let config = match lifecycle::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ferryd: {}", e);
            return Err(e.into());
        }
    };
    let log_path = config.log_path.clone();

    // Write startup marker to log (before tracing setup, so operators can find it)
    write_startup_marker(&log_path)?;

    // Set up logging
    let log_guard = setup_logging(&log_path)?;

    info!("Starting ferryd with config {}", config_path.display());

    // Start daemon
    let mut daemon = match lifecycle::startup(&config_path, config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&log_path, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let sigterm = signal(SignalKind::terminate())?;
    let sigint = signal(SignalKind::interrupt())?;

    let Some(listener) = daemon.listener.take() else {
        return Err("listener already taken".into());
    };
    if let Ok(addr) = listener.local_addr() {
        info!("Daemon ready, listening on {}", addr);
    }
    daemon.start_watcher();

    // Signal ready for parent process (e.g., systemd)
    println!("READY");

    let app = server::router(daemon.app.clone());
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sigterm, sigint))
        .await
    {
        error!("HTTP server error: {}", e);
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}

async fn shutdown_signal(mut sigterm: Signal, mut sigint: Signal) {
    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- ferryd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- ferryd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(log_dir: &Path) -> Result<(), LifecycleError> {
    use std::io::Write;

    std::fs::create_dir_all(log_dir)?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(log_dir: &Path, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    log_dir: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(log_dir)?;

    // Set up file appender
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
