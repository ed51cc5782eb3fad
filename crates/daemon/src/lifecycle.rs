// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use ferry_adapters::{
    GitMirror, GithubSink, RedmineOrigin, TracedMirror, TracedOrigin, TracedSink,
};
use ferry_core::{load_config, Config, ConfigError, ConfigHolder, ExecutorSettings, SystemClock};
use ferry_engine::{
    Dispatcher, InboundTrigger, IssueExecutor, MirrorExecutor, ReloadCoordinator, ReloadError,
    Scheduler, SyncStats,
};
use ferry_storage::{ErrorLog, Ledger, LedgerError, RunLog, WalError};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::server::AppState;

/// Executor with concrete adapter types (wrapped with tracing)
pub type DaemonExecutor = Dispatcher<
    TracedMirror<GitMirror>,
    TracedOrigin<RedmineOrigin>,
    TracedSink<GithubSink>,
    SystemClock,
>;

pub type DaemonScheduler = Scheduler<DaemonExecutor, SystemClock>;

/// Files the daemon keeps under `data_dir`
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub lock_path: PathBuf,
    pub ledger_path: PathBuf,
    pub errors_path: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            lock_path: data_dir.join("ferryd.pid"),
            ledger_path: data_dir.join("ledger.jsonl"),
            errors_path: data_dir.join("errors.jsonl"),
        }
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub paths: DataPaths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub listener: Option<TcpListener>,
    pub app: AppState<DaemonExecutor, SystemClock>,
    watcher: Option<JoinHandle<()>>,
}

impl DaemonState {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Begin polling the configuration file for changes
    pub fn start_watcher(&mut self) {
        let reload = Arc::clone(&self.app.reload);
        self.watcher = Some(tokio::spawn(async move { reload.watch().await }));
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop watching for configuration changes
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }

        // 2. Stop workers, letting in-flight runs finish within the grace period
        self.app.scheduler.stop().await;

        // 3. Remove PID file (lock is released when self.lock_file is dropped)
        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Error log error: {0}")]
    Wal(#[from] WalError),

    #[error("Reload error: {0}")]
    Reload(#[from] ReloadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read the configuration file named on the command line
pub fn load(config_path: &Path) -> Result<Config, LifecycleError> {
    Ok(load_config(config_path)?)
}

/// Start the daemon
pub async fn startup(config_path: &Path, config: Config) -> Result<DaemonState, LifecycleError> {
    let paths = DataPaths::new(&config.data_dir);
    match startup_inner(config_path, config, &paths).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(&paths, &e);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(
    config_path: &Path,
    config: Config,
    paths: &DataPaths,
) -> Result<DaemonState, LifecycleError> {
    // 1. Create data directory
    std::fs::create_dir_all(&config.data_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing one ledger
    let lock_file = acquire_lock(&paths.lock_path)?;

    // 3. Open durable logs
    let ledger = Arc::new(Ledger::open(&paths.ledger_path)?);
    let errors = Arc::new(ErrorLog::open(&paths.errors_path)?);
    let stats = SyncStats::collect(&ledger, &errors, Utc::now().date_naive())?;
    info!(
        total_synced = stats.total_synced,
        unresolved_errors = stats.unresolved_errors,
        "Loaded ledger"
    );
    reconcile_pending(&ledger);

    // 4. Set up adapters (wrapped with tracing for observability)
    let settings = ExecutorSettings::from_config(&config);
    let mirror = MirrorExecutor::new(
        TracedMirror::new(GitMirror::new(settings.git.clone())),
        SystemClock,
    );
    let issues = IssueExecutor::new(
        TracedOrigin::new(RedmineOrigin::new(settings.tracker.as_ref())),
        TracedSink::new(GithubSink::new(settings.remote.as_ref())),
        Arc::clone(&ledger),
        Arc::clone(&errors),
        &settings,
        SystemClock,
    );
    let dispatcher = Dispatcher::new(mirror, issues, RunLog::new(&settings.log_path));
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(dispatcher),
        SystemClock,
        config.shutdown_grace,
    ));

    // 5. Bind HTTP listener before any worker starts
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(addr.clone(), e))?;

    // 6. Start workers for the configured tasks
    let holder = Arc::new(ConfigHolder::new(config_path, config));
    let reload = Arc::new(ReloadCoordinator::new(
        Arc::clone(&holder),
        Arc::clone(&scheduler),
    ));
    let outcome = reload.start().await?;
    let inbound = Arc::new(InboundTrigger::new(holder, Arc::clone(&scheduler)));

    info!(
        tasks = outcome.report.added.len(),
        addr = %addr,
        "Daemon started"
    );

    Ok(DaemonState {
        paths: paths.clone(),
        lock_file,
        listener: Some(listener),
        app: AppState {
            scheduler,
            reload,
            inbound,
            ledger,
            errors,
            clock: SystemClock,
            started_at: Utc::now(),
        },
        watcher: None,
    })
}

/// Take the exclusive pid lock and write our PID into it
pub fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    use std::io::Write;

    // Open without truncating so a running daemon's PID survives a failed attempt
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Clean up resources on startup failure
fn cleanup_on_failure(paths: &DataPaths, error: &LifecycleError) {
    // Another daemon owns the PID file
    if matches!(error, LifecycleError::LockFailed(_)) {
        return;
    }
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

/// Report claims left pending by an interrupted run
fn reconcile_pending(ledger: &Ledger) {
    match ledger.pending() {
        Ok(pending) if pending.is_empty() => {}
        Ok(pending) => {
            warn!(
                "Found {} pending claims from a previous run (manual reconciliation required)",
                pending.len()
            );
            for record in &pending {
                warn!(
                    "  - item {} -> {} (task {}, claimed {})",
                    record.item_id, record.target, record.task, record.claimed_at
                );
            }
        }
        Err(e) => warn!(error = %e, "failed to read pending claims"),
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
