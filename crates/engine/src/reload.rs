// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration reloads from disk and from API pushes
//!
//! The watcher polls the configuration file and compares SHA-256
//! fingerprints of its content. A changed document is applied only after its
//! fingerprint has stayed the same for the debounce window. Invalid
//! documents never replace the live configuration.

use crate::error::ReloadError;
use crate::executor::SyncExecutor;
use crate::scheduler::{LoadReport, Scheduler};
use ferry_core::{parse_config, save_config, Clock, Config, ConfigError, ConfigHolder, ExecutorSettings};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// How often the watcher reads the configuration file
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Result of installing a configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadOutcome {
    #[serde(flatten)]
    pub report: LoadReport,
    /// Settings that only take effect after a daemon restart changed
    pub restart_required: bool,
}

/// Hex SHA-256 of a configuration document
pub fn fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Feeds configuration changes to the scheduler and executors
pub struct ReloadCoordinator<E, C> {
    holder: Arc<ConfigHolder>,
    scheduler: Arc<Scheduler<E, C>>,
    /// Fingerprint of the last document considered, valid or not
    seen: Mutex<Option<String>>,
    last_error: Mutex<Option<String>>,
    /// Serialises API pushes with reloads from disk
    applying: tokio::sync::Mutex<()>,
}

impl<E: SyncExecutor, C: Clock> ReloadCoordinator<E, C> {
    pub fn new(holder: Arc<ConfigHolder>, scheduler: Arc<Scheduler<E, C>>) -> Self {
        Self {
            holder,
            scheduler,
            seen: Mutex::new(None),
            last_error: Mutex::new(None),
            applying: tokio::sync::Mutex::new(()),
        }
    }

    pub fn holder(&self) -> &Arc<ConfigHolder> {
        &self.holder
    }

    /// Message of the last rejected document, cleared by a successful reload
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_seen(&self, fingerprint: Option<String>) {
        *self.seen.lock().unwrap_or_else(|e| e.into_inner()) = fingerprint;
    }

    fn is_seen(&self, fingerprint: &str) -> bool {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).as_deref() == Some(fingerprint)
    }

    fn set_error(&self, error: Option<String>) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = error;
    }

    /// Install the configuration already held, starting all workers
    pub async fn start(&self) -> Result<ReloadOutcome, ReloadError> {
        let _applying = self.applying.lock().await;
        let config = Config::clone(&self.holder.get());
        if let Ok(content) = read(self.holder.path()) {
            self.set_seen(Some(fingerprint(&content)));
        }
        self.install(config, false).await
    }

    /// Validate, save and apply a pushed configuration
    pub async fn apply(&self, config: Config) -> Result<ReloadOutcome, ReloadError> {
        let _applying = self.applying.lock().await;
        config.validate()?;
        save_config(self.holder.path(), &config)?;
        // The watcher must not re-apply the document just written
        if let Ok(content) = read(self.holder.path()) {
            self.set_seen(Some(fingerprint(&content)));
        }
        let outcome = self.install(config, true).await?;
        self.set_error(None);
        Ok(outcome)
    }

    /// Apply the file on disk if its content changed since last seen
    ///
    /// Returns `Ok(None)` when the content is unchanged. A rejected document
    /// is remembered, so it is reported once rather than on every poll.
    pub async fn reload_from_disk(&self) -> Result<Option<ReloadOutcome>, ReloadError> {
        let _applying = self.applying.lock().await;
        let path = self.holder.path();
        let content = read(path)?;
        let current = fingerprint(&content);
        if self.is_seen(&current) {
            return Ok(None);
        }
        self.set_seen(Some(current));

        let config = match parse_config(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "configuration rejected, keeping the live configuration"
                );
                self.set_error(Some(e.to_string()));
                return Err(e.into());
            }
        };
        let outcome = self.install(config, true).await?;
        self.set_error(None);
        tracing::info!(path = %path.display(), "configuration reloaded");
        Ok(Some(outcome))
    }

    async fn install(&self, config: Config, replace: bool) -> Result<ReloadOutcome, ReloadError> {
        let definitions = config.definitions()?;
        let previous = self.holder.get();
        let restart_required = replace && previous.http_port != config.http_port;
        if restart_required {
            tracing::warn!(
                from = previous.http_port,
                to = config.http_port,
                "http_port changed; restart the daemon to apply it"
            );
        }

        self.scheduler
            .executor()
            .update_settings(&ExecutorSettings::from_config(&config));
        self.scheduler.set_shutdown_grace(config.shutdown_grace).await;
        let report = self.scheduler.load(definitions).await?;
        if replace {
            self.holder.replace(config);
        }
        Ok(ReloadOutcome {
            report,
            restart_required,
        })
    }

    /// Poll the configuration file until the task is dropped
    pub async fn watch(&self) {
        let mut candidate: Option<(String, Instant)> = None;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let current = match read(self.holder.path()) {
                Ok(content) => fingerprint(&content),
                Err(e) => {
                    tracing::debug!(error = %e, "configuration file unreadable");
                    continue;
                }
            };
            if self.is_seen(&current) {
                candidate = None;
                continue;
            }

            let debounce = self.holder.get().reload_debounce;
            match &candidate {
                Some((pending, since)) if *pending == current => {
                    if since.elapsed() < debounce {
                        continue;
                    }
                }
                _ => {
                    tracing::debug!("configuration change detected");
                    candidate = Some((current, Instant::now()));
                    continue;
                }
            }

            candidate = None;
            // Errors were already logged and recorded
            let _ = self.reload_from_disk().await;
        }
    }
}

#[cfg(test)]
#[path = "reload_tests.rs"]
mod tests;
