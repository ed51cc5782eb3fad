// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime settings handed to executors and adapters
//!
//! Settings are derived from a validated [`Config`] on every reload and pushed
//! to running components without restarting workers. Credential values are
//! expanded from the environment (`${VAR}` / `${VAR:-default}`) here so the
//! saved configuration keeps the references rather than the secrets.

use super::{Config, OnErrorConfig};
use crate::template::expand_env;
use std::path::PathBuf;
use std::time::Duration;

/// Git transport settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    pub ssh_key_path: Option<PathBuf>,
    pub timeout: Duration,
}

/// Origin tracker endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct TrackerEndpoint {
    pub url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Remote issue tracker endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub api_url: String,
    pub web_url: String,
    pub token: String,
    pub timeout: Duration,
}

// Credentials stay out of debug output.
impl std::fmt::Debug for TrackerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerEndpoint")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl std::fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("api_url", &self.api_url)
            .field("web_url", &self.web_url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Issue synchronization policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    pub title_format: String,
    pub validate_targets: bool,
    pub on_error: OnErrorConfig,
    /// Base URL used for back-links to origin items
    pub tracker_url: String,
}

/// Everything executors need from the live configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub git: GitSettings,
    pub tracker: Option<TrackerEndpoint>,
    pub remote: Option<RemoteEndpoint>,
    pub sync: SyncPolicy,
    pub log_path: PathBuf,
}

impl ExecutorSettings {
    pub fn from_config(config: &Config) -> Self {
        let tracker = config.tracker.as_ref().map(|t| TrackerEndpoint {
            url: trim_slash(&expand_env(&t.url)),
            api_key: expand_env(&t.api_key),
            timeout: config.timeouts.remote,
        });
        let remote = config.remote.as_ref().map(|r| RemoteEndpoint {
            api_url: trim_slash(&expand_env(&r.api_url)),
            web_url: trim_slash(&expand_env(&r.web_url)),
            token: expand_env(&r.token),
            timeout: config.timeouts.remote,
        });
        let tracker_url = tracker.as_ref().map(|t| t.url.clone()).unwrap_or_default();

        Self {
            git: GitSettings {
                ssh_key_path: config.ssh_key_path.clone(),
                timeout: config.timeouts.fetch,
            },
            tracker,
            remote,
            sync: SyncPolicy {
                title_format: config.sync.title_format.clone(),
                validate_targets: config.sync.validate_targets,
                on_error: config.sync.on_error,
                tracker_url,
            },
            log_path: config.log_path.clone(),
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn trim_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
