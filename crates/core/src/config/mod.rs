// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration document
//!
//! The configuration is a TOML file declaring repository mirrors, tracker
//! projects and service-level settings. Defaults are filled at parse time so
//! that a saved configuration always carries every setting explicitly.

mod error;
mod holder;
mod loader;
mod settings;
mod validate;

pub use error::ConfigError;
pub use holder::ConfigHolder;
pub use loader::{load_config, parse_config, render_config, save_config};
pub use settings::{ExecutorSettings, GitSettings, RemoteEndpoint, SyncPolicy, TrackerEndpoint};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_PORT: i64 = 8080;
pub const DEFAULT_TITLE_FORMAT: &str = "[Redmine #{id}] {subject}";
pub const DEFAULT_REMOTE_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REMOTE_WEB_URL: &str = "https://github.com";

/// Top-level configuration
///
/// Scalar settings come first so the rendered TOML keeps them above tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_http_port")]
    pub http_port: i64,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<PathBuf>,
    #[serde(default = "default_reload_debounce", with = "humantime_serde")]
    pub reload_debounce: Duration,
    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<TrackerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
    #[serde(default, rename = "repo", skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<RepoConfig>,
    #[serde(default, rename = "project", skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<ProjectConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            log_path: default_log_path(),
            data_dir: default_data_dir(),
            ssh_key_path: None,
            reload_debounce: default_reload_debounce(),
            shutdown_grace: default_shutdown_grace(),
            timeouts: TimeoutsConfig::default(),
            tracker: None,
            remote: None,
            sync: SyncConfig::default(),
            webhook: None,
            repos: Vec::new(),
            projects: Vec::new(),
        }
    }
}

impl Config {
    /// Webhook secret, if one is configured and non-empty
    pub fn webhook_secret(&self) -> Option<String> {
        self.webhook
            .as_ref()
            .and_then(|w| w.secret.as_deref())
            .map(crate::template::expand_env)
            .filter(|s| !s.is_empty())
    }
}

/// Per-call timeouts for external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch: Duration,
    #[serde(default = "default_remote_timeout", with = "humantime_serde")]
    pub remote: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            fetch: default_fetch_timeout(),
            remote: default_remote_timeout(),
        }
    }
}

/// A git repository to mirror
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub local_path: String,
    #[serde(default)]
    pub interval: String,
}

/// A tracker project whose issues are mirrored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub interval: String,
    /// Custom field holding the `owner/repo` target
    #[serde(default)]
    pub target_field: u32,
    /// Custom field receiving the created item's URL
    #[serde(default)]
    pub reference_field: u32,
}

/// Origin tracker credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

/// Remote issue tracker credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_remote_api_url")]
    pub api_url: String,
    #[serde(default = "default_remote_web_url")]
    pub web_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_remote_api_url(),
            web_url: default_remote_web_url(),
        }
    }
}

/// Issue synchronization policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_title_format")]
    pub title_format: String,
    #[serde(default)]
    pub validate_targets: bool,
    #[serde(default)]
    pub on_error: OnErrorConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            title_format: default_title_format(),
            validate_targets: false,
            on_error: OnErrorConfig::default(),
        }
    }
}

/// What to do when an item fails to sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnErrorConfig {
    /// Emit a warning for each failure; failures are always recorded
    #[serde(default = "default_true")]
    pub log: bool,
    /// Annotate the origin item with the failure
    #[serde(default)]
    pub add_note: bool,
}

impl Default for OnErrorConfig {
    fn default() -> Self {
        Self {
            log: true,
            add_note: false,
        }
    }
}

/// Inbound notification settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

fn default_http_port() -> i64 {
    DEFAULT_HTTP_PORT
}

fn default_log_path() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_reload_debounce() -> Duration {
    Duration::from_millis(500)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_remote_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_remote_api_url() -> String {
    DEFAULT_REMOTE_API_URL.to_string()
}

fn default_remote_web_url() -> String {
    DEFAULT_REMOTE_WEB_URL.to_string()
}

fn default_title_format() -> String {
    DEFAULT_TITLE_FORMAT.to_string()
}

fn default_true() -> bool {
    true
}
