// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git mirror adapters

mod git;

pub use git::GitMirror;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMirror, MirrorCall};

use async_trait::async_trait;
use ferry_core::config::GitSettings;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from mirror operations
///
/// Failures carry the raw command output so it reaches run results and logs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("{command} failed: {status}\nOutput: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },
    #[error("{command} timed out after {after:?}")]
    TimedOut { command: String, after: Duration },
    #[error("failed to run {command}: {reason}")]
    Spawn { command: String, reason: String },
}

/// Adapter for keeping local mirrors of remote repositories
#[async_trait]
pub trait MirrorSource: Clone + Send + Sync + 'static {
    /// Whether a local mirror already exists at `local_path`
    async fn exists(&self, local_path: &Path) -> bool;

    /// Full initial transfer into `local_path`
    async fn clone_mirror(&self, url: &str, local_path: &Path) -> Result<String, MirrorError>;

    /// Incremental update of an existing mirror
    async fn fetch(&self, local_path: &Path) -> Result<String, MirrorError>;

    /// Apply new transport settings; later calls use them
    fn configure(&self, _settings: &GitSettings) {}
}
