// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote issue tracker adapters

mod github;

pub use github::GithubSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSink, SinkCall};

use async_trait::async_trait;
use ferry_core::config::RemoteEndpoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the remote issue tracker
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("remote tracker is not configured")]
    NotConfigured,
    #[error("repository not found or no permission: {0}")]
    TargetNotFound(String),
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote request failed: {0}")]
    Transport(String),
    #[error("failed to decode remote response: {0}")]
    Decode(String),
}

/// Item to create in the remote tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewItem {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Reference to a created remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItem {
    pub number: u64,
    pub url: String,
}

/// Adapter for the tracker that items are mirrored into
#[async_trait]
pub trait ItemSink: Clone + Send + Sync + 'static {
    /// Create an item in `target` (`owner/repo`)
    async fn create_item(&self, target: &str, item: &NewItem) -> Result<CreatedItem, SinkError>;

    /// Check that `target` exists and is writable
    async fn validate_target(&self, target: &str) -> Result<(), SinkError>;

    /// Apply new credentials; `None` disables the adapter
    fn configure(&self, _endpoint: Option<&RemoteEndpoint>) {}
}
