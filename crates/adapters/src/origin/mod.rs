// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Origin tracker adapters

mod redmine;

pub use redmine::RedmineOrigin;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeOrigin, OriginCall};

use async_trait::async_trait;
use ferry_core::config::TrackerEndpoint;
use ferry_core::{Item, ItemId};
use thiserror::Error;

/// Errors from origin tracker calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("tracker is not configured")]
    NotConfigured,
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error("tracker returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("tracker request failed: {0}")]
    Transport(String),
    #[error("failed to decode tracker response: {0}")]
    Decode(String),
}

/// Adapter for the tracker that items originate from
#[async_trait]
pub trait OriginSource: Clone + Send + Sync + 'static {
    /// Items of `project` whose target field is set and reference field empty
    async fn list_pending_items(
        &self,
        project: &str,
        target_field: u32,
        reference_field: u32,
    ) -> Result<Vec<Item>, OriginError>;

    async fn get_item(&self, id: ItemId) -> Result<Item, OriginError>;

    /// Store the external item's reference in a custom field
    async fn write_back_reference(
        &self,
        id: ItemId,
        field: u32,
        value: &str,
    ) -> Result<(), OriginError>;

    /// Add a note to the item's history
    async fn annotate(&self, id: ItemId, note: &str) -> Result<(), OriginError>;

    /// Apply new credentials; `None` disables the adapter
    fn configure(&self, _endpoint: Option<&TrackerEndpoint>) {}
}
