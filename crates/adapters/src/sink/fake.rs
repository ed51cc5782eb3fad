// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake item sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::github::issue_url;
use super::{CreatedItem, ItemSink, NewItem, SinkError};
use async_trait::async_trait;
use ferry_core::config::RemoteEndpoint;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded sink call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Create { target: String, item: NewItem },
    Validate { target: String },
}

#[derive(Default)]
struct FakeSinkState {
    next_number: u64,
    calls: Vec<SinkCall>,
    failures: HashMap<String, SinkError>,
    missing_targets: HashSet<String>,
    delay: Option<Duration>,
    configured_token: Option<String>,
}

/// Fake item sink that numbers created items sequentially
#[derive(Clone, Default)]
pub struct FakeSink {
    inner: Arc<Mutex<FakeSinkState>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make creations in `target` fail with `error`
    pub fn fail_target(&self, target: &str, error: SinkError) {
        self.lock().failures.insert(target.to_string(), error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Report `target` as missing from validation
    pub fn mark_missing(&self, target: &str) {
        self.lock().missing_targets.insert(target.to_string());
    }

    /// Make creations take `delay` (tokio time)
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.lock().calls.clone()
    }

    /// Items passed to successful or failed creations
    pub fn created(&self) -> Vec<(String, NewItem)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::Create { target, item } => Some((target.clone(), item.clone())),
                SinkCall::Validate { .. } => None,
            })
            .collect()
    }

    pub fn configured_token(&self) -> Option<String> {
        self.lock().configured_token.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeSinkState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ItemSink for FakeSink {
    async fn create_item(&self, target: &str, item: &NewItem) -> Result<CreatedItem, SinkError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(SinkCall::Create {
                target: target.to_string(),
                item: item.clone(),
            });
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(err) = state.failures.get(target) {
            return Err(err.clone());
        }
        state.next_number += 1;
        Ok(CreatedItem {
            number: state.next_number,
            url: issue_url("https://github.com", target, state.next_number),
        })
    }

    async fn validate_target(&self, target: &str) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Validate {
            target: target.to_string(),
        });
        if state.missing_targets.contains(target) {
            return Err(SinkError::TargetNotFound(target.to_string()));
        }
        Ok(())
    }

    fn configure(&self, endpoint: Option<&RemoteEndpoint>) {
        self.lock().configured_token = endpoint.map(|e| e.token.clone());
    }
}
