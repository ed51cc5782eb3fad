// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake mirror adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{MirrorError, MirrorSource};
use async_trait::async_trait;
use ferry_core::config::GitSettings;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded mirror call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorCall {
    Clone { url: String, local_path: PathBuf },
    Fetch { local_path: PathBuf },
}

#[derive(Default)]
struct FakeMirrorState {
    existing: HashSet<PathBuf>,
    calls: Vec<MirrorCall>,
    fetch_error: Option<String>,
    clone_error: Option<String>,
    fetch_output: String,
    delay: Option<Duration>,
    settings: Option<GitSettings>,
}

/// Fake mirror adapter for testing
#[derive(Clone, Default)]
pub struct FakeMirror {
    inner: Arc<Mutex<FakeMirrorState>>,
}

impl FakeMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend a mirror already exists at `path`
    pub fn add_existing(&self, path: impl Into<PathBuf>) {
        self.lock().existing.insert(path.into());
    }

    /// Make fetches fail with `output` until cleared
    pub fn fail_fetch(&self, output: Option<&str>) {
        self.lock().fetch_error = output.map(str::to_string);
    }

    pub fn fail_clone(&self, output: Option<&str>) {
        self.lock().clone_error = output.map(str::to_string);
    }

    /// Output returned by successful fetches
    pub fn set_fetch_output(&self, output: &str) {
        self.lock().fetch_output = output.to_string();
    }

    /// Make every call take `delay` (tokio time)
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<MirrorCall> {
        self.lock().calls.clone()
    }

    /// Settings from the last `configure` call
    pub fn settings(&self) -> Option<GitSettings> {
        self.lock().settings.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeMirrorState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn pause(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MirrorSource for FakeMirror {
    async fn exists(&self, local_path: &Path) -> bool {
        self.lock().existing.contains(local_path)
    }

    async fn clone_mirror(&self, url: &str, local_path: &Path) -> Result<String, MirrorError> {
        self.lock().calls.push(MirrorCall::Clone {
            url: url.to_string(),
            local_path: local_path.to_path_buf(),
        });
        self.pause().await;

        let mut state = self.lock();
        if let Some(output) = &state.clone_error {
            return Err(MirrorError::CommandFailed {
                command: "git clone --mirror".to_string(),
                status: "exit status: 128".to_string(),
                output: output.clone(),
            });
        }
        state.existing.insert(local_path.to_path_buf());
        Ok(String::new())
    }

    async fn fetch(&self, local_path: &Path) -> Result<String, MirrorError> {
        self.lock().calls.push(MirrorCall::Fetch {
            local_path: local_path.to_path_buf(),
        });
        self.pause().await;

        let state = self.lock();
        if let Some(output) = &state.fetch_error {
            return Err(MirrorError::CommandFailed {
                command: "git -C fetch".to_string(),
                status: "exit status: 128".to_string(),
                output: output.clone(),
            });
        }
        Ok(state.fetch_output.clone())
    }

    fn configure(&self, settings: &GitSettings) {
        self.lock().settings = Some(settings.clone());
    }
}
