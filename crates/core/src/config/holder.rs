// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::Config;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// The live configuration and the file it was loaded from
///
/// Passed explicitly to every component that reads configuration. Readers get
/// a cheap snapshot; a reload swaps the whole document.
#[derive(Debug)]
pub struct ConfigHolder {
    path: PathBuf,
    current: RwLock<Arc<Config>>,
}

impl ConfigHolder {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the live configuration
    pub fn get(&self) -> Arc<Config> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Install a new configuration, returning the previous one
    pub fn replace(&self, config: Config) -> Arc<Config> {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, Arc::new(config))
    }
}
