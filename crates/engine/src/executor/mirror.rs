// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ferry_adapters::MirrorSource;
use ferry_core::config::GitSettings;
use ferry_core::{Clock, RunResult, TaskId};
use std::path::Path;

/// Keeps a local mirror of one repository current
pub struct MirrorExecutor<M, C> {
    mirror: M,
    clock: C,
}

impl<M: MirrorSource, C: Clock> MirrorExecutor<M, C> {
    pub fn new(mirror: M, clock: C) -> Self {
        Self { mirror, clock }
    }

    pub fn configure(&self, settings: &GitSettings) {
        self.mirror.configure(settings);
    }

    /// Clone when the mirror is missing, otherwise fetch
    pub async fn run(&self, id: &TaskId, url: &str, local_path: &Path) -> RunResult {
        if !self.mirror.exists(local_path).await {
            tracing::info!(task = %id, path = %local_path.display(), "mirror missing, cloning");
            return match self.mirror.clone_mirror(url, local_path).await {
                Ok(_) => RunResult::success("Successfully cloned as mirror repository", self.clock.now()),
                Err(e) => RunResult::failure(format!("clone failed: {}", e), self.clock.now()),
            };
        }

        match self.mirror.fetch(local_path).await {
            Ok(output) => {
                let message = if output.trim().is_empty() {
                    "Already up to date".to_string()
                } else {
                    output.trim().to_string()
                };
                RunResult::success(message, self.clock.now())
            }
            Err(e) => RunResult::failure(format!("fetch failed: {}", e), self.clock.now()),
        }
    }
}
