// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outcome of one synchronization run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of executing one task once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl RunResult {
    pub fn success(message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            message: message.into(),
            timestamp,
        }
    }

    pub fn failure(message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            message: message.into(),
            timestamp,
        }
    }

    /// Status word written to run logs
    pub fn status_word(&self) -> &'static str {
        if self.success {
            "SUCCESS"
        } else {
            "FAILED"
        }
    }
}

/// Per-item tally for runs that touch several origin items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTally {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ItemTally {
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Synced => self.synced += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} synced, {} skipped, {} failed",
            self.synced, self.skipped, self.failed
        )
    }
}

/// What happened to one origin item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// External item created and recorded
    Synced,
    /// Nothing to do (no target, or already recorded)
    Skipped,
    /// The attempt failed and will be retried on a later run
    Failed,
}
