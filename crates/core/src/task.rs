// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identities and immutable task definitions
//!
//! A task definition is produced by configuration load and is replaced
//! wholesale on every reload. The identity is the join key used by the
//! scheduler, the executors and the idempotency ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted task identity
pub const MAX_TASK_ID_LEN: usize = 64;

/// Unique identifier for a schedulable task
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the identity is usable as a key and as a URL path segment
    pub fn validate(&self) -> Result<(), String> {
        if self.0.is_empty() {
            return Err("identity must not be empty".to_string());
        }
        if self.0.chars().count() > MAX_TASK_ID_LEN {
            return Err(format!(
                "identity '{}' is longer than {} characters",
                self.0, MAX_TASK_ID_LEN
            ));
        }
        if self.0.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(format!(
                "identity '{}' must not contain whitespace or '/'",
                self.0
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Origin item identifier (tracker issue number)
pub type ItemId = u64;

/// What a task synchronizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// Mirror a git repository into a local path
    Mirror { url: String, local_path: PathBuf },
    /// Mirror tracker issues of one project into a remote issue tracker
    Issues {
        project: String,
        target_field: u32,
        reference_field: u32,
    },
}

impl TaskKind {
    /// Short name used for log files and status output
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Mirror { .. } => "mirror",
            TaskKind::Issues { .. } => "issues",
        }
    }
}

/// Immutable per-reload definition of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: TaskId,
    #[serde(flatten)]
    pub kind: TaskKind,
    /// Repeat interval between the end of one run and the start of the next
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Interval as written in the configuration
    pub interval_text: String,
}

impl TaskDefinition {
    pub fn mirror(
        id: impl Into<TaskId>,
        url: impl Into<String>,
        local_path: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            kind: TaskKind::Mirror {
                url: url.into(),
                local_path: local_path.into(),
            },
            interval,
            interval_text: humantime::format_duration(interval).to_string(),
        }
    }

    pub fn issues(
        id: impl Into<TaskId>,
        project: impl Into<String>,
        target_field: u32,
        reference_field: u32,
        interval: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            kind: TaskKind::Issues {
                project: project.into(),
                target_field,
                reference_field,
            },
            interval,
            interval_text: humantime::format_duration(interval).to_string(),
        }
    }
}

/// How much work one execution covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    /// Everything the task is responsible for
    Full,
    /// A single origin item (inbound notification)
    Item(ItemId),
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncScope::Full => write!(f, "full"),
            SyncScope::Item(id) => write!(f, "item:{}", id),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
