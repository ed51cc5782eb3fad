// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-day plain-text run log
//!
//! Each execution appends `[YYYY-MM-DD HH:MM:SS] [SUCCESS|FAILED] id: message`
//! to `{dir}/{kind}-{YYYY-MM-DD}.log`.

use ferry_core::{RunResult, TaskId};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Appends one line per execution to dated log files
#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that a result with this timestamp lands in
    pub fn file_for(&self, kind: &str, result: &RunResult) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.log",
            kind,
            result.timestamp.format("%Y-%m-%d")
        ))
    }

    pub fn append(&self, kind: &str, id: &TaskId, result: &RunResult) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(kind, result))?;
        let line = format!(
            "[{}] [{}] {}: {}\n",
            result.timestamp.format("%Y-%m-%d %H:%M:%S"),
            result.status_word(),
            id,
            result.message.replace('\n', " | ")
        );
        file.write_all(line.as_bytes())
    }
}
