// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSON-lines log shared between processes
//!
//! Every mutation is one line `{"seq":N,"op":{...}}`. Readers keep a byte
//! offset and catch up incrementally, so several handles (in one or many
//! processes) converge on the same sequence of operations. Mutations run
//! under an exclusive file lock: catch up, decide, append, catch up again.

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write-ahead log of operations of type `Op`
pub struct Wal<Op> {
    path: PathBuf,
    file: File,
    sequence: u64,
    offset: u64,
    torn: bool,
    _op: PhantomData<fn() -> Op>,
}

impl<Op: Serialize + DeserializeOwned> Wal<Op> {
    /// Open or create a WAL at the given path
    ///
    /// Nothing is read yet; call [`Wal::read_new`] to replay.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let io_err = |source| WalError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)
            .map_err(io_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sequence: 0,
            offset: 0,
            torn: false,
            _op: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest sequence number seen so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Run `f` while holding the exclusive file lock
    pub fn locked<R, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<R, E>) -> Result<R, E>
    where
        E: From<WalError>,
    {
        FileExt::lock_exclusive(&self.file).map_err(|source| WalError::Lock {
            path: self.path.clone(),
            source,
        })?;
        let result = f(self);
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to unlock log");
        }
        result
    }

    /// Read operations appended since the last call
    ///
    /// A trailing line without a newline is left for a later call. Lines
    /// that do not parse are skipped with a warning.
    pub fn read_new(&mut self) -> Result<Vec<Op>, WalError> {
        let io_err = |source| WalError::Io {
            path: self.path.clone(),
            source,
        };
        let mut reader = File::open(&self.path).map_err(io_err)?;
        reader.seek(SeekFrom::Start(self.offset)).map_err(io_err)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(io_err)?;

        let complete = bytes
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        let mut ops = Vec::new();
        for line in bytes[..complete].split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<WalEntry<Op>>(line) {
                Ok(entry) => {
                    self.sequence = self.sequence.max(entry.seq);
                    ops.push(entry.op);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "skipping unreadable log line"
                    );
                }
            }
        }

        self.offset += complete as u64;
        self.torn = complete < bytes.len();
        Ok(ops)
    }

    /// Append an operation to the log
    ///
    /// Callers hold the lock and have caught up with [`Wal::read_new`] so
    /// the sequence number is current.
    pub fn append(&mut self, op: &Op) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            op,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        if self.torn {
            // Terminate a fragment left by a crashed writer
            line.insert(0, '\n');
        }

        let io_err = |source| WalError::Io {
            path: self.path.clone(),
            source,
        };
        self.file.write_all(line.as_bytes()).map_err(io_err)?;
        self.file.sync_data().map_err(io_err)?;
        Ok(entry.seq)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WalEntry<Op> {
    seq: u64,
    op: Op,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
