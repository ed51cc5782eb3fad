// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable log of synchronization failures for operators

use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use ferry_core::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: u64,
    pub task: String,
    pub item_id: Option<ItemId>,
    pub message: String,
    pub at: DateTime<Utc>,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorOp {
    Recorded {
        id: u64,
        task: String,
        item_id: Option<ItemId>,
        message: String,
        at: DateTime<Utc>,
    },
    Resolved {
        id: u64,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
struct ErrorState {
    records: BTreeMap<u64, ErrorRecord>,
}

impl ErrorState {
    fn apply(&mut self, op: &ErrorOp) {
        match op {
            ErrorOp::Recorded {
                id,
                task,
                item_id,
                message,
                at,
            } => {
                self.records.insert(
                    *id,
                    ErrorRecord {
                        id: *id,
                        task: task.clone(),
                        item_id: *item_id,
                        message: message.clone(),
                        at: *at,
                        resolved: false,
                    },
                );
            }
            ErrorOp::Resolved { id, .. } => {
                if let Some(record) = self.records.get_mut(id) {
                    record.resolved = true;
                }
            }
        }
    }

    fn next_id(&self) -> u64 {
        self.records.keys().next_back().map(|id| id + 1).unwrap_or(1)
    }
}

struct Inner {
    wal: Wal<ErrorOp>,
    state: ErrorState,
}

fn catch_up(wal: &mut Wal<ErrorOp>, state: &mut ErrorState) -> Result<(), WalError> {
    for op in wal.read_new()? {
        state.apply(&op);
    }
    Ok(())
}

/// Append-only error log
pub struct ErrorLog {
    inner: Mutex<Inner>,
}

impl ErrorLog {
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let mut wal = Wal::open(path)?;
        let mut state = ErrorState::default();
        catch_up(&mut wal, &mut state)?;
        Ok(Self {
            inner: Mutex::new(Inner { wal, state }),
        })
    }

    fn with_locked<R>(
        &self,
        f: impl FnOnce(&mut Wal<ErrorOp>, &mut ErrorState) -> Result<R, WalError>,
    ) -> Result<R, WalError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let Inner { wal, state } = &mut *guard;
        wal.locked(|wal| {
            catch_up(wal, state)?;
            f(wal, state)
        })
    }

    /// Record a failure and return its entry
    pub fn record(
        &self,
        task: &str,
        item_id: Option<ItemId>,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<ErrorRecord, WalError> {
        self.with_locked(|wal, state| {
            let record = ErrorRecord {
                id: state.next_id(),
                task: task.to_string(),
                item_id,
                message: message.to_string(),
                at,
                resolved: false,
            };
            wal.append(&ErrorOp::Recorded {
                id: record.id,
                task: record.task.clone(),
                item_id,
                message: record.message.clone(),
                at,
            })?;
            catch_up(wal, state)?;
            Ok(record)
        })
    }

    /// Mark an error resolved; `None` when no such error exists
    pub fn resolve(&self, id: u64, at: DateTime<Utc>) -> Result<Option<ErrorRecord>, WalError> {
        self.with_locked(|wal, state| {
            match state.records.get(&id) {
                None => return Ok(None),
                Some(record) if record.resolved => return Ok(Some(record.clone())),
                Some(_) => {}
            }
            wal.append(&ErrorOp::Resolved { id, at })?;
            catch_up(wal, state)?;
            Ok(state.records.get(&id).cloned())
        })
    }

    /// Unresolved errors, newest first
    pub fn unresolved(&self) -> Result<Vec<ErrorRecord>, WalError> {
        self.with_locked(|_, state| {
            Ok(state
                .records
                .values()
                .rev()
                .filter(|r| !r.resolved)
                .cloned()
                .collect())
        })
    }

    pub fn unresolved_count(&self) -> Result<usize, WalError> {
        self.with_locked(|_, state| Ok(state.records.values().filter(|r| !r.resolved).count()))
    }
}

#[cfg(test)]
#[path = "error_log_tests.rs"]
mod tests;
