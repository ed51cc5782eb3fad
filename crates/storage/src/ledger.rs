// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency ledger: origin item → external item
//!
//! An item is claimed before the external item is created and completed
//! afterwards. A claim is an insert-or-no-op performed under the log's file
//! lock, so two processes (or two handles) never both acquire the same item.
//! A claim is released only when creation is known to have failed; a claim
//! left behind by a crash stays pending until an operator reconciles it.

use crate::wal::{Wal, WalError};
use chrono::{DateTime, NaiveDate, Utc};
use ferry_core::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error("item {0} has no pending claim")]
    NotClaimed(ItemId),
}

/// Durable ledger mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerOp {
    Claimed {
        item_id: ItemId,
        task: String,
        target: String,
        at: DateTime<Utc>,
    },
    Completed {
        item_id: ItemId,
        number: u64,
        url: String,
        at: DateTime<Utc>,
    },
    Released {
        item_id: ItemId,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Claimed; external creation in progress or outcome unknown
    Pending,
    /// External item created and linked
    Synced,
}

/// One origin item's ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub item_id: ItemId,
    pub task: String,
    pub target: String,
    pub status: RecordStatus,
    pub number: Option<u64>,
    pub url: Option<String>,
    pub claimed_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Outcome of [`Ledger::claim`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// This caller owns the item and must complete or release it
    Acquired,
    AlreadySynced(LedgerRecord),
    InFlight(LedgerRecord),
}

/// Ledger counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_synced: usize,
    pub synced_today: usize,
    pub pending: usize,
}

/// Records materialized from ledger operations
#[derive(Debug, Default)]
struct LedgerState {
    records: HashMap<ItemId, LedgerRecord>,
}

impl LedgerState {
    fn apply(&mut self, op: &LedgerOp) {
        match op {
            LedgerOp::Claimed {
                item_id,
                task,
                target,
                at,
            } => {
                // A claim never replaces an existing record
                self.records.entry(*item_id).or_insert_with(|| LedgerRecord {
                    item_id: *item_id,
                    task: task.clone(),
                    target: target.clone(),
                    status: RecordStatus::Pending,
                    number: None,
                    url: None,
                    claimed_at: *at,
                    synced_at: None,
                });
            }
            LedgerOp::Completed {
                item_id,
                number,
                url,
                at,
            } => {
                if let Some(record) = self.records.get_mut(item_id) {
                    record.status = RecordStatus::Synced;
                    record.number = Some(*number);
                    record.url = Some(url.clone());
                    record.synced_at = Some(*at);
                }
            }
            LedgerOp::Released { item_id, .. } => {
                if self
                    .records
                    .get(item_id)
                    .is_some_and(|r| r.status == RecordStatus::Pending)
                {
                    self.records.remove(item_id);
                }
            }
        }
    }
}

struct Inner {
    wal: Wal<LedgerOp>,
    state: LedgerState,
}

/// Apply operations appended since the last read
fn catch_up(wal: &mut Wal<LedgerOp>, state: &mut LedgerState) -> Result<(), WalError> {
    for op in wal.read_new()? {
        state.apply(&op);
    }
    Ok(())
}

/// Append `op` and apply it through the log
fn commit(
    wal: &mut Wal<LedgerOp>,
    state: &mut LedgerState,
    op: &LedgerOp,
) -> Result<(), WalError> {
    wal.append(op)?;
    catch_up(wal, state)
}

fn is_pending(state: &LedgerState, item_id: ItemId) -> bool {
    state
        .records
        .get(&item_id)
        .is_some_and(|r| r.status == RecordStatus::Pending)
}

/// Durable idempotency ledger
pub struct Ledger {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl Ledger {
    /// Open the ledger at `path`, replaying existing records
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let mut wal = Wal::open(path)?;
        let mut state = LedgerState::default();
        catch_up(&mut wal, &mut state)?;
        tracing::debug!(
            path = %path.display(),
            records = state.records.len(),
            "ledger opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { wal, state }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` under the file lock after catching up with other writers
    fn with_locked<R>(
        &self,
        f: impl FnOnce(&mut Wal<LedgerOp>, &mut LedgerState) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let Inner { wal, state } = &mut *guard;
        wal.locked(|wal| {
            catch_up(wal, state)?;
            f(wal, state)
        })
    }

    /// Atomically claim an item unless a record already exists
    pub fn claim(
        &self,
        item_id: ItemId,
        task: &str,
        target: &str,
        at: DateTime<Utc>,
    ) -> Result<Claim, LedgerError> {
        self.with_locked(|wal, state| {
            if let Some(existing) = state.records.get(&item_id) {
                return Ok(match existing.status {
                    RecordStatus::Synced => Claim::AlreadySynced(existing.clone()),
                    RecordStatus::Pending => Claim::InFlight(existing.clone()),
                });
            }
            commit(wal, state, &LedgerOp::Claimed {
                item_id,
                task: task.to_string(),
                target: target.to_string(),
                at,
            })?;
            Ok(Claim::Acquired)
        })
    }

    /// Mark a claimed item as synced
    pub fn complete(
        &self,
        item_id: ItemId,
        number: u64,
        url: &str,
        at: DateTime<Utc>,
    ) -> Result<LedgerRecord, LedgerError> {
        self.with_locked(|wal, state| {
            if !is_pending(state, item_id) {
                return Err(LedgerError::NotClaimed(item_id));
            }
            commit(wal, state, &LedgerOp::Completed {
                item_id,
                number,
                url: url.to_string(),
                at,
            })?;
            state
                .records
                .get(&item_id)
                .cloned()
                .ok_or(LedgerError::NotClaimed(item_id))
        })
    }

    /// Drop a pending claim after a failed creation
    ///
    /// Synced records are never released.
    pub fn release(&self, item_id: ItemId, at: DateTime<Utc>) -> Result<(), LedgerError> {
        self.with_locked(|wal, state| {
            if !is_pending(state, item_id) {
                return Err(LedgerError::NotClaimed(item_id));
            }
            commit(wal, state, &LedgerOp::Released { item_id, at })?;
            Ok(())
        })
    }

    /// Current record for an item, including records written by other handles
    pub fn get(&self, item_id: ItemId) -> Result<Option<LedgerRecord>, LedgerError> {
        self.with_locked(|_, state| Ok(state.records.get(&item_id).cloned()))
    }

    /// Pending claims, oldest first
    pub fn pending(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.with_locked(|_, state| {
            let mut pending: Vec<_> = state
                .records
                .values()
                .filter(|r| r.status == RecordStatus::Pending)
                .cloned()
                .collect();
            pending.sort_by_key(|r| (r.claimed_at, r.item_id));
            Ok(pending)
        })
    }

    /// Synced totals; `today` is the calendar day (UTC) counted as today
    pub fn stats(&self, today: NaiveDate) -> Result<LedgerStats, LedgerError> {
        self.with_locked(|_, state| {
            let mut stats = LedgerStats::default();
            for record in state.records.values() {
                match record.status {
                    RecordStatus::Pending => stats.pending += 1,
                    RecordStatus::Synced => {
                        stats.total_synced += 1;
                        if record.synced_at.is_some_and(|at| at.date_naive() == today) {
                            stats.synced_today += 1;
                        }
                    }
                }
            }
            Ok(stats)
        })
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
