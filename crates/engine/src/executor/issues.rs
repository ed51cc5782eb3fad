// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mirrors origin items into the remote tracker exactly once
//!
//! Per item: resolve the target, claim the item in the ledger, create the
//! remote item, complete the ledger record, then write the reference back to
//! the origin. The claim is what prevents duplicates: a crash between
//! creation and completion leaves a pending claim, never a second item.
//!
//! Ledger and error log calls run on the blocking pool: both take a file
//! lock that another process may be holding.

use super::render::{is_repo_slug, labels_for, render_body, render_title};
use chrono::NaiveDate;
use ferry_adapters::{ItemSink, NewItem, OriginSource};
use ferry_core::config::SyncPolicy;
use ferry_core::{
    Clock, ExecutorSettings, Item, ItemId, ItemOutcome, ItemTally, RunResult, TaskId,
};
use ferry_storage::{Claim, ErrorLog, Ledger, LedgerError};
use serde::Serialize;
use std::fmt::Display;
use std::sync::{Arc, RwLock};

/// Ledger and error log counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub total_synced: usize,
    pub synced_today: usize,
    pub pending_claims: usize,
    pub unresolved_errors: usize,
}

impl SyncStats {
    /// Read counters from a ledger and an error log; `today` is a UTC date
    pub fn collect(ledger: &Ledger, errors: &ErrorLog, today: NaiveDate) -> Result<Self, LedgerError> {
        let stats = ledger.stats(today)?;
        Ok(Self {
            total_synced: stats.total_synced,
            synced_today: stats.synced_today,
            pending_claims: stats.pending,
            unresolved_errors: errors.unresolved_count()?,
        })
    }
}

/// Issue synchronization executor
pub struct IssueExecutor<O, S, C> {
    origin: O,
    sink: S,
    ledger: Arc<Ledger>,
    errors: Arc<ErrorLog>,
    policy: RwLock<SyncPolicy>,
    clock: C,
}

impl<O, S, C> IssueExecutor<O, S, C>
where
    O: OriginSource,
    S: ItemSink,
    C: Clock,
{
    pub fn new(
        origin: O,
        sink: S,
        ledger: Arc<Ledger>,
        errors: Arc<ErrorLog>,
        settings: &ExecutorSettings,
        clock: C,
    ) -> Self {
        origin.configure(settings.tracker.as_ref());
        sink.configure(settings.remote.as_ref());
        Self {
            origin,
            sink,
            ledger,
            errors,
            policy: RwLock::new(settings.sync.clone()),
            clock,
        }
    }

    /// Push new credentials and policy to this executor and its adapters
    pub fn configure(&self, settings: &ExecutorSettings) {
        self.origin.configure(settings.tracker.as_ref());
        self.sink.configure(settings.remote.as_ref());
        *self.policy.write().unwrap_or_else(|e| e.into_inner()) = settings.sync.clone();
    }

    fn policy(&self) -> SyncPolicy {
        self.policy.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Sync every pending item of `project`
    pub async fn run_full(
        &self,
        task: &TaskId,
        project: &str,
        (target_field, reference_field): (u32, u32),
    ) -> RunResult {
        let policy = self.policy();
        let items = match self
            .origin
            .list_pending_items(project, target_field, reference_field)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                let message = format!("failed to list pending items: {}", e);
                self.record_error(task, None, &message, &policy).await;
                return RunResult::failure(message, self.clock.now());
            }
        };

        if items.is_empty() {
            tracing::info!(task = %task, project, "no new items to sync");
            return RunResult::success("no new items", self.clock.now());
        }
        tracing::info!(task = %task, project, count = items.len(), "found items to sync");

        let mut tally = ItemTally::default();
        for item in &items {
            let outcome = self
                .sync_item(task, item, target_field, reference_field, &policy)
                .await;
            tally.record(outcome);
        }

        self.log_stats().await;
        let message = format!("{} pending: {}", items.len(), tally.summary());
        if tally.failed == 0 {
            RunResult::success(message, self.clock.now())
        } else {
            RunResult::failure(message, self.clock.now())
        }
    }

    /// Sync a single item by id
    pub async fn run_item(
        &self,
        task: &TaskId,
        item_id: ItemId,
        (target_field, reference_field): (u32, u32),
    ) -> RunResult {
        let policy = self.policy();
        let item = match self.origin.get_item(item_id).await {
            Ok(item) => item,
            Err(e) => {
                let message = format!("failed to fetch item {}: {}", item_id, e);
                self.record_error(task, Some(item_id), &message, &policy).await;
                return RunResult::failure(message, self.clock.now());
            }
        };

        if !item.field(reference_field).is_blank() {
            return RunResult::success(
                format!("item {} already linked", item_id),
                self.clock.now(),
            );
        }

        let outcome = self
            .sync_item(task, &item, target_field, reference_field, &policy)
            .await;
        let message = match outcome {
            ItemOutcome::Synced => format!("item {} synced", item_id),
            ItemOutcome::Skipped => format!("item {} skipped", item_id),
            ItemOutcome::Failed => format!("item {} failed", item_id),
        };
        if outcome == ItemOutcome::Failed {
            RunResult::failure(message, self.clock.now())
        } else {
            RunResult::success(message, self.clock.now())
        }
    }

    async fn sync_item(
        &self,
        task: &TaskId,
        item: &Item,
        target_field: u32,
        reference_field: u32,
        policy: &SyncPolicy,
    ) -> ItemOutcome {
        let target = item.field(target_field).as_text().trim().to_string();
        if target.is_empty() {
            tracing::debug!(task = %task, item_id = item.id, "no target, skipping");
            return ItemOutcome::Skipped;
        }

        if !is_repo_slug(&target) {
            let message = format!("Invalid repo format '{}', expected 'owner/repo'", target);
            self.fail_item(task, item.id, &message, policy).await;
            return ItemOutcome::Failed;
        }

        let claim = {
            let ledger = Arc::clone(&self.ledger);
            let (item_id, owner, claimed_target, at) =
                (item.id, task.as_str().to_string(), target.clone(), self.clock.now());
            blocking(move || ledger.claim(item_id, &owner, &claimed_target, at)).await
        };
        match claim {
            Ok(Claim::Acquired) => {}
            Ok(Claim::AlreadySynced(record)) => {
                tracing::info!(
                    task = %task,
                    item_id = item.id,
                    url = record.url.as_deref().unwrap_or_default(),
                    "already synced, skipping"
                );
                return ItemOutcome::Skipped;
            }
            Ok(Claim::InFlight(record)) => {
                tracing::warn!(
                    task = %task,
                    item_id = item.id,
                    claimed_at = %record.claimed_at,
                    "item has a pending claim, skipping"
                );
                return ItemOutcome::Skipped;
            }
            Err(e) => {
                let message = format!("failed to claim item: {}", e);
                self.fail_item(task, item.id, &message, policy).await;
                return ItemOutcome::Failed;
            }
        }

        if policy.validate_targets {
            if let Err(e) = self.sink.validate_target(&target).await {
                self.release(task, item.id).await;
                let message = format!("Target validation failed: {}", e);
                self.fail_item(task, item.id, &message, policy).await;
                return ItemOutcome::Failed;
            }
        }

        let new_item = NewItem {
            title: render_title(&policy.title_format, item),
            body: render_body(item, &policy.tracker_url),
            labels: labels_for(item),
        };
        let created = match self.sink.create_item(&target, &new_item).await {
            Ok(created) => created,
            Err(e) => {
                self.release(task, item.id).await;
                let message = format!("Failed to create GitHub issue: {}", e);
                self.fail_item(task, item.id, &message, policy).await;
                return ItemOutcome::Failed;
            }
        };

        let completed = {
            let ledger = Arc::clone(&self.ledger);
            let (item_id, number, url, at) =
                (item.id, created.number, created.url.clone(), self.clock.now());
            blocking(move || ledger.complete(item_id, number, &url, at)).await
        };
        if let Err(e) = completed {
            tracing::error!(
                task = %task,
                item_id = item.id,
                target = %target,
                number = created.number,
                url = %created.url,
                error = %e,
                "remote item created but ledger completion failed; manual reconciliation required"
            );
            let message = format!(
                "created {} but failed to record it: {}; manual reconciliation required",
                created.url, e
            );
            self.record_error(task, Some(item.id), &message, policy).await;
        }

        if let Err(e) = self
            .origin
            .write_back_reference(item.id, reference_field, &created.url)
            .await
        {
            tracing::warn!(
                task = %task,
                item_id = item.id,
                error = %e,
                "failed to write reference back to origin"
            );
        }

        tracing::info!(
            task = %task,
            item_id = item.id,
            target = %target,
            number = created.number,
            "item synced"
        );
        ItemOutcome::Synced
    }

    async fn release(&self, task: &TaskId, item_id: ItemId) {
        let ledger = Arc::clone(&self.ledger);
        let at = self.clock.now();
        if let Err(e) = blocking(move || ledger.release(item_id, at)).await {
            tracing::error!(task = %task, item_id, error = %e, "failed to release claim");
        }
    }

    async fn fail_item(&self, task: &TaskId, item_id: ItemId, message: &str, policy: &SyncPolicy) {
        self.record_error(task, Some(item_id), message, policy).await;
        if policy.on_error.add_note {
            let note = format!("GitHub sync failed\n\nError: {}", message);
            if let Err(e) = self.origin.annotate(item_id, &note).await {
                tracing::warn!(task = %task, item_id, error = %e, "failed to annotate item");
            }
        }
    }

    async fn record_error(
        &self,
        task: &TaskId,
        item_id: Option<ItemId>,
        message: &str,
        policy: &SyncPolicy,
    ) {
        if policy.on_error.log {
            tracing::warn!(task = %task, item_id, message, "sync error");
        }
        let errors = Arc::clone(&self.errors);
        let (owner, text, at) = (task.as_str().to_string(), message.to_string(), self.clock.now());
        if let Err(e) = blocking(move || errors.record(&owner, item_id, &text, at)).await {
            tracing::error!(task = %task, error = %e, "failed to record error");
        }
    }

    /// Current counters
    pub fn stats(&self, today: NaiveDate) -> Result<SyncStats, LedgerError> {
        SyncStats::collect(&self.ledger, &self.errors, today)
    }

    async fn log_stats(&self) {
        let (ledger, errors) = (Arc::clone(&self.ledger), Arc::clone(&self.errors));
        let today = self.clock.now().date_naive();
        match blocking(move || SyncStats::collect(&ledger, &errors, today)).await {
            Ok(stats) => tracing::info!(
                total_synced = stats.total_synced,
                synced_today = stats.synced_today,
                pending_claims = stats.pending_claims,
                unresolved_errors = stats.unresolved_errors,
                "sync stats"
            ),
            Err(e) => tracing::warn!(error = %e, "failed to read stats"),
        }
    }
}

/// Run a ledger or error log call on the blocking pool
async fn blocking<T, E, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Display,
{
    tokio::task::spawn_blocking(move || f().map_err(|e| e.to_string()))
        .await
        .map_err(|e| format!("storage task failed: {}", e))?
}

#[cfg(test)]
#[path = "issues_tests.rs"]
mod tests;
