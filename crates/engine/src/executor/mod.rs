// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronization executors
//!
//! An executor performs one unit of work for one task and reports a
//! [`RunResult`]. Executors never fail: transport and persistence problems
//! become failed results so workers keep ticking.

mod issues;
mod mirror;
mod render;

pub use issues::{IssueExecutor, SyncStats};
pub use mirror::MirrorExecutor;
pub use render::{is_repo_slug, labels_for, render_body, render_title};

use async_trait::async_trait;
use ferry_adapters::{ItemSink, MirrorSource, OriginSource};
use ferry_core::{Clock, ExecutorSettings, RunResult, SyncScope, TaskDefinition, TaskKind};
use ferry_storage::RunLog;
use std::sync::RwLock;

/// Runs one synchronization unit for a task definition
#[async_trait]
pub trait SyncExecutor: Send + Sync + 'static {
    async fn execute(&self, definition: &TaskDefinition, scope: SyncScope) -> RunResult;

    /// Apply settings from a reload without restarting workers
    fn update_settings(&self, _settings: &ExecutorSettings) {}
}

/// Routes definitions to the executor for their kind and writes the run log
pub struct Dispatcher<M, O, S, C> {
    mirror: MirrorExecutor<M, C>,
    issues: IssueExecutor<O, S, C>,
    run_log: RwLock<RunLog>,
}

impl<M, O, S, C> Dispatcher<M, O, S, C>
where
    M: MirrorSource,
    O: OriginSource,
    S: ItemSink,
    C: Clock,
{
    pub fn new(mirror: MirrorExecutor<M, C>, issues: IssueExecutor<O, S, C>, run_log: RunLog) -> Self {
        Self {
            mirror,
            issues,
            run_log: RwLock::new(run_log),
        }
    }

    pub fn issues(&self) -> &IssueExecutor<O, S, C> {
        &self.issues
    }

    fn log_run(&self, definition: &TaskDefinition, result: &RunResult) {
        let run_log = self.run_log.read().unwrap_or_else(|e| e.into_inner()).clone();
        if let Err(e) = run_log.append(definition.kind.label(), &definition.id, result) {
            tracing::warn!(
                task = %definition.id,
                dir = %run_log.dir().display(),
                error = %e,
                "failed to write run log"
            );
        }
    }
}

#[async_trait]
impl<M, O, S, C> SyncExecutor for Dispatcher<M, O, S, C>
where
    M: MirrorSource,
    O: OriginSource,
    S: ItemSink,
    C: Clock,
{
    async fn execute(&self, definition: &TaskDefinition, scope: SyncScope) -> RunResult {
        let result = match &definition.kind {
            // Mirrors have no items; the scheduler sends them full scopes only
            TaskKind::Mirror { url, local_path } => {
                self.mirror.run(&definition.id, url, local_path).await
            }
            TaskKind::Issues {
                project,
                target_field,
                reference_field,
            } => {
                let fields = (*target_field, *reference_field);
                match scope {
                    SyncScope::Full => self.issues.run_full(&definition.id, project, fields).await,
                    SyncScope::Item(item_id) => {
                        self.issues.run_item(&definition.id, item_id, fields).await
                    }
                }
            }
        };
        self.log_run(definition, &result);
        result
    }

    fn update_settings(&self, settings: &ExecutorSettings) {
        self.mirror.configure(&settings.git);
        self.issues.configure(settings);
        *self.run_log.write().unwrap_or_else(|e| e.into_inner()) = RunLog::new(&settings.log_path);
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
