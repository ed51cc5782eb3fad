// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task registry and per-identity periodic workers
//!
//! Every live task identity owns one tokio worker that runs the executor
//! immediately, then again `interval` after each completed run. All runs of
//! one identity, whether periodic, manual or item-scoped, hold that
//! identity's gate, so no identity ever executes twice at once. Gates
//! outlive reloads: a replacement worker waits for a run still holding the
//! gate of its predecessor.
//!
//! Manual and item-scoped runs execute on their own tasks, registered per
//! identity so that a removal or shutdown can abort them once the grace
//! period runs out.

use crate::error::SchedulerError;
use crate::executor::SyncExecutor;
use chrono::{DateTime, Utc};
use ferry_core::clock::add_duration;
use ferry_core::{Clock, ItemId, RunResult, SyncScope, TaskDefinition, TaskId, TaskKind};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as Gate, OwnedMutexGuard};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::Instrument;

/// Mutable runtime state of one task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TaskRuntime {
    last_run: Option<DateTime<Utc>>,
    last_result: Option<RunResult>,
    running: bool,
    next_run: Option<DateTime<Utc>>,
    run_count: u64,
    success_count: u64,
    failure_count: u64,
}

impl TaskRuntime {
    fn record(&mut self, result: &RunResult) {
        self.running = false;
        self.last_run = Some(result.timestamp);
        self.run_count += 1;
        if result.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.last_result = Some(result.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Live,
    /// Old worker stopping; a new definition takes over afterwards
    Replacing,
    /// Old worker stopping; the identity disappears afterwards
    Removing,
}

struct TaskEntry {
    definition: TaskDefinition,
    /// Distinguishes this worker's state from that of a replaced one
    generation: u64,
    runtime: TaskRuntime,
    lifecycle: Lifecycle,
}

/// Point-in-time copy of one task's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatus {
    pub id: TaskId,
    pub kind: &'static str,
    pub interval: String,
    pub last_run: Option<DateTime<Utc>>,
    pub last_result: Option<RunResult>,
    pub running: bool,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

impl TaskStatus {
    fn from_entry(entry: &TaskEntry) -> Self {
        let runtime = &entry.runtime;
        Self {
            id: entry.definition.id.clone(),
            kind: entry.definition.kind.label(),
            interval: entry.definition.interval_text.clone(),
            last_run: runtime.last_run,
            last_result: runtime.last_result.clone(),
            running: runtime.running,
            next_run: runtime.next_run,
            run_count: runtime.run_count,
            success_count: runtime.success_count,
            failure_count: runtime.failure_count,
        }
    }
}

/// Outcome of a manual trigger
#[derive(Debug)]
pub enum ManualTrigger {
    /// The run was started; the handle yields its result
    Started(JoinHandle<Option<RunResult>>),
    /// A run for this identity is in flight and covers the request
    AlreadyRunning,
    NotFound,
}

/// Identities touched by one `load`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub added: Vec<TaskId>,
    pub changed: Vec<TaskId>,
    pub removed: Vec<TaskId>,
    pub unchanged: Vec<TaskId>,
}

struct Worker {
    definition: TaskDefinition,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Admin {
    workers: HashMap<TaskId, Worker>,
    stopped: bool,
    shutdown_grace: Duration,
}

struct Shared<E, C> {
    executor: Arc<E>,
    clock: C,
    tasks: RwLock<HashMap<TaskId, TaskEntry>>,
    gates: Mutex<HashMap<TaskId, Arc<Gate<()>>>>,
    /// Runs started outside a worker, keyed by identity then run number
    runs: Mutex<HashMap<TaskId, HashMap<u64, AbortHandle>>>,
    next_generation: AtomicU64,
    next_run: AtomicU64,
    stopped: AtomicBool,
}

/// Message recorded for a run cut off by the grace period
const ABORTED: &str = "run aborted after shutdown grace period";

impl<E: SyncExecutor, C: Clock> Shared<E, C> {
    fn gate(&self, id: &TaskId) -> Arc<Gate<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(gates.entry(id.clone()).or_default())
    }

    fn existing_gate(&self, id: &TaskId) -> Option<Arc<Gate<()>>> {
        let gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.get(id).cloned()
    }

    /// Whether `gate` is still the one registered for `id`
    fn is_current_gate(&self, id: &TaskId, gate: &Arc<Gate<()>>) -> bool {
        let gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.get(id).is_some_and(|g| Arc::ptr_eq(g, gate))
    }

    /// Forget a removed identity's gate; late holders see it is stale
    fn remove_gate(&self, id: &TaskId) {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.remove(id);
    }

    /// Spawn a gated run outside the worker, registered so it can be aborted
    fn spawn_run(
        self: &Arc<Self>,
        id: &TaskId,
        generation: u64,
        scope: SyncScope,
        guard: OwnedMutexGuard<()>,
        span: tracing::Span,
    ) -> JoinHandle<Option<RunResult>> {
        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(self);
        let task = id.clone();
        // Held across the spawn so the run cannot deregister before it is registered
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        let handle = tokio::spawn(
            async move {
                let result = shared.run_once(&task, generation, scope).await;
                drop(guard);
                shared.finish_run(&task, run);
                result
            }
            .instrument(span),
        );
        runs.entry(id.clone())
            .or_default()
            .insert(run, handle.abort_handle());
        handle
    }

    fn finish_run(&self, id: &TaskId, run: u64) {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(active) = runs.get_mut(id) {
            active.remove(&run);
            if active.is_empty() {
                runs.remove(id);
            }
        }
    }

    /// Abort every run of `id` started outside its worker
    fn abort_runs(&self, id: &TaskId) -> usize {
        let aborted = {
            let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
            runs.remove(id).unwrap_or_default()
        };
        for handle in aborted.values() {
            handle.abort();
        }
        aborted.len()
    }

    /// Wait for `id`'s gate until `deadline`, then abort whatever holds it
    async fn drain_gate(&self, id: &TaskId, gate: Arc<Gate<()>>, deadline: Instant) -> bool {
        if let Ok(guard) = tokio::time::timeout_at(deadline, Arc::clone(&gate).lock_owned()).await {
            drop(guard);
            return false;
        }
        let aborted = self.abort_runs(id);
        tracing::warn!(task = %id, aborted, "run still in flight after grace period, aborting");
        // Aborted runs release the gate as soon as they are dropped
        drop(gate.lock_owned().await);
        true
    }

    /// Count a run cut off by the grace period as failed
    fn record_aborted(&self, id: &TaskId) {
        let result = RunResult::failure(ABORTED, self.clock.now());
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = tasks.get_mut(id).filter(|e| e.runtime.running) {
            entry.runtime.record(&result);
        }
    }

    fn lifecycle(&self, id: &TaskId) -> Option<(u64, Lifecycle)> {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks.get(id).map(|e| (e.generation, e.lifecycle))
    }

    /// Generation of a live issue task; only those take item-scoped runs
    fn item_generation(&self, id: &TaskId) -> Option<u64> {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks
            .get(id)
            .filter(|e| e.lifecycle == Lifecycle::Live)
            .filter(|e| matches!(e.definition.kind, TaskKind::Issues { .. }))
            .map(|e| e.generation)
    }

    /// Execute once for `generation`; the caller holds the gate
    async fn run_once(&self, id: &TaskId, generation: u64, scope: SyncScope) -> Option<RunResult> {
        let definition = {
            let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
            let entry = tasks.get_mut(id).filter(|e| e.generation == generation)?;
            entry.runtime.running = true;
            entry.definition.clone()
        };

        let started = Instant::now();
        let result = self.executor.execute(&definition, scope).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if result.success {
            tracing::info!(task = %id, %scope, elapsed_ms, message = %result.message, "run succeeded");
        } else {
            tracing::warn!(task = %id, %scope, elapsed_ms, message = %result.message, "run failed");
        }

        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = tasks.get_mut(id).filter(|e| e.generation == generation) {
            entry.runtime.record(&result);
        }
        Some(result)
    }

    fn schedule_next(&self, id: &TaskId, generation: u64, interval: Duration) {
        let next = add_duration(self.clock.now(), interval);
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = tasks.get_mut(id).filter(|e| e.generation == generation) {
            entry.runtime.next_run = Some(next);
        }
    }
}

/// Owner of all live task workers
pub struct Scheduler<E, C> {
    shared: Arc<Shared<E, C>>,
    admin: tokio::sync::Mutex<Admin>,
}

impl<E: SyncExecutor, C: Clock> Scheduler<E, C> {
    pub fn new(executor: Arc<E>, clock: C, shutdown_grace: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                executor,
                clock,
                tasks: RwLock::new(HashMap::new()),
                gates: Mutex::new(HashMap::new()),
                runs: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                next_run: AtomicU64::new(1),
                stopped: AtomicBool::new(false),
            }),
            admin: tokio::sync::Mutex::new(Admin {
                workers: HashMap::new(),
                stopped: false,
                shutdown_grace,
            }),
        }
    }

    pub fn executor(&self) -> &Arc<E> {
        &self.shared.executor
    }

    /// Bound on how long stop and removal wait for a run to finish
    pub async fn set_shutdown_grace(&self, grace: Duration) {
        self.admin.lock().await.shutdown_grace = grace;
    }

    /// Replace the live task set
    ///
    /// Removed and changed identities are stopped first; their runs, manual
    /// and item-scoped ones included, get the shutdown grace period to
    /// finish before being aborted. Unchanged
    /// identities keep their worker and counters.
    pub async fn load(&self, definitions: Vec<TaskDefinition>) -> Result<LoadReport, SchedulerError> {
        let mut admin = self.admin.lock().await;
        if admin.stopped {
            return Err(SchedulerError::Stopped);
        }

        let wanted: HashMap<TaskId, TaskDefinition> = definitions
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        let mut report = LoadReport::default();

        let retiring: Vec<TaskId> = admin
            .workers
            .iter()
            .filter(|(id, worker)| wanted.get(*id) != Some(&worker.definition))
            .map(|(id, _)| id.clone())
            .collect();
        {
            let mut tasks = self.shared.tasks.write().unwrap_or_else(|e| e.into_inner());
            for id in &retiring {
                if let Some(entry) = tasks.get_mut(id) {
                    entry.lifecycle = if wanted.contains_key(id) {
                        Lifecycle::Replacing
                    } else {
                        Lifecycle::Removing
                    };
                }
            }
        }

        let deadline = Instant::now() + admin.shutdown_grace;
        let stopping: Vec<(TaskId, Worker)> = retiring
            .iter()
            .filter_map(|id| admin.workers.remove_entry(id))
            .collect();
        stop_workers(stopping, deadline).await;

        for id in &retiring {
            // Runs outside the worker (manual, item) still hold the gate
            self.shared
                .drain_gate(id, self.shared.gate(id), deadline)
                .await;
            if wanted.contains_key(id) {
                report.changed.push(id.clone());
            } else {
                self.shared
                    .tasks
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(id);
                self.shared.remove_gate(id);
                tracing::info!(task = %id, "task removed");
                report.removed.push(id.clone());
            }
        }

        let changed: HashSet<&TaskId> = report.changed.iter().collect();
        let mut ids: Vec<&TaskId> = wanted.keys().collect();
        ids.sort();
        for id in ids {
            if admin.workers.contains_key(id) {
                report.unchanged.push(id.clone());
                continue;
            }
            if !changed.contains(id) {
                report.added.push(id.clone());
            }
            if let Some(definition) = wanted.get(id) {
                let worker = self.start_worker(definition.clone());
                admin.workers.insert(id.clone(), worker);
            }
        }

        report.changed.sort();
        report.removed.sort();
        tracing::info!(
            added = report.added.len(),
            changed = report.changed.len(),
            removed = report.removed.len(),
            unchanged = report.unchanged.len(),
            "task set loaded"
        );
        Ok(report)
    }

    fn start_worker(&self, definition: TaskDefinition) -> Worker {
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let id = definition.id.clone();
        self.shared
            .tasks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id.clone(),
                TaskEntry {
                    definition: definition.clone(),
                    generation,
                    runtime: TaskRuntime {
                        next_run: Some(self.shared.clock.now()),
                        ..TaskRuntime::default()
                    },
                    lifecycle: Lifecycle::Live,
                },
            );

        let (stop_tx, stop_rx) = oneshot::channel();
        let span = tracing::info_span!("worker", task = %id, kind = definition.kind.label());
        let handle = tokio::spawn(
            worker_loop(
                Arc::clone(&self.shared),
                id,
                generation,
                definition.interval,
                self.shared.gate(&definition.id),
                stop_rx,
            )
            .instrument(span),
        );
        tracing::info!(task = %definition.id, interval = %definition.interval_text, "worker started");
        Worker {
            definition,
            stop: stop_tx,
            handle,
        }
    }

    /// Run a task now unless a run is already in flight
    pub fn trigger(&self, id: &TaskId) -> Result<ManualTrigger, SchedulerError> {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return Err(SchedulerError::Stopped);
        }
        let Some(gate) = self.shared.existing_gate(id) else {
            return Ok(ManualTrigger::NotFound);
        };
        let Ok(guard) = Arc::clone(&gate).try_lock_owned() else {
            return Ok(ManualTrigger::AlreadyRunning);
        };
        if !self.shared.is_current_gate(id, &gate) {
            return Ok(ManualTrigger::NotFound);
        }
        let generation = match self.shared.lifecycle(id) {
            Some((generation, Lifecycle::Live)) => generation,
            Some((_, Lifecycle::Replacing)) => return Ok(ManualTrigger::AlreadyRunning),
            Some((_, Lifecycle::Removing)) | None => return Ok(ManualTrigger::NotFound),
        };

        tracing::info!(task = %id, "manual trigger");
        let span = tracing::info_span!("manual", task = %id);
        let handle = self
            .shared
            .spawn_run(id, generation, SyncScope::Full, guard, span);
        Ok(ManualTrigger::Started(handle))
    }

    /// Run a task for one origin item, waiting for any run in flight
    ///
    /// Returns `None` when the identity is unknown, names a mirror task, or
    /// is being replaced or removed by a reload; in the reload case the next
    /// full run covers the item.
    /// A run aborted after the grace period yields a failed result.
    pub async fn trigger_item(
        &self,
        id: &TaskId,
        item_id: ItemId,
    ) -> Result<Option<RunResult>, SchedulerError> {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return Err(SchedulerError::Stopped);
        }
        if self.shared.item_generation(id).is_none() {
            tracing::debug!(task = %id, item_id, "no live issue task for item");
            return Ok(None);
        }
        let Some(gate) = self.shared.existing_gate(id) else {
            return Ok(None);
        };
        let guard = Arc::clone(&gate).lock_owned().await;
        if self.shared.stopped.load(Ordering::SeqCst) {
            return Err(SchedulerError::Stopped);
        }
        if !self.shared.is_current_gate(id, &gate) {
            return Ok(None);
        }
        let Some(generation) = self.shared.item_generation(id) else {
            return Ok(None);
        };

        let span = tracing::info_span!("item", task = %id, item_id);
        let handle = self
            .shared
            .spawn_run(id, generation, SyncScope::Item(item_id), guard, span);
        match handle.await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!(task = %id, item_id, error = %e, "item run did not finish");
                Ok(Some(RunResult::failure(ABORTED, self.shared.clock.now())))
            }
        }
    }

    /// Copies of every task's state, sorted by identity
    pub fn status(&self) -> Vec<TaskStatus> {
        let mut statuses: Vec<TaskStatus> = {
            let tasks = self.shared.tasks.read().unwrap_or_else(|e| e.into_inner());
            tasks.values().map(TaskStatus::from_entry).collect()
        };
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    /// Stop every worker and wait for in-flight runs
    ///
    /// Runs still going when the grace period ends are aborted and counted
    /// as failed. Runtime state stays readable afterwards; further loads and
    /// triggers are refused.
    pub async fn stop(&self) {
        let mut admin = self.admin.lock().await;
        if admin.stopped {
            return;
        }
        admin.stopped = true;
        self.shared.stopped.store(true, Ordering::SeqCst);

        let deadline = Instant::now() + admin.shutdown_grace;
        let workers: Vec<(TaskId, Worker)> = admin.workers.drain().collect();
        let count = workers.len();
        for id in stop_workers(workers, deadline).await {
            self.shared.record_aborted(&id);
        }

        let gates: Vec<(TaskId, Arc<Gate<()>>)> = {
            let mut gates = self.shared.gates.lock().unwrap_or_else(|e| e.into_inner());
            gates.drain().collect()
        };
        for (id, gate) in gates {
            if self.shared.drain_gate(&id, gate, deadline).await {
                self.shared.record_aborted(&id);
            }
        }
        tracing::info!(workers = count, "scheduler stopped");
    }
}

impl<E, C> Drop for Scheduler<E, C> {
    fn drop(&mut self) {
        for worker in self.admin.get_mut().workers.values() {
            worker.handle.abort();
        }
    }
}

/// Signal workers to stop and wait until `deadline`; returns the aborted ones
async fn stop_workers(workers: Vec<(TaskId, Worker)>, deadline: Instant) -> Vec<TaskId> {
    let mut aborted = Vec::new();
    let mut handles = Vec::with_capacity(workers.len());
    for (id, worker) in workers {
        // The worker may already have exited
        let _ = worker.stop.send(());
        handles.push((id, worker.handle));
    }
    for (id, mut handle) in handles {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => tracing::debug!(task = %id, "worker stopped"),
            Ok(Err(e)) => tracing::warn!(task = %id, error = %e, "worker ended abnormally"),
            Err(_) => {
                tracing::warn!(task = %id, "worker did not stop within grace period, aborting");
                handle.abort();
                let _ = handle.await;
                aborted.push(id);
            }
        }
    }
    aborted
}

async fn worker_loop<E: SyncExecutor, C: Clock>(
    shared: Arc<Shared<E, C>>,
    id: TaskId,
    generation: u64,
    interval: Duration,
    gate: Arc<Gate<()>>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        let guard: OwnedMutexGuard<()> = tokio::select! {
            biased;
            _ = &mut stop => break,
            guard = Arc::clone(&gate).lock_owned() => guard,
        };
        shared.run_once(&id, generation, SyncScope::Full).await;
        drop(guard);
        shared.schedule_next(&id, generation, interval);

        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    tracing::debug!("worker loop exited");
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
