// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use ferry_core::FakeClock;
use std::collections::HashSet;
use tokio::time::sleep;

/// Executor that records calls and detects overlapping runs per identity
#[derive(Default)]
struct FakeExecutor {
    clock: FakeClock,
    calls: Mutex<Vec<(TaskId, SyncScope)>>,
    finished: Mutex<Vec<TaskId>>,
    active: Mutex<HashMap<TaskId, usize>>,
    overlapped: AtomicBool,
    delay: Mutex<Duration>,
    failing: Mutex<HashSet<TaskId>>,
}

impl FakeExecutor {
    fn with_delay(delay: Duration) -> Self {
        let executor = Self::default();
        *executor.delay.lock().unwrap() = delay;
        executor
    }

    fn calls_for(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t.as_str() == id)
            .count()
    }

    fn finished_for(&self, id: &str) -> usize {
        self.finished
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.as_str() == id)
            .count()
    }

    fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn scopes(&self) -> Vec<SyncScope> {
        self.calls.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }

    fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(TaskId::new(id));
    }
}

#[async_trait]
impl SyncExecutor for FakeExecutor {
    async fn execute(&self, definition: &TaskDefinition, scope: SyncScope) -> RunResult {
        let id = definition.id.clone();
        self.calls.lock().unwrap().push((id.clone(), scope));
        let _active = ActiveRun::enter(self, &id);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        self.finished.lock().unwrap().push(id.clone());
        if self.failing.lock().unwrap().contains(&id) {
            RunResult::failure("boom", self.clock.now())
        } else {
            RunResult::success("ok", self.clock.now())
        }
    }
}

/// Marks a run active until it ends or is aborted
struct ActiveRun<'a> {
    executor: &'a FakeExecutor,
    id: TaskId,
}

impl<'a> ActiveRun<'a> {
    fn enter(executor: &'a FakeExecutor, id: &TaskId) -> Self {
        let mut active = executor.active.lock().unwrap();
        let count = active.entry(id.clone()).or_default();
        *count += 1;
        if *count > 1 {
            executor.overlapped.store(true, Ordering::SeqCst);
        }
        Self {
            executor,
            id: id.clone(),
        }
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        *self.executor.active.lock().unwrap().entry(self.id.clone()).or_default() -= 1;
    }
}

fn mirror(id: &str, secs: u64) -> TaskDefinition {
    TaskDefinition::mirror(
        id,
        format!("https://git.example.com/{}.git", id),
        format!("/srv/{}.git", id),
        Duration::from_secs(secs),
    )
}

fn issues(id: &str, secs: u64) -> TaskDefinition {
    TaskDefinition::issues(id, id, 12, 13, Duration::from_secs(secs))
}

fn scheduler(executor: FakeExecutor) -> (Arc<FakeExecutor>, Scheduler<FakeExecutor, FakeClock>) {
    let executor = Arc::new(executor);
    let scheduler = Scheduler::new(
        Arc::clone(&executor),
        FakeClock::new(),
        Duration::from_secs(30),
    );
    (executor, scheduler)
}

fn status_of(scheduler: &Scheduler<FakeExecutor, FakeClock>, id: &str) -> TaskStatus {
    scheduler
        .status()
        .into_iter()
        .find(|s| s.id.as_str() == id)
        .unwrap()
}

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn status_lists_loaded_tasks_sorted() {
    let (_, scheduler) = scheduler(FakeExecutor::default());

    scheduler
        .load(vec![mirror("repo-b", 60), mirror("repo-a", 300)])
        .await
        .unwrap();

    let status = scheduler.status();
    let ids: Vec<&str> = status.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["repo-a", "repo-b"]);
    assert_eq!(status[0].kind, "mirror");
    assert_eq!(status[0].interval, "5m");
    assert!(status[0].next_run.is_some());
}

#[tokio::test(start_paused = true)]
async fn runs_immediately_then_every_interval() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();

    settle().await;
    assert_eq!(executor.calls_for("repo-a"), 1);

    sleep(Duration::from_secs(298)).await;
    assert_eq!(executor.calls_for("repo-a"), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(executor.calls_for("repo-a"), 2);
}

#[tokio::test(start_paused = true)]
async fn interval_counts_from_completion() {
    let (executor, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(100)));
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();

    // First run ends at t=100, the next starts at t=400
    sleep(Duration::from_secs(399)).await;
    assert_eq!(executor.calls_for("repo-a"), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(executor.calls_for("repo-a"), 2);
}

#[tokio::test(start_paused = true)]
async fn counters_track_outcomes() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    executor.fail("repo-b");
    scheduler
        .load(vec![mirror("repo-a", 60), mirror("repo-b", 60)])
        .await
        .unwrap();

    sleep(Duration::from_secs(61)).await;

    let a = status_of(&scheduler, "repo-a");
    assert_eq!((a.run_count, a.success_count, a.failure_count), (2, 2, 0));
    let b = status_of(&scheduler, "repo-b");
    assert_eq!((b.run_count, b.success_count, b.failure_count), (2, 0, 2));
    assert!(!b.last_result.unwrap().success);
    assert!(!b.running);
}

#[tokio::test(start_paused = true)]
async fn running_flag_is_visible_during_a_run() {
    let (_, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(10)));
    scheduler.load(vec![mirror("repo-a", 60)]).await.unwrap();

    settle().await;
    assert!(status_of(&scheduler, "repo-a").running);

    sleep(Duration::from_secs(10)).await;
    assert!(!status_of(&scheduler, "repo-a").running);
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_while_running_is_rejected() {
    let (executor, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(10)));
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    settle().await;

    let outcome = scheduler.trigger(&TaskId::new("repo-a")).unwrap();

    assert!(matches!(outcome, ManualTrigger::AlreadyRunning));
    sleep(Duration::from_secs(20)).await;
    assert_eq!(executor.calls_for("repo-a"), 1);
    assert!(!executor.overlapped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_runs_when_idle() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    settle().await;

    let ManualTrigger::Started(handle) = scheduler.trigger(&TaskId::new("repo-a")).unwrap() else {
        panic!("expected the trigger to start a run");
    };
    let result = handle.await.unwrap().unwrap();

    assert!(result.success);
    assert_eq!(executor.calls_for("repo-a"), 2);
    assert_eq!(status_of(&scheduler, "repo-a").run_count, 2);
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_for_unknown_identity() {
    let (_, scheduler) = scheduler(FakeExecutor::default());
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();

    let outcome = scheduler.trigger(&TaskId::new("nope")).unwrap();

    assert!(matches!(outcome, ManualTrigger::NotFound));
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_never_overlap() {
    let (executor, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(5)));
    let scheduler = Arc::new(scheduler);
    scheduler.load(vec![issues("web", 7)]).await.unwrap();

    for _ in 0..20 {
        let _ = scheduler.trigger(&TaskId::new("web")).unwrap();
        let s = Arc::clone(&scheduler);
        tokio::spawn(async move { s.trigger_item(&TaskId::new("web"), 9).await });
        sleep(Duration::from_secs(3)).await;
    }
    sleep(Duration::from_secs(60)).await;

    assert!(!executor.overlapped.load(Ordering::SeqCst));
    let status = status_of(&scheduler, "web");
    assert_eq!(status.run_count, status.success_count + status.failure_count);
}

#[tokio::test(start_paused = true)]
async fn item_trigger_waits_for_the_run_in_flight() {
    let (executor, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(10)));
    scheduler.load(vec![issues("web", 300)]).await.unwrap();
    settle().await;

    let result = scheduler
        .trigger_item(&TaskId::new("web"), 42)
        .await
        .unwrap()
        .unwrap();

    assert!(result.success);
    assert_eq!(executor.scopes(), vec![SyncScope::Full, SyncScope::Item(42)]);
    assert!(!executor.overlapped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn item_trigger_for_unknown_identity() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());

    let result = scheduler.trigger_item(&TaskId::new("web"), 42).await.unwrap();

    assert!(result.is_none());
    assert!(executor.scopes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn item_trigger_skips_mirror_tasks() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    settle().await;

    let result = scheduler.trigger_item(&TaskId::new("repo-a"), 42).await.unwrap();

    assert!(result.is_none());
    assert_eq!(executor.scopes(), vec![SyncScope::Full]);
    assert_eq!(status_of(&scheduler, "repo-a").run_count, 1);
}

#[tokio::test(start_paused = true)]
async fn reload_keeps_unchanged_and_resets_changed() {
    let (_, scheduler) = scheduler(FakeExecutor::default());
    scheduler
        .load(vec![mirror("repo-a", 60), mirror("repo-b", 60)])
        .await
        .unwrap();
    sleep(Duration::from_secs(61)).await;
    assert_eq!(status_of(&scheduler, "repo-a").run_count, 2);

    let report = scheduler
        .load(vec![mirror("repo-a", 60), mirror("repo-b", 120)])
        .await
        .unwrap();

    assert_eq!(report.unchanged, vec![TaskId::new("repo-a")]);
    assert_eq!(report.changed, vec![TaskId::new("repo-b")]);
    assert_eq!(status_of(&scheduler, "repo-a").run_count, 2);
    let b = status_of(&scheduler, "repo-b");
    assert_eq!(b.run_count, 0);
    assert_eq!(b.interval, "2m");
}

#[tokio::test(start_paused = true)]
async fn removed_identity_stops_and_disappears() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    settle().await;

    let report = scheduler.load(vec![mirror("repo-b", 300)]).await.unwrap();
    settle().await;

    assert_eq!(report.removed, vec![TaskId::new("repo-a")]);
    assert_eq!(report.added, vec![TaskId::new("repo-b")]);
    let ids: Vec<TaskId> = scheduler.status().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![TaskId::new("repo-b")]);

    sleep(Duration::from_secs(3600)).await;
    assert_eq!(executor.calls_for("repo-a"), 1);
}

#[tokio::test(start_paused = true)]
async fn removal_waits_for_the_run_in_flight() {
    let (executor, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(10)));
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    settle().await;

    let started = Instant::now();
    scheduler.load(vec![mirror("repo-b", 300)]).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(9));
    assert_eq!(executor.active.lock().unwrap().get(&TaskId::new("repo-a")), Some(&0));
}

#[tokio::test(start_paused = true)]
async fn stuck_runs_are_aborted_after_grace() {
    let (_, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(3600)));
    scheduler.set_shutdown_grace(Duration::from_secs(5)).await;
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    settle().await;

    let started = Instant::now();
    scheduler.load(vec![]).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(scheduler.status().is_empty());
}

#[tokio::test(start_paused = true)]
async fn changed_worker_waits_for_manual_run() {
    let (executor, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(10)));
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    sleep(Duration::from_secs(11)).await;
    let ManualTrigger::Started(_) = scheduler.trigger(&TaskId::new("repo-a")).unwrap() else {
        panic!("expected the trigger to start a run");
    };
    settle().await;

    scheduler.load(vec![mirror("repo-a", 600)]).await.unwrap();
    sleep(Duration::from_secs(30)).await;

    assert!(!executor.overlapped.load(Ordering::SeqCst));
    assert_eq!(executor.calls_for("repo-a"), 3);
}

#[tokio::test(start_paused = true)]
async fn stop_keeps_status_and_refuses_load() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    scheduler.load(vec![mirror("repo-a", 60)]).await.unwrap();
    settle().await;

    scheduler.stop().await;
    sleep(Duration::from_secs(600)).await;

    assert_eq!(executor.calls_for("repo-a"), 1);
    assert_eq!(status_of(&scheduler, "repo-a").run_count, 1);
    assert_eq!(
        scheduler.load(vec![mirror("repo-a", 60)]).await.unwrap_err(),
        SchedulerError::Stopped
    );
    assert_eq!(
        scheduler.trigger(&TaskId::new("repo-a")).unwrap_err(),
        SchedulerError::Stopped
    );
}

#[tokio::test(start_paused = true)]
async fn manual_run_is_aborted_when_its_identity_is_removed() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    scheduler.set_shutdown_grace(Duration::from_secs(5)).await;
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    settle().await;
    executor.set_delay(Duration::from_secs(3600));
    let ManualTrigger::Started(handle) = scheduler.trigger(&TaskId::new("repo-a")).unwrap() else {
        panic!("expected the trigger to start a run");
    };
    settle().await;

    let started = Instant::now();
    scheduler.load(vec![mirror("repo-b", 300)]).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(handle.await.unwrap_err().is_cancelled());
    let ids: Vec<TaskId> = scheduler.status().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![TaskId::new("repo-b")]);

    sleep(Duration::from_secs(7200)).await;
    assert_eq!(executor.calls_for("repo-a"), 2);
    assert_eq!(executor.finished_for("repo-a"), 1);
}

#[tokio::test(start_paused = true)]
async fn changed_identity_aborts_a_stuck_manual_run() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    scheduler.set_shutdown_grace(Duration::from_secs(5)).await;
    scheduler.load(vec![mirror("repo-a", 300)]).await.unwrap();
    settle().await;
    executor.set_delay(Duration::from_secs(3600));
    let _ = scheduler.trigger(&TaskId::new("repo-a")).unwrap();
    settle().await;

    scheduler.load(vec![mirror("repo-a", 600)]).await.unwrap();
    settle().await;

    // The replacement worker starts right away instead of waiting an hour
    assert_eq!(executor.calls_for("repo-a"), 3);
    assert!(!executor.overlapped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn stop_aborts_item_run_after_grace() {
    let (executor, scheduler) = scheduler(FakeExecutor::default());
    let scheduler = Arc::new(scheduler);
    scheduler.set_shutdown_grace(Duration::from_secs(5)).await;
    scheduler.load(vec![issues("web", 300)]).await.unwrap();
    settle().await;
    executor.set_delay(Duration::from_secs(3600));
    let s = Arc::clone(&scheduler);
    let item = tokio::spawn(async move { s.trigger_item(&TaskId::new("web"), 42).await });
    settle().await;

    let started = Instant::now();
    scheduler.stop().await;

    assert!(started.elapsed() < Duration::from_secs(60));
    let result = item.await.unwrap().unwrap().unwrap();
    assert!(!result.success);
    assert_eq!(result.message, ABORTED);
    let web = status_of(&scheduler, "web");
    assert!(!web.running);
    assert_eq!((web.run_count, web.failure_count), (2, 1));

    sleep(Duration::from_secs(7200)).await;
    assert_eq!(executor.finished_for("web"), 1);
}

#[tokio::test(start_paused = true)]
async fn item_trigger_waiting_at_stop_is_refused() {
    let (executor, scheduler) = scheduler(FakeExecutor::with_delay(Duration::from_secs(10)));
    let scheduler = Arc::new(scheduler);
    scheduler.load(vec![issues("web", 300)]).await.unwrap();
    settle().await;
    let s = Arc::clone(&scheduler);
    let item = tokio::spawn(async move { s.trigger_item(&TaskId::new("web"), 42).await });
    settle().await;

    scheduler.stop().await;

    assert_eq!(item.await.unwrap().unwrap_err(), SchedulerError::Stopped);
    assert_eq!(executor.scopes(), vec![SyncScope::Full]);
}

#[tokio::test(start_paused = true)]
async fn removal_and_stop_forget_gates() {
    let (_, scheduler) = scheduler(FakeExecutor::default());
    scheduler
        .load(vec![mirror("repo-a", 300), mirror("repo-b", 300)])
        .await
        .unwrap();
    settle().await;

    scheduler.load(vec![mirror("repo-b", 300)]).await.unwrap();
    assert!(scheduler.shared.existing_gate(&TaskId::new("repo-a")).is_none());
    assert!(scheduler.shared.existing_gate(&TaskId::new("repo-b")).is_some());

    scheduler.stop().await;
    assert!(scheduler.shared.gates.lock().unwrap().is_empty());
    assert!(scheduler.shared.runs.lock().unwrap().is_empty());
}
