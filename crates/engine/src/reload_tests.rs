// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use ferry_core::config::RepoConfig;
use ferry_core::{FakeClock, RunResult, SyncScope, TaskDefinition, TaskId};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingExecutor {
    clock: FakeClock,
    updates: AtomicUsize,
    title_format: Mutex<String>,
}

#[async_trait]
impl SyncExecutor for RecordingExecutor {
    async fn execute(&self, _definition: &TaskDefinition, _scope: SyncScope) -> RunResult {
        RunResult::success("ok", self.clock.now())
    }

    fn update_settings(&self, settings: &ExecutorSettings) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.title_format.lock().unwrap() = settings.sync.title_format.clone();
    }
}

fn repo_doc(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| {
            format!(
                "[[repo]]\nname = \"{name}\"\nurl = \"https://git.example.com/{name}.git\"\n\
                 local_path = \"/srv/{name}.git\"\ninterval = \"5m\"\n\n"
            )
        })
        .collect()
}

fn repo(name: &str) -> RepoConfig {
    RepoConfig {
        name: name.to_string(),
        url: format!("https://git.example.com/{}.git", name),
        local_path: format!("/srv/{}.git", name),
        interval: "5m".to_string(),
    }
}

struct Harness {
    dir: TempDir,
    executor: Arc<RecordingExecutor>,
    scheduler: Arc<Scheduler<RecordingExecutor, FakeClock>>,
    coordinator: Arc<ReloadCoordinator<RecordingExecutor, FakeClock>>,
}

impl Harness {
    fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("ferry.toml")
    }

    fn write(&self, content: &str) {
        std::fs::write(self.path(), content).unwrap();
    }

    fn ids(&self) -> Vec<String> {
        self.scheduler
            .status()
            .into_iter()
            .map(|s| s.id.to_string())
            .collect()
    }
}

async fn harness(initial: &str) -> Harness {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ferry.toml");
    std::fs::write(&path, initial).unwrap();
    let config = parse_config(initial).unwrap();
    let executor = Arc::new(RecordingExecutor::default());
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&executor),
        FakeClock::new(),
        Duration::from_secs(30),
    ));
    let holder = Arc::new(ConfigHolder::new(path, config));
    let coordinator = Arc::new(ReloadCoordinator::new(holder, Arc::clone(&scheduler)));
    coordinator.start().await.unwrap();
    Harness {
        dir,
        executor,
        scheduler,
        coordinator,
    }
}

fn spawn_watcher(h: &Harness) -> tokio::task::JoinHandle<()> {
    let coordinator = Arc::clone(&h.coordinator);
    tokio::spawn(async move { coordinator.watch().await })
}

#[test]
fn fingerprint_is_hex_sha256() {
    assert_eq!(
        fingerprint(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_ne!(fingerprint("a"), fingerprint("b"));
}

#[tokio::test(start_paused = true)]
async fn start_loads_the_held_configuration() {
    let h = harness(&repo_doc(&["repo-a", "repo-b"])).await;

    assert_eq!(h.ids(), vec!["repo-a", "repo-b"]);
    assert_eq!(h.executor.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn disk_edit_applies_after_debounce() {
    let h = harness(&repo_doc(&["repo-a"])).await;
    let watcher = spawn_watcher(&h);

    h.write(&repo_doc(&["repo-a", "repo-b"]));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.ids(), vec!["repo-a"]);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.ids(), vec!["repo-a", "repo-b"]);
    assert_eq!(h.coordinator.holder().get().repos.len(), 2);
    watcher.abort();
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_applies_once() {
    let h = harness(&repo_doc(&["repo-a"])).await;
    let watcher = spawn_watcher(&h);

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.write(&repo_doc(&["repo-a", "repo-b"]));
    tokio::time::sleep(Duration::from_millis(250)).await;
    h.write(&repo_doc(&["repo-a", "repo-c"]));
    tokio::time::sleep(Duration::from_millis(250)).await;
    h.write(&repo_doc(&["repo-a", "repo-d"]));
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(h.executor.updates.load(Ordering::SeqCst), 2);
    assert_eq!(h.ids(), vec!["repo-a", "repo-d"]);
    watcher.abort();
}

#[tokio::test(start_paused = true)]
async fn invalid_edit_keeps_the_live_configuration() {
    let h = harness(&repo_doc(&["repo-a"])).await;
    let watcher = spawn_watcher(&h);

    h.write("[[repo]]\nname = \"repo-a\"\nurl = \"x\"\nlocal_path = \"/srv/a\"\ninterval = \"soon\"\n");
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.ids(), vec!["repo-a"]);
    assert_eq!(h.coordinator.holder().get().repos[0].interval, "5m");
    assert!(h.coordinator.last_error().unwrap().contains("repo-a"));

    h.write(&repo_doc(&["repo-b"]));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.ids(), vec!["repo-b"]);
    assert!(h.coordinator.last_error().is_none());
    watcher.abort();
}

#[tokio::test(start_paused = true)]
async fn unchanged_file_is_not_reapplied() {
    let h = harness(&repo_doc(&["repo-a"])).await;

    let outcome = h.coordinator.reload_from_disk().await.unwrap();

    assert!(outcome.is_none());
    assert_eq!(h.executor.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn apply_saves_then_reloads() {
    let h = harness(&repo_doc(&["repo-a"])).await;
    let mut config = Config::clone(&h.coordinator.holder().get());
    config.repos.push(repo("repo-b"));
    config.sync.title_format = "{subject}".to_string();

    let outcome = h.coordinator.apply(config).await.unwrap();

    assert_eq!(outcome.report.added, vec![TaskId::new("repo-b")]);
    assert!(!outcome.restart_required);
    assert_eq!(h.ids(), vec!["repo-a", "repo-b"]);
    assert_eq!(*h.executor.title_format.lock().unwrap(), "{subject}");
    let saved = parse_config(&std::fs::read_to_string(h.path()).unwrap()).unwrap();
    assert_eq!(saved.repos.len(), 2);
    // The watcher sees its own write as unchanged
    assert!(h.coordinator.reload_from_disk().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn apply_rejects_invalid_configuration() {
    let h = harness(&repo_doc(&["repo-a"])).await;
    let before = std::fs::read_to_string(h.path()).unwrap();

    let err = h.coordinator.apply(Config::default()).await.unwrap_err();

    assert!(matches!(err, ReloadError::Config(ConfigError::NoIdentities)));
    assert_eq!(std::fs::read_to_string(h.path()).unwrap(), before);
    assert_eq!(h.ids(), vec!["repo-a"]);
}

#[tokio::test(start_paused = true)]
async fn port_change_requires_restart() {
    let h = harness(&repo_doc(&["repo-a"])).await;
    let mut config = Config::clone(&h.coordinator.holder().get());
    config.http_port = 9090;

    let outcome = h.coordinator.apply(config).await.unwrap();

    assert!(outcome.restart_required);
    assert_eq!(h.coordinator.holder().get().http_port, 9090);
}
