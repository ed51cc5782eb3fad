// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::mirror::FakeMirror;
use crate::origin::FakeOrigin;
use crate::sink::FakeSink;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn traced_mirror_clone_logs_span_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedMirror::new(FakeMirror::new());
        traced
            .clone_mirror("git@example.com:org/repo-a.git", Path::new("/srv/repo-a.git"))
            .await
    });

    assert!(result.is_ok());
    assert!(logs.contains("mirror.clone"), "Logs:\n{}", logs);
    assert!(logs.contains("repo-a"), "Logs:\n{}", logs);
    assert!(logs.contains("mirror cloned"), "Logs:\n{}", logs);
    assert!(logs.contains("elapsed_ms"), "Logs:\n{}", logs);
}

#[test]
fn traced_mirror_fetch_logs_failure_output() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeMirror::new();
        fake.fail_fetch(Some("fatal: could not read from remote"));
        TracedMirror::new(fake).fetch(Path::new("/srv/repo-a.git")).await
    });

    assert!(result.is_err());
    assert!(logs.contains("fetch failed"), "Logs:\n{}", logs);
    assert!(
        logs.contains("could not read from remote"),
        "Logs:\n{}",
        logs
    );
}

#[test]
fn traced_sink_logs_created_item() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedSink::new(FakeSink::new());
        traced
            .create_item(
                "org/web",
                &NewItem {
                    title: "[Redmine #1] Title".to_string(),
                    body: String::new(),
                    labels: vec!["from-redmine".to_string()],
                },
            )
            .await
    });

    assert_eq!(result.unwrap().number, 1);
    assert!(logs.contains("sink.create_item"), "Logs:\n{}", logs);
    assert!(logs.contains("org/web"), "Logs:\n{}", logs);
    assert!(logs.contains("item created"), "Logs:\n{}", logs);
}

#[test]
fn traced_origin_logs_write_back_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeOrigin::new();
        fake.fail_write_back(Some(OriginError::Transport("connection reset".to_string())));
        TracedOrigin::new(fake)
            .write_back_reference(42, 13, "https://github.com/org/web/issues/1")
            .await
    });

    assert!(result.is_err());
    assert!(logs.contains("origin.write_back"), "Logs:\n{}", logs);
    assert!(logs.contains("connection reset"), "Logs:\n{}", logs);
}

#[tokio::test]
async fn traced_wrappers_forward_configuration() {
    let fake = FakeSink::new();
    let traced = TracedSink::new(fake.clone());
    traced.configure(Some(&RemoteEndpoint {
        api_url: "https://api.github.com".to_string(),
        web_url: "https://github.com".to_string(),
        token: "t0k3n".to_string(),
        timeout: std::time::Duration::from_secs(1),
    }));

    assert_eq!(fake.configured_token().as_deref(), Some("t0k3n"));
}
