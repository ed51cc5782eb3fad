// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git CLI mirror adapter

use super::{MirrorError, MirrorSource};
use async_trait::async_trait;
use ferry_core::config::GitSettings;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::process::Command;

/// Mirror adapter that shells out to `git`
#[derive(Clone)]
pub struct GitMirror {
    settings: Arc<RwLock<GitSettings>>,
}

impl GitMirror {
    pub fn new(settings: GitSettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    fn settings(&self) -> GitSettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn run(&self, args: &[&OsStr]) -> Result<String, MirrorError> {
        let settings = self.settings();
        let command = describe(args);

        let mut cmd = Command::new("git");
        cmd.args(args).kill_on_drop(true);
        if let Some(key) = &settings.ssh_key_path {
            cmd.env(
                "GIT_SSH_COMMAND",
                format!("ssh -i {} -o StrictHostKeyChecking=no", key.display()),
            );
        }

        let output = match tokio::time::timeout(settings.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| MirrorError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                return Err(MirrorError::TimedOut {
                    command,
                    after: settings.timeout,
                })
            }
        };

        // git reports progress on stderr even on success
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(MirrorError::CommandFailed {
                command,
                status: output.status.to_string(),
                output: combined.trim().to_string(),
            });
        }
        Ok(combined.trim().to_string())
    }
}

impl Default for GitMirror {
    fn default() -> Self {
        Self::new(GitSettings {
            ssh_key_path: None,
            timeout: Duration::from_secs(60),
        })
    }
}

fn describe(args: &[&OsStr]) -> String {
    let parts: Vec<String> = args
        .iter()
        .take(3)
        .map(|a| a.to_string_lossy().to_string())
        .collect();
    format!("git {}", parts.join(" "))
}

#[async_trait]
impl MirrorSource for GitMirror {
    async fn exists(&self, local_path: &Path) -> bool {
        tokio::fs::try_exists(local_path).await.unwrap_or(false)
    }

    async fn clone_mirror(&self, url: &str, local_path: &Path) -> Result<String, MirrorError> {
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MirrorError::Spawn {
                        command: "git clone --mirror".to_string(),
                        reason: format!("cannot create {}: {}", parent.display(), e),
                    })?;
            }
        }
        self.run(&[
            OsStr::new("clone"),
            OsStr::new("--mirror"),
            OsStr::new(url),
            local_path.as_os_str(),
        ])
        .await
    }

    async fn fetch(&self, local_path: &Path) -> Result<String, MirrorError> {
        self.run(&[
            OsStr::new("-C"),
            local_path.as_os_str(),
            OsStr::new("fetch"),
            OsStr::new("--all"),
            OsStr::new("--prune"),
        ])
        .await
    }

    fn configure(&self, settings: &GitSettings) {
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = settings.clone();
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
