// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the ferryd control API

use std::time::Duration;

use chrono::{DateTime, Utc};
use ferry_core::{ItemId, RunResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ureq::Agent;

/// Default daemon address
pub const DEFAULT_URL: &str = "http://127.0.0.1:8080";

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for one request to the daemon
pub fn timeout_request() -> Duration {
    parse_duration_ms("FERRY_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not reachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Daemon answered {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response from daemon: {0}")]
    UnexpectedResponse(String),
}

/// One row of `GET /api/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub id: String,
    pub kind: String,
    pub interval: String,
    pub last_run: Option<DateTime<Utc>>,
    pub last_result: Option<RunResult>,
    pub running: bool,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// Body of `GET /api/stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub sync: SyncCounts,
    pub inbound: InboundCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncCounts {
    pub total_synced: usize,
    pub synced_today: usize,
    pub pending_claims: usize,
    pub unresolved_errors: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundCounts {
    pub accepted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
}

/// Entry of the daemon's error log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub id: u64,
    pub task: String,
    pub item_id: Option<ItemId>,
    pub message: String,
    pub at: DateTime<Utc>,
    pub resolved: bool,
}

/// Answer to a manual trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Triggered,
    AlreadyRunning,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Daemon client
pub struct DaemonClient {
    base_url: String,
    agent: Agent,
}

impl DaemonClient {
    pub fn new(base_url: &str) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout_request()))
            .http_status_as_error(false)
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: config.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn status(&self) -> Result<Vec<TaskStatus>, ClientError> {
        let (_, body) = self.get("/api/status")?;
        decode(&body)
    }

    pub fn trigger(&self, name: &str) -> Result<TriggerOutcome, ClientError> {
        let (status, body) = self.post(&format!("/api/trigger/{}", name))?;
        match status {
            202 => Ok(TriggerOutcome::Triggered),
            409 => Ok(TriggerOutcome::AlreadyRunning),
            _ => Err(rejection(status, &body, name)),
        }
    }

    pub fn stats(&self) -> Result<Stats, ClientError> {
        let (_, body) = self.get("/api/stats")?;
        decode(&body)
    }

    pub fn errors(&self) -> Result<Vec<ErrorEntry>, ClientError> {
        let (_, body) = self.get("/api/errors")?;
        decode(&body)
    }

    pub fn resolve_error(&self, id: u64) -> Result<ErrorEntry, ClientError> {
        let (status, body) = self.post(&format!("/api/errors/{}/resolve", id))?;
        if status != 200 {
            return Err(rejection(status, &body, &format!("error {}", id)));
        }
        decode(&body)
    }

    /// GET that fails on any non-2xx answer
    fn get(&self, path: &str) -> Result<(u16, String), ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| self.unreachable(e))?;
        let (status, body) = read(response)?;
        if !(200..300).contains(&status) {
            return Err(rejection(status, &body, path));
        }
        Ok((status, body))
    }

    /// POST with an empty body; the caller interprets the status
    fn post(&self, path: &str) -> Result<(u16, String), ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .agent
            .post(&url)
            .send_empty()
            .map_err(|e| self.unreachable(e))?;
        read(response)
    }

    fn unreachable(&self, error: ureq::Error) -> ClientError {
        ClientError::Unreachable {
            url: self.base_url.clone(),
            reason: error.to_string(),
        }
    }
}

fn read(mut response: ureq::http::Response<ureq::Body>) -> Result<(u16, String), ClientError> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;
    Ok((status, body))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::UnexpectedResponse(e.to_string()))
}

fn rejection(status: u16, body: &str, what: &str) -> ClientError {
    if status == 404 {
        return ClientError::NotFound(what.to_string());
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());
    ClientError::Rejected { status, message }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
