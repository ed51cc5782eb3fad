// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface of the daemon.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use ferry_core::{Clock, Config, TaskId};
use ferry_engine::{
    InboundError, InboundTrigger, ManualTrigger, ReloadCoordinator, ReloadError, Scheduler,
    SyncExecutor, SyncStats, SIGNATURE_HEADER,
};
use ferry_storage::{ErrorLog, Ledger};
use serde_json::json;
use tracing::{error, info};

/// Placeholder returned instead of credentials
pub const REDACTED: &str = "********";

/// Shared handler state
pub struct AppState<E, C> {
    pub scheduler: Arc<Scheduler<E, C>>,
    pub reload: Arc<ReloadCoordinator<E, C>>,
    pub inbound: Arc<InboundTrigger<E, C>>,
    pub ledger: Arc<Ledger>,
    pub errors: Arc<ErrorLog>,
    pub clock: C,
    pub started_at: DateTime<Utc>,
}

impl<E, C: Clone> Clone for AppState<E, C> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            reload: Arc::clone(&self.reload),
            inbound: Arc::clone(&self.inbound),
            ledger: Arc::clone(&self.ledger),
            errors: Arc::clone(&self.errors),
            clock: self.clock.clone(),
            started_at: self.started_at,
        }
    }
}

/// Build the router for every daemon route
pub fn router<E: SyncExecutor, C: Clock>(state: AppState<E, C>) -> Router {
    Router::new()
        .route("/health", get(health::<E, C>))
        .route("/api/status", get(status::<E, C>))
        .route("/api/trigger/{name}", post(trigger::<E, C>))
        .route("/api/config", get(get_config::<E, C>).post(update_config::<E, C>))
        .route("/api/errors", get(list_errors::<E, C>))
        .route("/api/errors/{id}/resolve", post(resolve_error::<E, C>))
        .route("/api/stats", get(stats::<E, C>))
        .route("/webhook/issue-changed", post(webhook::<E, C>))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

/// Run a ledger or error log call on the blocking pool
async fn on_storage<T, E, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display,
{
    tokio::task::spawn_blocking(move || f().map_err(|e| e.to_string()))
        .await
        .map_err(|e| format!("storage task failed: {}", e))?
}

async fn health<E: SyncExecutor, C: Clock>(State(state): State<AppState<E, C>>) -> Response {
    let uptime_secs = (state.clock.now() - state.started_at).num_seconds().max(0);
    Json(json!({
        "status": "ok",
        "tasks": state.scheduler.status().len(),
        "uptime_secs": uptime_secs,
    }))
    .into_response()
}

async fn status<E: SyncExecutor, C: Clock>(State(state): State<AppState<E, C>>) -> Response {
    Json(state.scheduler.status()).into_response()
}

async fn trigger<E: SyncExecutor, C: Clock>(
    State(state): State<AppState<E, C>>,
    Path(name): Path<String>,
) -> Response {
    let id = TaskId::new(name);
    match state.scheduler.trigger(&id) {
        Ok(ManualTrigger::Started(_)) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "triggered", "task": id })),
        )
            .into_response(),
        Ok(ManualTrigger::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "already_running", "task": id })),
        )
            .into_response(),
        Ok(ManualTrigger::NotFound) => {
            error_response(StatusCode::NOT_FOUND, format!("task '{}' not found", id))
        }
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}

/// Copy of `config` with credentials replaced by [`REDACTED`]
pub fn redact(config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(tracker) = config.tracker.as_mut() {
        if !tracker.api_key.is_empty() {
            tracker.api_key = REDACTED.to_string();
        }
    }
    if let Some(remote) = config.remote.as_mut() {
        if !remote.token.is_empty() {
            remote.token = REDACTED.to_string();
        }
    }
    if let Some(secret) = config.webhook.as_mut().and_then(|w| w.secret.as_mut()) {
        if !secret.is_empty() {
            *secret = REDACTED.to_string();
        }
    }
    config
}

/// Put back credentials that a client echoed as [`REDACTED`]
pub fn unredact(mut incoming: Config, current: &Config) -> Config {
    if let (Some(tracker), Some(live)) = (incoming.tracker.as_mut(), current.tracker.as_ref()) {
        if tracker.api_key == REDACTED {
            tracker.api_key = live.api_key.clone();
        }
    }
    if let (Some(remote), Some(live)) = (incoming.remote.as_mut(), current.remote.as_ref()) {
        if remote.token == REDACTED {
            remote.token = live.token.clone();
        }
    }
    let live_secret = current.webhook.as_ref().and_then(|w| w.secret.clone());
    if let Some(secret) = incoming.webhook.as_mut().and_then(|w| w.secret.as_mut()) {
        if secret == REDACTED {
            *secret = live_secret.unwrap_or_default();
        }
    }
    incoming
}

async fn get_config<E: SyncExecutor, C: Clock>(State(state): State<AppState<E, C>>) -> Response {
    Json(redact(&state.reload.holder().get())).into_response()
}

async fn update_config<E: SyncExecutor, C: Clock>(
    State(state): State<AppState<E, C>>,
    Json(incoming): Json<Config>,
) -> Response {
    let config = unredact(incoming, &state.reload.holder().get());
    match state.reload.apply(config).await {
        Ok(outcome) => {
            info!(
                added = outcome.report.added.len(),
                removed = outcome.report.removed.len(),
                "configuration updated over HTTP"
            );
            Json(outcome).into_response()
        }
        Err(ReloadError::Config(e)) => error_response(StatusCode::BAD_REQUEST, e),
        Err(ReloadError::Scheduler(e)) => error_response(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}

async fn list_errors<E: SyncExecutor, C: Clock>(State(state): State<AppState<E, C>>) -> Response {
    let errors = Arc::clone(&state.errors);
    match on_storage(move || errors.unresolved()).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            error!(error = %e, "failed to read error log");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn resolve_error<E: SyncExecutor, C: Clock>(
    State(state): State<AppState<E, C>>,
    Path(id): Path<u64>,
) -> Response {
    let (errors, at) = (Arc::clone(&state.errors), state.clock.now());
    match on_storage(move || errors.resolve(id, at)).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("error {} not found", id)),
        Err(e) => {
            error!(error = %e, "failed to resolve error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn stats<E: SyncExecutor, C: Clock>(State(state): State<AppState<E, C>>) -> Response {
    let today = state.clock.now().date_naive();
    let (ledger, errors) = (Arc::clone(&state.ledger), Arc::clone(&state.errors));
    match on_storage(move || SyncStats::collect(&ledger, &errors, today)).await {
        Ok(sync) => Json(json!({
            "sync": sync,
            "inbound": state.inbound.stats(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "failed to read stats");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn webhook<E: SyncExecutor, C: Clock>(
    State(state): State<AppState<E, C>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    match state.inbound.accept(&body, signature) {
        Ok(payload) => Json(json!({
            "status": "accepted",
            "item_id": payload.item_id,
            "project": payload.project_identifier,
        }))
        .into_response(),
        Err(e @ (InboundError::MissingSignature | InboundError::InvalidSignature)) => {
            error_response(StatusCode::UNAUTHORIZED, e)
        }
        Err(e @ InboundError::MalformedPayload(_)) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
