// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signed inbound notifications
//!
//! A notification names one origin item. Once the signature checks out the
//! caller is answered immediately and the item-scoped run happens on a
//! background task. Background runs are bounded by a semaphore, watched with
//! a timeout and counted.

use crate::error::InboundError;
use crate::executor::SyncExecutor;
use crate::scheduler::Scheduler;
use ferry_core::{Clock, ConfigHolder, ItemId, TaskId};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::Instrument;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex>`
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Default number of item runs dispatched at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Default time a dispatch is watched before it is counted as timed out
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Body of an item-changed notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChanged {
    #[serde(alias = "issue_id")]
    pub item_id: ItemId,
    pub project_identifier: String,
    #[serde(default, alias = "target_repo", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Check `header` against the HMAC-SHA256 of `body`
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<(), InboundError> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(InboundError::MissingSignature)?;
    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or(InboundError::InvalidSignature)?;
    let expected = hex::decode(hex_digest).map_err(|_| InboundError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| InboundError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| InboundError::InvalidSignature)
}

/// `sha256=<hex>` signature for `body`, as a sender computes it
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

/// Dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InboundStats {
    pub accepted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
}

/// Verifies notifications and dispatches item runs to the scheduler
pub struct InboundTrigger<E, C> {
    holder: Arc<ConfigHolder>,
    scheduler: Arc<Scheduler<E, C>>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    counters: Arc<Counters>,
}

impl<E: SyncExecutor, C: Clock> InboundTrigger<E, C> {
    pub fn new(holder: Arc<ConfigHolder>, scheduler: Arc<Scheduler<E, C>>) -> Self {
        Self::with_limits(holder, scheduler, DEFAULT_MAX_IN_FLIGHT, DEFAULT_DISPATCH_TIMEOUT)
    }

    pub fn with_limits(
        holder: Arc<ConfigHolder>,
        scheduler: Arc<Scheduler<E, C>>,
        max_in_flight: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            holder,
            scheduler,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            timeout,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Verify and decode a notification, then dispatch it in the background
    ///
    /// The secret is read from the live configuration on every call; with
    /// no secret configured, signatures are not checked.
    pub fn accept(&self, body: &[u8], signature: Option<&str>) -> Result<ItemChanged, InboundError> {
        if let Some(secret) = self.holder.get().webhook_secret() {
            if let Err(e) = verify_signature(&secret, body, signature) {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "inbound notification rejected");
                return Err(e);
            }
        }

        let payload: ItemChanged = serde_json::from_slice(body).map_err(|e| {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            InboundError::MalformedPayload(e.to_string())
        })?;

        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            item_id = payload.item_id,
            project = %payload.project_identifier,
            action = payload.action.as_deref().unwrap_or_default(),
            "inbound notification accepted"
        );
        self.dispatch(&payload);
        Ok(payload)
    }

    fn dispatch(&self, payload: &ItemChanged) {
        let scheduler = Arc::clone(&self.scheduler);
        let permits = Arc::clone(&self.permits);
        let counters = Arc::clone(&self.counters);
        let timeout = self.timeout;
        let task = TaskId::new(payload.project_identifier.clone());
        let item_id = payload.item_id;
        let span = tracing::info_span!("inbound", task = %task, item_id);

        tokio::spawn(
            async move {
                let Ok(permit) = permits.acquire_owned().await else {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    return;
                };
                // A timeout only stops the watch; the run keeps its permit
                let mut run = tokio::spawn(
                    async move {
                        let outcome = scheduler.trigger_item(&task, item_id).await;
                        drop(permit);
                        outcome
                    }
                    .in_current_span(),
                );

                match tokio::time::timeout(timeout, &mut run).await {
                    Ok(Ok(Ok(Some(result)))) if result.success => {
                        counters.completed.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(message = %result.message, "inbound run completed");
                    }
                    Ok(Ok(Ok(Some(result)))) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(message = %result.message, "inbound run failed");
                    }
                    Ok(Ok(Ok(None))) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("no live task for inbound notification");
                    }
                    Ok(Ok(Err(e))) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(error = %e, "inbound run refused");
                    }
                    Ok(Err(e)) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(error = %e, "inbound run panicked");
                    }
                    Err(_) => {
                        counters.timed_out.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            timeout_secs = timeout.as_secs(),
                            "inbound run still in flight after timeout"
                        );
                    }
                }
            }
            .instrument(span),
        );
    }

    pub fn stats(&self) -> InboundStats {
        InboundStats {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "inbound_tests.rs"]
mod tests;
