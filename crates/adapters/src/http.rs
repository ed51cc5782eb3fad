// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking HTTP plumbing shared by the REST adapters
//!
//! Requests run on the blocking pool so slow remotes never stall the runtime.

use std::time::Duration;
use ureq::Agent;

/// Build an agent that returns non-2xx responses instead of erroring
pub(crate) fn agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}

/// Status and body of a completed request
#[derive(Debug)]
pub(crate) struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn from_response(mut response: ureq::http::Response<ureq::Body>) -> Result<Self, String> {
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| format!("failed to read response body: {}", e))?;
        Ok(Self { status, body })
    }

    pub fn is(&self, codes: &[u16]) -> bool {
        codes.contains(&self.status)
    }

    /// Short body excerpt for error messages
    pub fn excerpt(&self) -> String {
        const LIMIT: usize = 512;
        let trimmed = self.body.trim();
        match trimmed.char_indices().nth(LIMIT) {
            Some((idx, _)) => format!("{}…", &trimmed[..idx]),
            None => trimmed.to_string(),
        }
    }
}

/// Run a blocking request closure on the blocking pool
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, String> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("request task failed: {}", e))?
}
