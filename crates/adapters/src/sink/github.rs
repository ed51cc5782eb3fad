// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub REST item sink

use super::{CreatedItem, ItemSink, NewItem, SinkError};
use crate::http::{self, Reply};
use async_trait::async_trait;
use ferry_core::config::RemoteEndpoint;
use serde::Deserialize;
use std::sync::{Arc, RwLock};

const ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Clone)]
struct Client {
    endpoint: RemoteEndpoint,
    agent: ureq::Agent,
}

impl Client {
    fn authorization(&self) -> String {
        format!("token {}", self.endpoint.token)
    }
}

/// Item sink creating GitHub issues
#[derive(Clone, Default)]
pub struct GithubSink {
    client: Arc<RwLock<Option<Client>>>,
}

impl GithubSink {
    pub fn new(endpoint: Option<&RemoteEndpoint>) -> Self {
        let sink = Self::default();
        sink.configure(endpoint);
        sink
    }

    fn client(&self) -> Result<Client, SinkError> {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(SinkError::NotConfigured)
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
    #[serde(default)]
    html_url: Option<String>,
}

/// Browser URL of an issue
pub(crate) fn issue_url(web_url: &str, target: &str, number: u64) -> String {
    format!("{}/{}/issues/{}", web_url.trim_end_matches('/'), target, number)
}

#[async_trait]
impl ItemSink for GithubSink {
    async fn create_item(&self, target: &str, item: &NewItem) -> Result<CreatedItem, SinkError> {
        let client = self.client()?;
        let url = format!("{}/repos/{}/issues", client.endpoint.api_url, target);
        let body = serde_json::to_string(item).map_err(|e| SinkError::Decode(e.to_string()))?;
        let web_url = client.endpoint.web_url.clone();

        let reply = http::blocking(move || {
            let response = client
                .agent
                .post(&url)
                .header("Authorization", client.authorization())
                .header("Accept", ACCEPT)
                .header("Content-Type", "application/json")
                .send(body)
                .map_err(|e| e.to_string())?;
            Reply::from_response(response)
        })
        .await
        .map_err(SinkError::Transport)?;

        match reply.status {
            201 => {
                let issue: IssueResponse = serde_json::from_str(&reply.body)
                    .map_err(|e| SinkError::Decode(e.to_string()))?;
                Ok(CreatedItem {
                    number: issue.number,
                    url: issue
                        .html_url
                        .unwrap_or_else(|| issue_url(&web_url, target, issue.number)),
                })
            }
            404 => Err(SinkError::TargetNotFound(target.to_string())),
            status => Err(SinkError::Status {
                status,
                body: reply.excerpt(),
            }),
        }
    }

    async fn validate_target(&self, target: &str) -> Result<(), SinkError> {
        let client = self.client()?;
        let url = format!("{}/repos/{}", client.endpoint.api_url, target);
        let reply = http::blocking(move || {
            let response = client
                .agent
                .get(&url)
                .header("Authorization", client.authorization())
                .header("Accept", ACCEPT)
                .call()
                .map_err(|e| e.to_string())?;
            Reply::from_response(response)
        })
        .await
        .map_err(SinkError::Transport)?;

        match reply.status {
            200 => Ok(()),
            404 => Err(SinkError::TargetNotFound(target.to_string())),
            status => Err(SinkError::Status {
                status,
                body: reply.excerpt(),
            }),
        }
    }

    fn configure(&self, endpoint: Option<&RemoteEndpoint>) {
        let client = endpoint.map(|endpoint| Client {
            endpoint: endpoint.clone(),
            agent: http::agent(endpoint.timeout),
        });
        *self.client.write().unwrap_or_else(|e| e.into_inner()) = client;
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
