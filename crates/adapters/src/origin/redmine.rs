// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redmine REST origin adapter

use super::{OriginError, OriginSource};
use crate::http::{self, Reply};
use async_trait::async_trait;
use ferry_core::config::TrackerEndpoint;
use ferry_core::{FieldValue, Item, ItemId};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

const API_KEY_HEADER: &str = "X-Redmine-API-Key";
const PAGE_LIMIT: &str = "100";

#[derive(Clone)]
struct Client {
    endpoint: TrackerEndpoint,
    agent: ureq::Agent,
}

/// Origin adapter speaking the Redmine JSON API
#[derive(Clone, Default)]
pub struct RedmineOrigin {
    client: Arc<RwLock<Option<Client>>>,
}

impl RedmineOrigin {
    pub fn new(endpoint: Option<&TrackerEndpoint>) -> Self {
        let origin = Self::default();
        origin.configure(endpoint);
        origin
    }

    fn client(&self) -> Result<Client, OriginError> {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(OriginError::NotConfigured)
    }
}

#[async_trait]
impl OriginSource for RedmineOrigin {
    async fn list_pending_items(
        &self,
        project: &str,
        target_field: u32,
        reference_field: u32,
    ) -> Result<Vec<Item>, OriginError> {
        let client = self.client()?;
        let url = format!("{}/issues.json", client.endpoint.url);
        let project = project.to_string();
        let reply = http::blocking(move || {
            let response = client
                .agent
                .get(&url)
                .header(API_KEY_HEADER, &client.endpoint.api_key)
                .query("project_id", &project)
                .query("status_id", "*")
                .query(format!("cf_{}", target_field), "*")
                .query("limit", PAGE_LIMIT)
                .query("sort", "created_on:desc")
                .call()
                .map_err(|e| e.to_string())?;
            Reply::from_response(response)
        })
        .await
        .map_err(OriginError::Transport)?;

        if !reply.is(&[200]) {
            return Err(OriginError::Status {
                status: reply.status,
                body: reply.excerpt(),
            });
        }
        let items = decode_issues(&reply.body)?;
        Ok(pending_only(items, target_field, reference_field))
    }

    async fn get_item(&self, id: ItemId) -> Result<Item, OriginError> {
        let client = self.client()?;
        let url = format!("{}/issues/{}.json", client.endpoint.url, id);
        let reply = http::blocking(move || {
            let response = client
                .agent
                .get(&url)
                .header(API_KEY_HEADER, &client.endpoint.api_key)
                .call()
                .map_err(|e| e.to_string())?;
            Reply::from_response(response)
        })
        .await
        .map_err(OriginError::Transport)?;

        match reply.status {
            200 => decode_issue(&reply.body),
            404 => Err(OriginError::NotFound(id)),
            status => Err(OriginError::Status {
                status,
                body: reply.excerpt(),
            }),
        }
    }

    async fn write_back_reference(
        &self,
        id: ItemId,
        field: u32,
        value: &str,
    ) -> Result<(), OriginError> {
        let payload = serde_json::json!({
            "issue": { "custom_fields": [{ "id": field, "value": value }] }
        });
        self.update(id, payload).await
    }

    async fn annotate(&self, id: ItemId, note: &str) -> Result<(), OriginError> {
        let payload = serde_json::json!({ "issue": { "notes": note } });
        self.update(id, payload).await
    }

    fn configure(&self, endpoint: Option<&TrackerEndpoint>) {
        let client = endpoint.map(|endpoint| Client {
            endpoint: endpoint.clone(),
            agent: http::agent(endpoint.timeout),
        });
        *self.client.write().unwrap_or_else(|e| e.into_inner()) = client;
    }
}

impl RedmineOrigin {
    async fn update(&self, id: ItemId, payload: serde_json::Value) -> Result<(), OriginError> {
        let client = self.client()?;
        let url = format!("{}/issues/{}.json", client.endpoint.url, id);
        let body = payload.to_string();
        let reply = http::blocking(move || {
            let response = client
                .agent
                .put(&url)
                .header(API_KEY_HEADER, &client.endpoint.api_key)
                .header("Content-Type", "application/json")
                .send(body)
                .map_err(|e| e.to_string())?;
            Reply::from_response(response)
        })
        .await
        .map_err(OriginError::Transport)?;

        match reply.status {
            200 | 204 => Ok(()),
            404 => Err(OriginError::NotFound(id)),
            status => Err(OriginError::Status {
                status,
                body: reply.excerpt(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssuesResponse {
    #[serde(default)]
    issues: Vec<RedmineIssue>,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    issue: RedmineIssue,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CustomField {
    id: u32,
    #[serde(default)]
    value: FieldValue,
}

#[derive(Debug, Deserialize)]
struct RedmineIssue {
    id: ItemId,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    description: Option<String>,
    project: Option<Named>,
    tracker: Option<Named>,
    priority: Option<Named>,
    author: Option<Named>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    custom_fields: Vec<CustomField>,
}

impl From<RedmineIssue> for Item {
    fn from(issue: RedmineIssue) -> Self {
        let name = |n: Option<Named>| n.map(|n| n.name).unwrap_or_default();
        Item {
            id: issue.id,
            subject: issue.subject,
            description: issue.description.unwrap_or_default(),
            project: name(issue.project),
            tracker: name(issue.tracker),
            priority: name(issue.priority),
            author: name(issue.author),
            created_on: issue.created_on,
            fields: issue
                .custom_fields
                .into_iter()
                .map(|f| (f.id, f.value))
                .collect::<BTreeMap<_, _>>(),
        }
    }
}

fn decode_issues(body: &str) -> Result<Vec<Item>, OriginError> {
    let response: IssuesResponse =
        serde_json::from_str(body).map_err(|e| OriginError::Decode(e.to_string()))?;
    Ok(response.issues.into_iter().map(Item::from).collect())
}

fn decode_issue(body: &str) -> Result<Item, OriginError> {
    let response: IssueResponse =
        serde_json::from_str(body).map_err(|e| OriginError::Decode(e.to_string()))?;
    Ok(response.issue.into())
}

/// Keep items whose target is set and whose reference is still empty
fn pending_only(items: Vec<Item>, target_field: u32, reference_field: u32) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| !item.field(target_field).is_blank())
        .filter(|item| item.field(reference_field).is_blank())
        .collect()
}

#[cfg(test)]
#[path = "redmine_tests.rs"]
mod tests;
