// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake origin tracker for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{OriginError, OriginSource};
use async_trait::async_trait;
use ferry_core::config::TrackerEndpoint;
use ferry_core::{FieldValue, Item, ItemId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Recorded origin call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginCall {
    ListPending { project: String },
    GetItem { id: ItemId },
    WriteBack { id: ItemId, field: u32, value: String },
    Annotate { id: ItemId, note: String },
}

#[derive(Default)]
struct FakeOriginState {
    items: BTreeMap<ItemId, Item>,
    calls: Vec<OriginCall>,
    list_error: Option<OriginError>,
    write_back_error: Option<OriginError>,
    endpoint_url: Option<String>,
}

/// In-memory origin tracker
///
/// Successful write-backs update the stored item, so a later listing no
/// longer reports it as pending.
#[derive(Clone, Default)]
pub struct FakeOrigin {
    inner: Arc<Mutex<FakeOriginState>>,
}

impl FakeOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&self, item: Item) {
        self.lock().items.insert(item.id, item);
    }

    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.lock().items.get(&id).cloned()
    }

    pub fn fail_list(&self, error: Option<OriginError>) {
        self.lock().list_error = error;
    }

    pub fn fail_write_back(&self, error: Option<OriginError>) {
        self.lock().write_back_error = error;
    }

    pub fn calls(&self) -> Vec<OriginCall> {
        self.lock().calls.clone()
    }

    /// Notes added to an item, in order
    pub fn notes(&self, id: ItemId) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                OriginCall::Annotate { id: i, note } if *i == id => Some(note.clone()),
                _ => None,
            })
            .collect()
    }

    /// URL of the endpoint from the last `configure` call
    pub fn endpoint_url(&self) -> Option<String> {
        self.lock().endpoint_url.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeOriginState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OriginSource for FakeOrigin {
    async fn list_pending_items(
        &self,
        project: &str,
        target_field: u32,
        reference_field: u32,
    ) -> Result<Vec<Item>, OriginError> {
        let mut state = self.lock();
        state.calls.push(OriginCall::ListPending {
            project: project.to_string(),
        });
        if let Some(err) = &state.list_error {
            return Err(err.clone());
        }
        Ok(state
            .items
            .values()
            .rev()
            .filter(|item| item.project.is_empty() || item.project == project)
            .filter(|item| !item.field(target_field).is_blank())
            .filter(|item| item.field(reference_field).is_blank())
            .cloned()
            .collect())
    }

    async fn get_item(&self, id: ItemId) -> Result<Item, OriginError> {
        let mut state = self.lock();
        state.calls.push(OriginCall::GetItem { id });
        state.items.get(&id).cloned().ok_or(OriginError::NotFound(id))
    }

    async fn write_back_reference(
        &self,
        id: ItemId,
        field: u32,
        value: &str,
    ) -> Result<(), OriginError> {
        let mut state = self.lock();
        state.calls.push(OriginCall::WriteBack {
            id,
            field,
            value: value.to_string(),
        });
        if let Some(err) = &state.write_back_error {
            return Err(err.clone());
        }
        let item = state.items.get_mut(&id).ok_or(OriginError::NotFound(id))?;
        item.fields
            .insert(field, FieldValue::Text(value.to_string()));
        Ok(())
    }

    async fn annotate(&self, id: ItemId, note: &str) -> Result<(), OriginError> {
        self.lock().calls.push(OriginCall::Annotate {
            id,
            note: note.to_string(),
        });
        Ok(())
    }

    fn configure(&self, endpoint: Option<&TrackerEndpoint>) {
        self.lock().endpoint_url = endpoint.map(|e| e.url.clone());
    }
}
