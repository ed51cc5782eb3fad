// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::mirror::{MirrorError, MirrorSource};
use crate::origin::{OriginError, OriginSource};
use crate::sink::{CreatedItem, ItemSink, NewItem, SinkError};
use async_trait::async_trait;
use ferry_core::config::{GitSettings, RemoteEndpoint, TrackerEndpoint};
use ferry_core::{Item, ItemId};
use std::path::Path;
use std::time::Instant;
use tracing::Instrument;

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Wrapper that adds tracing to any MirrorSource
#[derive(Clone)]
pub struct TracedMirror<M> {
    inner: M,
}

impl<M> TracedMirror<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: MirrorSource> MirrorSource for TracedMirror<M> {
    async fn exists(&self, local_path: &Path) -> bool {
        let exists = self.inner.exists(local_path).await;
        tracing::trace!(path = %local_path.display(), exists, "checked mirror");
        exists
    }

    async fn clone_mirror(&self, url: &str, local_path: &Path) -> Result<String, MirrorError> {
        let span = tracing::info_span!("mirror.clone", url, path = %local_path.display());
        async {
            tracing::info!("cloning");
            let start = Instant::now();
            let result = self.inner.clone_mirror(url, local_path).await;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms = elapsed_ms(start), "mirror cloned"),
                Err(e) => tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "clone failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn fetch(&self, local_path: &Path) -> Result<String, MirrorError> {
        let span = tracing::info_span!("mirror.fetch", path = %local_path.display());
        async {
            let start = Instant::now();
            let result = self.inner.fetch(local_path).await;
            match &result {
                Ok(output) => tracing::info!(
                    elapsed_ms = elapsed_ms(start),
                    output_len = output.len(),
                    "fetched"
                ),
                Err(e) => tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "fetch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn configure(&self, settings: &GitSettings) {
        tracing::debug!(
            ssh_key = settings.ssh_key_path.is_some(),
            timeout_s = settings.timeout.as_secs(),
            "mirror settings updated"
        );
        self.inner.configure(settings);
    }
}

/// Wrapper that adds tracing to any OriginSource
#[derive(Clone)]
pub struct TracedOrigin<O> {
    inner: O,
}

impl<O> TracedOrigin<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<O: OriginSource> OriginSource for TracedOrigin<O> {
    async fn list_pending_items(
        &self,
        project: &str,
        target_field: u32,
        reference_field: u32,
    ) -> Result<Vec<Item>, OriginError> {
        let span = tracing::info_span!("origin.list_pending", project);
        async {
            let start = Instant::now();
            let result = self
                .inner
                .list_pending_items(project, target_field, reference_field)
                .await;
            match &result {
                Ok(items) => tracing::info!(
                    elapsed_ms = elapsed_ms(start),
                    count = items.len(),
                    "listed pending items"
                ),
                Err(e) => tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "list failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get_item(&self, id: ItemId) -> Result<Item, OriginError> {
        let span = tracing::info_span!("origin.get_item", item_id = id);
        async {
            let result = self.inner.get_item(id).await;
            match &result {
                Ok(_) => tracing::debug!("fetched item"),
                Err(e) => tracing::warn!(error = %e, "get item failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn write_back_reference(
        &self,
        id: ItemId,
        field: u32,
        value: &str,
    ) -> Result<(), OriginError> {
        let span = tracing::info_span!("origin.write_back", item_id = id, field);
        async {
            let result = self.inner.write_back_reference(id, field, value).await;
            match &result {
                Ok(()) => tracing::info!(value, "reference written back"),
                Err(e) => tracing::warn!(error = %e, "write-back failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn annotate(&self, id: ItemId, note: &str) -> Result<(), OriginError> {
        let span = tracing::info_span!("origin.annotate", item_id = id);
        async {
            let result = self.inner.annotate(id, note).await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "annotate failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    fn configure(&self, endpoint: Option<&TrackerEndpoint>) {
        tracing::debug!(url = ?endpoint.map(|e| e.url.as_str()), "tracker endpoint updated");
        self.inner.configure(endpoint);
    }
}

/// Wrapper that adds tracing to any ItemSink
#[derive(Clone)]
pub struct TracedSink<S> {
    inner: S,
}

impl<S> TracedSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ItemSink> ItemSink for TracedSink<S> {
    async fn create_item(&self, target: &str, item: &NewItem) -> Result<CreatedItem, SinkError> {
        let span = tracing::info_span!("sink.create_item", repo = target);
        async {
            tracing::info!(title = %item.title, labels = ?item.labels, "creating");
            let start = Instant::now();
            let result = self.inner.create_item(target, item).await;
            match &result {
                Ok(created) => tracing::info!(
                    elapsed_ms = elapsed_ms(start),
                    number = created.number,
                    url = %created.url,
                    "item created"
                ),
                Err(e) => tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "create failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn validate_target(&self, target: &str) -> Result<(), SinkError> {
        let span = tracing::info_span!("sink.validate_target", repo = target);
        async {
            let result = self.inner.validate_target(target).await;
            match &result {
                Ok(()) => tracing::debug!("target valid"),
                Err(e) => tracing::warn!(error = %e, "target invalid"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn configure(&self, endpoint: Option<&RemoteEndpoint>) {
        tracing::debug!(api_url = ?endpoint.map(|e| e.api_url.as_str()), "remote endpoint updated");
        self.inner.configure(endpoint);
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
