// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deletion watcher - recreates managed secrets as soon as they are deleted.

use crate::constants::labels;
use crate::store::{ClusterSecrets, SecretRef};
use crate::sync::{Enqueued, SyncTask, TaskOrigin, TaskQueueHandle};
use crate::types::MappingRegistry;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct DeletionWatcher {
    cluster: Arc<dyn ClusterSecrets>,
    registry: Arc<MappingRegistry>,
    queue: TaskQueueHandle,
    owner: String,
    enqueue_timeout: Duration,
}

impl DeletionWatcher {
    pub fn new(
        cluster: Arc<dyn ClusterSecrets>,
        registry: Arc<MappingRegistry>,
        queue: TaskQueueHandle,
        owner: &str,
        enqueue_timeout: Duration,
    ) -> Self {
        Self {
            cluster,
            registry,
            queue,
            owner: owner.to_string(),
            enqueue_timeout,
        }
    }

    pub fn label_selector(&self) -> String {
        format!("{}={}", labels::MANAGED_BY, self.owner)
    }

    pub async fn run(self, token: CancellationToken) -> anyhow::Result<()> {
        let selector = self.label_selector();
        info!("Watching deletions of secrets labelled {}", selector);

        let mut deletions = self.cluster.watch_deletions(&selector);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                next = deletions.next() => match next {
                    Some(Ok(deleted)) => {
                        self.handle_deletion(&deleted).await;
                    }
                    Some(Err(e)) => warn!("Deletion watch error: {}", e),
                    None => {
                        warn!("Deletion watch stream ended");
                        break;
                    }
                },
            }
        }

        info!("Deletion watcher stopped");
        Ok(())
    }

    /// Queue a recreation for a deleted secret if a mapping declares it.
    /// Returns whether a task was queued.
    pub async fn handle_deletion(&self, deleted: &SecretRef) -> bool {
        let Some(mapping) = self.registry.find(&deleted.namespace, &deleted.name) else {
            debug!(
                "Deleted secret {}/{} has no mapping, ignoring",
                deleted.namespace, deleted.name
            );
            return false;
        };

        info!("Secret {} deleted, scheduling recreation", mapping);

        match self
            .queue
            .enqueue_within(
                SyncTask::create(mapping.clone(), TaskOrigin::Deletion),
                self.enqueue_timeout,
            )
            .await
        {
            Enqueued::Queued => true,
            Enqueued::Dropped => {
                warn!(
                    "Task queue full for {:?}, dropping recreation of {}; the next cycle will restore it",
                    self.enqueue_timeout, mapping
                );
                false
            }
            Enqueued::Closed => {
                debug!("Task queue closed, not recreating {}", mapping);
                false
            }
        }
    }
}
