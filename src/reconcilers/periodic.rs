// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Periodic reconciler - scans every namespace for each mapping and queues one
//! corrective task per mapping per cycle.

use crate::constants::defaults;
use crate::error::Result;
use crate::store::ClusterSecrets;
use crate::sync::plan::is_owned_by;
use crate::sync::{Enqueued, SyncTask, TaskOrigin, TaskQueueHandle};
use crate::types::{MappingRegistry, SecretMapping};
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub struct PeriodicReconciler {
    cluster: Arc<dyn ClusterSecrets>,
    registry: Arc<MappingRegistry>,
    queue: TaskQueueHandle,
    owner: String,
}

/// Counts from a single cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub queued: usize,
    pub duplicates_removed: usize,
    pub failed: usize,
}

impl PeriodicReconciler {
    pub fn new(
        cluster: Arc<dyn ClusterSecrets>,
        registry: Arc<MappingRegistry>,
        queue: TaskQueueHandle,
        owner: &str,
    ) -> Self {
        Self {
            cluster,
            registry,
            queue,
            owner: owner.to_string(),
        }
    }

    /// Run a cycle immediately and then once per `interval` until cancelled.
    /// A zero interval falls back to the default refresh interval.
    pub async fn run(self, interval: Duration, token: CancellationToken) -> anyhow::Result<()> {
        let interval = if interval.is_zero() {
            warn!("Refresh interval must be positive, using the default");
            Duration::from_secs(defaults::REFRESH_INTERVAL_SECS)
        } else {
            interval
        };

        info!(
            "Periodic reconciler started for {} mappings, interval {:?}",
            self.registry.len(),
            interval
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // A cycle blocked on a full queue must not hold up shutdown
            tokio::select! {
                _ = token.cancelled() => break,
                report = self.run_cycle() => debug!("Reconciliation cycle finished: {:?}", report),
            }
        }

        info!("Periodic reconciler stopped");
        Ok(())
    }

    /// One pass over every mapping
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let namespaces = match self.cluster.list_namespaces().await {
            Ok(namespaces) => namespaces,
            Err(e) => {
                error!("Failed to list namespaces, skipping cycle: {}", e);
                return report;
            }
        };

        for mapping in self.registry.iter() {
            let found = match self.scan(mapping, &namespaces, &mut report).await {
                Ok(found) => found,
                Err(e) => {
                    error!("Skipping {} this cycle: {}", mapping, e);
                    report.failed += 1;
                    continue;
                }
            };

            let task = if found {
                SyncTask::update(mapping.clone(), TaskOrigin::Periodic)
            } else {
                SyncTask::create(mapping.clone(), TaskOrigin::Periodic)
            };

            match self.queue.enqueue(task).await {
                Enqueued::Queued => report.queued += 1,
                Enqueued::Closed | Enqueued::Dropped => {
                    warn!("Task queue closed, abandoning cycle");
                    break;
                }
            }
        }

        report
    }

    /// Look for the mapping's secret in every namespace, deleting managed copies in
    /// the wrong place. Returns whether the secret exists at its declared location.
    #[instrument(
        skip(self, mapping, namespaces, report),
        fields(namespace = %mapping.destination_namespace, name = %mapping.destination_name)
    )]
    async fn scan(
        &self,
        mapping: &SecretMapping,
        namespaces: &[String],
        report: &mut CycleReport,
    ) -> Result<bool> {
        let mut found = false;

        for namespace in namespaces {
            let Some(secret) = self.cluster.get(namespace, &mapping.destination_name).await? else {
                continue;
            };

            let actual_namespace = secret.namespace().unwrap_or_else(|| namespace.clone());
            if actual_namespace == mapping.destination_namespace {
                found = true;
                continue;
            }

            // Another mapping may legitimately target the same name here
            if self
                .registry
                .find(&actual_namespace, &mapping.destination_name)
                .is_some()
            {
                continue;
            }

            if !is_owned_by(&secret, &self.owner) {
                warn!(
                    "Secret {}/{} shares the name but is not managed by {}, leaving it",
                    actual_namespace, mapping.destination_name, self.owner
                );
                continue;
            }

            info!(
                "Secret {} found in namespace {}, deleting misplaced copy",
                mapping, actual_namespace
            );
            self.cluster
                .delete(&actual_namespace, &mapping.destination_name)
                .await?;
            report.duplicates_removed += 1;
        }

        Ok(found)
    }
}
