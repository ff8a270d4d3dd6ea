// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create and update tasks: the only code that writes managed secrets.

use crate::error::{Result, SyncError};
use crate::store::{ClusterSecrets, CreateOutcome, SecretStore};
use crate::sync::plan::{is_owned_by, owner_of, plan_update, DesiredSecret, UpdatePlan};
use crate::sync::task::{SyncTask, TaskKind};
use crate::types::{SecretMapping, SecretPayload};
use k8s_openapi::api::core::v1::Secret;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Final state of one executed task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
    Conflict,
    Failed,
}

pub struct UpsertExecutor {
    vault: Arc<dyn SecretStore>,
    cluster: Arc<dyn ClusterSecrets>,
    owner: String,
}

impl UpsertExecutor {
    pub fn new(vault: Arc<dyn SecretStore>, cluster: Arc<dyn ClusterSecrets>, owner: &str) -> Self {
        Self {
            vault,
            cluster,
            owner: owner.to_string(),
        }
    }

    /// Run a task to completion. Failures are logged here and never propagate.
    pub async fn execute(&self, task: SyncTask) -> Outcome {
        let mapping = task.mapping.as_ref();
        let result = match task.kind {
            TaskKind::Create => self.create(mapping).await,
            TaskKind::Update => self.update(mapping).await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e @ SyncError::Conflict { .. }) => {
                warn!(origin = ?task.origin, "Refusing to overwrite secret: {}", e);
                Outcome::Conflict
            }
            Err(e) => {
                error!(
                    origin = ?task.origin,
                    "Failed to sync secret {} from {}: {}",
                    mapping, mapping.path, e
                );
                Outcome::Failed
            }
        }
    }

    /// Create the destination secret, falling back to an update if it already exists
    #[instrument(
        skip(self, mapping),
        fields(namespace = %mapping.destination_namespace, name = %mapping.destination_name)
    )]
    pub async fn create(&self, mapping: &SecretMapping) -> Result<Outcome> {
        let desired = self.desired(mapping).await?;

        match self
            .cluster
            .create(&mapping.destination_namespace, &desired.secret)
            .await?
        {
            CreateOutcome::Created => {
                info!("Created secret {} from {}", mapping, mapping.path);
                Ok(Outcome::Created)
            }
            CreateOutcome::AlreadyExists => {
                debug!("Secret {} already exists, updating instead", mapping);
                let existing = self
                    .cluster
                    .get(&mapping.destination_namespace, &mapping.destination_name)
                    .await?
                    .ok_or_else(|| SyncError::Vanished {
                        namespace: mapping.destination_namespace.clone(),
                        name: mapping.destination_name.clone(),
                    })?;
                self.reconcile_existing(mapping, &existing, Some(desired))
                    .await
            }
        }
    }

    /// Bring an existing destination secret up to date, creating it if it is gone
    #[instrument(
        skip(self, mapping),
        fields(namespace = %mapping.destination_namespace, name = %mapping.destination_name)
    )]
    pub async fn update(&self, mapping: &SecretMapping) -> Result<Outcome> {
        let existing = self
            .cluster
            .get(&mapping.destination_namespace, &mapping.destination_name)
            .await?;

        match existing {
            Some(existing) => self.reconcile_existing(mapping, &existing, None).await,
            None => {
                debug!("Secret {} no longer exists, creating it", mapping);
                self.create(mapping).await
            }
        }
    }

    async fn reconcile_existing(
        &self,
        mapping: &SecretMapping,
        existing: &Secret,
        desired: Option<DesiredSecret>,
    ) -> Result<Outcome> {
        // Checked before reading Vault so foreign secrets cost nothing
        if !is_owned_by(existing, &self.owner) {
            return Err(self.conflict(mapping, existing));
        }

        let desired = match desired {
            Some(d) => d,
            None => self.desired(mapping).await?,
        };

        match plan_update(&desired, existing, &self.owner) {
            UpdatePlan::Unchanged => {
                debug!("Secret {} is up to date", mapping);
                Ok(Outcome::Unchanged)
            }
            UpdatePlan::Replace(secret) => {
                self.cluster
                    .replace(&mapping.destination_namespace, &secret)
                    .await?;
                info!("Updated secret {} from {}", mapping, mapping.path);
                Ok(Outcome::Updated)
            }
            UpdatePlan::Conflict { .. } => Err(self.conflict(mapping, existing)),
        }
    }

    /// Read the mapping's source and build the secret it should produce
    async fn desired(&self, mapping: &SecretMapping) -> Result<DesiredSecret> {
        let response = self
            .vault
            .read(&mapping.path)
            .await?
            .ok_or_else(|| SyncError::EmptyPayload(mapping.path.clone()))?;

        let payload = SecretPayload::from_vault(&mapping.path, mapping.kv_version(), &response)?;
        Ok(DesiredSecret::new(mapping, payload, &self.owner))
    }

    fn conflict(&self, mapping: &SecretMapping, existing: &Secret) -> SyncError {
        debug!(found_owner = ?owner_of(existing), "Ownership check failed");
        SyncError::Conflict {
            namespace: mapping.destination_namespace.clone(),
            name: mapping.destination_name.clone(),
            owner: self.owner.clone(),
        }
    }
}
