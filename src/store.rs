// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Interfaces to the two external systems: the Vault secret store and the
//! cluster's Secret objects.

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Secret;
use serde_json::{Map, Value};

/// Read access to the external key-value secret store
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// The `data` object of a logical read at `path`, or `None` if nothing is stored there
    async fn read(&self, path: &str) -> Result<Option<Map<String, Value>>>;
}

/// Result of a create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Identity of a Secret that was removed from the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

/// Operations on the cluster's Secret objects
#[async_trait]
pub trait ClusterSecrets: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// The secret at `namespace/name`, or `None` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    async fn create(&self, namespace: &str, secret: &Secret) -> Result<CreateOutcome>;

    async fn replace(&self, namespace: &str, secret: &Secret) -> Result<()>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;

    /// Stream of deletions of secrets matching `label_selector`, for as long as the
    /// stream is polled
    fn watch_deletions(&self, label_selector: &str) -> BoxStream<'static, Result<SecretRef>>;
}
