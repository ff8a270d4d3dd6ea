// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Declared secret mappings and the registry that holds them.

use crate::constants::DEFAULT_SECRET_TYPE;
use crate::error::{Result, SyncError};
use crate::types::shard::Shard;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Version of the Vault key/value engine mounted at a mapping's path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum KvVersion {
    /// The read result is the secret itself
    V1,
    /// The secret is nested under the read result's `data` key
    V2,
}

impl TryFrom<u8> for KvVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(KvVersion::V1),
            2 => Ok(KvVersion::V2),
            other => Err(format!("kv_version must be 1 or 2, got {}", other)),
        }
    }
}

/// A Vault path and the Kubernetes secret it is materialized as
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecretMapping {
    /// Logical Vault path, e.g. `secret/data/db/creds`
    #[serde(alias = "source_path")]
    pub path: String,
    pub destination_namespace: String,
    pub destination_name: String,
    /// Kubernetes secret type, `Opaque` when unset
    #[serde(default, rename = "type")]
    pub secret_type: Option<String>,
    /// KV engine version; inferred from the path when unset
    #[serde(default)]
    pub kv_version: Option<KvVersion>,
}

impl SecretMapping {
    pub fn new(path: &str, destination_namespace: &str, destination_name: &str) -> Self {
        Self {
            path: path.to_string(),
            destination_namespace: destination_namespace.to_string(),
            destination_name: destination_name.to_string(),
            secret_type: None,
            kv_version: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(SyncError::InvalidMapping(format!(
                "path is required (destination {})",
                self
            )));
        }
        if self.destination_namespace.trim().is_empty() {
            return Err(SyncError::InvalidMapping(format!(
                "destination_namespace is required (path {})",
                self.path
            )));
        }
        if self.destination_name.trim().is_empty() {
            return Err(SyncError::InvalidMapping(format!(
                "destination_name is required (path {})",
                self.path
            )));
        }
        Ok(())
    }

    pub fn secret_type(&self) -> &str {
        self.secret_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_SECRET_TYPE)
    }

    /// The configured KV version, or V2 when the path has the `<mount>/data/...` form
    pub fn kv_version(&self) -> KvVersion {
        if let Some(version) = self.kv_version {
            return version;
        }
        match self.path.trim_start_matches('/').split('/').nth(1) {
            Some("data") => KvVersion::V2,
            _ => KvVersion::V1,
        }
    }

    pub fn targets(&self, namespace: &str, name: &str) -> bool {
        self.destination_namespace == namespace && self.destination_name == name
    }
}

impl fmt::Display for SecretMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.destination_namespace, self.destination_name)
    }
}

/// Validated, read-only set of mappings this replica reconciles
#[derive(Debug, Clone)]
pub struct MappingRegistry {
    mappings: Vec<Arc<SecretMapping>>,
}

impl MappingRegistry {
    /// Validate every mapping and keep the ones that fall in `shard`.
    ///
    /// Duplicate destinations are rejected across the full list, not only within the
    /// shard, so every replica agrees on whether the configuration is valid.
    pub fn new(mappings: Vec<SecretMapping>, shard: Shard) -> Result<Self> {
        let mut seen = HashSet::new();
        for mapping in &mappings {
            mapping.validate()?;
            let key = (
                mapping.destination_namespace.as_str(),
                mapping.destination_name.as_str(),
            );
            if !seen.insert(key) {
                return Err(SyncError::DuplicateDestination {
                    namespace: key.0.to_string(),
                    name: key.1.to_string(),
                });
            }
        }

        let mappings = mappings
            .into_iter()
            .filter(|m| shard.contains(&m.destination_name))
            .map(Arc::new)
            .collect();

        Ok(Self { mappings })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SecretMapping>> {
        self.mappings.iter()
    }

    /// The mapping whose destination is exactly `namespace/name`, if this replica owns it
    pub fn find(&self, namespace: &str, name: &str) -> Option<Arc<SecretMapping>> {
        self.mappings
            .iter()
            .find(|m| m.targets(namespace, name))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
