// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Static partitioning of mappings across operator replicas.

use crate::error::{Result, SyncError};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// The bucket of destination names this replica is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Shard {
    #[serde(default)]
    pub index: u32,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

impl Default for Shard {
    fn default() -> Self {
        Self { index: 0, count: 1 }
    }
}

impl Shard {
    pub fn new(index: u32, count: u32) -> Result<Self> {
        let shard = Self { index, count };
        shard.validate()?;
        Ok(shard)
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(SyncError::ConfigError("shard count must be at least 1".into()));
        }
        if self.index >= self.count {
            return Err(SyncError::ConfigError(format!(
                "shard index {} is out of range for {} shards",
                self.index, self.count
            )));
        }
        Ok(())
    }

    /// Whether a destination name hashes into this shard
    pub fn contains(&self, destination_name: &str) -> bool {
        if self.count <= 1 {
            return true;
        }
        let digest = Sha256::digest(destination_name.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix) % u64::from(self.count) == u64::from(self.index)
    }

    /// Parse a shard index from either a plain number or a StatefulSet pod name
    /// such as `vault-sync-2`
    pub fn parse_index(value: &str) -> Result<u32> {
        let ordinal = value.rsplit('-').next().unwrap_or(value);
        ordinal.trim().parse().map_err(|_| {
            SyncError::ConfigError(format!("cannot derive a shard index from '{}'", value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_shard_contains_everything() {
        let shard = Shard::default();
        assert!(shard.contains("db-secret"));
        assert!(shard.contains("anything"));
    }

    #[test]
    fn test_every_name_lands_in_exactly_one_shard() {
        let names = ["a", "db-secret", "api-key", "tls", "registry-creds", "x-y-z"];
        for name in names {
            let owners = (0..3)
                .filter(|i| Shard::new(*i, 3).unwrap().contains(name))
                .count();
            assert_eq!(owners, 1, "{} should belong to exactly one shard", name);
        }
    }

    #[test]
    fn test_bucketing_is_deterministic() {
        let shard = Shard::new(1, 4).unwrap();
        assert_eq!(shard.contains("db-secret"), shard.contains("db-secret"));
    }

    #[test]
    fn test_new_rejects_out_of_range_index() {
        assert!(Shard::new(2, 2).is_err());
        assert!(Shard::new(0, 0).is_err());
    }

    #[test]
    fn test_parse_index_plain_number() {
        assert_eq!(Shard::parse_index("3").unwrap(), 3);
    }

    #[test]
    fn test_parse_index_statefulset_hostname() {
        assert_eq!(Shard::parse_index("vault-sync-2").unwrap(), 2);
    }

    #[test]
    fn test_parse_index_invalid() {
        assert!(Shard::parse_index("vault-sync").is_err());
    }
}
