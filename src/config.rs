// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{defaults, vault, DEFAULT_OWNER};
use crate::error::{Result, SyncError};
use crate::types::{MappingRegistry, SecretMapping, Shard};
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Operator configuration, loaded from a YAML file with environment overrides
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seconds between reconciliation cycles; zero or absent falls back to the default
    #[serde(default)]
    pub refresh_interval: u64,
    /// Value written to the managed-by label
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub queue_capacity: usize,
    /// Seconds the deletion watcher may wait for queue space before dropping an event
    #[serde(default)]
    pub event_enqueue_timeout: u64,
    #[serde(default)]
    pub shard: Shard,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub secrets: Vec<SecretMapping>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_vault_addr")]
    pub address: String,
    #[serde(default)]
    pub namespace: Option<String>,
    /// HTTP timeout in seconds
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub auth: VaultAuth,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: default_vault_addr(),
            namespace: None,
            timeout: 0,
            auth: VaultAuth::default(),
        }
    }
}

/// How the operator obtains a Vault token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum VaultAuth {
    /// Service-account login against a Vault kubernetes auth mount
    Kubernetes {
        #[serde(default)]
        role: String,
        #[serde(default = "default_auth_mount")]
        mount: String,
        #[serde(default = "default_token_path")]
        token_path: String,
    },
    /// A static token
    Token {
        #[serde(default)]
        token: String,
    },
    /// Username and password against a Vault userpass auth mount
    Userpass {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
        #[serde(default = "default_userpass_mount")]
        mount: String,
    },
}

impl Default for VaultAuth {
    fn default() -> Self {
        VaultAuth::Kubernetes {
            role: String::new(),
            mount: default_auth_mount(),
            token_path: default_token_path(),
        }
    }
}

fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}

fn default_vault_addr() -> String {
    vault::DEFAULT_ADDR.to_string()
}

fn default_auth_mount() -> String {
    vault::DEFAULT_AUTH_MOUNT.to_string()
}

fn default_userpass_mount() -> String {
    vault::DEFAULT_USERPASS_MOUNT.to_string()
}

fn default_token_path() -> String {
    vault::DEFAULT_TOKEN_PATH.to_string()
}

impl Config {
    /// Load configuration from the file named by CONFIG_PATH and apply environment overrides
    pub fn from_env() -> anyhow::Result<Self> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| defaults::CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config
            .apply_overrides(|key| env::var(key).ok())
            .context("invalid environment override")?;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| SyncError::ConfigError(e.to_string()))
    }

    /// Apply overrides from a key lookup, normally the process environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("VAULT_ADDR") {
            self.vault.address = addr;
        }
        if let Some(token) = lookup("VAULT_TOKEN") {
            self.vault.auth = VaultAuth::Token { token };
        }
        if let (Some(username), Some(password)) = (lookup("VAULT_USERNAME"), lookup("VAULT_PASSWORD")) {
            let mount = match &self.vault.auth {
                VaultAuth::Userpass { mount, .. } => mount.clone(),
                _ => default_userpass_mount(),
            };
            self.vault.auth = VaultAuth::Userpass {
                username,
                password,
                mount,
            };
        }
        if let Some(new_role) = lookup("VAULT_ROLE") {
            if let VaultAuth::Kubernetes { role, .. } = &mut self.vault.auth {
                *role = new_role;
            }
        }
        if let Some(interval) = lookup("REFRESH_INTERVAL") {
            self.refresh_interval = interval.parse().map_err(|_| {
                SyncError::ConfigError(format!("REFRESH_INTERVAL '{}' is not a number", interval))
            })?;
        }
        if let Some(count) = lookup("SHARD_COUNT") {
            self.shard.count = count.parse().map_err(|_| {
                SyncError::ConfigError(format!("SHARD_COUNT '{}' is not a number", count))
            })?;
        }
        if let Some(index) = lookup("SHARD_INDEX") {
            self.shard.index = Shard::parse_index(&index)?;
        }
        Ok(())
    }

    /// Check everything that can be checked before connecting to anything
    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(SyncError::ConfigError("owner must not be empty".into()));
        }
        if !is_label_value(&self.owner) {
            return Err(SyncError::ConfigError(format!(
                "owner '{}' is not a valid label value: at most 63 characters of [A-Za-z0-9-_.], starting and ending alphanumeric",
                self.owner
            )));
        }
        if url::Url::parse(&self.vault.address).is_err() {
            return Err(SyncError::ConfigError(format!(
                "vault.address '{}' is not a valid URL",
                self.vault.address
            )));
        }
        match &self.vault.auth {
            VaultAuth::Kubernetes { role, .. } if role.is_empty() => {
                return Err(SyncError::ConfigError(
                    "vault.auth.role is required for kubernetes auth".into(),
                ));
            }
            VaultAuth::Token { token } if token.is_empty() => {
                return Err(SyncError::ConfigError(
                    "vault.auth.token is required for token auth".into(),
                ));
            }
            VaultAuth::Userpass {
                username, password, ..
            } if username.is_empty() || password.is_empty() => {
                return Err(SyncError::ConfigError(
                    "vault.auth.username and vault.auth.password are required for userpass auth"
                        .into(),
                ));
            }
            _ => {}
        }
        self.shard.validate()?;
        self.registry().map(|_| ())
    }

    /// Build the mapping registry for this replica's shard
    pub fn registry(&self) -> Result<MappingRegistry> {
        MappingRegistry::new(self.secrets.clone(), self.shard)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(non_zero(
            self.refresh_interval,
            defaults::REFRESH_INTERVAL_SECS,
        ))
    }

    pub fn workers(&self) -> usize {
        non_zero(self.workers, defaults::WORKERS)
    }

    pub fn queue_capacity(&self) -> usize {
        non_zero(self.queue_capacity, defaults::QUEUE_CAPACITY)
    }

    pub fn event_enqueue_timeout(&self) -> Duration {
        Duration::from_secs(non_zero(
            self.event_enqueue_timeout,
            defaults::EVENT_ENQUEUE_TIMEOUT_SECS,
        ))
    }
}

impl VaultConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(non_zero(self.timeout, vault::DEFAULT_TIMEOUT_SECS))
    }
}

/// Kubernetes label value grammar
fn is_label_value(value: &str) -> bool {
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= 63
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        }
        _ => false,
    }
}

fn non_zero<T: Default + PartialEq>(value: T, fallback: T) -> T {
    if value == T::default() {
        fallback
    } else {
        value
    }
}
