// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes label keys used by vault-sync
pub mod labels {
    /// Ownership marker; only secrets carrying our owner value here are ever mutated
    pub const MANAGED_BY: &str = "managed-by";
}

/// Kubernetes annotation keys used by vault-sync
pub mod annotations {
    /// Fingerprint of the last applied data payload
    pub const SYNC_ID: &str = "vault-sync-id";
    /// Base64 of the Vault path the payload was read from
    pub const SOURCE_PATH: &str = "vault-sync-path";
}

/// Default owner identity written to the managed-by label
pub const DEFAULT_OWNER: &str = "vault-sync";

/// Secret type used when a mapping does not declare one
pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

/// Runtime defaults applied when the configuration leaves a value unset or zero
pub mod defaults {
    pub const CONFIG_PATH: &str = "/etc/vault-sync/config.yaml";
    pub const REFRESH_INTERVAL_SECS: u64 = 30;
    pub const WORKERS: usize = 4;
    pub const QUEUE_CAPACITY: usize = 256;
    pub const EVENT_ENQUEUE_TIMEOUT_SECS: u64 = 5;
}

/// Vault connection defaults
pub mod vault {
    pub const DEFAULT_ADDR: &str = "http://vault-active.vault.svc.cluster.local:8200";
    pub const DEFAULT_AUTH_MOUNT: &str = "kubernetes";
    pub const DEFAULT_USERPASS_MOUNT: &str = "userpass";
    pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
    pub const TOKEN_HEADER: &str = "X-Vault-Token";
    pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";
}
