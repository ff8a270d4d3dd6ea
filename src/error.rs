// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Vault request failed: {0}")]
    VaultError(String),

    #[error("Watch stream error: {0}")]
    WatchError(#[from] kube::runtime::watcher::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid secret mapping: {0}")]
    InvalidMapping(String),

    #[error("Destination {namespace}/{name} is declared by more than one mapping")]
    DuplicateDestination { namespace: String, name: String },

    #[error("No data found at {0}")]
    EmptyPayload(String),

    #[error("Malformed payload at {path}: {reason}")]
    MalformedPayload { path: String, reason: String },

    #[error("Secret {namespace}/{name} disappeared while it was being reconciled")]
    Vanished { namespace: String, name: String },

    #[error("Secret {namespace}/{name} is not managed by {owner}")]
    Conflict {
        namespace: String,
        name: String,
        owner: String,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;
