// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Content fingerprints used to decide whether a managed secret is current.
//!
//! The digest is computed over a canonical serialization of the payload: keys in
//! sorted order, each key and value prefixed with its length. Two payloads with the
//! same logical content always produce the same fingerprint, regardless of the order
//! in which their entries were inserted or read.

use base64::{engine::general_purpose::STANDARD, Engine};
use k8s_openapi::ByteString;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hex-encoded SHA-256 over the canonical form of a secret data payload
pub fn fingerprint(data: &BTreeMap<String, ByteString>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update((key.len() as u64).to_be_bytes());
        hasher.update(key.as_bytes());
        hasher.update((value.0.len() as u64).to_be_bytes());
        hasher.update(&value.0);
    }
    hex::encode(hasher.finalize())
}

/// Encoding of the source path stored next to the fingerprint, so a mapping that is
/// repointed at a different Vault path is rewritten even when the content is identical
pub fn encode_source_path(path: &str) -> String {
    STANDARD.encode(path.as_bytes())
}
