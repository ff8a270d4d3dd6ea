// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Conversion of a Vault read result into Kubernetes secret data.

use crate::error::{Result, SyncError};
use crate::fingerprint::fingerprint;
use crate::types::mapping::KvVersion;
use k8s_openapi::ByteString;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key/value data destined for a managed secret, already coerced to bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPayload {
    data: BTreeMap<String, ByteString>,
}

impl SecretPayload {
    /// Build a payload from the `data` object of a Vault read.
    ///
    /// KV v2 responses nest the secret under another `data` key next to its
    /// `metadata`. KV v1 responses are the secret itself, so a v1 key that happens
    /// to be called `data` is copied like any other.
    pub fn from_vault(path: &str, version: KvVersion, response: &Map<String, Value>) -> Result<Self> {
        let entries = match version {
            KvVersion::V1 => response,
            KvVersion::V2 => match response.get("data") {
                Some(Value::Object(inner)) => inner,
                Some(Value::Null) | None => return Err(SyncError::EmptyPayload(path.to_string())),
                Some(other) => {
                    return Err(SyncError::MalformedPayload {
                        path: path.to_string(),
                        reason: format!(
                            "expected an object under 'data', got {}",
                            kind_of(other)
                        ),
                    })
                }
            },
        };

        let data: BTreeMap<String, ByteString> = entries
            .iter()
            .map(|(k, v)| (k.clone(), ByteString(coerce(v))))
            .collect();

        if data.is_empty() {
            return Err(SyncError::EmptyPayload(path.to_string()));
        }

        Ok(Self { data })
    }

    pub fn data(&self) -> &BTreeMap<String, ByteString> {
        &self.data
    }

    pub fn into_data(self) -> BTreeMap<String, ByteString> {
        self.data
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.data)
    }
}

/// Raw byte form of a Vault value
fn coerce(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Null => Vec::new(),
        Value::Bool(b) => b.to_string().into_bytes(),
        Value::Number(n) => n.to_string().into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
