// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Desired state of a managed secret and the decision of what to do about the
//! observed one. Nothing in here performs I/O.

use crate::constants::{annotations, labels};
use crate::fingerprint::{encode_source_path, fingerprint};
use crate::types::{SecretMapping, SecretPayload};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// The secret a mapping should produce from the current Vault payload
#[derive(Debug, Clone)]
pub struct DesiredSecret {
    pub secret: Secret,
    pub fingerprint: String,
    pub source_path: String,
}

impl DesiredSecret {
    pub fn new(mapping: &SecretMapping, payload: SecretPayload, owner: &str) -> Self {
        let fingerprint = payload.fingerprint();
        let source_path = encode_source_path(&mapping.path);

        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(mapping.destination_name.clone()),
                namespace: Some(mapping.destination_namespace.clone()),
                labels: Some(BTreeMap::from([(
                    labels::MANAGED_BY.to_string(),
                    owner.to_string(),
                )])),
                annotations: Some(BTreeMap::from([
                    (annotations::SYNC_ID.to_string(), fingerprint.clone()),
                    (annotations::SOURCE_PATH.to_string(), source_path.clone()),
                ])),
                ..Default::default()
            },
            data: Some(payload.into_data()),
            type_: Some(mapping.secret_type().to_string()),
            ..Default::default()
        };

        Self {
            secret,
            fingerprint,
            source_path,
        }
    }
}

/// What the update path should do with an existing secret
#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePlan {
    /// Data and annotations already match the desired state
    Unchanged,
    /// Write this object back in a single replace call
    Replace(Box<Secret>),
    /// The secret is not ours; leave it alone
    Conflict { found_owner: Option<String> },
}

/// The managed-by label value on a secret, if any
pub fn owner_of(secret: &Secret) -> Option<&str> {
    secret
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(labels::MANAGED_BY))
        .map(String::as_str)
}

pub fn is_owned_by(secret: &Secret, owner: &str) -> bool {
    owner_of(secret) == Some(owner)
}

fn annotation<'a>(secret: &'a Secret, key: &str) -> Option<&'a str> {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .map(String::as_str)
}

/// Decide how to bring `observed` in line with `desired`.
///
/// The secret is current only when both annotations match and the data actually
/// stored still hashes to the recorded fingerprint, so edits made to the data
/// without touching the annotation are also repaired.
pub fn plan_update(desired: &DesiredSecret, observed: &Secret, owner: &str) -> UpdatePlan {
    if !is_owned_by(observed, owner) {
        return UpdatePlan::Conflict {
            found_owner: owner_of(observed).map(str::to_string),
        };
    }

    let empty = BTreeMap::new();
    let observed_data = observed.data.as_ref().unwrap_or(&empty);

    let current = annotation(observed, annotations::SYNC_ID) == Some(desired.fingerprint.as_str())
        && annotation(observed, annotations::SOURCE_PATH) == Some(desired.source_path.as_str())
        && fingerprint(observed_data) == desired.fingerprint
        && observed.string_data.is_none();

    if current {
        return UpdatePlan::Unchanged;
    }

    UpdatePlan::Replace(Box::new(merge(desired, observed)))
}

/// The observed object with our data, label and annotations written over it.
///
/// Unrelated labels and annotations are kept, as is the resource version so the
/// replace fails rather than clobbering a concurrent write. The type is immutable
/// once a secret exists and is left as found.
fn merge(desired: &DesiredSecret, observed: &Secret) -> Secret {
    let mut merged = observed.clone();

    let mut merged_labels = merged.metadata.labels.take().unwrap_or_default();
    if let Some(desired_labels) = &desired.secret.metadata.labels {
        merged_labels.extend(desired_labels.clone());
    }
    merged.metadata.labels = Some(merged_labels);

    let mut merged_annotations = merged.metadata.annotations.take().unwrap_or_default();
    if let Some(desired_annotations) = &desired.secret.metadata.annotations {
        merged_annotations.extend(desired_annotations.clone());
    }
    merged.metadata.annotations = Some(merged_annotations);

    merged.data = desired.secret.data.clone();
    merged.string_data = None;
    merged
}
