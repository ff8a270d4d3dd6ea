// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Units of work passed from the producers to the worker pool.

use crate::types::SecretMapping;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// The destination was not found; create it
    Create,
    /// The destination exists; bring it up to date
    Update,
}

/// Which producer enqueued a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrigin {
    Periodic,
    Deletion,
}

/// A corrective action for one mapping.
///
/// Carries no secret data: the executor reads Vault when the task runs, so a task
/// that executes later always sees data at least as fresh as an earlier one.
#[derive(Debug, Clone)]
pub struct SyncTask {
    pub kind: TaskKind,
    pub origin: TaskOrigin,
    pub mapping: Arc<SecretMapping>,
}

impl SyncTask {
    pub fn create(mapping: Arc<SecretMapping>, origin: TaskOrigin) -> Self {
        Self {
            kind: TaskKind::Create,
            origin,
            mapping,
        }
    }

    pub fn update(mapping: Arc<SecretMapping>, origin: TaskOrigin) -> Self {
        Self {
            kind: TaskKind::Update,
            origin,
            mapping,
        }
    }
}
