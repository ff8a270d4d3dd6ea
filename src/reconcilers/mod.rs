// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The two task producers: the periodic scan and the deletion watch.

pub mod deletion;
pub mod periodic;

pub use deletion::DeletionWatcher;
pub use periodic::{CycleReport, PeriodicReconciler};
