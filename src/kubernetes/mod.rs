// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes-backed implementation of the cluster secret store.

pub mod namespaces;
pub mod secrets;

pub use namespaces::list_namespace_names;
pub use secrets::KubeSecrets;
