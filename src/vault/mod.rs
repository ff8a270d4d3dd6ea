// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Vault-backed secret store.

pub mod client;

pub use client::VaultClient;
