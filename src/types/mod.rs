// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Domain types: mappings, payloads and shards.

pub mod mapping;
pub mod payload;
pub mod shard;

pub use mapping::{KvVersion, MappingRegistry, SecretMapping};
pub use payload::SecretPayload;
pub use shard::Shard;
