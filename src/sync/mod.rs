// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Task queue, worker pool and the upsert logic they run.

pub mod plan;
pub mod pool;
pub mod queue;
pub mod task;
pub mod upsert;

pub use plan::{plan_update, DesiredSecret, UpdatePlan};
pub use pool::WorkerPool;
pub use queue::{Enqueued, TaskQueue, TaskQueueHandle};
pub use task::{SyncTask, TaskKind, TaskOrigin};
pub use upsert::{Outcome, UpsertExecutor};
