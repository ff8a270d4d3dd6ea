// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded pool draining the task queue.

use crate::sync::queue::TaskQueue;
use crate::sync::upsert::UpsertExecutor;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Runs queued tasks with at most `workers` executing at once.
///
/// A task is only taken off the queue once a worker slot is free, so a busy pool
/// pushes back on producers through the queue's capacity.
pub struct WorkerPool {
    queue: TaskQueue,
    executor: Arc<UpsertExecutor>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(queue: TaskQueue, executor: Arc<UpsertExecutor>, workers: usize) -> Self {
        Self {
            queue,
            executor,
            workers: workers.max(1),
        }
    }

    pub async fn run(mut self, token: CancellationToken) -> anyhow::Result<()> {
        info!("Worker pool started with {} workers", self.workers);

        let slots = Arc::new(Semaphore::new(self.workers));
        let mut in_flight = JoinSet::new();

        loop {
            let permit = tokio::select! {
                _ = token.cancelled() => break,
                permit = slots.clone().acquire_owned() => permit?,
            };

            let task = tokio::select! {
                _ = token.cancelled() => break,
                task = self.queue.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            let executor = self.executor.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                let mapping = task.mapping.clone();
                let outcome = executor.execute(task).await;
                debug!("Task for {} finished: {:?}", mapping, outcome);
            });

            while let Some(result) = in_flight.try_join_next() {
                if let Err(e) = result {
                    error!("Worker task panicked: {}", e);
                }
            }
        }

        // Producers see a closed queue from here on instead of blocking
        self.queue.close();

        info!(
            "Worker pool stopping, waiting for {} in-flight tasks",
            in_flight.len()
        );
        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                error!("Worker task panicked: {}", e);
            }
        }
        info!("Worker pool stopped");

        Ok(())
    }
}
