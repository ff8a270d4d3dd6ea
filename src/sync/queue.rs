// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded queue between the task producers and the worker pool.

use crate::sync::task::SyncTask;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

/// Receiving side, owned by the worker pool
#[derive(Debug)]
pub struct TaskQueue {
    task_rx: mpsc::Receiver<SyncTask>,
}

/// Handle producers use to submit tasks
#[derive(Debug, Clone)]
pub struct TaskQueueHandle {
    task_tx: mpsc::Sender<SyncTask>,
}

/// What happened to a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// The queue stayed full for the whole timeout; the task was discarded
    Dropped,
    /// The worker pool has shut down
    Closed,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> (Self, TaskQueueHandle) {
        let (task_tx, task_rx) = mpsc::channel(capacity.max(1));
        (Self { task_rx }, TaskQueueHandle { task_tx })
    }

    pub async fn recv(&mut self) -> Option<SyncTask> {
        self.task_rx.recv().await
    }

    /// Stop accepting new tasks; already queued tasks can still be received
    pub fn close(&mut self) {
        self.task_rx.close();
    }
}

impl TaskQueueHandle {
    /// Submit a task, waiting for as long as the queue is full
    pub async fn enqueue(&self, task: SyncTask) -> Enqueued {
        match self.task_tx.send(task).await {
            Ok(()) => Enqueued::Queued,
            Err(_) => Enqueued::Closed,
        }
    }

    /// Submit a task, giving up once `timeout` has passed without free capacity
    pub async fn enqueue_within(&self, task: SyncTask, timeout: Duration) -> Enqueued {
        match self.task_tx.send_timeout(task, timeout).await {
            Ok(()) => Enqueued::Queued,
            Err(SendTimeoutError::Timeout(_)) => Enqueued::Dropped,
            Err(SendTimeoutError::Closed(_)) => Enqueued::Closed,
        }
    }
}
