// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher service: status-keyed queues with worker pools.
//!
//! Each configured queue gets its own channel and `workers` tasks, so
//! operators can give a high-volume terminal status (e.g. `completed`)
//! a 100-worker pool while `cancel` keeps one. A status not assigned to
//! any queue routes to queue 0.

use crate::config::DispatcherConfig;
use crate::request::{DispatchRequestId, ProcessingStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

const QUEUE_DEPTH: usize = 1_024;

/// One unit of dispatcher work: a request reached a status.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub request: DispatchRequestId,
    pub status: ProcessingStatus,
}

/// Processes status changes drained from the queues.
#[async_trait]
pub trait DispatchHandler: Send + Sync + 'static {
    async fn handle(&self, change: StatusChange);
}

/// Running worker pools over the configured queues.
pub struct DispatcherService {
    config: DispatcherConfig,
    senders: Vec<mpsc::Sender<StatusChange>>,
    workers: Vec<JoinHandle<()>>,
}

impl DispatcherService {
    /// Spawn the per-queue worker pools.
    pub fn start(config: DispatcherConfig, handler: Arc<dyn DispatchHandler>) -> Self {
        let mut senders = Vec::with_capacity(config.queues.len());
        let mut workers = Vec::new();

        for queue in &config.queues {
            let (tx, rx) = mpsc::channel::<StatusChange>(QUEUE_DEPTH);
            let rx = Arc::new(Mutex::new(rx));
            for n in 0..queue.workers {
                let rx = Arc::clone(&rx);
                let handler = Arc::clone(&handler);
                let queue_name = queue.name.clone();
                workers.push(tokio::spawn(async move {
                    loop {
                        let change = { rx.lock().await.recv().await };
                        let Some(change) = change else { break };
                        tracing::trace!(
                            queue = %queue_name,
                            worker = n,
                            request = %change.request,
                            status = %change.status,
                            "dispatching status change"
                        );
                        handler.handle(change).await;
                    }
                }));
            }
            senders.push(tx);
        }

        Self { config, senders, workers }
    }

    /// Route a status change to its queue's worker pool.
    pub async fn dispatch(&self, change: StatusChange) {
        let index = self.config.queue_for(change.status);
        if let Some(sender) = self.senders.get(index) {
            // Backpressure: await queue space rather than dropping work.
            let _ = sender.send(change).await;
        }
    }

    pub fn queue_count(&self) -> usize {
        self.senders.len()
    }

    /// Close the queues and wait for in-flight work to finish.
    pub async fn shutdown(self) {
        drop(self.senders);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
