// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transport: queues plus links plus the delivery seam.

use crate::link::LinkHealth;
use crate::queue::{DestQueue, PushOutcome};
use async_trait::async_trait;
use gp_core::{Event, EventSeq, LinkState, RunNumber, WsName};
use std::collections::HashMap;
use thiserror::Error;

/// Delivery failure reported by a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("destination unreachable: {0}")]
    Unreachable(String),
    #[error("destination rejected event: {0}")]
    Rejected(String),
}

/// Where events actually go: a socket, a child channel, or an
/// in-process fake in tests.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, dest: &WsName, event: &Event) -> Result<(), SinkError>;
}

/// Transport tuning.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-destination queue bound.
    pub queue_capacity: usize,
    /// A destination failing for this long is marked unlinked.
    pub unlink_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { queue_capacity: 10_000, unlink_timeout_ms: 60_000 }
    }
}

/// Result of flushing one destination queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub remaining: usize,
    /// The flush attempt crossed the timeout and unlinked the
    /// destination.
    pub unlinked: bool,
}

/// Store-and-forward sender for one workstation.
///
/// Owns a bounded [`DestQueue`] and a [`LinkHealth`] per destination.
/// Events accumulate while a destination is unreachable and replay in
/// FIFO order on the next flush after relink.
pub struct Transport {
    source: WsName,
    config: TransportConfig,
    queues: HashMap<WsName, DestQueue>,
    links: HashMap<WsName, LinkHealth>,
    /// Outbound sequence stamp, restarted per run.
    run: RunNumber,
    next_seq: u64,
}

impl Transport {
    pub fn new(source: WsName, config: TransportConfig) -> Self {
        Self {
            source,
            config,
            queues: HashMap::new(),
            links: HashMap::new(),
            run: RunNumber(0),
            next_seq: 0,
        }
    }

    pub fn source(&self) -> &WsName {
        &self.source
    }

    /// Restart the outbound sequence for a new plan generation.
    pub fn begin_run(&mut self, run: RunNumber) {
        self.run = run;
        self.next_seq = 0;
    }

    /// Stamp the next outbound event.
    pub fn next_stamp(&mut self) -> EventSeq {
        self.next_seq += 1;
        EventSeq::new(self.run, self.next_seq)
    }

    /// Queue an event for a destination.
    ///
    /// On overflow the oldest event is dropped and, once per episode, a
    /// `queue:overflow` warning event is returned for the caller to
    /// route to the master.
    pub fn enqueue(&mut self, dest: &WsName, event: Event, now_ms: u64) -> Option<Event> {
        let capacity = self.config.queue_capacity;
        let timeout = self.config.unlink_timeout_ms;
        self.links
            .entry(dest.clone())
            .or_insert_with(|| LinkHealth::new(now_ms, timeout));
        let outcome = self
            .queues
            .entry(dest.clone())
            .or_insert_with(|| DestQueue::new(dest.clone(), capacity))
            .push(event);

        match outcome {
            PushOutcome::Queued => None,
            PushOutcome::Overflowed { dropped_total, warn } if warn => {
                Some(Event::QueueOverflow {
                    source: self.source.clone(),
                    seq: self.next_stamp(),
                    destination: dest.clone(),
                    dropped: dropped_total,
                })
            }
            PushOutcome::Overflowed { .. } => None,
        }
    }

    /// Deliver queued events to one destination, preserving FIFO order.
    ///
    /// Stops at the first failure, leaving the failed event at the head
    /// for the next attempt (at-least-once: an event is only removed
    /// after the sink accepted it).
    pub async fn flush(
        &mut self,
        dest: &WsName,
        sink: &dyn EventSink,
        now_ms: u64,
    ) -> FlushReport {
        let timeout = self.config.unlink_timeout_ms;
        let Some(queue) = self.queues.get_mut(dest) else {
            return FlushReport { delivered: 0, remaining: 0, unlinked: false };
        };
        let link = self
            .links
            .entry(dest.clone())
            .or_insert_with(|| LinkHealth::new(now_ms, timeout));

        let mut delivered = 0;
        let mut unlinked = false;
        while let Some(event) = queue.front() {
            match sink.deliver(dest, event).await {
                Ok(()) => {
                    queue.pop_front();
                    link.record_success(now_ms);
                    delivered += 1;
                }
                Err(err) => {
                    unlinked = link.record_failure(now_ms);
                    if unlinked {
                        tracing::warn!(dest = %dest, error = %err, "destination unlinked");
                    } else {
                        tracing::debug!(dest = %dest, error = %err, "delivery failed, will retry");
                    }
                    break;
                }
            }
        }
        FlushReport { delivered, remaining: queue.len(), unlinked }
    }

    /// Begin re-establishing an unlinked destination. Queued events are
    /// replayed by the next flush once the sink accepts again.
    pub fn relink(&mut self, dest: &WsName) {
        if let Some(link) = self.links.get_mut(dest) {
            link.begin_relink();
        }
    }

    pub fn link_state(&self, dest: &WsName) -> LinkState {
        self.links.get(dest).map(|l| l.state()).unwrap_or(LinkState::Unlinked)
    }

    pub fn queued(&self, dest: &WsName) -> usize {
        self.queues.get(dest).map(|q| q.len()).unwrap_or(0)
    }

    /// Destinations with pending events.
    pub fn backlogged(&self) -> Vec<WsName> {
        self.queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(d, _)| d.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
