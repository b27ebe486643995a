// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded per-destination event queue.
//!
//! Circular-buffer semantics under pressure: pushing into a full queue
//! evicts the oldest unacknowledged event. The data loss is surfaced as
//! a capacity warning raised once per overflow episode — the warning
//! re-arms when the queue drains, so a second sustained overflow warns
//! again without flooding every push in between.

use gp_core::{Event, WsName};
use std::collections::VecDeque;

/// Result of pushing an event into a destination queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The oldest event was evicted to make room.
    Overflowed {
        /// Total events dropped on this queue since creation.
        dropped_total: u64,
        /// True exactly once per overflow episode: the push that starts
        /// the episode. Callers surface a capacity warning on it.
        warn: bool,
    },
}

/// Bounded FIFO of events awaiting delivery to one destination.
#[derive(Debug)]
pub struct DestQueue {
    dest: WsName,
    capacity: usize,
    items: VecDeque<Event>,
    dropped_total: u64,
    warned_this_episode: bool,
}

impl DestQueue {
    pub fn new(dest: WsName, capacity: usize) -> Self {
        Self {
            dest,
            capacity: capacity.max(1),
            items: VecDeque::new(),
            dropped_total: 0,
            warned_this_episode: false,
        }
    }

    pub fn dest(&self) -> &WsName {
        &self.dest
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Events dropped since this queue was created.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }

    /// Append an event, evicting the oldest if the queue is full.
    pub fn push(&mut self, event: Event) -> PushOutcome {
        if self.items.len() < self.capacity {
            self.items.push_back(event);
            return PushOutcome::Queued;
        }

        self.items.pop_front();
        self.items.push_back(event);
        self.dropped_total += 1;

        let warn = !self.warned_this_episode;
        self.warned_this_episode = true;
        if warn {
            tracing::warn!(
                dest = %self.dest,
                capacity = self.capacity,
                "destination queue overflow, oldest event dropped"
            );
        }
        PushOutcome::Overflowed { dropped_total: self.dropped_total, warn }
    }

    /// Next event to deliver, without removing it.
    pub fn front(&self) -> Option<&Event> {
        self.items.front()
    }

    /// Remove the delivered head. Draining the queue ends the current
    /// overflow episode and re-arms the warning.
    pub fn pop_front(&mut self) -> Option<Event> {
        let event = self.items.pop_front();
        if self.items.is_empty() {
            self.warned_this_episode = false;
        }
        event
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
