// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan generations and event sequencing.
//!
//! Every plan carries a [`RunNumber`], a monotonic generation counter.
//! Every event carries an [`EventSeq`] — the (run number, sequence) pair
//! its source stamped on it. Transport guarantees FIFO per destination
//! only, so receivers deduplicate and order with [`DedupIndex`] rather
//! than relying on arrival order.

use crate::workstation::WsName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Monotonic generation counter for plan versions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunNumber(pub u64);

impl RunNumber {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for RunNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// Ordering and deduplication stamp for a single event.
///
/// Ordered first by run number, then by sequence within the run. A source
/// restarts its sequence at 1 for each new plan generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EventSeq {
    pub run: RunNumber,
    pub seq: u64,
}

impl EventSeq {
    pub fn new(run: RunNumber, seq: u64) -> Self {
        Self { run, seq }
    }
}

impl std::fmt::Display for EventSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.run, self.seq)
    }
}

/// Per-source high-watermark of applied event stamps.
///
/// Delivery is at-least-once: the same event can arrive twice (queue
/// replay after relink) and must change state at most once. Transport
/// preserves FIFO per source, so anything at or below the source's
/// watermark has already been applied.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DedupIndex {
    applied: HashMap<WsName, EventSeq>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `seq` from `source` if it is fresh. Returns `true` when the
    /// event should be applied, `false` when it is a duplicate or older
    /// than the watermark.
    pub fn try_advance(&mut self, source: &WsName, seq: EventSeq) -> bool {
        match self.applied.get(source) {
            Some(mark) if *mark >= seq => false,
            _ => {
                self.applied.insert(source.clone(), seq);
                true
            }
        }
    }

    /// Current watermark for a source, if any event was applied from it.
    pub fn watermark(&self, source: &WsName) -> Option<EventSeq> {
        self.applied.get(source).copied()
    }

    /// Forget watermarks from runs older than `run`. Called on plan
    /// rollover so stale sources cannot block a fresh generation.
    pub fn prune_before(&mut self, run: RunNumber) {
        self.applied.retain(|_, mark| mark.run >= run);
    }
}

#[cfg(test)]
#[path = "seq_tests.rs"]
mod tests;
