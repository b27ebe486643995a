// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and job-stream definitions.
//!
//! Definitions are templates; the planner turns them into concrete
//! instances per occurrence. Order matters everywhere: stores and
//! batches preserve definition order because reference resolution is
//! order-sensitive (see `validate`/`submit`).

use gp_core::{PlanPeriod, Workstation, WsName};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Reference to a job in a (possibly different) stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobRef {
    pub stream: SmolStr,
    pub job: SmolStr,
}

impl JobRef {
    pub fn new(stream: impl Into<SmolStr>, job: impl Into<SmolStr>) -> Self {
        Self { stream: stream.into(), job: job.into() }
    }
}

impl std::fmt::Display for JobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.stream, self.job)
    }
}

/// Template for one job inside a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDef {
    pub name: SmolStr,
    pub workstation: WsName,
    pub command: String,
    /// Exit codes counted as success; empty means "only 0".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub success_codes: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follows: Vec<JobRef>,
}

impl JobDef {
    pub fn new(name: impl Into<SmolStr>, workstation: impl Into<WsName>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workstation: workstation.into(),
            command: command.into(),
            success_codes: Vec::new(),
            follows: Vec::new(),
        }
    }

    pub fn follows(mut self, target: JobRef) -> Self {
        self.follows.push(target);
        self
    }

    pub fn success_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }
}

/// When a stream's occurrences fall inside a plan window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// One occurrence at a fixed time.
    Once { at_ms: u64 },
    /// One occurrence per day at a fixed offset from midnight.
    Daily { at_ms_of_day: u64 },
    /// Repeating occurrences at a fixed interval from epoch 0.
    Every { interval_ms: u64 },
}

impl Recurrence {
    /// Concrete occurrence times within `[from_ms, to_ms)`, ascending.
    pub fn occurrences(&self, period: PlanPeriod) -> Vec<u64> {
        match *self {
            Recurrence::Once { at_ms } => {
                if period.contains(at_ms) {
                    vec![at_ms]
                } else {
                    Vec::new()
                }
            }
            Recurrence::Daily { at_ms_of_day } => {
                let mut out = Vec::new();
                let mut day = period.from_ms / DAY_MS * DAY_MS;
                loop {
                    let at = day + at_ms_of_day;
                    if at >= period.to_ms {
                        break;
                    }
                    if at >= period.from_ms {
                        out.push(at);
                    }
                    day += DAY_MS;
                }
                out
            }
            Recurrence::Every { interval_ms } => {
                if interval_ms == 0 {
                    return Vec::new();
                }
                let first = period.from_ms.div_ceil(interval_ms) * interval_ms;
                (0..)
                    .map(|n| first + n * interval_ms)
                    .take_while(|at| *at < period.to_ms)
                    .collect()
            }
        }
    }
}

/// Template for a job stream: a named DAG of jobs plus a recurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDef {
    pub name: SmolStr,
    pub workstation: WsName,
    pub recurrence: Recurrence,
    pub jobs: Vec<JobDef>,
}

impl StreamDef {
    pub fn job(&self, name: &str) -> Option<&JobDef> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

/// The durable definitions seam (database mirror). Read-only from the
/// planner's perspective; mutation goes through `submit`.
pub trait DefinitionStore {
    /// All known workstations, in definition order.
    fn workstations(&self) -> Vec<Workstation>;
    /// All known streams, in definition order.
    fn streams(&self) -> Vec<StreamDef>;
    fn stream(&self, name: &str) -> Option<StreamDef>;

    /// Whether a job reference resolves against the stored definitions.
    fn resolves(&self, target: &JobRef) -> bool {
        self.stream(&target.stream)
            .is_some_and(|s| s.job(&target.job).is_some())
    }
}

/// In-memory definition store used by the master and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryDefs {
    workstations: IndexMap<WsName, Workstation>,
    streams: IndexMap<SmolStr, StreamDef>,
}

impl MemoryDefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_workstation(&mut self, ws: Workstation) {
        self.workstations.insert(ws.name.clone(), ws);
    }

    /// Insert a stream definition without reference checking. Checked
    /// mutation goes through [`crate::submit`].
    pub fn insert_stream_unchecked(&mut self, def: StreamDef) {
        self.streams.insert(def.name.clone(), def);
    }

    pub fn contains_stream(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }
}

impl DefinitionStore for MemoryDefs {
    fn workstations(&self) -> Vec<Workstation> {
        self.workstations.values().cloned().collect()
    }

    fn streams(&self) -> Vec<StreamDef> {
        self.streams.values().cloned().collect()
    }

    fn stream(&self, name: &str) -> Option<StreamDef> {
        self.streams.get(name).cloned()
    }
}

#[cfg(test)]
#[path = "defs_tests.rs"]
mod tests;
