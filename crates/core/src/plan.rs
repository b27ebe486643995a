// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The plan: an immutable-per-period snapshot of what should run.
//!
//! Structural content (workstations, streams, job identity and
//! dependency edges) is fixed for a run number and hashed; execution
//! status is the only field a replica mutates locally. A new generation
//! is produced as a fresh snapshot and swapped in atomically, never
//! edited in place.

use crate::event::Event;
use crate::job::{JobInstance, JobInstanceId, JobStatus};
use crate::seq::RunNumber;
use crate::workstation::{LinkState, Workstation, WsName};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smol_str::SmolStr;

crate::define_name! {
    /// Identifier of a materialized job-stream occurrence,
    /// `{stream}@{occurrence_ms}`.
    pub struct StreamInstanceId;
}

/// Half-open time window `[from_ms, to_ms)` covered by one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPeriod {
    pub from_ms: u64,
    pub to_ms: u64,
}

impl PlanPeriod {
    pub fn contains(&self, epoch_ms: u64) -> bool {
        epoch_ms >= self.from_ms && epoch_ms < self.to_ms
    }
}

/// A job stream materialized for one occurrence time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInstance {
    pub id: StreamInstanceId,
    pub name: SmolStr,
    pub workstation: WsName,
    pub occurrence_ms: u64,
    pub jobs: Vec<JobInstanceId>,
}

/// Outcome of applying an event to a plan replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// State changed.
    Changed,
    /// Already in the target state — replay or duplicate.
    Duplicate,
    /// The event does not fit the current state machine position
    /// (stale ordering); the replica keeps its state.
    Rejected,
    /// Event carries no replica state.
    NoOp,
}

/// An immutable-per-period scheduling snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub run_number: RunNumber,
    pub period: PlanPeriod,
    pub workstations: IndexMap<WsName, Workstation>,
    pub streams: IndexMap<StreamInstanceId, StreamInstance>,
    pub jobs: IndexMap<JobInstanceId, JobInstance>,
    /// SHA-256 over structural content, stamped by the producer via
    /// [`Plan::seal`]. Replicas verify against it on receipt.
    #[serde(default)]
    pub structural_hash: String,
}

impl Plan {
    pub fn new(run_number: RunNumber, period: PlanPeriod) -> Self {
        Self {
            run_number,
            period,
            workstations: IndexMap::new(),
            streams: IndexMap::new(),
            jobs: IndexMap::new(),
            structural_hash: String::new(),
        }
    }

    /// Stamp the structural hash. Producers call this once the plan is
    /// fully materialized; any later structural edit invalidates it.
    pub fn seal(&mut self) {
        self.structural_hash = self.compute_structural_hash();
    }

    /// Recompute the hash over structural (non-status) content.
    pub fn compute_structural_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.run_number.0.to_be_bytes());
        hasher.update(self.period.from_ms.to_be_bytes());
        hasher.update(self.period.to_ms.to_be_bytes());
        for ws in self.workstations.values() {
            hasher.update(ws.name.as_str().as_bytes());
            hasher.update(ws.role.to_string().as_bytes());
            if let Some(parent) = &ws.parent {
                hasher.update(parent.as_str().as_bytes());
            }
            hasher.update(ws.limit.to_be_bytes());
            // ws.link is runtime state, excluded
        }
        for stream in self.streams.values() {
            hasher.update(stream.id.as_str().as_bytes());
            hasher.update(stream.occurrence_ms.to_be_bytes());
        }
        for job in self.jobs.values() {
            hasher.update(job.id.as_str().as_bytes());
            hasher.update(job.workstation.as_str().as_bytes());
            hasher.update(job.command.as_bytes());
            // deps and success policy are structural; status is not
            if let Ok(bytes) = serde_json::to_vec(&job.deps) {
                hasher.update(&bytes);
            }
            if let Ok(bytes) = serde_json::to_vec(&job.success) {
                hasher.update(&bytes);
            }
        }
        use std::fmt::Write;
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for byte in digest {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// Structural content matches the stamped hash.
    pub fn verify_structure(&self) -> bool {
        !self.structural_hash.is_empty()
            && self.structural_hash == self.compute_structural_hash()
    }

    pub fn job(&self, id: &JobInstanceId) -> Option<&JobInstance> {
        self.jobs.get(id)
    }

    pub fn job_mut(&mut self, id: &JobInstanceId) -> Option<&mut JobInstance> {
        self.jobs.get_mut(id)
    }

    pub fn workstation(&self, name: &WsName) -> Option<&Workstation> {
        self.workstations.get(name)
    }

    /// Instances currently occupying a launch slot on a workstation.
    pub fn running_count(&self, ws: &WsName) -> usize {
        self.jobs
            .values()
            .filter(|j| {
                j.workstation == *ws
                    && matches!(j.status, JobStatus::Intro | JobStatus::Exec)
            })
            .count()
    }

    /// Instances owned by a workstation, in plan order.
    pub fn jobs_on<'a>(&'a self, ws: &'a WsName) -> impl Iterator<Item = &'a JobInstance> {
        self.jobs.values().filter(move |j| j.workstation == *ws)
    }

    /// Non-terminal instances, candidates for carry-forward at rollover.
    pub fn open_jobs(&self) -> impl Iterator<Item = &JobInstance> {
        self.jobs.values().filter(|j| !j.status.is_terminal())
    }

    /// Apply one event to this replica.
    ///
    /// Must be idempotent: applying the same event twice changes state at
    /// most once. Callers are expected to have already filtered
    /// duplicates through a [`crate::seq::DedupIndex`]; this guard is the
    /// second line of defense.
    pub fn apply_event(&mut self, event: &Event) -> Applied {
        match event {
            Event::JobStatus { job, status, .. } => match self.jobs.get_mut(job) {
                Some(instance) if instance.status == *status => Applied::Duplicate,
                Some(instance) => {
                    if instance.transition(*status).is_ok() {
                        Applied::Changed
                    } else {
                        Applied::Rejected
                    }
                }
                None => Applied::Rejected,
            },
            Event::JobCancel { job, .. } => match self.jobs.get_mut(job) {
                Some(instance) => {
                    if instance.cancel() {
                        Applied::Changed
                    } else {
                        Applied::Duplicate
                    }
                }
                None => Applied::Rejected,
            },
            Event::LinkUp { workstation, .. } => {
                self.set_link(workstation, LinkState::Linked)
            }
            Event::LinkDown { workstation, .. } => {
                self.set_link(workstation, LinkState::Unlinked)
            }
            Event::PlanAck { .. } | Event::QueueOverflow { .. } | Event::Custom => Applied::NoOp,
        }
    }

    fn set_link(&mut self, ws: &WsName, state: LinkState) -> Applied {
        match self.workstations.get_mut(ws) {
            Some(def) if def.link == state => Applied::Duplicate,
            Some(def) => {
                def.link = state;
                Applied::Changed
            }
            None => Applied::Rejected,
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
