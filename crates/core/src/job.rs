// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job instance identity, status state machine, and dependency edges.

use crate::workstation::WsName;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeSet;
use thiserror::Error;

crate::define_name! {
    /// Identifier of a concrete job instance inside one plan.
    ///
    /// Materialized deterministically by the planner as
    /// `{stream}@{occurrence_ms}#{job}` so that regenerating the same
    /// window yields the same IDs.
    pub struct JobInstanceId;
}

/// Status of a job instance.
///
/// The machine is `Hold → Ready → Intro → Exec → {Succ | Abend}`, with
/// `Cancelled` reachable from any non-terminal status and `Abend` also
/// reachable from `Intro` when the launch itself fails. No transition
/// skips a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Dependencies not yet released for evaluation.
    Hold,
    /// Eligible to launch once dependencies and the workstation limit allow.
    Ready,
    /// Launch requested, spawn not yet confirmed.
    Intro,
    /// Process is running.
    Exec,
    /// Terminal: completed within the success-code set.
    Succ,
    /// Terminal: abnormal end.
    Abend,
    /// Terminal: cancelled before completion.
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succ | JobStatus::Abend | JobStatus::Cancelled)
    }

    /// Whether the state machine permits `self → next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Hold, Ready) => true,
            (Ready, Intro) => true,
            (Intro, Exec) => true,
            // Launch failure: the process never spawned.
            (Intro, Abend) => true,
            (Exec, Succ) | (Exec, Abend) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

crate::simple_display! {
    JobStatus {
        Hold => "hold",
        Ready => "ready",
        Intro => "intro",
        Exec => "exec",
        Succ => "succ",
        Abend => "abend",
        Cancelled => "cancelled",
    }
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition {from} -> {to} for job {job}")]
pub struct TransitionError {
    pub job: JobInstanceId,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// A dependency edge on a job instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dependency {
    /// Satisfied when the referenced instance reaches `Succ`.
    Follows { job: JobInstanceId },
    /// Satisfied while the named local resource has at least `units` free.
    Resource { name: SmolStr, units: u32 },
    /// Satisfied once the local clock passes the given time.
    At { epoch_ms: u64 },
}

/// Context against which dependency edges are evaluated.
pub struct DepContext<'a> {
    pub now_ms: u64,
    /// Free units per local resource name.
    pub resources: &'a dyn Fn(&str) -> u32,
    /// Status lookup for follows-edges (same or different workstation).
    pub status_of: &'a dyn Fn(&JobInstanceId) -> Option<JobStatus>,
}

impl Dependency {
    pub fn is_satisfied(&self, ctx: &DepContext<'_>) -> bool {
        match self {
            Dependency::Follows { job } => (ctx.status_of)(job) == Some(JobStatus::Succ),
            Dependency::Resource { name, units } => (ctx.resources)(name) >= *units,
            Dependency::At { epoch_ms } => ctx.now_ms >= *epoch_ms,
        }
    }
}

/// Exit-code evaluation policy: which exit codes count as success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessPolicy {
    codes: BTreeSet<i32>,
}

impl Default for SuccessPolicy {
    /// Default policy: only exit 0 succeeds, any other code abends.
    fn default() -> Self {
        Self { codes: BTreeSet::from([0]) }
    }
}

impl SuccessPolicy {
    pub fn with_codes(codes: impl IntoIterator<Item = i32>) -> Self {
        Self { codes: codes.into_iter().collect() }
    }

    pub fn status_for_exit(&self, code: i32) -> JobStatus {
        if self.codes.contains(&code) {
            JobStatus::Succ
        } else {
            JobStatus::Abend
        }
    }
}

/// A concrete job occurrence inside one plan period.
///
/// Everything except `status` is structural content owned by the master;
/// an agent may only mutate `status` on its local replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInstance {
    pub id: JobInstanceId,
    pub name: SmolStr,
    pub stream: crate::plan::StreamInstanceId,
    pub workstation: WsName,
    pub status: JobStatus,
    /// Command line launched on the owning workstation.
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<Dependency>,
    #[serde(default)]
    pub success: SuccessPolicy,
    /// True when this instance was carried over from the prior plan with
    /// its last known status instead of being freshly materialized.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub carried_forward: bool,
}

impl JobInstance {
    /// Apply a status transition, enforcing the state machine.
    pub fn transition(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError { job: self.id.clone(), from: self.status, to });
        }
        self.status = to;
        Ok(())
    }

    /// Cancel the instance. Terminal instances are left untouched — a
    /// cancel arriving after completion is a no-op, not an error.
    /// Returns `true` when the status actually changed.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Cancelled;
        true
    }

    /// All dependency edges satisfied in the given context.
    pub fn deps_satisfied(&self, ctx: &DepContext<'_>) -> bool {
        self.deps.iter().all(|d| d.is_satisfied(ctx))
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
