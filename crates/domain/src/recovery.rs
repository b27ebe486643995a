// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery of the authoritative plan after corruption.
//!
//! Three strategies, ordered by how much state they preserve:
//!
//! 1. `Failover` — promote a backup domain manager's in-sync replica.
//! 2. `ReplayLog` — latest archived plan plus durable event-log replay;
//!    entries lost to log retention surface as an explicit
//!    "recovery incomplete" warning.
//! 3. `Regenerate` — fresh plan from definitions; completed work in the
//!    window comes back unexecuted and **will run again**, called out
//!    to the operator, never done silently.
//!
//! The strategy is an explicit operator decision carried in the request;
//! nothing here picks one automatically. Whatever the strategy, the
//! recovered plan's run number strictly exceeds every run number any
//! workstation has observed, so replayed events can never be mistaken
//! for fresh ones.

use gp_core::{JobInstanceId, JobStatus, Plan, PlanPeriod, RunNumber};
use gp_planner::{generate_plan, DefinitionStore, PlanError};
use gp_storage::{ArchiveError, EventLog, PlanArchive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Failover,
    ReplayLog,
    Regenerate,
}

gp_core::simple_display! {
    RecoveryStrategy {
        Failover => "failover",
        ReplayLog => "replay_log",
        Regenerate => "regenerate",
    }
}

/// Data-loss facts surfaced by a recovery, for the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryWarning {
    /// The event log no longer retains everything the replay needed.
    Incomplete { requested_after: u64, available_from: u64 },
    /// These instances had completed before the corruption; after
    /// regeneration they are unexecuted and will run again.
    CompletedWorkLost { jobs: Vec<JobInstanceId> },
}

#[derive(Debug)]
pub struct RecoveryOutcome {
    pub strategy: RecoveryStrategy,
    pub plan: Plan,
    pub warnings: Vec<RecoveryWarning>,
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("failover requested but no in-sync backup replica is available")]
    NoReplica,
    #[error("failover replica fails structural verification")]
    BadReplica,
    #[error("log replay requested but no archived plan exists")]
    NoArchive,
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("regeneration failed: {0}")]
    Planner(#[from] PlanError),
}

/// Everything a recovery can draw on.
pub struct RecoveryContext<'a> {
    pub defs: &'a dyn DefinitionStore,
    pub archive: &'a PlanArchive,
    pub log: &'a EventLog,
    pub window: PlanPeriod,
    /// In-sync replica held by a backup domain manager, if one exists.
    pub backup_replica: Option<&'a Plan>,
    /// Every run number any workstation has observed.
    pub observed_runs: &'a [RunNumber],
}

/// Execute the chosen strategy and produce the replacement plan.
pub fn recover(
    strategy: RecoveryStrategy,
    ctx: &RecoveryContext<'_>,
) -> Result<RecoveryOutcome, RecoveryError> {
    tracing::warn!(
        %strategy,
        "recovering authoritative plan; data-loss tradeoffs apply per strategy"
    );
    let (mut plan, warnings) = match strategy {
        RecoveryStrategy::Failover => recover_failover(ctx)?,
        RecoveryStrategy::ReplayLog => recover_replay(ctx)?,
        RecoveryStrategy::Regenerate => recover_regenerate(ctx)?,
    };

    plan.run_number = next_safe_run(ctx.observed_runs, plan.run_number);
    plan.seal();

    for warning in &warnings {
        match warning {
            RecoveryWarning::Incomplete { requested_after, available_from } => {
                tracing::warn!(
                    requested_after,
                    available_from,
                    "recovery incomplete: event log retention gap"
                );
            }
            RecoveryWarning::CompletedWorkLost { jobs } => {
                tracing::warn!(
                    count = jobs.len(),
                    "previously completed instances will re-execute"
                );
            }
        }
    }
    tracing::info!(run = %plan.run_number, %strategy, "recovery produced replacement plan");
    Ok(RecoveryOutcome { strategy, plan, warnings })
}

/// Strictly greater than everything observed and the candidate itself.
fn next_safe_run(observed: &[RunNumber], candidate: RunNumber) -> RunNumber {
    let floor = observed.iter().copied().max().unwrap_or(RunNumber(0));
    RunNumber(floor.0.max(candidate.0) + 1)
}

fn recover_failover(
    ctx: &RecoveryContext<'_>,
) -> Result<(Plan, Vec<RecoveryWarning>), RecoveryError> {
    let replica = ctx.backup_replica.ok_or(RecoveryError::NoReplica)?;
    if !replica.verify_structure() {
        return Err(RecoveryError::BadReplica);
    }
    Ok((replica.clone(), Vec::new()))
}

fn recover_replay(
    ctx: &RecoveryContext<'_>,
) -> Result<(Plan, Vec<RecoveryWarning>), RecoveryError> {
    let archived = ctx.archive.latest()?.ok_or(RecoveryError::NoArchive)?;
    let mut plan = archived.plan;
    let mut warnings = Vec::new();

    let replay = ctx.log.replay_after(archived.log_seq);
    if let Some(gap) = replay.gap {
        warnings.push(RecoveryWarning::Incomplete {
            requested_after: gap.requested_after,
            available_from: gap.available_from,
        });
    }
    for entry in &replay.entries {
        plan.apply_event(&entry.event);
    }
    Ok((plan, warnings))
}

fn recover_regenerate(
    ctx: &RecoveryContext<'_>,
) -> Result<(Plan, Vec<RecoveryWarning>), RecoveryError> {
    let plan = generate_plan(ctx.defs, ctx.window, None)?;

    // Reconstruct which instances had completed, from the best durable
    // record available, so the re-run is called out rather than silent.
    let mut completed = Vec::new();
    if let Some(archived) = ctx.archive.latest()? {
        let mut prior = archived.plan;
        for entry in &ctx.log.replay_after(archived.log_seq).entries {
            prior.apply_event(&entry.event);
        }
        completed = prior
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Succ && plan.jobs.contains_key(&j.id))
            .map(|j| j.id.clone())
            .collect();
    }

    let warnings = if completed.is_empty() {
        Vec::new()
    } else {
        vec![RecoveryWarning::CompletedWorkLost { jobs: completed }]
    };
    Ok((plan, warnings))
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
