// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic plan generation.
//!
//! Expands stream templates into concrete instances for the requested
//! window and carries forward open instances from the prior plan with
//! their last known status. The same inputs always produce the same
//! instance IDs, so regeneration after a crash is reproducible.

use crate::defs::{DefinitionStore, JobRef, StreamDef};
use gp_core::{
    Dependency, JobInstance, JobInstanceId, JobStatus, Plan, PlanPeriod, RunNumber,
    StreamInstance, StreamInstanceId, SuccessPolicy, WsName,
};
use thiserror::Error;

/// Errors from plan generation.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan window is empty: [{from_ms}, {to_ms})")]
    EmptyWindow { from_ms: u64, to_ms: u64 },
    #[error("stream {stream} names unknown workstation {workstation}")]
    UnknownWorkstation { stream: String, workstation: WsName },
}

/// Deterministic instance ID for a stream occurrence.
fn stream_instance_id(stream: &str, occurrence_ms: u64) -> StreamInstanceId {
    StreamInstanceId::from(format!("{stream}@{occurrence_ms}"))
}

/// Deterministic instance ID for a job occurrence.
fn job_instance_id(stream: &str, occurrence_ms: u64, job: &str) -> JobInstanceId {
    JobInstanceId::from(format!("{stream}@{occurrence_ms}#{job}"))
}

/// Materialize a plan for `period` from the stored definitions.
///
/// `prior` supplies the run number to advance from and the open
/// instances to carry forward. Acquiring the generation lock and
/// swapping the live plan are the caller's responsibility (the master
/// serializes generations through the storage layer's exclusive lock);
/// this function is pure with respect to storage.
pub fn generate_plan(
    defs: &dyn DefinitionStore,
    period: PlanPeriod,
    prior: Option<&Plan>,
) -> Result<Plan, PlanError> {
    if period.from_ms >= period.to_ms {
        return Err(PlanError::EmptyWindow { from_ms: period.from_ms, to_ms: period.to_ms });
    }

    let run = prior.map(|p| p.run_number.next()).unwrap_or(RunNumber(1));
    let mut plan = Plan::new(run, period);

    for ws in defs.workstations() {
        plan.workstations.insert(ws.name.clone(), ws);
    }

    // Occurrence times per stream, needed to resolve follows-references
    // against the nearest earlier occurrence of the target stream.
    let streams = defs.streams();
    let occurrences: Vec<(StreamDef, Vec<u64>)> = streams
        .into_iter()
        .map(|def| {
            let occs = def.recurrence.occurrences(period);
            (def, occs)
        })
        .collect();

    for (def, occs) in &occurrences {
        if !plan.workstations.contains_key(&def.workstation) {
            return Err(PlanError::UnknownWorkstation {
                stream: def.name.to_string(),
                workstation: def.workstation.clone(),
            });
        }
        for &occ in occs {
            materialize_occurrence(&mut plan, def, occ, &occurrences);
        }
    }

    if let Some(prior) = prior {
        carry_forward(&mut plan, prior);
    }

    plan.seal();
    tracing::info!(
        run = %plan.run_number,
        jobs = plan.jobs.len(),
        streams = plan.streams.len(),
        "plan generated"
    );
    Ok(plan)
}

fn materialize_occurrence(
    plan: &mut Plan,
    def: &StreamDef,
    occurrence_ms: u64,
    all: &[(StreamDef, Vec<u64>)],
) {
    let sid = stream_instance_id(&def.name, occurrence_ms);
    let mut job_ids = Vec::with_capacity(def.jobs.len());

    for job_def in &def.jobs {
        let id = job_instance_id(&def.name, occurrence_ms, &job_def.name);
        let mut deps = Vec::new();
        for target in &job_def.follows {
            match resolve_follows(target, &def.name, occurrence_ms, all) {
                Some(target_id) => deps.push(Dependency::Follows { job: target_id }),
                None => {
                    tracing::warn!(
                        job = %id,
                        target = %target,
                        "follows target not materialized in window, dependency dropped"
                    );
                }
            }
        }
        let success = if job_def.success_codes.is_empty() {
            SuccessPolicy::default()
        } else {
            SuccessPolicy::with_codes(job_def.success_codes.iter().copied())
        };
        let instance = JobInstance {
            id: id.clone(),
            name: job_def.name.clone(),
            stream: sid.clone(),
            workstation: job_def.workstation.clone(),
            status: JobStatus::Hold,
            command: job_def.command.clone(),
            deps,
            success,
            carried_forward: false,
        };
        plan.jobs.insert(id.clone(), instance);
        job_ids.push(id);
    }

    plan.streams.insert(
        sid.clone(),
        StreamInstance {
            id: sid,
            name: def.name.clone(),
            workstation: def.workstation.clone(),
            occurrence_ms,
            jobs: job_ids,
        },
    );
}

/// Resolve a follows-reference to a concrete instance.
///
/// Same-stream references bind to the same occurrence. Cross-stream
/// references bind to the nearest occurrence of the target stream at or
/// before this occurrence time.
fn resolve_follows(
    target: &JobRef,
    stream: &str,
    occurrence_ms: u64,
    all: &[(StreamDef, Vec<u64>)],
) -> Option<JobInstanceId> {
    if target.stream == stream {
        return Some(job_instance_id(stream, occurrence_ms, &target.job));
    }
    let (_, occs) = all.iter().find(|(def, _)| def.name == target.stream)?;
    let at = occs.iter().copied().filter(|o| *o <= occurrence_ms).max()?;
    Some(job_instance_id(&target.stream, at, &target.job))
}

/// Carry open instances from the prior plan into the new one with their
/// last known status.
///
/// An instance the prior plan saw in `Exec` is carried in `Exec` even
/// though its completion event may still be in transit — the owning
/// agent correlates against live processes on receipt and waits for the
/// delayed event rather than guessing.
fn carry_forward(plan: &mut Plan, prior: &Plan) {
    let carried: Vec<JobInstance> = prior
        .open_jobs()
        .filter(|j| !plan.jobs.contains_key(&j.id))
        .cloned()
        .collect();

    for mut job in carried {
        job.carried_forward = true;
        if let Some(stream) = prior.streams.get(&job.stream) {
            plan.streams.entry(stream.id.clone()).or_insert_with(|| stream.clone());
        }
        tracing::debug!(job = %job.id, status = %job.status, "instance carried forward");
        plan.jobs.insert(job.id.clone(), job);
    }
}

#[cfg(test)]
#[path = "generate_tests.rs"]
mod tests;
