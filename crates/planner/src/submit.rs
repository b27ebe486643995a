// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tolerant, mutating submission.
//!
//! Unlike `validate`, submission commits what it can: a stream whose
//! references all resolve is stored immediately and becomes a referent
//! for the rest of the batch; a stream with unresolved references is
//! deferred and reported, and repeating the same request succeeds once
//! the referents exist. The asymmetry with strict validation is
//! deliberate and preserved.

use crate::defs::{DefinitionStore, JobRef, MemoryDefs, StreamDef};
use smol_str::SmolStr;
use std::collections::BTreeSet;

/// Per-job confirmation decision for wildcard submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Accept,
    Decline,
}

/// A stream held back because of unresolved references.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredStream {
    pub name: SmolStr,
    pub missing: Vec<JobRef>,
}

/// What a submission committed and what it deferred.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitOutcome {
    pub committed: Vec<SmolStr>,
    pub deferred: Vec<DeferredStream>,
}

impl SubmitOutcome {
    pub fn is_complete(&self) -> bool {
        self.deferred.is_empty()
    }
}

/// Submit a batch of stream definitions, committing in definition order.
pub fn submit(defs: &mut MemoryDefs, batch: Vec<StreamDef>) -> SubmitOutcome {
    let mut outcome = SubmitOutcome::default();

    for stream in batch {
        let missing: Vec<JobRef> = stream
            .jobs
            .iter()
            .flat_map(|j| j.follows.iter())
            .filter(|target| {
                !(target.stream == stream.name && stream.job(&target.job).is_some())
                    && !defs.resolves(target)
            })
            .cloned()
            .collect();

        if missing.is_empty() {
            tracing::debug!(stream = %stream.name, "stream committed");
            outcome.committed.push(stream.name.clone());
            defs.insert_stream_unchecked(stream);
        } else {
            tracing::info!(
                stream = %stream.name,
                missing = missing.len(),
                "stream deferred, resubmit once referents exist"
            );
            outcome.deferred.push(DeferredStream { name: stream.name.clone(), missing });
        }
    }

    outcome
}

/// Wildcard submission with a per-job confirmation prompt.
///
/// Declined jobs are left out. A dependency edge whose target was
/// declined in the same submission is dropped from the dependent rather
/// than failing it — anomalous but logical, and exactly how operators
/// expect wildcard confirmation to behave.
pub fn submit_with_confirm(
    defs: &mut MemoryDefs,
    batch: Vec<StreamDef>,
    confirm: &mut dyn FnMut(&SmolStr, &str) -> Confirmation,
) -> SubmitOutcome {
    let mut declined: BTreeSet<JobRef> = BTreeSet::new();

    // Collect decisions in definition order.
    for stream in &batch {
        for job in &stream.jobs {
            if confirm(&stream.name, &job.name) == Confirmation::Decline {
                declined.insert(JobRef::new(stream.name.clone(), job.name.clone()));
            }
        }
    }

    // Filter declined jobs out and drop edges that pointed at them.
    let filtered: Vec<StreamDef> = batch
        .into_iter()
        .map(|mut stream| {
            stream.jobs.retain(|j| {
                !declined.contains(&JobRef::new(stream.name.clone(), j.name.clone()))
            });
            for job in &mut stream.jobs {
                job.follows.retain(|target| {
                    let dropped = declined.contains(target);
                    if dropped {
                        tracing::debug!(
                            stream = %stream.name,
                            job = %job.name,
                            target = %target,
                            "dependency target declined, edge dropped"
                        );
                    }
                    !dropped
                });
            }
            stream
        })
        .filter(|s| !s.jobs.is_empty())
        .collect();

    submit(defs, filtered)
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
