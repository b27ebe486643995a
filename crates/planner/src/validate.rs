// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strict batch validation.
//!
//! Pure check with no side effects: objects are processed in definition
//! order and a reference to an object not yet known (neither stored nor
//! earlier in the batch) is an error. This is deliberately stricter
//! than `submit` — a pure validation has no committed first pass to
//! lean on, so forward and circular references between co-submitted
//! objects can never be resolved here.

use crate::defs::{DefinitionStore, JobRef, MemoryDefs, StreamDef};
use smol_str::SmolStr;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    #[error("stream {stream}: job {job} references unknown object {target}")]
    UnknownReference { stream: SmolStr, job: SmolStr, target: JobRef },
    #[error("duplicate stream definition {name}")]
    DuplicateStream { name: SmolStr },
}

/// Validate a batch against the store, in definition order.
pub fn validate(defs: &MemoryDefs, batch: &[StreamDef]) -> Result<(), Vec<ValidateError>> {
    let mut errors = Vec::new();
    let mut seen: BTreeSet<SmolStr> = BTreeSet::new();

    for (index, stream) in batch.iter().enumerate() {
        if defs.contains_stream(&stream.name) || !seen.insert(stream.name.clone()) {
            errors.push(ValidateError::DuplicateStream { name: stream.name.clone() });
        }
        for job in &stream.jobs {
            for target in &job.follows {
                if !reference_known(defs, batch, index, stream, target) {
                    errors.push(ValidateError::UnknownReference {
                        stream: stream.name.clone(),
                        job: job.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A reference resolves against the store, the batch prefix processed
/// so far, or the referencing stream itself.
fn reference_known(
    defs: &MemoryDefs,
    batch: &[StreamDef],
    index: usize,
    current: &StreamDef,
    target: &JobRef,
) -> bool {
    if target.stream == current.name {
        return current.job(&target.job).is_some();
    }
    if defs.resolves(target) {
        return true;
    }
    batch[..index]
        .iter()
        .any(|s| s.name == target.stream && s.job(&target.job).is_some())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
