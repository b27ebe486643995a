// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-sliced admission control.
//!
//! Once per slot the advisor pulls at most `max_allocs_per_slot`
//! requests, FIFO, from a cache bounded by `max_allocs_in_cache`, and
//! binds each to a registered resource or requeues it. Admission beyond
//! the per-slot quota is deferred to the next slot, bounding the load a
//! burst can put on the resource layer.

use crate::config::AdvisorConfig;
use crate::pool::ResourcePool;
use crate::request::{DispatchRequest, DispatchRequestId, ProcessingStatus};
use smol_str::SmolStr;
use std::collections::{HashMap, VecDeque};

/// Why a request failed allocation permanently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationFailure {
    /// The target resource was deregistered (or never existed).
    ResourceUnreachable { resource: SmolStr },
    /// Reallocation retries exhausted without an eligible resource.
    AttemptsExhausted { attempts: u32 },
}

/// What one admission slot did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SlotReport {
    /// Requests pulled from the cache this slot. Never exceeds
    /// `max_allocs_per_slot`.
    pub admitted: usize,
    pub allocated: Vec<DispatchRequestId>,
    /// Back in the cache, waiting for a later slot.
    pub requeued: Vec<DispatchRequestId>,
    pub failed: Vec<(DispatchRequestId, AllocationFailure)>,
    /// Cache occupancy after the slot.
    pub cache_occupancy: usize,
}

/// The advisor's bounded FIFO admission cache.
pub struct ResourceAdvisor {
    config: AdvisorConfig,
    cache: VecDeque<DispatchRequestId>,
}

impl ResourceAdvisor {
    pub fn new(config: AdvisorConfig) -> Self {
        Self { config, cache: VecDeque::new() }
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Top the cache up from the submission backlog, never beyond
    /// `max_allocs_in_cache`.
    pub fn refill(&mut self, backlog: &mut VecDeque<DispatchRequestId>) {
        while self.cache.len() < self.config.max_allocs_in_cache {
            let Some(id) = backlog.pop_front() else { break };
            self.cache.push_back(id);
        }
    }

    /// Run one admission slot.
    ///
    /// The advisor is the cache's only consumer (single writer per
    /// slot); submissions only ever append to the backlog feeding it.
    pub fn allocate_slot(
        &mut self,
        requests: &mut HashMap<DispatchRequestId, DispatchRequest>,
        pool: &mut ResourcePool,
    ) -> SlotReport {
        let mut report = SlotReport::default();

        while report.admitted < self.config.max_allocs_per_slot {
            let Some(id) = self.cache.pop_front() else { break };
            report.admitted += 1;

            let Some(request) = requests.get_mut(&id) else { continue };
            if request.status.is_terminal()
                || request.status == ProcessingStatus::CancelPending
            {
                // Cancelled while cached; nothing to allocate.
                continue;
            }

            let resource = request.need.resource.clone();
            if !pool.is_registered(&resource) {
                request.failure = Some(format!("resource {resource} unreachable"));
                request.transition(ProcessingStatus::Error);
                tracing::warn!(request = %id, %resource, "allocation failed: resource unreachable");
                report.failed.push((id, AllocationFailure::ResourceUnreachable { resource }));
                continue;
            }

            if pool.try_allocate(&resource, request.need.units) {
                request.bound_to = Some(resource);
                request.transition(ProcessingStatus::Execute);
                report.allocated.push(id);
                continue;
            }

            request.attempts += 1;
            if request.attempts > self.config.max_realloc_attempts {
                request.failure = Some("no eligible resource".to_string());
                request.transition(ProcessingStatus::Error);
                tracing::warn!(
                    request = %id,
                    attempts = request.attempts,
                    "allocation failed permanently: retries exhausted"
                );
                report
                    .failed
                    .push((id, AllocationFailure::AttemptsExhausted { attempts: request.attempts }));
            } else {
                request.transition(ProcessingStatus::Reallocate);
                self.cache.push_back(id.clone());
                report.requeued.push(id);
            }
        }

        report.cache_occupancy = self.cache.len();
        debug_assert!(report.cache_occupancy <= self.config.max_allocs_in_cache);
        report
    }
}

#[cfg(test)]
#[path = "advisor_tests.rs"]
mod tests;
