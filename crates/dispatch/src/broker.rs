// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker: submission registry plus advisor plus resource pool.
//!
//! Submissions append to a backlog (producer side); the advisor's slot
//! cycle is the single consumer that moves them through the cache. No
//! global lock: the two sides meet only at the backlog queue.

use crate::advisor::{ResourceAdvisor, SlotReport};
use crate::config::{AdvisorConfig, ConfigError, DispatcherConfig};
use crate::pool::ResourcePool;
use crate::request::{
    DispatchRequest, DispatchRequestId, ExternalStatus, ProcessingStatus, ResourceNeed,
};
use crate::service::StatusChange;
use gp_core::Clock;
use smol_str::SmolStr;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error("unknown dispatch request {0}")]
    UnknownRequest(DispatchRequestId),
}

/// What a submitter asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSpec {
    pub job_name: SmolStr,
    pub command: String,
    pub need: ResourceNeed,
}

/// The dynamic dispatch broker.
pub struct Broker<C: Clock> {
    clock: C,
    dispatcher: DispatcherConfig,
    requests: HashMap<DispatchRequestId, DispatchRequest>,
    backlog: VecDeque<DispatchRequestId>,
    advisor: ResourceAdvisor,
    pool: ResourcePool,
    changes: Vec<StatusChange>,
}

impl<C: Clock> Broker<C> {
    pub fn new(
        dispatcher: DispatcherConfig,
        advisor: AdvisorConfig,
        clock: C,
    ) -> Result<Self, ConfigError> {
        dispatcher.validate()?;
        advisor.validate()?;
        Ok(Self {
            clock,
            dispatcher,
            requests: HashMap::new(),
            backlog: VecDeque::new(),
            advisor: ResourceAdvisor::new(advisor),
            pool: ResourcePool::new(),
            changes: Vec::new(),
        })
    }

    pub fn dispatcher_config(&self) -> &DispatcherConfig {
        &self.dispatcher
    }

    pub fn register_resource(&mut self, name: impl Into<SmolStr>, capacity: u32) {
        self.pool.register(name, capacity);
    }

    /// Deregister a resource and permanently fail every in-flight
    /// request targeting it. The failure is surfaced to the submitter
    /// through the request's status and failure reason, never dropped.
    pub fn deregister_resource(&mut self, name: &str) {
        self.pool.deregister(name);
        let affected: Vec<DispatchRequestId> = self
            .requests
            .values()
            .filter(|r| !r.status.is_terminal() && r.need.resource == name)
            .map(|r| r.id.clone())
            .collect();
        for id in affected {
            if let Some(request) = self.requests.get_mut(&id) {
                request.failure = Some(format!("resource {name} unreachable"));
                if request.transition(ProcessingStatus::Error) {
                    tracing::warn!(request = %id, resource = %name, "failed: resource deregistered mid-flight");
                    self.changes.push(StatusChange { request: id, status: ProcessingStatus::Error });
                }
            }
        }
    }

    pub fn free_capacity(&self, resource: &str) -> u32 {
        self.pool.free(resource)
    }

    /// Accept a dynamic submission. Always returns an ID; placement
    /// happens on a later advisor slot.
    pub fn submit(&mut self, spec: DispatchSpec) -> DispatchRequestId {
        let id = DispatchRequestId::generate();
        let request = DispatchRequest {
            id: id.clone(),
            job_name: spec.job_name,
            command: spec.command,
            need: spec.need,
            status: ProcessingStatus::Submitted,
            attempts: 0,
            submitted_at_ms: self.clock.epoch_ms(),
            bound_to: None,
            failure: None,
        };
        tracing::debug!(request = %id, job = %request.job_name, "dispatch request submitted");
        self.requests.insert(id.clone(), request);
        self.backlog.push_back(id.clone());
        self.changes
            .push(StatusChange { request: id.clone(), status: ProcessingStatus::Submitted });
        id
    }

    /// Cancel a request. Idempotent: cancelling a terminal request
    /// returns `Ok(false)` and changes nothing.
    pub fn cancel(&mut self, id: &DispatchRequestId) -> Result<bool, SubmitError> {
        let request = self
            .requests
            .get_mut(id)
            .ok_or_else(|| SubmitError::UnknownRequest(id.clone()))?;
        if request.status.is_terminal() {
            return Ok(false);
        }
        let next = if request.status == ProcessingStatus::Execute {
            ProcessingStatus::CancelPending
        } else {
            ProcessingStatus::Cancel
        };
        let changed = request.transition(next);
        if changed {
            self.changes.push(StatusChange { request: id.clone(), status: next });
        }
        Ok(changed)
    }

    /// Report completion of an executing request.
    pub fn complete(&mut self, id: &DispatchRequestId, success: bool) -> Result<(), SubmitError> {
        let request = self
            .requests
            .get_mut(id)
            .ok_or_else(|| SubmitError::UnknownRequest(id.clone()))?;

        if let Some(resource) = request.bound_to.take() {
            self.pool.release(&resource, request.need.units);
        }
        let next = match (request.status, success) {
            (ProcessingStatus::CancelPending, _) => ProcessingStatus::Cancel,
            (_, true) => ProcessingStatus::Completed,
            (_, false) => ProcessingStatus::Error,
        };
        if !success && request.failure.is_none() {
            request.failure = Some("execution failed".to_string());
        }
        if request.transition(next) {
            self.changes.push(StatusChange { request: id.clone(), status: next });
        }
        Ok(())
    }

    /// Run one advisor admission slot.
    pub fn run_slot(&mut self) -> SlotReport {
        self.advisor.refill(&mut self.backlog);
        let report = self.advisor.allocate_slot(&mut self.requests, &mut self.pool);
        for id in &report.allocated {
            self.changes
                .push(StatusChange { request: id.clone(), status: ProcessingStatus::Execute });
        }
        for id in &report.requeued {
            self.changes
                .push(StatusChange { request: id.clone(), status: ProcessingStatus::Reallocate });
        }
        for (id, _) in &report.failed {
            self.changes
                .push(StatusChange { request: id.clone(), status: ProcessingStatus::Error });
        }
        report
    }

    pub fn cache_len(&self) -> usize {
        self.advisor.cache_len()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn request(&self, id: &DispatchRequestId) -> Option<&DispatchRequest> {
        self.requests.get(id)
    }

    /// Internal and externally mapped status of a request.
    pub fn status(&self, id: &DispatchRequestId) -> Option<(ProcessingStatus, ExternalStatus)> {
        self.requests.get(id).map(|r| (r.status, r.external()))
    }

    /// Status changes accumulated since the last call, for routing into
    /// the dispatcher service's queues.
    pub fn take_changes(&mut self) -> Vec<StatusChange> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
