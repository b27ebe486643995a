// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch requests and their processing-status machine.

use gp_core::define_id;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

define_id! {
    /// Identifier assigned to every dynamic submission.
    pub struct DispatchRequestId("dsp-");
}

/// Internal processing status of a dispatch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Accepted, waiting to enter the advisor cache.
    Submitted,
    /// Allocation failed; waiting to be admitted again.
    Reallocate,
    /// Bound to a resource and running.
    Execute,
    /// Cancel requested while running.
    CancelPending,
    /// Terminal: cancelled.
    Cancel,
    /// Terminal: finished successfully.
    Completed,
    /// Terminal: failed permanently.
    Error,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Cancel | ProcessingStatus::Completed | ProcessingStatus::Error
        )
    }

    /// Simplified mirror of the plan job state machine.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        match (self, next) {
            (Submitted, Execute) | (Submitted, Reallocate) => true,
            (Reallocate, Execute) | (Reallocate, Reallocate) => true,
            (Execute, Completed) | (Execute, CancelPending) => true,
            (CancelPending, Cancel) => true,
            (Submitted, Cancel) | (Reallocate, Cancel) => true,
            (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }
}

gp_core::simple_display! {
    ProcessingStatus {
        Submitted => "submitted",
        Reallocate => "reallocate",
        Execute => "execute",
        CancelPending => "cancel_pending",
        Cancel => "cancel",
        Completed => "completed",
        Error => "error",
    }
}

/// Externally surfaced status, aligned with the plan job statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalStatus {
    Intro,
    Wait,
    Exec,
    Succ,
    Abend,
}

gp_core::simple_display! {
    ExternalStatus {
        Intro => "INTRO",
        Wait => "WAIT",
        Exec => "EXEC",
        Succ => "SUCC",
        Abend => "ABEND",
    }
}

/// Table-driven mapping of internal statuses to the external set.
pub const STATUS_MAP: &[(ProcessingStatus, ExternalStatus)] = &[
    (ProcessingStatus::Submitted, ExternalStatus::Intro),
    (ProcessingStatus::Reallocate, ExternalStatus::Wait),
    (ProcessingStatus::Execute, ExternalStatus::Exec),
    (ProcessingStatus::CancelPending, ExternalStatus::Exec),
    (ProcessingStatus::Cancel, ExternalStatus::Abend),
    (ProcessingStatus::Completed, ExternalStatus::Succ),
    (ProcessingStatus::Error, ExternalStatus::Abend),
];

pub fn external_status(status: ProcessingStatus) -> ExternalStatus {
    STATUS_MAP
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, e)| *e)
        // Table covers every variant; Abend is the conservative fallback.
        .unwrap_or(ExternalStatus::Abend)
}

/// Resource demand of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNeed {
    pub resource: SmolStr,
    pub units: u32,
}

/// A dynamic job submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub id: DispatchRequestId,
    pub job_name: SmolStr,
    pub command: String,
    pub need: ResourceNeed,
    pub status: ProcessingStatus,
    /// Allocation attempts consumed so far.
    pub attempts: u32,
    pub submitted_at_ms: u64,
    /// Resource the request is bound to while executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_to: Option<SmolStr>,
    /// Permanent failure reason, set with `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl DispatchRequest {
    /// Apply a status transition, enforcing the machine.
    /// Returns `false` (unchanged) for an invalid transition.
    pub fn transition(&mut self, next: ProcessingStatus) -> bool {
        if self.status == next {
            return false;
        }
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    pub fn external(&self) -> ExternalStatus {
        external_status(self.status)
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
