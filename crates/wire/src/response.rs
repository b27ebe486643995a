// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gp_core::{LinkState, RunNumber, WsName};
use serde::{Deserialize, Serialize};

/// Stable error categories automation can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Plan generation lock held; previous plan remains authoritative.
    PlanLockHeld,
    /// Transient link failure; retried automatically.
    LinkDown,
    /// Destination queue overflowed; oldest events dropped.
    QueueOverflow,
    /// Authoritative plan unreadable or inconsistent.
    Corruption,
    /// Recovery preconditions not met for the chosen strategy.
    RecoveryUnavailable,
    /// No eligible resource after the retry bound.
    AllocationFailed,
    /// Target resource deregistered mid-flight.
    ResourceUnreachable,
    /// Definitions failed strict validation.
    ValidationFailed,
    InvalidRequest,
    NotFound,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkstationEntry {
    pub name: WsName,
    pub role: String,
    pub link: LinkState,
    /// Queued control commands awaiting the workstation's ack.
    pub pending_controls: usize,
    pub acked_run: Option<RunNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub run: RunNumber,
    pub from_ms: u64,
    pub to_ms: u64,
    pub jobs: usize,
    pub streams: usize,
    pub structural_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub plan: Option<PlanSummary>,
    pub workstations: Vec<WorkstationEntry>,
    pub event_log_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchStatusEntry {
    pub request: String,
    pub status: String,
    /// External mapping: INTRO, WAIT, EXEC, SUCC, or ABEND.
    pub external: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Response from the master daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Success with no payload
    Ok,

    /// Failure with a stable code and a human-readable message
    Error { code: ErrorCode, message: String },

    Pong,

    Status { report: StatusReport },

    PlanGenerated { summary: PlanSummary },

    /// Submission outcome: committed and deferred stream names
    Submitted { committed: Vec<String>, deferred: Vec<String> },

    DispatchSubmitted { request: String },

    DispatchStatus { entry: DispatchStatusEntry },

    /// Recovery outcome with operator-facing warnings
    Recovered { run: RunNumber, warnings: Vec<String> },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error { code, message: message.into() }
    }
}
