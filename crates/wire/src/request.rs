// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gp_core::WsName;
use serde::{Deserialize, Serialize};

/// Job template carried in a stream submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitJob {
    pub name: String,
    pub workstation: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub success_codes: Vec<i32>,
    /// `stream.job` references this job follows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follows: Vec<String>,
}

/// Stream definition carried in a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitStream {
    pub name: String,
    pub workstation: String,
    /// Epoch ms of a one-shot occurrence, or a daily offset prefixed
    /// with `daily:`.
    pub schedule: String,
    pub jobs: Vec<SubmitJob>,
}

/// Recovery strategy selector (an explicit operator decision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryChoice {
    Failover,
    ReplayLog,
    Regenerate,
}

/// Request from the console layer to the master daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Overall master status
    Status,

    /// Strictly validate stream definitions without committing them
    ValidateDefs { streams: Vec<SubmitStream> },

    /// Submit stream definitions (tolerant, retryable)
    SubmitDefs { streams: Vec<SubmitStream> },

    /// Generate and distribute the plan for a window
    GeneratePlan { from_ms: u64, to_ms: u64 },

    /// Pause launches on one workstation
    Stop { workstation: WsName },

    /// Resume launches on one workstation
    Start { workstation: WsName },

    /// Per-workstation stops for the whole tree, ordered leaves to root
    StopCascade,

    /// Re-establish the channel to one workstation
    Link { workstation: WsName },

    /// Mark one workstation's channel down
    Unlink { workstation: WsName },

    /// Cancel one job instance on its owning workstation
    CancelJob { workstation: WsName, job: String },

    /// Submit a dynamic job to the broker
    DispatchSubmit { job_name: String, command: String, resource: String, units: u32 },

    /// Cancel a dynamic dispatch request
    DispatchCancel { request: String },

    /// Query a dispatch request's status
    DispatchStatus { request: String },

    /// Recover the authoritative plan with the chosen strategy
    Recover { strategy: RecoveryChoice },

    /// Request daemon shutdown
    Shutdown,
}
