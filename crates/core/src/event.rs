// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events: immutable, timestamped facts propagated between workstations.
//!
//! Serializes with `{"type": "noun:verb", ...fields}` format. Every
//! variant carries its source workstation and an [`EventSeq`] stamp so
//! receivers can deduplicate and order without relying on transport
//! arrival order. Unknown type tags deserialize to `Custom`.

use crate::job::{JobInstanceId, JobStatus};
use crate::seq::{EventSeq, RunNumber};
use crate::workstation::WsName;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A job instance reached a new status on its owning workstation.
    #[serde(rename = "job:status")]
    JobStatus {
        source: WsName,
        seq: EventSeq,
        job: JobInstanceId,
        status: JobStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        at_ms: u64,
    },

    /// Cancellation request/fact for a job instance. Applying it to an
    /// already-terminal instance is a no-op.
    #[serde(rename = "job:cancel")]
    JobCancel { source: WsName, seq: EventSeq, job: JobInstanceId },

    /// A workstation acknowledges full receipt of a plan generation.
    #[serde(rename = "plan:ack")]
    PlanAck { source: WsName, seq: EventSeq, run: RunNumber },

    #[serde(rename = "link:up")]
    LinkUp { source: WsName, seq: EventSeq, workstation: WsName },

    #[serde(rename = "link:down")]
    LinkDown {
        source: WsName,
        seq: EventSeq,
        workstation: WsName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// A destination queue overflowed and evicted its oldest events.
    /// Data loss is surfaced, never swallowed.
    #[serde(rename = "queue:overflow")]
    QueueOverflow {
        source: WsName,
        seq: EventSeq,
        destination: WsName,
        dropped: u64,
    },

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// Workstation that produced the event.
    pub fn source(&self) -> Option<&WsName> {
        match self {
            Event::JobStatus { source, .. }
            | Event::JobCancel { source, .. }
            | Event::PlanAck { source, .. }
            | Event::LinkUp { source, .. }
            | Event::LinkDown { source, .. }
            | Event::QueueOverflow { source, .. } => Some(source),
            Event::Custom => None,
        }
    }

    /// Sequencing stamp, if the event carries one.
    pub fn seq(&self) -> Option<EventSeq> {
        match self {
            Event::JobStatus { seq, .. }
            | Event::JobCancel { seq, .. }
            | Event::PlanAck { seq, .. }
            | Event::LinkUp { seq, .. }
            | Event::LinkDown { seq, .. }
            | Event::QueueOverflow { seq, .. } => Some(*seq),
            Event::Custom => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
