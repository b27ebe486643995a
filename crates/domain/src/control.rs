// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative control commands.
//!
//! Always individually addressed to one workstation (or one job) and
//! idempotent on the receiver — there is no broadcast form. A fleet-wide
//! stop is expressed as per-workstation commands ordered leaves to root,
//! so in-flight event delivery is never raced by an upstream stop.

use gp_core::{JobInstanceId, WsName};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlCommand {
    Stop { workstation: WsName },
    Start { workstation: WsName },
    Link { workstation: WsName },
    Unlink { workstation: WsName },
    CancelJob { workstation: WsName, job: JobInstanceId },
}

impl ControlCommand {
    /// The workstation this command is addressed to.
    pub fn target(&self) -> &WsName {
        match self {
            ControlCommand::Stop { workstation }
            | ControlCommand::Start { workstation }
            | ControlCommand::Link { workstation }
            | ControlCommand::Unlink { workstation }
            | ControlCommand::CancelJob { workstation, .. } => workstation,
        }
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlCommand::Stop { workstation } => write!(f, "stop {workstation}"),
            ControlCommand::Start { workstation } => write!(f, "start {workstation}"),
            ControlCommand::Link { workstation } => write!(f, "link {workstation}"),
            ControlCommand::Unlink { workstation } => write!(f, "unlink {workstation}"),
            ControlCommand::CancelJob { workstation, job } => {
                write!(f, "cancel {job} on {workstation}")
            }
        }
    }
}
