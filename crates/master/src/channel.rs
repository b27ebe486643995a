// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Downstream push channel to direct children.
//!
//! Plans and control commands are framed with the wire codec and
//! pushed over each child's Unix socket. Delivery is fire-and-ack:
//! the child's plan acknowledgment travels back as an event, not as a
//! connection-level reply.

use async_trait::async_trait;
use gp_core::{Plan, WsName};
use gp_domain::{ChannelError, ControlCommand, PlanChannel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::net::UnixStream;

/// Message pushed from a manager to a direct child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownstreamMessage {
    #[serde(rename = "plan:push")]
    Plan { plan: Plan },
    #[serde(rename = "control:push")]
    Control { command: ControlCommand },
}

/// Pushes downstream messages over per-child Unix sockets.
#[derive(Debug, Default)]
pub struct SocketChannel {
    sockets: HashMap<WsName, PathBuf>,
}

impl SocketChannel {
    pub fn new(sockets: HashMap<WsName, PathBuf>) -> Self {
        Self { sockets }
    }

    async fn push(&self, dest: &WsName, message: &DownstreamMessage) -> Result<(), ChannelError> {
        let path = self
            .sockets
            .get(dest)
            .ok_or_else(|| ChannelError::Unreachable(format!("no socket for {dest}")))?;
        let mut stream = UnixStream::connect(path)
            .await
            .map_err(|e| ChannelError::Unreachable(format!("{dest}: {e}")))?;
        gp_wire::write_message(&mut stream, message)
            .await
            .map_err(|e| ChannelError::Unreachable(format!("{dest}: {e}")))
    }
}

#[async_trait]
impl PlanChannel for SocketChannel {
    async fn push_plan(&self, dest: &WsName, plan: &Plan) -> Result<(), ChannelError> {
        tracing::debug!(dest = %dest, run = %plan.run_number, "pushing plan");
        self.push(dest, &DownstreamMessage::Plan { plan: plan.clone() }).await
    }

    async fn push_control(
        &self,
        dest: &WsName,
        command: &ControlCommand,
    ) -> Result<(), ChannelError> {
        tracing::debug!(dest = %dest, command = %command, "pushing control");
        self.push(dest, &DownstreamMessage::Control { command: command.clone() }).await
    }
}
