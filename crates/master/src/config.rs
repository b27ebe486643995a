// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, loaded from TOML.

use gp_core::{Workstation, WsName, WsRole, DEFAULT_JOB_LIMIT};
use gp_dispatch::{AdvisorConfig, DispatcherConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("broker config invalid: {0}")]
    Broker(#[from] gp_dispatch::ConfigError),
}

/// One workstation as declared in the daemon config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkstationConfig {
    pub name: WsName,
    pub role: WsRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<WsName>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Socket the master pushes plans and controls to (direct children).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,
}

fn default_limit() -> u32 {
    DEFAULT_JOB_LIMIT
}

impl WorkstationConfig {
    pub fn to_workstation(&self) -> Workstation {
        let mut ws = Workstation::new(self.name.clone(), self.role).with_limit(self.limit);
        if let Some(parent) = &self.parent {
            ws = ws.with_parent(parent.clone());
        }
        ws
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// This master's workstation name.
    pub name: WsName,
    /// Root directory for plan, archive, and event log.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    /// Admin socket path.
    #[serde(default)]
    pub socket: Option<PathBuf>,
    /// Durable event-log retention (entries). Unset means unbounded.
    #[serde(default)]
    pub event_log_capacity: Option<u64>,
    #[serde(rename = "workstation", default)]
    pub workstations: Vec<WorkstationConfig>,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(flatten)]
    pub dispatcher: DispatcherConfig,
}

impl MasterConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.dispatcher.queues.is_empty() {
            config.dispatcher = DispatcherConfig::default();
        }
        config.dispatcher.validate()?;
        config.advisor.validate()?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("gridplan")
        })
    }

    pub fn socket_path(&self) -> PathBuf {
        self.socket.clone().unwrap_or_else(|| self.state_dir().join("gpd.sock"))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
