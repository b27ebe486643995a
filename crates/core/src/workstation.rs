// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workstation identity, roles, and link state.

use serde::{Deserialize, Serialize};

crate::define_name! {
    /// Operator-assigned workstation name.
    pub struct WsName;
}

/// Role a workstation plays in the domain hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsRole {
    Master,
    DomainManager,
    BackupDomainManager,
    FaultTolerantAgent,
    StandardAgent,
    DynamicAgent,
}

impl WsRole {
    /// Managers relay plans and events between their parent and children.
    pub fn is_manager(&self) -> bool {
        matches!(self, WsRole::Master | WsRole::DomainManager)
    }

    /// Can hold a plan replica and keep executing during a partition.
    pub fn is_fault_tolerant(&self) -> bool {
        matches!(
            self,
            WsRole::Master
                | WsRole::DomainManager
                | WsRole::BackupDomainManager
                | WsRole::FaultTolerantAgent
        )
    }
}

crate::simple_display! {
    WsRole {
        Master => "master",
        DomainManager => "domain_manager",
        BackupDomainManager => "backup_domain_manager",
        FaultTolerantAgent => "fault_tolerant_agent",
        StandardAgent => "standard_agent",
        DynamicAgent => "dynamic_agent",
    }
}

/// Liveness of the link between a workstation and its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Linked,
    #[default]
    Unlinked,
    Linking,
}

crate::simple_display! {
    LinkState {
        Linked => "linked",
        Unlinked => "unlinked",
        Linking => "linking",
    }
}

/// A workstation definition as materialized into a plan.
///
/// `name`, `role`, `parent`, and `limit` are structural (identical on
/// every replica of a run number); `link` is runtime state owned by
/// whichever node tracks the link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workstation {
    pub name: WsName,
    pub role: WsRole,
    /// Parent domain manager; `None` only for the master.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<WsName>,
    /// Concurrent-job limit. 0 pauses all launches on this workstation.
    pub limit: u32,
    #[serde(default)]
    pub link: LinkState,
}

impl Workstation {
    pub fn new(name: impl Into<WsName>, role: WsRole) -> Self {
        Self { name: name.into(), role, parent: None, limit: DEFAULT_JOB_LIMIT, link: LinkState::Unlinked }
    }

    pub fn with_parent(mut self, parent: impl Into<WsName>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Default concurrent-job limit for a workstation that does not set one.
pub const DEFAULT_JOB_LIMIT: u32 = 10;

#[cfg(test)]
#[path = "workstation_tests.rs"]
mod tests;
