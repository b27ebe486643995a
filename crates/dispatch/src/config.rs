// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker configuration, loaded from TOML.

use crate::request::ProcessingStatus;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Hard ceiling on dispatcher queues.
pub const MAX_QUEUES: usize = 10;
/// Worker-pool bounds per queue.
pub const MIN_WORKERS: u32 = 1;
pub const MAX_WORKERS: u32 = 100;
/// Advisor cache must hold at least this many slots' worth of requests.
pub const MIN_CACHE_SLOTS: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("too many dispatcher queues: {0} (max {MAX_QUEUES})")]
    TooManyQueues(usize),
    #[error("queue {name}: workers {workers} outside {MIN_WORKERS}..={MAX_WORKERS}")]
    WorkersOutOfRange { name: SmolStr, workers: u32 },
    #[error("status {status} assigned to both {first} and {second}")]
    StatusAssignedTwice { status: ProcessingStatus, first: SmolStr, second: SmolStr },
    #[error(
        "cache of {cache} cannot absorb bursts: needs at least {MIN_CACHE_SLOTS}x \
         the per-slot rate of {per_slot}"
    )]
    CacheTooSmall { cache: usize, per_slot: usize },
    #[error("per-slot admission rate must be nonzero")]
    ZeroSlotRate,
    #[error("config parse error: {0}")]
    Parse(String),
}

/// One named dispatcher queue and the statuses routed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: SmolStr,
    #[serde(default)]
    pub statuses: Vec<ProcessingStatus>,
    pub workers: u32,
}

/// Dispatcher queue layout. Statuses not assigned anywhere route to
/// queue 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(rename = "queue", default)]
    pub queues: Vec<QueueConfig>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queues: vec![QueueConfig { name: "default".into(), statuses: Vec::new(), workers: 5 }],
        }
    }
}

impl DispatcherConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queues.len() > MAX_QUEUES {
            return Err(ConfigError::TooManyQueues(self.queues.len()));
        }
        let mut assigned: Vec<(ProcessingStatus, &SmolStr)> = Vec::new();
        for queue in &self.queues {
            if !(MIN_WORKERS..=MAX_WORKERS).contains(&queue.workers) {
                return Err(ConfigError::WorkersOutOfRange {
                    name: queue.name.clone(),
                    workers: queue.workers,
                });
            }
            for status in &queue.statuses {
                if let Some((_, first)) = assigned.iter().find(|(s, _)| s == status) {
                    return Err(ConfigError::StatusAssignedTwice {
                        status: *status,
                        first: (*first).clone(),
                        second: queue.name.clone(),
                    });
                }
                assigned.push((*status, &queue.name));
            }
        }
        Ok(())
    }

    /// Queue index a status routes to; unassigned statuses go to 0.
    pub fn queue_for(&self, status: ProcessingStatus) -> usize {
        self.queues
            .iter()
            .position(|q| q.statuses.contains(&status))
            .unwrap_or(0)
    }
}

/// Resource advisor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Fixed admission slot length.
    #[serde(default = "default_slot_ms")]
    pub slot_ms: u64,
    pub max_allocs_per_slot: usize,
    pub max_allocs_in_cache: usize,
    /// Reallocation attempts before a request fails permanently.
    #[serde(default = "default_realloc_attempts")]
    pub max_realloc_attempts: u32,
}

fn default_slot_ms() -> u64 {
    15_000
}

fn default_realloc_attempts() -> u32 {
    3
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            slot_ms: default_slot_ms(),
            max_allocs_per_slot: 100,
            max_allocs_in_cache: 1_000,
            max_realloc_attempts: default_realloc_attempts(),
        }
    }
}

impl AdvisorConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_allocs_per_slot == 0 {
            return Err(ConfigError::ZeroSlotRate);
        }
        if self.max_allocs_in_cache < MIN_CACHE_SLOTS * self.max_allocs_per_slot {
            return Err(ConfigError::CacheTooSmall {
                cache: self.max_allocs_in_cache,
                per_slot: self.max_allocs_per_slot,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
