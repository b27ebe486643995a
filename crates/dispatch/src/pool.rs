// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registered dynamic resources and their free capacity.

use smol_str::SmolStr;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct ResourceState {
    capacity: u32,
    in_use: u32,
    registered: bool,
}

/// The elastic resources dynamic jobs are placed onto.
///
/// Deregistration keeps the record (with `registered = false`) so
/// mid-flight requests bound to the resource can be failed with a
/// distinguishable "unreachable" error instead of vanishing.
#[derive(Debug, Default)]
pub struct ResourcePool {
    resources: HashMap<SmolStr, ResourceState>,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<SmolStr>, capacity: u32) {
        let name = name.into();
        tracing::info!(resource = %name, capacity, "resource registered");
        let entry = self
            .resources
            .entry(name)
            .or_insert(ResourceState { capacity, in_use: 0, registered: true });
        entry.capacity = capacity;
        entry.registered = true;
    }

    pub fn deregister(&mut self, name: &str) {
        if let Some(state) = self.resources.get_mut(name) {
            tracing::info!(resource = %name, "resource deregistered");
            state.registered = false;
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.resources.get(name).is_some_and(|s| s.registered)
    }

    /// Known at some point, even if since deregistered.
    pub fn is_known(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn free(&self, name: &str) -> u32 {
        self.resources
            .get(name)
            .filter(|s| s.registered)
            .map(|s| s.capacity.saturating_sub(s.in_use))
            .unwrap_or(0)
    }

    /// Reserve `units` on a registered resource.
    pub fn try_allocate(&mut self, name: &str, units: u32) -> bool {
        let Some(state) = self.resources.get_mut(name) else { return false };
        if !state.registered || state.capacity.saturating_sub(state.in_use) < units {
            return false;
        }
        state.in_use += units;
        true
    }

    pub fn release(&mut self, name: &str, units: u32) {
        if let Some(state) = self.resources.get_mut(name) {
            state.in_use = state.in_use.saturating_sub(units);
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
