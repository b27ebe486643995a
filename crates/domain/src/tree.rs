// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The domain tree: one master at the root, managers below it, agents
//! at the leaves.

use gp_core::{Workstation, WsName, WsRole};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("duplicate workstation {0}")]
    Duplicate(WsName),
    #[error("workstation {workstation} names unknown parent {parent}")]
    UnknownParent { workstation: WsName, parent: WsName },
    #[error("tree has no master")]
    NoMaster,
    #[error("tree has more than one master: {0} and {1}")]
    TwoMasters(WsName, WsName),
    #[error("non-master workstation {0} has no parent")]
    Orphan(WsName),
}

/// Validated workstation hierarchy, preserving definition order.
#[derive(Debug, Clone, Default)]
pub struct DomainTree {
    nodes: IndexMap<WsName, Workstation>,
}

impl DomainTree {
    /// Build and validate a tree from workstation definitions.
    ///
    /// Parents must appear before their children (definition order), so
    /// cycles cannot form.
    pub fn from_workstations(
        workstations: impl IntoIterator<Item = Workstation>,
    ) -> Result<Self, TreeError> {
        let mut tree = Self::default();
        for ws in workstations {
            tree.insert(ws)?;
        }
        if tree.root().is_none() {
            return Err(TreeError::NoMaster);
        }
        Ok(tree)
    }

    fn insert(&mut self, ws: Workstation) -> Result<(), TreeError> {
        if self.nodes.contains_key(&ws.name) {
            return Err(TreeError::Duplicate(ws.name));
        }
        match (&ws.role, &ws.parent) {
            (WsRole::Master, _) => {
                if let Some(existing) = self.root() {
                    return Err(TreeError::TwoMasters(existing.name.clone(), ws.name));
                }
            }
            (_, None) => return Err(TreeError::Orphan(ws.name)),
            (_, Some(parent)) => {
                if !self.nodes.contains_key(parent) {
                    return Err(TreeError::UnknownParent {
                        workstation: ws.name,
                        parent: parent.clone(),
                    });
                }
            }
        }
        self.nodes.insert(ws.name.clone(), ws);
        Ok(())
    }

    pub fn root(&self) -> Option<&Workstation> {
        self.nodes.values().find(|w| w.role == WsRole::Master)
    }

    pub fn get(&self, name: &WsName) -> Option<&Workstation> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &WsName) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn parent(&self, name: &WsName) -> Option<&WsName> {
        self.nodes.get(name).and_then(|w| w.parent.as_ref())
    }

    /// Direct children of a node, in definition order.
    pub fn children(&self, name: &WsName) -> Vec<WsName> {
        self.nodes
            .values()
            .filter(|w| w.parent.as_ref() == Some(name))
            .map(|w| w.name.clone())
            .collect()
    }

    /// A node plus all its descendants.
    pub fn subtree(&self, name: &WsName) -> Vec<WsName> {
        let mut out = Vec::new();
        let mut stack = vec![name.clone()];
        while let Some(node) = stack.pop() {
            if !self.contains(&node) {
                continue;
            }
            stack.extend(self.children(&node));
            out.push(node);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All workstations ordered leaves before parents, root last.
    ///
    /// The order a fleet-wide stop must use: descendants are stopped
    /// before the managers that relay their events.
    pub fn leaves_first(&self) -> Vec<WsName> {
        let Some(root) = self.root() else { return Vec::new() };
        let mut out = Vec::new();
        self.post_order(&root.name.clone(), &mut out);
        out
    }

    fn post_order(&self, node: &WsName, out: &mut Vec<WsName>) {
        for child in self.children(node) {
            self.post_order(&child, out);
        }
        out.push(node.clone());
    }

    pub fn workstations(&self) -> impl Iterator<Item = &Workstation> {
        self.nodes.values()
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
