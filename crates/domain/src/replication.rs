// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan replication, one hop of the domain tree at a time.
//!
//! Each manager runs its own [`Replication`] over its direct children.
//! Distribution is top-down: this node forwards only after accepting
//! the plan itself, so a child can never hold a newer plan than its
//! parent. A child becomes initialized only by acking the current run
//! number; control commands routed through an uninitialized child are
//! queued on that child's link and drained in order on ack.

use crate::control::ControlCommand;
use crate::tree::DomainTree;
use async_trait::async_trait;
use gp_core::{Plan, RunNumber, WsName};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("destination unreachable: {0}")]
    Unreachable(String),
}

/// Push seam toward one direct child (socket in production, in-process
/// fake in tests).
#[async_trait]
pub trait PlanChannel: Send + Sync {
    async fn push_plan(&self, dest: &WsName, plan: &Plan) -> Result<(), ChannelError>;
    async fn push_control(
        &self,
        dest: &WsName,
        command: &ControlCommand,
    ) -> Result<(), ChannelError>;
}

#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("plan {run} failed structural verification")]
    BadPlan { run: RunNumber },
    #[error("no plan accepted yet")]
    NoPlan,
    #[error("{0} is not a workstation in this domain")]
    UnknownTarget(WsName),
    #[error("push failed: {0}")]
    Push(#[from] ChannelError),
}

/// Replication state for one direct child.
#[derive(Debug, Default)]
pub struct ChildLink {
    /// Run number last successfully pushed to the child.
    pub sent_run: Option<RunNumber>,
    /// Highest run number the child has acknowledged.
    pub acked_run: Option<RunNumber>,
    pending: VecDeque<ControlCommand>,
}

impl ChildLink {
    /// Initialized means: acked the given (current) run number.
    pub fn initialized(&self, current: RunNumber) -> bool {
        self.acked_run == Some(current)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// What distribution did per child.
#[derive(Debug, Default)]
pub struct DistributionReport {
    pub pushed: Vec<WsName>,
    /// Already sent this run number — at most one push per run.
    pub skipped: Vec<WsName>,
    /// Child keeps its previous plan; retried on the next relink.
    pub failed: Vec<(WsName, ChannelError)>,
}

/// How a control command was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlDisposition {
    /// Addressed to this node; caller handles it locally.
    Local,
    /// Pushed to the routing child.
    Sent,
    /// Routing child not initialized (or unreachable); queued on its
    /// link, never dropped.
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelinkOutcome {
    /// Child was behind; the current plan was pushed.
    PlanPushed,
    /// Child already holds the current run number.
    UpToDate,
}

/// Replication engine for one manager node.
pub struct Replication {
    node: WsName,
    tree: DomainTree,
    current: Option<Plan>,
    children: HashMap<WsName, ChildLink>,
}

impl Replication {
    pub fn new(node: WsName, tree: DomainTree) -> Self {
        let children = tree
            .children(&node)
            .into_iter()
            .map(|c| (c, ChildLink::default()))
            .collect();
        Self { node, tree, current: None, children }
    }

    pub fn node(&self) -> &WsName {
        &self.node
    }

    pub fn tree(&self) -> &DomainTree {
        &self.tree
    }

    pub fn current_run(&self) -> Option<RunNumber> {
        self.current.as_ref().map(|p| p.run_number)
    }

    pub fn current_plan(&self) -> Option<&Plan> {
        self.current.as_ref()
    }

    /// Mutable access for applying status events to the accepted plan.
    /// Structural content must not be touched through this.
    pub fn current_plan_mut(&mut self) -> Option<&mut Plan> {
        self.current.as_mut()
    }

    pub fn child(&self, name: &WsName) -> Option<&ChildLink> {
        self.children.get(name)
    }

    /// Direct children and their replication state.
    pub fn children(&self) -> impl Iterator<Item = (&WsName, &ChildLink)> {
        self.children.iter()
    }

    /// Accept a plan at this node. Must happen before any forwarding,
    /// so a child never outruns its parent.
    pub fn accept_plan(&mut self, plan: Plan) -> Result<(), ReplicationError> {
        if !plan.verify_structure() {
            return Err(ReplicationError::BadPlan { run: plan.run_number });
        }
        tracing::info!(node = %self.node, run = %plan.run_number, "plan accepted");
        self.current = Some(plan);
        Ok(())
    }

    /// Push the accepted plan to each direct child, at most once per
    /// run number. A failed push leaves the child on its previous plan;
    /// it catches up on the next relink.
    pub async fn distribute(&mut self, channel: &dyn PlanChannel) -> Result<DistributionReport, ReplicationError> {
        let plan = self.current.as_ref().ok_or(ReplicationError::NoPlan)?;
        let run = plan.run_number;
        let mut report = DistributionReport::default();

        for (child, link) in &mut self.children {
            if link.sent_run == Some(run) {
                report.skipped.push(child.clone());
                continue;
            }
            match channel.push_plan(child, plan).await {
                Ok(()) => {
                    link.sent_run = Some(run);
                    report.pushed.push(child.clone());
                }
                Err(err) => {
                    tracing::warn!(
                        child = %child,
                        run = %run,
                        error = %err,
                        "plan push failed, child keeps previous plan"
                    );
                    report.failed.push((child.clone(), err));
                }
            }
        }
        Ok(report)
    }

    /// Record a child's acknowledgment. When the ack matches the
    /// current run the child becomes initialized and its queued control
    /// commands are released (returned in queue order for sending).
    pub fn handle_ack(&mut self, child: &WsName, run: RunNumber) -> Vec<ControlCommand> {
        let current = self.current_run();
        let Some(link) = self.children.get_mut(child) else {
            tracing::debug!(child = %child, "ack from unknown child ignored");
            return Vec::new();
        };
        if link.acked_run.is_none_or(|prev| run > prev) {
            link.acked_run = Some(run);
        }
        if current == Some(run) {
            tracing::info!(child = %child, run = %run, "child initialized");
            return link.pending.drain(..).collect();
        }
        Vec::new()
    }

    /// Route a control command toward its target workstation.
    ///
    /// The command travels through the direct child whose subtree
    /// contains the target. Until that child is initialized for the
    /// current run, commands are queued on its link.
    pub async fn send_control(
        &mut self,
        command: ControlCommand,
        channel: &dyn PlanChannel,
    ) -> Result<ControlDisposition, ReplicationError> {
        let target = command.target().clone();
        if target == self.node {
            return Ok(ControlDisposition::Local);
        }
        let route = self
            .route_child(&target)
            .ok_or(ReplicationError::UnknownTarget(target.clone()))?;
        let current = self.current_run();

        let Some(link) = self.children.get_mut(&route) else {
            return Err(ReplicationError::UnknownTarget(target));
        };
        let initialized = current.is_some_and(|run| link.initialized(run));
        if !initialized {
            tracing::info!(
                child = %route,
                command = %command,
                "routing child not initialized, control command queued"
            );
            link.pending.push_back(command);
            return Ok(ControlDisposition::Queued);
        }
        match channel.push_control(&route, &command).await {
            Ok(()) => Ok(ControlDisposition::Sent),
            Err(err) => {
                tracing::warn!(child = %route, error = %err, "control push failed, queued");
                link.pending.push_back(command);
                Ok(ControlDisposition::Queued)
            }
        }
    }

    /// Re-establish a child channel: push the current plan if the child
    /// reports an older run number.
    pub async fn relink(
        &mut self,
        child: &WsName,
        child_run: Option<RunNumber>,
        channel: &dyn PlanChannel,
    ) -> Result<RelinkOutcome, ReplicationError> {
        let plan = self.current.as_ref().ok_or(ReplicationError::NoPlan)?;
        let run = plan.run_number;
        if !self.children.contains_key(child) {
            return Err(ReplicationError::UnknownTarget(child.clone()));
        }
        if child_run == Some(run) {
            // The ack path marks initialization; nothing to push.
            return Ok(RelinkOutcome::UpToDate);
        }
        channel.push_plan(child, plan).await?;
        if let Some(link) = self.children.get_mut(child) {
            link.sent_run = Some(run);
        }
        tracing::info!(child = %child, run = %run, "relink pushed current plan");
        Ok(RelinkOutcome::PlanPushed)
    }

    /// Per-workstation stop commands for this node's subtree, ordered
    /// leaves to root. The corrected fleet-stop: never a broadcast.
    pub fn stop_cascade(&self) -> Vec<ControlCommand> {
        self.tree
            .leaves_first()
            .into_iter()
            .map(|workstation| ControlCommand::Stop { workstation })
            .collect()
    }

    /// Every run number this node has observed: its own plus anything
    /// a child has acked or been sent. Recovery seeds the next run
    /// number strictly above all of these.
    pub fn observed_runs(&self) -> Vec<RunNumber> {
        let mut runs: Vec<RunNumber> = self.current_run().into_iter().collect();
        for link in self.children.values() {
            runs.extend(link.sent_run);
            runs.extend(link.acked_run);
        }
        runs.sort();
        runs.dedup();
        runs
    }

    /// The direct child whose subtree contains `target`.
    fn route_child(&self, target: &WsName) -> Option<WsName> {
        self.children
            .keys()
            .find(|child| self.tree.subtree(child).contains(target))
            .cloned()
    }
}

#[cfg(test)]
#[path = "replication_tests.rs"]
mod tests;
