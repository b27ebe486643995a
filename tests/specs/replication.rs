// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan replication across a three-node domain chain.
//!
//! Scenario: run number 5 distributed to root -> child -> grandchild.
//! The grandchild's link drops before it acknowledges; control
//! commands addressed to it must queue at its manager until it
//! reconnects and acks run 5.

use gp_core::test_support::sample_plan;
use gp_core::{Plan, RunNumber, Workstation, WsName, WsRole};
use gp_domain::{
    ChannelError, ControlCommand, ControlDisposition, DomainTree, PlanChannel, Replication,
};
use parking_lot::Mutex;
use std::collections::HashSet;

fn chain_tree() -> DomainTree {
    DomainTree::from_workstations([
        Workstation::new("mst", WsRole::Master),
        Workstation::new("dm1", WsRole::DomainManager).with_parent("mst"),
        Workstation::new("fta1", WsRole::FaultTolerantAgent).with_parent("dm1"),
    ])
    .unwrap()
}

fn plan_run_5() -> Plan {
    let mut plan = sample_plan(RunNumber(5));
    for ws in chain_tree().workstations() {
        plan.workstations.insert(ws.name.clone(), ws.clone());
    }
    plan.seal();
    plan
}

#[derive(Default)]
struct Network {
    plan_pushes: Mutex<Vec<(WsName, RunNumber)>>,
    control_pushes: Mutex<Vec<(WsName, ControlCommand)>>,
    down: Mutex<HashSet<WsName>>,
}

impl Network {
    fn drop_link(&self, ws: &str) {
        self.down.lock().insert(WsName::from(ws));
    }

    fn restore_link(&self, ws: &str) {
        self.down.lock().remove(&WsName::from(ws));
    }

    fn controls_to(&self, ws: &str) -> Vec<ControlCommand> {
        self.control_pushes
            .lock()
            .iter()
            .filter(|(dest, _)| dest == ws)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl PlanChannel for Network {
    async fn push_plan(&self, dest: &WsName, plan: &Plan) -> Result<(), ChannelError> {
        if self.down.lock().contains(dest) {
            return Err(ChannelError::Unreachable(dest.to_string()));
        }
        self.plan_pushes.lock().push((dest.clone(), plan.run_number));
        Ok(())
    }

    async fn push_control(
        &self,
        dest: &WsName,
        command: &ControlCommand,
    ) -> Result<(), ChannelError> {
        if self.down.lock().contains(dest) {
            return Err(ChannelError::Unreachable(dest.to_string()));
        }
        self.control_pushes.lock().push((dest.clone(), command.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn controls_wait_for_the_grandchild_ack() {
    let network = Network::default();
    let mut root = Replication::new(WsName::from("mst"), chain_tree());
    let mut manager = Replication::new(WsName::from("dm1"), chain_tree());

    // Top-down: root accepts, pushes to dm1; dm1 accepts, tries fta1
    root.accept_plan(plan_run_5()).unwrap();
    root.distribute(&network).await.unwrap();
    manager.accept_plan(plan_run_5()).unwrap();

    // Grandchild link drops before it can be pushed to or ack
    network.drop_link("fta1");
    let report = manager.distribute(&network).await.unwrap();
    assert_eq!(report.failed.len(), 1);

    // dm1 itself acks run 5 to the root
    root.handle_ack(&WsName::from("dm1"), RunNumber(5));

    // Root issues a stop for the grandchild; it reaches dm1 but must
    // queue there, because fta1 has not acked run 5
    let stop = ControlCommand::Stop { workstation: WsName::from("fta1") };
    let disposition = root.send_control(stop.clone(), &network).await.unwrap();
    assert_eq!(disposition, ControlDisposition::Sent);
    let disposition = manager.send_control(stop.clone(), &network).await.unwrap();
    assert_eq!(disposition, ControlDisposition::Queued);
    assert!(network.controls_to("fta1").is_empty());
    assert_eq!(manager.child(&WsName::from("fta1")).unwrap().pending(), 1);

    // Grandchild reconnects: relink pushes run 5, the ack releases the
    // queued stop
    network.restore_link("fta1");
    manager.relink(&WsName::from("fta1"), Some(RunNumber(4)), &network).await.unwrap();
    let released = manager.handle_ack(&WsName::from("fta1"), RunNumber(5));
    assert_eq!(released, vec![stop.clone()]);
    for command in released {
        manager.send_control(command, &network).await.unwrap();
    }
    assert_eq!(network.controls_to("fta1"), vec![stop]);
}

#[tokio::test]
async fn child_never_holds_a_newer_plan_than_its_parent() {
    let network = Network::default();
    let mut root = Replication::new(WsName::from("mst"), chain_tree());

    // A manager that has not accepted a plan cannot forward one
    assert!(root.distribute(&network).await.is_err());
    assert!(network.plan_pushes.lock().is_empty());

    root.accept_plan(plan_run_5()).unwrap();
    root.distribute(&network).await.unwrap();
    assert_eq!(network.plan_pushes.lock().clone(), vec![(WsName::from("dm1"), RunNumber(5))]);
}

#[tokio::test]
async fn distribution_is_at_most_once_per_run_number() {
    let network = Network::default();
    let mut root = Replication::new(WsName::from("mst"), chain_tree());
    root.accept_plan(plan_run_5()).unwrap();

    root.distribute(&network).await.unwrap();
    root.distribute(&network).await.unwrap();
    root.distribute(&network).await.unwrap();

    assert_eq!(network.plan_pushes.lock().len(), 1);
}
