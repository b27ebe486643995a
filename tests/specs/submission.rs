// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wildcard submission with per-job confirmation.
//!
//! Scenario: J1 follows J2, both submitted concurrently under a
//! wildcard. J2's confirmation is declined before J1's is processed:
//! J1 is materialized without the J2 dependency — anomalous but
//! logical, not an error.

use gp_core::{JobInstanceId, PlanPeriod, Workstation, WsRole};
use gp_planner::{
    generate_plan, submit_with_confirm, Confirmation, JobDef, JobRef, MemoryDefs, Recurrence,
    StreamDef,
};

fn defs() -> MemoryDefs {
    let mut defs = MemoryDefs::new();
    defs.insert_workstation(Workstation::new("mst", WsRole::Master));
    defs.insert_workstation(
        Workstation::new("ws1", WsRole::FaultTolerantAgent).with_parent("mst"),
    );
    defs
}

fn batch() -> Vec<StreamDef> {
    vec![StreamDef {
        name: "adhoc".into(),
        workstation: "ws1".into(),
        recurrence: Recurrence::Once { at_ms: 100 },
        jobs: vec![
            JobDef::new("j2", "ws1", "two.sh"),
            JobDef::new("j1", "ws1", "one.sh").follows(JobRef::new("adhoc", "j2")),
        ],
    }]
}

#[test]
fn declined_predecessor_leaves_dependent_without_the_edge() {
    let mut store = defs();
    let mut order = Vec::new();

    let outcome = submit_with_confirm(&mut store, batch(), &mut |_, job| {
        order.push(job.to_string());
        if job == "j2" {
            Confirmation::Decline
        } else {
            Confirmation::Accept
        }
    });

    // j2 was declined before j1 was processed
    assert_eq!(order, vec!["j2", "j1"]);
    assert!(outcome.is_complete());

    // The committed stream holds j1 only, dependency dropped
    let plan = generate_plan(&store, PlanPeriod { from_ms: 0, to_ms: 1_000 }, None).unwrap();
    assert!(plan.job(&JobInstanceId::from("adhoc@100#j2")).is_none());
    let j1 = plan.job(&JobInstanceId::from("adhoc@100#j1")).unwrap();
    assert!(j1.deps.is_empty());
}

#[test]
fn accepting_both_keeps_the_edge() {
    let mut store = defs();
    let outcome = submit_with_confirm(&mut store, batch(), &mut |_, _| Confirmation::Accept);
    assert!(outcome.is_complete());

    let plan = generate_plan(&store, PlanPeriod { from_ms: 0, to_ms: 1_000 }, None).unwrap();
    let j1 = plan.job(&JobInstanceId::from("adhoc@100#j1")).unwrap();
    assert_eq!(j1.deps.len(), 1);
}
