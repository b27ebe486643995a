// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn chain() -> DomainTree {
    // mst -> dm1 -> {fta1, fta2}, mst -> fta0
    DomainTree::from_workstations([
        Workstation::new("mst", WsRole::Master),
        Workstation::new("dm1", WsRole::DomainManager).with_parent("mst"),
        Workstation::new("fta1", WsRole::FaultTolerantAgent).with_parent("dm1"),
        Workstation::new("fta2", WsRole::FaultTolerantAgent).with_parent("dm1"),
        Workstation::new("fta0", WsRole::FaultTolerantAgent).with_parent("mst"),
    ])
    .unwrap()
}

#[test]
fn root_is_the_master() {
    let tree = chain();
    assert_eq!(tree.root().unwrap().name, "mst");
    assert_eq!(tree.len(), 5);
}

#[test]
fn children_in_definition_order() {
    let tree = chain();
    assert_eq!(
        tree.children(&WsName::from("mst")),
        vec![WsName::from("dm1"), WsName::from("fta0")]
    );
    assert_eq!(
        tree.children(&WsName::from("dm1")),
        vec![WsName::from("fta1"), WsName::from("fta2")]
    );
    assert!(tree.children(&WsName::from("fta1")).is_empty());
}

#[test]
fn subtree_includes_self_and_descendants() {
    let tree = chain();
    let mut subtree = tree.subtree(&WsName::from("dm1"));
    subtree.sort();
    assert_eq!(subtree, vec![WsName::from("dm1"), WsName::from("fta1"), WsName::from("fta2")]);
}

#[test]
fn leaves_first_puts_root_last() {
    let tree = chain();
    let order = tree.leaves_first();
    assert_eq!(order.last(), Some(&WsName::from("mst")));

    let pos = |name: &str| order.iter().position(|w| w == name).unwrap();
    assert!(pos("fta1") < pos("dm1"));
    assert!(pos("fta2") < pos("dm1"));
    assert!(pos("dm1") < pos("mst"));
    assert!(pos("fta0") < pos("mst"));
}

#[test]
fn missing_master_is_rejected() {
    let err = DomainTree::from_workstations([
        Workstation::new("dm1", WsRole::DomainManager).with_parent("mst"),
    ])
    .unwrap_err();
    assert!(matches!(err, TreeError::UnknownParent { .. }));

    let err = DomainTree::from_workstations([] as [Workstation; 0]).unwrap_err();
    assert_eq!(err, TreeError::NoMaster);
}

#[test]
fn two_masters_are_rejected() {
    let err = DomainTree::from_workstations([
        Workstation::new("mst", WsRole::Master),
        Workstation::new("mst2", WsRole::Master),
    ])
    .unwrap_err();
    assert!(matches!(err, TreeError::TwoMasters(..)));
}

#[test]
fn duplicate_workstation_is_rejected() {
    let err = DomainTree::from_workstations([
        Workstation::new("mst", WsRole::Master),
        Workstation::new("mst", WsRole::FaultTolerantAgent).with_parent("mst"),
    ])
    .unwrap_err();
    assert!(matches!(err, TreeError::Duplicate(_)));
}

#[test]
fn non_master_without_parent_is_rejected() {
    let err = DomainTree::from_workstations([
        Workstation::new("mst", WsRole::Master),
        Workstation::new("loose", WsRole::FaultTolerantAgent),
    ])
    .unwrap_err();
    assert!(matches!(err, TreeError::Orphan(_)));
}
