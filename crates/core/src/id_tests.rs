// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::workstation::WsName;

crate::define_id! {
    /// Test-only ID type exercising the macro.
    pub struct ProbeId("prb-");
}

#[test]
fn generated_ids_carry_prefix_and_differ() {
    let a = ProbeId::generate();
    let b = ProbeId::generate();
    assert!(a.as_str().starts_with("prb-"));
    assert_ne!(a, b);
}

#[test]
fn short_strips_prefix() {
    let id = ProbeId::from_string("prb-abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn name_from_str_and_display() {
    let ws: WsName = "mst".into();
    assert_eq!(ws.to_string(), "mst");
    assert_eq!(ws.as_str(), "mst");
    assert_eq!(ws, "mst");
}

#[test]
fn name_serde_transparent() {
    let ws = WsName::from("ws1");
    let json = serde_json::to_string(&ws).unwrap();
    assert_eq!(json, "\"ws1\"");
    let parsed: WsName = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, ws);
}

#[test]
fn names_order_lexically() {
    let mut names = vec![WsName::from("b"), WsName::from("a"), WsName::from("c")];
    names.sort();
    assert_eq!(names, vec![WsName::from("a"), WsName::from("b"), WsName::from("c")]);
}
