// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gp_core::WsRole;

const HOUR: u64 = 60 * 60 * 1000;
const DAY: u64 = 24 * HOUR;

fn window(from_ms: u64, to_ms: u64) -> PlanPeriod {
    PlanPeriod { from_ms, to_ms }
}

#[test]
fn once_inside_window() {
    let rec = Recurrence::Once { at_ms: 500 };
    assert_eq!(rec.occurrences(window(0, 1_000)), vec![500]);
    assert_eq!(rec.occurrences(window(501, 1_000)), Vec::<u64>::new());
    // Window end is exclusive
    assert_eq!(rec.occurrences(window(0, 500)), Vec::<u64>::new());
}

#[test]
fn daily_expands_per_day() {
    let rec = Recurrence::Daily { at_ms_of_day: 2 * HOUR };
    let occs = rec.occurrences(window(0, 3 * DAY));
    assert_eq!(occs, vec![2 * HOUR, DAY + 2 * HOUR, 2 * DAY + 2 * HOUR]);
}

#[test]
fn daily_skips_occurrence_before_window_start() {
    let rec = Recurrence::Daily { at_ms_of_day: 2 * HOUR };
    let occs = rec.occurrences(window(3 * HOUR, DAY + 3 * HOUR));
    assert_eq!(occs, vec![DAY + 2 * HOUR]);
}

#[test]
fn every_aligns_to_interval() {
    let rec = Recurrence::Every { interval_ms: 1_000 };
    assert_eq!(rec.occurrences(window(1_500, 4_001)), vec![2_000, 3_000, 4_000]);
    // Zero interval yields nothing instead of looping forever
    assert_eq!(
        Recurrence::Every { interval_ms: 0 }.occurrences(window(0, 10)),
        Vec::<u64>::new()
    );
}

#[test]
fn memory_defs_preserve_definition_order() {
    let mut defs = MemoryDefs::new();
    for name in ["charlie", "alpha", "bravo"] {
        defs.insert_stream_unchecked(StreamDef {
            name: name.into(),
            workstation: "ws1".into(),
            recurrence: Recurrence::Once { at_ms: 0 },
            jobs: vec![],
        });
    }
    let names: Vec<_> = defs.streams().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["charlie", "alpha", "bravo"]);
}

#[test]
fn resolves_checks_stream_and_job() {
    let mut defs = MemoryDefs::new();
    defs.insert_workstation(gp_core::Workstation::new("ws1", WsRole::FaultTolerantAgent));
    defs.insert_stream_unchecked(StreamDef {
        name: "etl".into(),
        workstation: "ws1".into(),
        recurrence: Recurrence::Once { at_ms: 0 },
        jobs: vec![JobDef::new("extract", "ws1", "extract.sh")],
    });

    assert!(defs.resolves(&JobRef::new("etl", "extract")));
    assert!(!defs.resolves(&JobRef::new("etl", "load")));
    assert!(!defs.resolves(&JobRef::new("ghost", "extract")));
}
