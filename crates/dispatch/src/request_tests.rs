// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ids_carry_prefix() {
    let id = DispatchRequestId::generate();
    assert!(id.as_str().starts_with("dsp-"));
    assert_ne!(id, DispatchRequestId::generate());
}

#[yare::parameterized(
    submitted  = { ProcessingStatus::Submitted, ExternalStatus::Intro },
    reallocate = { ProcessingStatus::Reallocate, ExternalStatus::Wait },
    execute    = { ProcessingStatus::Execute, ExternalStatus::Exec },
    pending    = { ProcessingStatus::CancelPending, ExternalStatus::Exec },
    cancel     = { ProcessingStatus::Cancel, ExternalStatus::Abend },
    completed  = { ProcessingStatus::Completed, ExternalStatus::Succ },
    error      = { ProcessingStatus::Error, ExternalStatus::Abend },
)]
fn status_map_covers_every_status(internal: ProcessingStatus, external: ExternalStatus) {
    assert_eq!(external_status(internal), external);
}

#[test]
fn map_table_has_no_duplicates() {
    for (i, (status, _)) in STATUS_MAP.iter().enumerate() {
        assert!(
            !STATUS_MAP[i + 1..].iter().any(|(s, _)| s == status),
            "{status} mapped twice"
        );
    }
}

#[yare::parameterized(
    cancel    = { ProcessingStatus::Cancel },
    completed = { ProcessingStatus::Completed },
    error     = { ProcessingStatus::Error },
)]
fn terminal_statuses(status: ProcessingStatus) {
    assert!(status.is_terminal());
    assert!(!status.can_transition_to(ProcessingStatus::Execute));
    assert!(!status.can_transition_to(ProcessingStatus::Error));
}

#[test]
fn transition_enforces_machine() {
    let mut request = DispatchRequest {
        id: DispatchRequestId::from_string("dsp-test"),
        job_name: "adhoc".into(),
        command: "run.sh".into(),
        need: ResourceNeed { resource: "lin".into(), units: 1 },
        status: ProcessingStatus::Submitted,
        attempts: 0,
        submitted_at_ms: 0,
        bound_to: None,
        failure: None,
    };

    // Submitted cannot complete directly
    assert!(!request.transition(ProcessingStatus::Completed));
    assert_eq!(request.status, ProcessingStatus::Submitted);

    assert!(request.transition(ProcessingStatus::Execute));
    assert!(request.transition(ProcessingStatus::CancelPending));
    assert!(request.transition(ProcessingStatus::Cancel));
    // Terminal: stuck
    assert!(!request.transition(ProcessingStatus::Execute));
}

#[test]
fn status_serde_snake_case() {
    let json = serde_json::to_string(&ProcessingStatus::CancelPending).unwrap();
    assert_eq!(json, "\"cancel_pending\"");
    let ext = serde_json::to_string(&ExternalStatus::Abend).unwrap();
    assert_eq!(ext, "\"ABEND\"");
}
