// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures and proptest strategies shared across crate tests.

use crate::job::{JobInstance, JobInstanceId, JobStatus, SuccessPolicy};
use crate::plan::{Plan, PlanPeriod, StreamInstance, StreamInstanceId};
use crate::seq::RunNumber;
use crate::workstation::{Workstation, WsName, WsRole};

/// A minimal job instance owned by `ws`, status `Hold`.
pub fn job_instance(id: &str, ws: &str) -> JobInstance {
    JobInstance {
        id: JobInstanceId::from(id),
        name: id.into(),
        stream: StreamInstanceId::from("nightly@0"),
        workstation: WsName::from(ws),
        status: JobStatus::Hold,
        command: format!("run {id}"),
        deps: Vec::new(),
        success: SuccessPolicy::default(),
        carried_forward: false,
    }
}

/// A sealed two-workstation plan: master `mst`, agent `ws1`, one stream
/// `nightly@0` with jobs `j1` and `j2` on `ws1`, both `Ready`.
pub fn sample_plan(run: RunNumber) -> Plan {
    let mut plan = Plan::new(run, PlanPeriod { from_ms: 0, to_ms: 86_400_000 });
    plan.workstations.insert(
        WsName::from("mst"),
        Workstation::new("mst", WsRole::Master),
    );
    plan.workstations.insert(
        WsName::from("ws1"),
        Workstation::new("ws1", WsRole::FaultTolerantAgent).with_parent("mst"),
    );
    let mut j1 = job_instance("nightly@0#j1", "ws1");
    j1.status = JobStatus::Ready;
    let mut j2 = job_instance("nightly@0#j2", "ws1");
    j2.status = JobStatus::Ready;
    plan.streams.insert(
        StreamInstanceId::from("nightly@0"),
        StreamInstance {
            id: StreamInstanceId::from("nightly@0"),
            name: "nightly".into(),
            workstation: WsName::from("ws1"),
            occurrence_ms: 0,
            jobs: vec![j1.id.clone(), j2.id.clone()],
        },
    );
    plan.jobs.insert(j1.id.clone(), j1);
    plan.jobs.insert(j2.id.clone(), j2);
    plan.seal();
    plan
}

pub mod strategies {
    use super::*;
    use crate::seq::EventSeq;
    use proptest::prelude::*;

    pub fn arb_job_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Hold),
            Just(JobStatus::Ready),
            Just(JobStatus::Intro),
            Just(JobStatus::Exec),
            Just(JobStatus::Succ),
            Just(JobStatus::Abend),
            Just(JobStatus::Cancelled),
        ]
    }

    pub fn arb_event_seq() -> impl Strategy<Value = EventSeq> {
        (0u64..100, 0u64..10_000)
            .prop_map(|(run, seq)| EventSeq::new(RunNumber(run), seq))
    }
}
