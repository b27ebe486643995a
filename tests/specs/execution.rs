// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full execution loop: master plan -> agent replica -> events back.

use gp_agent::{AgentRuntime, FakeLauncher};
use gp_core::test_support::{job_instance, sample_plan};
use gp_core::{
    Applied, Dependency, Event, EventSeq, FakeClock, JobInstanceId, JobStatus, Plan, RunNumber,
    WsName,
};
use gp_transport::{EventSink, SinkError, Transport, TransportConfig};
use parking_lot::Mutex;

fn agent() -> AgentRuntime<FakeLauncher, FakeClock> {
    AgentRuntime::new("ws1", FakeLauncher::new(), FakeClock::new())
}

/// Sink feeding a master-side replica through a dedup index, the way
/// the master ingests agent events.
#[derive(Default)]
struct MasterSide {
    state: Mutex<Option<(Plan, gp_core::DedupIndex)>>,
}

impl MasterSide {
    fn install(&self, plan: Plan) {
        *self.state.lock() = Some((plan, gp_core::DedupIndex::new()));
    }

    fn status(&self, job: &str) -> Option<JobStatus> {
        self.state
            .lock()
            .as_ref()
            .and_then(|(p, _)| p.job(&JobInstanceId::from(job)).map(|j| j.status))
    }
}

#[async_trait::async_trait]
impl EventSink for MasterSide {
    async fn deliver(&self, _dest: &WsName, event: &Event) -> Result<(), SinkError> {
        let mut guard = self.state.lock();
        if let Some((plan, dedup)) = guard.as_mut() {
            if let (Some(source), Some(seq)) = (event.source(), event.seq()) {
                if dedup.try_advance(&source.clone(), seq) {
                    plan.apply_event(event);
                }
            }
        }
        Ok(())
    }
}

#[tokio::test]
async fn replica_structure_stays_identical_while_statuses_diverge() {
    let plan = sample_plan(RunNumber(5));
    let master_hash = plan.structural_hash.clone();

    let mut agent = agent();
    agent.apply_plan(plan).await.unwrap();

    // Execute both jobs to terminal status
    agent.tick().await.unwrap();
    agent.launcher_ref().finish(&"nightly@0#j1".into(), 0);
    agent.launcher_ref().finish(&"nightly@0#j2".into(), 0);
    agent.tick().await.unwrap();

    // Status fields moved; structural content is byte-identical
    let replica = agent.replica().unwrap();
    similar_asserts::assert_eq!(replica.compute_structural_hash(), master_hash);
    assert!(replica.verify_structure());
    assert_eq!(
        replica.job(&"nightly@0#j1".into()).unwrap().status,
        JobStatus::Succ
    );
}

#[tokio::test]
async fn events_flow_back_and_replay_is_idempotent() {
    let plan = sample_plan(RunNumber(5));
    let master = MasterSide::default();
    master.install(plan.clone());

    let mut agent = agent();
    let mut transport = Transport::new(WsName::from("ws1"), TransportConfig::default());
    transport.begin_run(RunNumber(5));

    agent.apply_plan(plan).await.unwrap();
    let mut outbound = Vec::new();
    outbound.extend(agent.tick().await.unwrap());
    agent.launcher_ref().finish(&"nightly@0#j1".into(), 0);
    agent.launcher_ref().finish(&"nightly@0#j2".into(), 1);
    outbound.extend(agent.tick().await.unwrap());

    let dest = WsName::from("mst");
    for event in &outbound {
        transport.enqueue(&dest, event.clone(), 0);
    }
    let report = transport.flush(&dest, &master, 0).await;
    assert_eq!(report.remaining, 0);

    assert_eq!(master.status("nightly@0#j1"), Some(JobStatus::Succ));
    assert_eq!(master.status("nightly@0#j2"), Some(JobStatus::Abend));

    // At-least-once delivery: replaying the whole stream changes nothing
    for event in &outbound {
        transport.enqueue(&dest, event.clone(), 1);
    }
    transport.flush(&dest, &master, 1).await;
    assert_eq!(master.status("nightly@0#j1"), Some(JobStatus::Succ));
    assert_eq!(master.status("nightly@0#j2"), Some(JobStatus::Abend));
}

#[tokio::test]
async fn no_transition_skips_a_state() {
    let mut plan = sample_plan(RunNumber(5));

    // A forged Ready -> Succ event must be rejected by every replica
    let forged = Event::JobStatus {
        source: WsName::from("ws1"),
        seq: EventSeq::new(RunNumber(5), 1),
        job: "nightly@0#j1".into(),
        status: JobStatus::Succ,
        exit_code: Some(0),
        at_ms: 1,
    };
    assert_eq!(plan.apply_event(&forged), Applied::Rejected);
    assert_eq!(
        plan.job(&"nightly@0#j1".into()).unwrap().status,
        JobStatus::Ready
    );
}

#[tokio::test]
async fn cross_workstation_dependency_resolves_via_events() {
    // j2 on ws1 follows j0 on ws2; the Succ fact arrives as an event
    let mut plan = sample_plan(RunNumber(5));
    let mut j0 = job_instance("other@0#j0", "ws2");
    j0.status = JobStatus::Exec;
    plan.jobs.insert(j0.id.clone(), j0);
    if let Some(j2) = plan.jobs.get_mut(&JobInstanceId::from("nightly@0#j2")) {
        j2.deps = vec![Dependency::Follows { job: "other@0#j0".into() }];
    }
    plan.seal();

    let mut agent = agent();
    agent.apply_plan(plan).await.unwrap();

    agent.tick().await.unwrap();
    // j1 launches, j2 blocked on the remote job
    assert_eq!(
        agent.launcher_ref().spawned(),
        vec![JobInstanceId::from("nightly@0#j1")]
    );

    let remote_succ = Event::JobStatus {
        source: WsName::from("ws2"),
        seq: EventSeq::new(RunNumber(5), 1),
        job: "other@0#j0".into(),
        status: JobStatus::Succ,
        exit_code: Some(0),
        at_ms: 9,
    };
    assert!(agent.apply_event(&remote_succ));

    agent.tick().await.unwrap();
    assert_eq!(
        agent.launcher_ref().spawned(),
        vec![
            JobInstanceId::from("nightly@0#j1"),
            JobInstanceId::from("nightly@0#j2")
        ]
    );
}
