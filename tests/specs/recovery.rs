// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery strategy 3 (full regeneration): completed work is NOT
//! assumed complete afterwards. The previously succeeded instance
//! comes back unexecuted and actually re-executes — the documented
//! tradeoff, asserted as-is rather than "fixed".

use gp_agent::{AgentRuntime, FakeLauncher};
use gp_core::{Event, EventSeq, FakeClock, JobInstanceId, JobStatus, PlanPeriod, RunNumber,
    Workstation, WsName, WsRole};
use gp_domain::{recover, RecoveryContext, RecoveryStrategy, RecoveryWarning};
use gp_planner::{generate_plan, JobDef, MemoryDefs, Recurrence, StreamDef};
use gp_storage::{EventLog, PlanArchive};
use tempfile::TempDir;

fn defs() -> MemoryDefs {
    let mut defs = MemoryDefs::new();
    defs.insert_workstation(Workstation::new("mst", WsRole::Master));
    defs.insert_workstation(
        Workstation::new("ws1", WsRole::FaultTolerantAgent).with_parent("mst"),
    );
    defs.insert_stream_unchecked(StreamDef {
        name: "batch".into(),
        workstation: "ws1".into(),
        recurrence: Recurrence::Once { at_ms: 0 },
        jobs: vec![JobDef::new("payroll", "ws1", "payroll.sh")],
    });
    defs
}

fn window() -> PlanPeriod {
    PlanPeriod { from_ms: 0, to_ms: 86_400_000 }
}

#[tokio::test]
async fn regenerated_window_reexecutes_completed_work() {
    let dir = TempDir::new().unwrap();
    let archive = PlanArchive::open(dir.path().join("archive")).unwrap();
    let mut log = EventLog::open(dir.path().join("events.log"), None).unwrap();
    let defs = defs();
    let job_id = JobInstanceId::from("batch@0#payroll");

    // First life: the agent runs payroll to completion
    let plan = generate_plan(&defs, window(), None).unwrap();
    archive.archive(&plan, 0).unwrap();

    let mut agent = AgentRuntime::new("ws1", FakeLauncher::new(), FakeClock::new());
    agent.apply_plan(plan).await.unwrap();
    for event in agent.tick().await.unwrap() {
        log.append(&event).unwrap();
    }
    agent.launcher_ref().finish(&job_id, 0);
    for event in agent.tick().await.unwrap() {
        log.append(&event).unwrap();
    }
    assert_eq!(
        agent.replica().unwrap().job(&job_id).unwrap().status,
        JobStatus::Succ
    );
    assert_eq!(agent.launcher_ref().spawned().len(), 1);

    // The master's plan store corrupts; the operator chooses strategy 3
    let observed = [RunNumber(1)];
    let ctx = RecoveryContext {
        defs: &defs,
        archive: &archive,
        log: &log,
        window: window(),
        backup_replica: None,
        observed_runs: &observed,
    };
    let outcome = recover(RecoveryStrategy::Regenerate, &ctx).unwrap();

    // The loss is called out to the operator, never silent
    assert!(matches!(
        &outcome.warnings[..],
        [RecoveryWarning::CompletedWorkLost { jobs }] if jobs.contains(&job_id)
    ));
    assert!(outcome.plan.run_number > RunNumber(1));

    // Second life: the regenerated plan does not assume completion...
    assert_eq!(outcome.plan.job(&job_id).unwrap().status, JobStatus::Hold);

    // ...and the agent actually re-executes the job
    agent.apply_plan(outcome.plan).await.unwrap();
    agent.tick().await.unwrap();
    assert_eq!(agent.launcher_ref().spawned().len(), 2);
    assert_eq!(
        agent.replica().unwrap().job(&job_id).unwrap().status,
        JobStatus::Exec
    );
}

#[tokio::test]
async fn replay_strategy_preserves_completed_history() {
    let dir = TempDir::new().unwrap();
    let archive = PlanArchive::open(dir.path().join("archive")).unwrap();
    let mut log = EventLog::open(dir.path().join("events.log"), None).unwrap();
    let defs = defs();
    let job_id = JobInstanceId::from("batch@0#payroll");

    let plan = generate_plan(&defs, window(), None).unwrap();
    archive.archive(&plan, 0).unwrap();
    for (n, status) in
        [JobStatus::Ready, JobStatus::Intro, JobStatus::Exec, JobStatus::Succ].into_iter().enumerate()
    {
        log.append(&Event::JobStatus {
            source: WsName::from("ws1"),
            seq: EventSeq::new(RunNumber(1), n as u64 + 1),
            job: job_id.clone(),
            status,
            exit_code: None,
            at_ms: n as u64,
        })
        .unwrap();
    }

    let observed = [RunNumber(1)];
    let ctx = RecoveryContext {
        defs: &defs,
        archive: &archive,
        log: &log,
        window: window(),
        backup_replica: None,
        observed_runs: &observed,
    };
    let outcome = recover(RecoveryStrategy::ReplayLog, &ctx).unwrap();

    // Strategy 2 keeps the completed-job history strategy 3 loses
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.plan.job(&job_id).unwrap().status, JobStatus::Succ);
}
