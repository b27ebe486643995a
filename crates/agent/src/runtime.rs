// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent runtime: plan replica plus launch pipeline.

use crate::launcher::{LaunchHandle, Launcher, ProcessState};
use gp_core::{
    Clock, DedupIndex, DepContext, Event, EventSeq, JobInstanceId, JobStatus, Plan, RunNumber,
    WsName, DEFAULT_JOB_LIMIT,
};
use smol_str::SmolStr;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no plan replica yet")]
    NoPlan,
    #[error("plan {run} failed structural verification on receipt")]
    StructureMismatch { run: RunNumber },
    #[error("received plan {got} but replica already holds {have}")]
    PlanRegression { have: RunNumber, got: RunNumber },
    #[error("job {0} is not in the replica")]
    UnknownJob(JobInstanceId),
    #[error(transparent)]
    Launch(#[from] crate::launcher::LaunchError),
}

/// Per-workstation runtime.
///
/// Single-threaded with respect to its own replica: every mutation goes
/// through `&mut self`. Concurrency comes from the many job processes a
/// tick may have in flight, bounded by the workstation limit.
pub struct AgentRuntime<L: Launcher, C: Clock> {
    ws: WsName,
    launcher: L,
    clock: C,
    replica: Option<Plan>,
    dedup: DedupIndex,
    running: HashMap<JobInstanceId, LaunchHandle>,
    resources: HashMap<SmolStr, u32>,
    limit_override: Option<u32>,
    /// Stop/start control; pauses Ready → Intro only.
    paused: bool,
    out_seq: u64,
}

impl<L: Launcher, C: Clock> AgentRuntime<L, C> {
    pub fn new(ws: impl Into<WsName>, launcher: L, clock: C) -> Self {
        Self {
            ws: ws.into(),
            launcher,
            clock,
            replica: None,
            dedup: DedupIndex::new(),
            running: HashMap::new(),
            resources: HashMap::new(),
            limit_override: None,
            paused: false,
            out_seq: 0,
        }
    }

    pub fn workstation(&self) -> &WsName {
        &self.ws
    }

    pub fn replica(&self) -> Option<&Plan> {
        self.replica.as_ref()
    }

    pub fn current_run(&self) -> Option<RunNumber> {
        self.replica.as_ref().map(|p| p.run_number)
    }

    /// Effective concurrency limit: a runtime override, else the plan's
    /// workstation definition, else the default. 0 pauses all launches.
    pub fn limit(&self) -> u32 {
        if let Some(limit) = self.limit_override {
            return limit;
        }
        self.replica
            .as_ref()
            .and_then(|p| p.workstation(&self.ws))
            .map(|w| w.limit)
            .unwrap_or(DEFAULT_JOB_LIMIT)
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.limit_override = Some(limit);
    }

    /// Pause launches. Idempotent; running processes are not touched.
    pub fn stop(&mut self) {
        self.paused = true;
    }

    /// Resume launches. Idempotent.
    pub fn start(&mut self) {
        self.paused = false;
    }

    pub fn is_stopped(&self) -> bool {
        self.paused
    }

    /// Local free units for a named resource.
    pub fn set_resource(&mut self, name: impl Into<SmolStr>, units: u32) {
        self.resources.insert(name.into(), units);
    }

    fn next_stamp(&mut self) -> EventSeq {
        self.out_seq += 1;
        let run = self.current_run().unwrap_or(RunNumber(0));
        EventSeq::new(run, self.out_seq)
    }

    fn status_event(&mut self, job: JobInstanceId, status: JobStatus, exit_code: Option<i32>) -> Event {
        Event::JobStatus {
            source: self.ws.clone(),
            seq: self.next_stamp(),
            job,
            status,
            exit_code,
            at_ms: self.clock.epoch_ms(),
        }
    }

    /// Install a new plan replica.
    ///
    /// Verifies structural integrity, correlates carried `Exec`
    /// instances against live local processes, and acks the run number.
    /// A carried `Exec` instance with no matching process is left
    /// exactly as carried: its completion event is still in transit,
    /// and completion is never inferred. The delayed event resolves it,
    /// or the next rollover expires it.
    pub async fn apply_plan(&mut self, plan: Plan) -> Result<Vec<Event>, AgentError> {
        if !plan.verify_structure() {
            return Err(AgentError::StructureMismatch { run: plan.run_number });
        }
        if let Some(have) = self.current_run() {
            if plan.run_number < have {
                return Err(AgentError::PlanRegression { have, got: plan.run_number });
            }
            if plan.run_number == have {
                // Duplicate push (relink replay): re-ack, change nothing.
                let ack = Event::PlanAck {
                    source: self.ws.clone(),
                    seq: self.next_stamp(),
                    run: plan.run_number,
                };
                return Ok(vec![ack]);
            }
        }

        // Correlate carried in-flight instances with live processes.
        let mut kept = HashMap::new();
        let mut orphaned = Vec::new();
        for (id, handle) in self.running.drain() {
            if plan.job(&id).is_some() {
                kept.insert(id, handle);
            } else {
                orphaned.push(handle);
            }
        }
        for handle in orphaned {
            tracing::info!(job = %handle.job, "process has no instance in new plan, killing");
            self.launcher.kill(&handle).await?;
        }
        for job in plan.jobs.values() {
            if job.carried_forward
                && job.status == JobStatus::Exec
                && !kept.contains_key(&job.id)
            {
                tracing::info!(
                    job = %job.id,
                    "carried exec instance has no local process; awaiting delayed completion event"
                );
            }
        }

        self.running = kept;
        self.out_seq = 0;
        self.dedup.prune_before(plan.run_number);
        let run = plan.run_number;
        self.replica = Some(plan);
        tracing::info!(ws = %self.ws, run = %run, "plan replica installed");

        Ok(vec![Event::PlanAck {
            source: self.ws.clone(),
            seq: self.next_stamp(),
            run,
        }])
    }

    /// Apply an inbound event from another workstation, deduplicated by
    /// its sequence stamp. Returns `true` when the event was fresh.
    pub fn apply_event(&mut self, event: &Event) -> bool {
        let (Some(source), Some(seq)) = (event.source(), event.seq()) else {
            return false;
        };
        if !self.dedup.try_advance(&source.clone(), seq) {
            return false;
        }
        if let Some(replica) = self.replica.as_mut() {
            replica.apply_event(event);
        }
        true
    }

    /// One scheduling pass: reap exits, release held jobs, launch
    /// eligible ones up to the limit. Returns the emitted events.
    pub async fn tick(&mut self) -> Result<Vec<Event>, AgentError> {
        if self.replica.is_none() {
            return Err(AgentError::NoPlan);
        }
        let mut events = Vec::new();
        self.reap_exits(&mut events).await?;
        self.release_held(&mut events);
        if !self.paused {
            self.launch_ready(&mut events).await?;
        }
        Ok(events)
    }

    /// Poll running processes and evaluate exit codes.
    async fn reap_exits(&mut self, events: &mut Vec<Event>) -> Result<(), AgentError> {
        let handles: Vec<LaunchHandle> = self.running.values().cloned().collect();
        for handle in handles {
            let state = self.launcher.poll(&handle).await?;
            let ProcessState::Exited(code) = state else { continue };
            self.running.remove(&handle.job);

            let finished = {
                let Some(replica) = self.replica.as_mut() else { continue };
                let Some(job) = replica.job_mut(&handle.job) else { continue };
                if job.status != JobStatus::Exec {
                    // Cancelled (or otherwise resolved) while the process ran.
                    continue;
                }
                let status = job.success.status_for_exit(code);
                job.transition(status).ok().map(|()| status)
            };
            if let Some(status) = finished {
                tracing::info!(job = %handle.job, %status, code, "job finished");
                events.push(self.status_event(handle.job.clone(), status, Some(code)));
            }
        }
        Ok(())
    }

    /// Hold → Ready once the owning stream's occurrence time arrives.
    fn release_held(&mut self, events: &mut Vec<Event>) {
        let now = self.clock.epoch_ms();
        let Some(replica) = self.replica.as_ref() else { return };

        let releasable: Vec<JobInstanceId> = replica
            .jobs_on(&self.ws)
            .filter(|j| j.status == JobStatus::Hold)
            .filter(|j| {
                replica
                    .streams
                    .get(&j.stream)
                    .map(|s| s.occurrence_ms <= now)
                    // Carried instance without its stream: already released once.
                    .unwrap_or(true)
            })
            .map(|j| j.id.clone())
            .collect();

        for id in releasable {
            let changed = self
                .replica
                .as_mut()
                .and_then(|p| p.job_mut(&id))
                .map(|j| j.transition(JobStatus::Ready).is_ok())
                .unwrap_or(false);
            if changed {
                events.push(self.status_event(id, JobStatus::Ready, None));
            }
        }
    }

    /// Ready → Intro → Exec for jobs whose dependencies are satisfied,
    /// while the concurrency limit allows.
    async fn launch_ready(&mut self, events: &mut Vec<Event>) -> Result<(), AgentError> {
        let limit = self.limit() as usize;
        loop {
            if self.running.len() >= limit {
                return Ok(());
            }
            let Some(id) = self.next_launchable() else { return Ok(()) };

            // Ready -> Intro
            {
                let Some(replica) = self.replica.as_mut() else { return Ok(()) };
                let Some(job) = replica.job_mut(&id) else { continue };
                if job.transition(JobStatus::Intro).is_err() {
                    continue;
                }
            }
            events.push(self.status_event(id.clone(), JobStatus::Intro, None));

            let job = self
                .replica
                .as_ref()
                .and_then(|p| p.job(&id))
                .cloned()
                .ok_or_else(|| AgentError::UnknownJob(id.clone()))?;

            match self.launcher.spawn(&job).await {
                Ok(handle) => {
                    // Spawn confirmation: Intro -> Exec
                    self.running.insert(id.clone(), handle);
                    if let Some(j) = self.replica.as_mut().and_then(|p| p.job_mut(&id)) {
                        let _ = j.transition(JobStatus::Exec);
                    }
                    events.push(self.status_event(id, JobStatus::Exec, None));
                }
                Err(err) => {
                    // Launch failure: the process never existed.
                    tracing::warn!(job = %id, error = %err, "launch failed");
                    if let Some(j) = self.replica.as_mut().and_then(|p| p.job_mut(&id)) {
                        let _ = j.transition(JobStatus::Abend);
                    }
                    events.push(self.status_event(id, JobStatus::Abend, None));
                }
            }
        }
    }

    /// First Ready job (plan order) whose dependency edges are all
    /// satisfied against the current replica.
    fn next_launchable(&self) -> Option<JobInstanceId> {
        let replica = self.replica.as_ref()?;
        let now = self.clock.epoch_ms();
        let resources = |name: &str| self.resources.get(name).copied().unwrap_or(0);
        let status_of = |id: &JobInstanceId| replica.job(id).map(|j| j.status);
        let ctx = DepContext { now_ms: now, resources: &resources, status_of: &status_of };

        replica
            .jobs_on(&self.ws)
            .find(|j| j.status == JobStatus::Ready && j.deps_satisfied(&ctx))
            .map(|j| j.id.clone())
    }

    /// Cancel a job instance locally: kill any live process and mark
    /// the instance. Cancelling a terminal instance emits nothing and
    /// errors nothing.
    pub async fn cancel(&mut self, id: &JobInstanceId) -> Result<Vec<Event>, AgentError> {
        let replica = self.replica.as_mut().ok_or(AgentError::NoPlan)?;
        let job = replica.job_mut(id).ok_or_else(|| AgentError::UnknownJob(id.clone()))?;

        if !job.cancel() {
            return Ok(Vec::new());
        }
        if let Some(handle) = self.running.remove(id) {
            self.launcher.kill(&handle).await?;
        }
        tracing::info!(job = %id, "job cancelled");
        let event = Event::JobCancel {
            source: self.ws.clone(),
            seq: self.next_stamp(),
            job: id.clone(),
        };
        Ok(vec![event])
    }

    /// Jobs with live local processes.
    pub fn running_jobs(&self) -> Vec<JobInstanceId> {
        self.running.keys().cloned().collect()
    }

    pub fn launcher_ref(&self) -> &L {
        &self.launcher
    }

    pub fn clock_ref(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
