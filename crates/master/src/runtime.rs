// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The master runtime: authoritative state and request handling.
//!
//! Single writer: every mutation flows through `&mut self` inside the
//! daemon's one event loop. Plan generation and recovery additionally
//! hold the on-disk generation lock, so a second master process fails
//! fast instead of interleaving.

use crate::config::MasterConfig;
use gp_core::{Clock, DedupIndex, Event, Plan, PlanPeriod, RunNumber, WsName};
use gp_dispatch::{Broker, DispatchSpec, ResourceNeed, SubmitError};
use gp_domain::{
    recover, ControlCommand, DomainTree, PlanChannel, RecoveryContext, RecoveryError,
    RecoveryOutcome, RecoveryStrategy, Replication, ReplicationError, TreeError,
};
use gp_planner::{
    generate_plan, submit, validate, JobDef, JobRef, MemoryDefs, PlanError, Recurrence, StreamDef,
};
use gp_storage::{ArchiveError, EventLog, LogError, PlanArchive, PlanFile, StoreError};
use gp_wire::{
    DispatchStatusEntry, ErrorCode, PlanSummary, RecoveryChoice, Request, Response, StatusReport,
    SubmitStream, WorkstationEntry,
};
use thiserror::Error;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Replication(#[from] ReplicationError),
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
    #[error(transparent)]
    Dispatch(#[from] SubmitError),
    #[error("bad definition: {0}")]
    BadDefinition(String),
}

impl MasterError {
    fn code(&self) -> ErrorCode {
        match self {
            MasterError::Store(StoreError::LockHeld) => ErrorCode::PlanLockHeld,
            MasterError::Store(StoreError::Corrupt(_)) => ErrorCode::Corruption,
            MasterError::Recovery(
                RecoveryError::NoReplica | RecoveryError::BadReplica | RecoveryError::NoArchive,
            ) => ErrorCode::RecoveryUnavailable,
            MasterError::Dispatch(SubmitError::UnknownRequest(_)) => ErrorCode::NotFound,
            MasterError::Replication(ReplicationError::UnknownTarget(_)) => ErrorCode::NotFound,
            MasterError::Plan(_) | MasterError::Tree(_) | MasterError::BadDefinition(_) => {
                ErrorCode::InvalidRequest
            }
            _ => ErrorCode::Internal,
        }
    }
}

/// The master daemon's state.
pub struct Master<C: Clock> {
    name: WsName,
    clock: C,
    defs: MemoryDefs,
    plan_file: PlanFile,
    archive: PlanArchive,
    log: EventLog,
    replication: Replication,
    broker: Broker<C>,
    dedup: DedupIndex,
    /// In-sync replica from a backup domain manager, if one reported.
    backup_replica: Option<Plan>,
    /// Set when the live plan failed to load; cleared by recovery.
    corruption: Option<String>,
}

impl<C: Clock> Master<C> {
    pub fn open(config: &MasterConfig, clock: C) -> Result<Self, MasterError> {
        let state_dir = config.state_dir();
        std::fs::create_dir_all(&state_dir).map_err(StoreError::Io)?;

        let plan_file = PlanFile::new(&state_dir);
        let archive = PlanArchive::open(state_dir.join("archive"))?;
        let log = EventLog::open(state_dir.join("events.log"), config.event_log_capacity)?;

        let mut defs = MemoryDefs::new();
        for ws in &config.workstations {
            defs.insert_workstation(ws.to_workstation());
        }
        let tree =
            DomainTree::from_workstations(config.workstations.iter().map(|w| w.to_workstation()))?;
        let mut replication = Replication::new(config.name.clone(), tree);

        let mut corruption = None;
        match plan_file.load() {
            Ok(Some(plan)) => replication.accept_plan(plan)?,
            Ok(None) => {}
            Err(StoreError::Corrupt(msg)) => {
                tracing::error!(error = %msg, "live plan is corrupt; recovery required");
                corruption = Some(msg);
            }
            Err(e) => return Err(e.into()),
        }

        let broker = Broker::new(config.dispatcher.clone(), config.advisor, clock.clone())
            .map_err(|e| MasterError::BadDefinition(e.to_string()))?;

        Ok(Self {
            name: config.name.clone(),
            clock,
            defs,
            plan_file,
            archive,
            log,
            replication,
            broker,
            dedup: DedupIndex::new(),
            backup_replica: None,
            corruption,
        })
    }

    pub fn broker_mut(&mut self) -> &mut Broker<C> {
        &mut self.broker
    }

    pub fn replication(&self) -> &Replication {
        &self.replication
    }

    /// Record an in-sync replica pushed up by a backup domain manager.
    pub fn set_backup_replica(&mut self, plan: Plan) {
        self.backup_replica = Some(plan);
    }

    /// Ingest one inbound event: dedup, persist, apply, and react.
    /// Returns `false` for duplicates.
    pub async fn ingest_event(
        &mut self,
        event: Event,
        channel: &dyn PlanChannel,
    ) -> Result<bool, MasterError> {
        let (Some(source), Some(seq)) = (event.source().cloned(), event.seq()) else {
            return Ok(false);
        };
        if !self.dedup.try_advance(&source, seq) {
            tracing::debug!(source = %source, %seq, "duplicate event ignored");
            return Ok(false);
        }

        self.log.append(&event)?;
        self.log.flush()?;

        if let Event::PlanAck { source, run, .. } = &event {
            let released = self.replication.handle_ack(source, *run);
            for command in released {
                let disposition = self.replication.send_control(command, channel).await?;
                tracing::debug!(?disposition, "queued control released after ack");
            }
        }

        if let Some(plan) = self.replication.current_plan_mut() {
            plan.apply_event(&event);
        }
        Ok(true)
    }

    /// Generate the plan for a window and distribute it down the tree.
    pub async fn generate(
        &mut self,
        from_ms: u64,
        to_ms: u64,
        channel: &dyn PlanChannel,
    ) -> Result<PlanSummary, MasterError> {
        // Fail fast on contention; the previous plan stays authoritative.
        let lock = self.plan_file.try_lock()?;

        let prior = self.replication.current_plan().cloned();
        if let Some(prior) = &prior {
            self.archive.archive(prior, self.log.write_seq())?;
        }

        let period = PlanPeriod { from_ms, to_ms };
        let plan = generate_plan(&self.defs, period, prior.as_ref())?;
        self.plan_file.swap(&plan, &lock)?;
        drop(lock);

        let summary = summarize(&plan);
        self.replication.accept_plan(plan)?;
        self.corruption = None;
        self.replication.distribute(channel).await?;
        Ok(summary)
    }

    /// Run the chosen recovery strategy and distribute the result.
    pub async fn recover_with(
        &mut self,
        strategy: RecoveryStrategy,
        channel: &dyn PlanChannel,
    ) -> Result<(RunNumber, Vec<String>), MasterError> {
        let observed = self.replication.observed_runs();
        let window = self
            .replication
            .current_plan()
            .map(|p| p.period)
            .or_else(|| self.archive.latest().ok().flatten().map(|a| a.plan.period))
            .unwrap_or_else(|| {
                let now = self.clock.epoch_ms();
                let from = now / DAY_MS * DAY_MS;
                PlanPeriod { from_ms: from, to_ms: from + DAY_MS }
            });

        let outcome: RecoveryOutcome = {
            let ctx = RecoveryContext {
                defs: &self.defs,
                archive: &self.archive,
                log: &self.log,
                window,
                backup_replica: self.backup_replica.as_ref(),
                observed_runs: &observed,
            };
            recover(strategy, &ctx)?
        };

        let lock = self.plan_file.try_lock()?;
        self.plan_file.swap(&outcome.plan, &lock)?;
        drop(lock);

        let run = outcome.plan.run_number;
        self.replication.accept_plan(outcome.plan)?;
        self.corruption = None;
        self.replication.distribute(channel).await?;

        let warnings = outcome.warnings.iter().map(warning_text).collect();
        Ok((run, warnings))
    }

    /// Handle one admin request from the console layer.
    pub async fn handle_request(
        &mut self,
        request: Request,
        channel: &dyn PlanChannel,
    ) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::Status => Response::Status { report: self.status_report() },
            Request::Shutdown => Response::Ok,

            Request::ValidateDefs { streams } => self.validate_defs(streams),
            Request::SubmitDefs { streams } => self.submit_defs(streams),

            Request::GeneratePlan { from_ms, to_ms } => {
                match self.generate(from_ms, to_ms, channel).await {
                    Ok(summary) => Response::PlanGenerated { summary },
                    Err(e) => error_response(e),
                }
            }

            Request::Stop { workstation } => {
                self.control(ControlCommand::Stop { workstation }, channel).await
            }
            Request::Start { workstation } => {
                self.control(ControlCommand::Start { workstation }, channel).await
            }
            Request::Unlink { workstation } => {
                self.control(ControlCommand::Unlink { workstation }, channel).await
            }
            Request::Link { workstation } => self.link(workstation, channel).await,
            Request::CancelJob { workstation, job } => {
                self.control(
                    ControlCommand::CancelJob { workstation, job: job.as_str().into() },
                    channel,
                )
                .await
            }
            Request::StopCascade => {
                for command in self.replication.stop_cascade() {
                    if let Err(e) = self.replication.send_control(command, channel).await {
                        return error_response(e.into());
                    }
                }
                Response::Ok
            }

            Request::DispatchSubmit { job_name, command, resource, units } => {
                let id = self.broker.submit(DispatchSpec {
                    job_name: job_name.into(),
                    command,
                    need: ResourceNeed { resource: resource.into(), units },
                });
                Response::DispatchSubmitted { request: id.to_string() }
            }
            Request::DispatchCancel { request } => {
                match self.broker.cancel(&request.as_str().into()) {
                    Ok(_) => Response::Ok,
                    Err(e) => error_response(e.into()),
                }
            }
            Request::DispatchStatus { request } => {
                let id = request.as_str().into();
                match self.broker.request(&id) {
                    Some(r) => Response::DispatchStatus {
                        entry: DispatchStatusEntry {
                            request,
                            status: r.status.to_string(),
                            external: r.external().to_string(),
                            failure: r.failure.clone(),
                        },
                    },
                    None => Response::error(ErrorCode::NotFound, format!("unknown request {id}")),
                }
            }

            Request::Recover { strategy } => {
                let strategy = match strategy {
                    RecoveryChoice::Failover => RecoveryStrategy::Failover,
                    RecoveryChoice::ReplayLog => RecoveryStrategy::ReplayLog,
                    RecoveryChoice::Regenerate => RecoveryStrategy::Regenerate,
                };
                match self.recover_with(strategy, channel).await {
                    Ok((run, warnings)) => Response::Recovered { run, warnings },
                    Err(e) => error_response(e),
                }
            }
        }
    }

    async fn control(&mut self, command: ControlCommand, channel: &dyn PlanChannel) -> Response {
        match self.replication.send_control(command, channel).await {
            // Local, Sent, and Queued are all success: queued commands
            // are delivered once the child initializes.
            Ok(_) => Response::Ok,
            Err(e) => error_response(e.into()),
        }
    }

    async fn link(&mut self, workstation: WsName, channel: &dyn PlanChannel) -> Response {
        if self.replication.child(&workstation).is_some() {
            // Direct child: relink pushes the current plan if it is behind.
            match self.replication.relink(&workstation, None, channel).await {
                Ok(_) => Response::Ok,
                Err(e) => error_response(e.into()),
            }
        } else {
            self.control(ControlCommand::Link { workstation }, channel).await
        }
    }

    fn validate_defs(&self, streams: Vec<SubmitStream>) -> Response {
        let batch = match convert_streams(streams) {
            Ok(batch) => batch,
            Err(e) => return error_response(e),
        };
        match validate(&self.defs, &batch) {
            Ok(()) => Response::Ok,
            Err(errors) => {
                let message =
                    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
                Response::error(ErrorCode::ValidationFailed, message)
            }
        }
    }

    fn submit_defs(&mut self, streams: Vec<SubmitStream>) -> Response {
        let batch = match convert_streams(streams) {
            Ok(batch) => batch,
            Err(e) => return error_response(e),
        };
        let outcome = submit(&mut self.defs, batch);
        Response::Submitted {
            committed: outcome.committed.iter().map(|s| s.to_string()).collect(),
            deferred: outcome.deferred.iter().map(|d| d.name.to_string()).collect(),
        }
    }

    fn status_report(&self) -> StatusReport {
        let plan = self.replication.current_plan().map(summarize);
        let mut workstations: Vec<WorkstationEntry> = self
            .replication
            .children()
            .map(|(name, link)| {
                let role = self
                    .replication
                    .tree()
                    .get(name)
                    .map(|w| w.role.to_string())
                    .unwrap_or_default();
                let state = self
                    .replication
                    .current_plan()
                    .and_then(|p| p.workstation(name))
                    .map(|w| w.link)
                    .unwrap_or_default();
                WorkstationEntry {
                    name: name.clone(),
                    role,
                    link: state,
                    pending_controls: link.pending(),
                    acked_run: link.acked_run,
                }
            })
            .collect();
        workstations.sort_by(|a, b| a.name.cmp(&b.name));
        StatusReport { plan, workstations, event_log_seq: self.log.write_seq() }
    }
}

fn summarize(plan: &Plan) -> PlanSummary {
    PlanSummary {
        run: plan.run_number,
        from_ms: plan.period.from_ms,
        to_ms: plan.period.to_ms,
        jobs: plan.jobs.len(),
        streams: plan.streams.len(),
        structural_hash: plan.structural_hash.clone(),
    }
}

fn error_response(err: MasterError) -> Response {
    let code = err.code();
    tracing::warn!(error = %err, ?code, "request failed");
    Response::error(code, err.to_string())
}

fn warning_text(warning: &gp_domain::RecoveryWarning) -> String {
    match warning {
        gp_domain::RecoveryWarning::Incomplete { requested_after, available_from } => format!(
            "recovery incomplete: log entries after seq {requested_after} were lost \
             (retention starts at {available_from})"
        ),
        gp_domain::RecoveryWarning::CompletedWorkLost { jobs } => format!(
            "{} previously completed instance(s) will re-execute: {}",
            jobs.len(),
            jobs.iter().map(|j| j.as_str()).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Convert wire DTOs into planner definitions.
fn convert_streams(streams: Vec<SubmitStream>) -> Result<Vec<StreamDef>, MasterError> {
    streams.into_iter().map(convert_stream).collect()
}

fn convert_stream(stream: SubmitStream) -> Result<StreamDef, MasterError> {
    let recurrence = parse_schedule(&stream.schedule)
        .ok_or_else(|| MasterError::BadDefinition(format!("bad schedule {}", stream.schedule)))?;
    let jobs = stream
        .jobs
        .into_iter()
        .map(|job| {
            let follows = job
                .follows
                .iter()
                .map(|r| parse_follows(r, &stream.name))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(JobDef {
                name: job.name.into(),
                workstation: job.workstation.as_str().into(),
                command: job.command,
                success_codes: job.success_codes,
                follows,
            })
        })
        .collect::<Result<Vec<_>, MasterError>>()?;
    Ok(StreamDef {
        name: stream.name.into(),
        workstation: stream.workstation.as_str().into(),
        recurrence,
        jobs,
    })
}

/// `daily:<ms-of-day>`, `every:<interval-ms>`, or a plain epoch-ms.
fn parse_schedule(text: &str) -> Option<Recurrence> {
    if let Some(at) = text.strip_prefix("daily:") {
        return at.parse().ok().map(|at_ms_of_day| Recurrence::Daily { at_ms_of_day });
    }
    if let Some(every) = text.strip_prefix("every:") {
        return every.parse().ok().map(|interval_ms| Recurrence::Every { interval_ms });
    }
    text.parse().ok().map(|at_ms| Recurrence::Once { at_ms })
}

/// `stream.job`, or a bare job name meaning the submitting stream.
fn parse_follows(text: &str, default_stream: &str) -> Result<JobRef, MasterError> {
    match text.split_once('.') {
        Some((stream, job)) if !stream.is_empty() && !job.is_empty() => {
            Ok(JobRef::new(stream, job))
        }
        None if !text.is_empty() => Ok(JobRef::new(default_stream, text)),
        _ => Err(MasterError::BadDefinition(format!("bad follows reference {text}"))),
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
