// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The launcher seam: how job instances become processes.

use async_trait::async_trait;
use gp_core::{JobInstance, JobInstanceId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("spawn failed for {job}: {reason}")]
    Spawn { job: JobInstanceId, reason: String },
    #[error("unknown launch handle for {0}")]
    UnknownHandle(JobInstanceId),
}

/// Handle to one launched job process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchHandle {
    pub job: JobInstanceId,
    pub token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Exited(i32),
}

/// Spawns and tracks job processes for one workstation.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start the job's command. Returning `Ok` is the spawn
    /// confirmation that drives `Intro → Exec`.
    async fn spawn(&self, job: &JobInstance) -> Result<LaunchHandle, LaunchError>;

    /// Non-blocking check of the process state.
    async fn poll(&self, handle: &LaunchHandle) -> Result<ProcessState, LaunchError>;

    /// Terminate the process. Idempotent: killing an exited process is
    /// a no-op.
    async fn kill(&self, handle: &LaunchHandle) -> Result<(), LaunchError>;
}

enum Slot {
    Live(tokio::process::Child),
    Done(i32),
}

/// Launcher backed by real OS processes (`sh -c <command>`).
#[derive(Default)]
pub struct ProcessLauncher {
    next_token: AtomicU64,
    slots: Mutex<HashMap<u64, Slot>>,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn spawn(&self, job: &JobInstance) -> Result<LaunchHandle, LaunchError> {
        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&job.command)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::Spawn { job: job.id.clone(), reason: e.to_string() })?;

        let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(job = %job.id, token, pid = child.id(), "job process spawned");
        self.slots.lock().insert(token, Slot::Live(child));
        Ok(LaunchHandle { job: job.id.clone(), token })
    }

    async fn poll(&self, handle: &LaunchHandle) -> Result<ProcessState, LaunchError> {
        let mut slots = self.slots.lock();
        let slot = slots
            .get_mut(&handle.token)
            .ok_or_else(|| LaunchError::UnknownHandle(handle.job.clone()))?;
        match slot {
            Slot::Done(code) => Ok(ProcessState::Exited(*code)),
            Slot::Live(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    let code = status.code().unwrap_or(-1);
                    *slot = Slot::Done(code);
                    Ok(ProcessState::Exited(code))
                }
                Ok(None) => Ok(ProcessState::Running),
                Err(e) => Err(LaunchError::Spawn { job: handle.job.clone(), reason: e.to_string() }),
            },
        }
    }

    async fn kill(&self, handle: &LaunchHandle) -> Result<(), LaunchError> {
        let mut slots = self.slots.lock();
        if let Some(Slot::Live(child)) = slots.get_mut(&handle.token) {
            let _ = child.start_kill();
        }
        Ok(())
    }
}

/// In-memory launcher for tests: spawns are recorded and exits are
/// scripted by the test.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeLauncher {
    next_token: AtomicU64,
    states: Mutex<HashMap<u64, ProcessState>>,
    by_job: Mutex<HashMap<JobInstanceId, u64>>,
    spawned: Mutex<Vec<JobInstanceId>>,
    refuse: Mutex<std::collections::HashSet<JobInstanceId>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next spawn of `job` fail.
    pub fn refuse(&self, job: impl Into<JobInstanceId>) {
        self.refuse.lock().insert(job.into());
    }

    /// Mark a running job's process as exited with `code`.
    pub fn finish(&self, job: &JobInstanceId, code: i32) {
        let by_job = self.by_job.lock();
        if let Some(token) = by_job.get(job) {
            self.states.lock().insert(*token, ProcessState::Exited(code));
        }
    }

    /// Jobs spawned so far, in order.
    pub fn spawned(&self) -> Vec<JobInstanceId> {
        self.spawned.lock().clone()
    }

    /// Whether the job's process is still tracked as running.
    pub fn is_running(&self, job: &JobInstanceId) -> bool {
        let by_job = self.by_job.lock();
        by_job
            .get(job)
            .and_then(|t| self.states.lock().get(t).copied())
            == Some(ProcessState::Running)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Launcher for FakeLauncher {
    async fn spawn(&self, job: &JobInstance) -> Result<LaunchHandle, LaunchError> {
        if self.refuse.lock().remove(&job.id) {
            return Err(LaunchError::Spawn { job: job.id.clone(), reason: "refused".into() });
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        self.states.lock().insert(token, ProcessState::Running);
        self.by_job.lock().insert(job.id.clone(), token);
        self.spawned.lock().push(job.id.clone());
        Ok(LaunchHandle { job: job.id.clone(), token })
    }

    async fn poll(&self, handle: &LaunchHandle) -> Result<ProcessState, LaunchError> {
        self.states
            .lock()
            .get(&handle.token)
            .copied()
            .ok_or_else(|| LaunchError::UnknownHandle(handle.job.clone()))
    }

    async fn kill(&self, handle: &LaunchHandle) -> Result<(), LaunchError> {
        self.states.lock().insert(handle.token, ProcessState::Exited(-9));
        Ok(())
    }
}
