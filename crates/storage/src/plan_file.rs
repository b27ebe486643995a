// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live plan file: single-writer, atomically swapped per generation.
//!
//! A new plan is serialized to a temp file, fsynced, and renamed over
//! the live path — readers never observe a partial plan. Generation is
//! serialized through an exclusive advisory lock; a second generator
//! fails fast and the previous plan stays authoritative.

use fs2::FileExt;
use gp_core::Plan;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from plan file operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plan generation lock is held by another process")]
    LockHeld,
    #[error("live plan is corrupt: {0}")]
    Corrupt(String),
}

/// Exclusive generation lock. Released on drop.
pub struct GenerationLock {
    file: File,
}

impl Drop for GenerationLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Handle to the live plan and its generation lock.
pub struct PlanFile {
    path: PathBuf,
    lock_path: PathBuf,
}

impl PlanFile {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self { path: dir.join("plan.json"), lock_path: dir.join("plan.lock") }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the exclusive generation lock, failing fast if another
    /// generation attempt holds it.
    pub fn try_lock(&self) -> Result<GenerationLock, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(GenerationLock { file }),
            Err(err)
                if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
            {
                Err(StoreError::LockHeld)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Load the live plan, if one exists.
    ///
    /// An unreadable or structurally inconsistent plan is a `Corrupt`
    /// error, the trigger for the recovery subsystem.
    pub fn load(&self) -> Result<Option<Plan>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let plan: Plan = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if !plan.verify_structure() {
            return Err(StoreError::Corrupt(format!(
                "structural hash mismatch for {}",
                plan.run_number
            )));
        }
        Ok(Some(plan))
    }

    /// Atomically replace the live plan. The caller holds the
    /// generation lock; the `_lock` parameter makes that explicit.
    pub fn swap(&self, plan: &Plan, _lock: &GenerationLock) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&serde_json::to_vec(plan)?)?;
            file.sync_data()?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::info!(run = %plan.run_number, path = %self.path.display(), "live plan swapped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "plan_file_tests.rs"]
mod tests;
