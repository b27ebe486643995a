// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive of superseded plans.
//!
//! Each archived plan is a zstd-compressed JSON document keyed by run
//! number, stamped with the event-log sequence current at archive time
//! so recovery knows where replay resumes. Terminal instances pruned
//! from the live plan at rollover stay queryable here.

use chrono::{DateTime, Utc};
use gp_core::{Plan, RunNumber};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current archive schema version
pub const CURRENT_ARCHIVE_VERSION: u32 = 1;

/// Errors from archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("archived plan {0} is corrupt: {1}")]
    Corrupt(RunNumber, String),
}

/// An archived plan with its recovery metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedPlan {
    /// Schema version for migrations
    #[serde(rename = "v")]
    pub version: u32,
    pub run: RunNumber,
    /// Event-log sequence already reflected in this plan's state.
    pub log_seq: u64,
    pub archived_at: DateTime<Utc>,
    pub plan: Plan,
}

/// Directory of zstd-compressed archived plans.
pub struct PlanArchive {
    dir: PathBuf,
}

impl PlanArchive {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, run: RunNumber) -> PathBuf {
        self.dir.join(format!("plan-{:010}.zst", run.0))
    }

    /// Archive a plan. Overwriting the same run number is idempotent.
    pub fn archive(&self, plan: &Plan, log_seq: u64) -> Result<PathBuf, ArchiveError> {
        let archived = ArchivedPlan {
            version: CURRENT_ARCHIVE_VERSION,
            run: plan.run_number,
            log_seq,
            archived_at: Utc::now(),
            plan: plan.clone(),
        };
        let json = serde_json::to_vec(&archived)?;
        let compressed = zstd::stream::encode_all(&json[..], 0)?;

        let path = self.entry_path(plan.run_number);
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&compressed)?;
            file.sync_data()?;
        }
        fs::rename(&tmp, &path)?;
        tracing::debug!(run = %plan.run_number, path = %path.display(), "plan archived");
        Ok(path)
    }

    /// Load an archived plan by run number.
    pub fn load(&self, run: RunNumber) -> Result<Option<ArchivedPlan>, ArchiveError> {
        let path = self.entry_path(run);
        if !path.exists() {
            return Ok(None);
        }
        let compressed = fs::read(&path)?;
        let json = zstd::stream::decode_all(&compressed[..])
            .map_err(|e| ArchiveError::Corrupt(run, e.to_string()))?;
        let archived: ArchivedPlan = serde_json::from_slice(&json)
            .map_err(|e| ArchiveError::Corrupt(run, e.to_string()))?;
        Ok(Some(archived))
    }

    /// Highest-run archived plan, if any.
    pub fn latest(&self) -> Result<Option<ArchivedPlan>, ArchiveError> {
        match self.runs()?.into_iter().max() {
            Some(run) => self.load(run),
            None => Ok(None),
        }
    }

    /// All archived run numbers, ascending.
    pub fn runs(&self) -> Result<Vec<RunNumber>, ArchiveError> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(run) = parse_entry_name(&name.to_string_lossy()) {
                runs.push(run);
            }
        }
        runs.sort();
        Ok(runs)
    }
}

fn parse_entry_name(name: &str) -> Option<RunNumber> {
    name.strip_prefix("plan-")?
        .strip_suffix(".zst")?
        .parse::<u64>()
        .ok()
        .map(RunNumber)
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
