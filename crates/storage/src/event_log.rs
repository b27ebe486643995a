// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable append-only event log.
//!
//! One JSON object per line, each entry carrying a monotonic sequence
//! number. Distinct from the live transport queues: this log is the
//! recovery record the master replays over an archived plan. Retention
//! is bounded by `capacity`; a replay that needs entries older than the
//! oldest retained one reports the gap instead of masking it.

use gp_core::Event;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from event log operations.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One durable log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub event: Event,
}

/// Entries lost to the retention bound, reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayGap {
    /// Replay was requested starting after this sequence.
    pub requested_after: u64,
    /// Oldest sequence still retained.
    pub available_from: u64,
}

/// Result of a replay request: the retained entries plus the gap, if any.
#[derive(Debug)]
pub struct Replay {
    pub entries: Vec<LogEntry>,
    pub gap: Option<ReplayGap>,
}

/// Rewrite the on-disk file once this many entries have been evicted
/// in memory, rather than on every eviction.
const COMPACT_SLACK: u64 = 64;

/// Bounded, durable, append-only event log.
pub struct EventLog {
    path: PathBuf,
    writer: BufWriter<File>,
    entries: VecDeque<LogEntry>,
    write_seq: u64,
    capacity: Option<u64>,
    evicted_since_compact: u64,
}

impl EventLog {
    /// Open or create the log at `path`.
    ///
    /// A corrupt tail (partial write, binary garbage) is handled by
    /// rotating the damaged file to `.bak` and rewriting the valid
    /// prefix; valid entries are never lost to trailing corruption.
    pub fn open(path: impl Into<PathBuf>, capacity: Option<u64>) -> Result<Self, LogError> {
        let path = path.into();
        let (entries, had_corruption) = read_entries(&path)?;

        if had_corruption {
            tracing::warn!(path = %path.display(), "corrupt event log tail, rotating to .bak");
            let bak = rotate_bak_path(&path);
            fs::copy(&path, &bak)?;
            rewrite(&path, &entries)?;
        }

        let write_seq = entries.back().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut log = Self {
            path,
            writer: BufWriter::new(file),
            entries,
            write_seq,
            capacity,
            evicted_since_compact: 0,
        };
        log.enforce_capacity()?;
        Ok(log)
    }

    /// Append an event, returning its assigned sequence number.
    pub fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        self.write_seq += 1;
        let entry = LogEntry { seq: self.write_seq, event: event.clone() };
        let line = serde_json::to_string(&entry)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.entries.push_back(entry);
        self.enforce_capacity()?;
        Ok(self.write_seq)
    }

    pub fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Highest sequence number written so far (0 when empty).
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Oldest retained sequence number, if the log is non-empty.
    pub fn first_seq(&self) -> Option<u64> {
        self.entries.front().map(|e| e.seq)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retained entries with sequence strictly greater than `seq`.
    pub fn entries_after(&self, seq: u64) -> Vec<LogEntry> {
        self.entries.iter().filter(|e| e.seq > seq).cloned().collect()
    }

    /// Replay entries after `seq`, reporting entries lost to retention.
    ///
    /// Recovery turns the gap into an explicit "recovery incomplete"
    /// warning for the operator.
    pub fn replay_after(&self, seq: u64) -> Replay {
        let gap = match self.first_seq() {
            Some(first) if seq + 1 < first => {
                Some(ReplayGap { requested_after: seq, available_from: first })
            }
            None if self.write_seq > seq => {
                // Everything after `seq` has been evicted.
                Some(ReplayGap { requested_after: seq, available_from: self.write_seq + 1 })
            }
            _ => None,
        };
        Replay { entries: self.entries_after(seq), gap }
    }

    /// Drop entries with sequence strictly less than `seq` and compact
    /// the on-disk file.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), LogError> {
        while self.entries.front().is_some_and(|e| e.seq < seq) {
            self.entries.pop_front();
        }
        self.compact()
    }

    fn enforce_capacity(&mut self) -> Result<(), LogError> {
        let Some(capacity) = self.capacity else { return Ok(()) };
        let mut evicted = 0u64;
        while self.entries.len() as u64 > capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        if evicted == 0 {
            return Ok(());
        }
        self.evicted_since_compact += evicted;
        if self.evicted_since_compact >= COMPACT_SLACK {
            self.compact()?;
        }
        Ok(())
    }

    fn compact(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        let entries: Vec<LogEntry> = self.entries.iter().cloned().collect();
        rewrite(&self.path, &VecDeque::from(entries))?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.evicted_since_compact = 0;
        Ok(())
    }
}

/// Read entries from disk, stopping at the first corrupt line.
/// Returns the valid prefix and whether corruption was found.
fn read_entries(path: &Path) -> Result<(VecDeque<LogEntry>, bool), LogError> {
    if !path.exists() {
        return Ok((VecDeque::new(), false));
    }
    let bytes = fs::read(path)?;
    let mut entries = VecDeque::new();
    let mut corrupt = false;
    for line in bytes.split(|b| *b == b'\n') {
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice::<LogEntry>(line) {
            Ok(entry) => entries.push_back(entry),
            Err(_) => {
                corrupt = true;
                break;
            }
        }
    }
    Ok((entries, corrupt))
}

/// Serialize entries to a temp file and rename it over `path`.
fn rewrite(path: &Path, entries: &VecDeque<LogEntry>) -> Result<(), LogError> {
    let tmp = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for entry in entries {
            let line = serde_json::to_string(entry)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        writer.get_ref().sync_data()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
