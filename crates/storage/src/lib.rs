// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gp-storage: durable state for the gridplan master.
//!
//! Three pieces: the append-only [`EventLog`] (replayed during
//! recovery), the live [`PlanFile`] (atomic pointer swap per
//! generation), and the [`PlanArchive`] of superseded plans.

mod archive;
mod event_log;
mod plan_file;

pub use archive::{ArchiveError, ArchivedPlan, PlanArchive, CURRENT_ARCHIVE_VERSION};
pub use event_log::{EventLog, LogEntry, LogError, Replay, ReplayGap};
pub use plan_file::{GenerationLock, PlanFile, StoreError};
