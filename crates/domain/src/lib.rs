// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gp-domain: the domain hierarchy, plan replication, and recovery.
//!
//! Plans flow top-down through the tree: a manager forwards to its
//! children only after accepting the plan itself, and a child is not
//! considered initialized until it acknowledges the current run number.
//! Control commands addressed through an uninitialized child are queued
//! per child, never dropped.

mod control;
mod recovery;
mod replication;
mod tree;

pub use control::ControlCommand;
pub use recovery::{
    recover, RecoveryContext, RecoveryError, RecoveryOutcome, RecoveryStrategy, RecoveryWarning,
};
pub use replication::{
    ChannelError, ChildLink, ControlDisposition, DistributionReport, PlanChannel, RelinkOutcome,
    Replication, ReplicationError,
};
pub use tree::{DomainTree, TreeError};
