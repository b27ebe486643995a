// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for master administration.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.
//! The console layer issues idempotent, individually-addressed
//! operations; there are no broadcast requests on this protocol.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;
mod request;
mod response;

pub use codec::{decode, encode, read_message, write_message, ProtocolError, MAX_FRAME_BYTES};
pub use request::{RecoveryChoice, Request, SubmitJob, SubmitStream};
pub use response::{
    DispatchStatusEntry, ErrorCode, PlanSummary, Response, StatusReport, WorkstationEntry,
};
