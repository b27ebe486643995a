// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gp-transport: store-and-forward event delivery between workstations.
//!
//! One bounded FIFO queue per destination, at-least-once delivery with
//! receiver-side dedup, and a per-link state machine that tolerates
//! partitions: a destination that stays unreachable past the timeout is
//! marked unlinked and local progress continues without it.
//!
//! Ordering is FIFO **per destination only**. Consumers that care about
//! the relative order of events from different sources must use the
//! [`gp_core::EventSeq`] stamps; transport delays can and do reorder
//! causally related events from different workstations.

mod link;
mod queue;
mod transport;

pub use link::LinkHealth;
pub use queue::{DestQueue, PushOutcome};
pub use transport::{EventSink, FlushReport, SinkError, Transport, TransportConfig};
