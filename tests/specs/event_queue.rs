// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event queue capacity semantics.
//!
//! Scenario: a destination queue bounded at K receives K+1 events. The
//! oldest is evicted (circular-buffer semantics) and a capacity
//! warning is raised exactly once.

use gp_core::{Event, EventSeq, JobInstanceId, JobStatus, RunNumber, WsName};
use gp_transport::{EventSink, SinkError, Transport, TransportConfig};
use parking_lot::Mutex;

const K: usize = 16;

fn event(transport: &mut Transport, n: u64) -> Event {
    Event::JobStatus {
        source: transport.source().clone(),
        seq: transport.next_stamp(),
        job: JobInstanceId::from(format!("s@0#j{n}")),
        status: JobStatus::Ready,
        exit_code: None,
        at_ms: n,
    }
}

#[derive(Default)]
struct Collector {
    seen: Mutex<Vec<u64>>,
}

#[async_trait::async_trait]
impl EventSink for Collector {
    async fn deliver(&self, _dest: &WsName, event: &Event) -> Result<(), SinkError> {
        if let Some(seq) = event.seq() {
            self.seen.lock().push(seq.seq);
        }
        Ok(())
    }
}

#[tokio::test]
async fn k_plus_one_evicts_oldest_and_warns_exactly_once() {
    let mut transport = Transport::new(
        WsName::from("ws1"),
        TransportConfig { queue_capacity: K, unlink_timeout_ms: 60_000 },
    );
    transport.begin_run(RunNumber(1));
    let dest = WsName::from("mst");

    let mut warnings = Vec::new();
    for n in 1..=(K as u64 + 1) {
        let e = event(&mut transport, n);
        if let Some(warning) = transport.enqueue(&dest, e, 0) {
            warnings.push(warning);
        }
    }

    // Exactly one warning for the overflow episode
    assert_eq!(warnings.len(), 1);
    match &warnings[0] {
        Event::QueueOverflow { destination, dropped, .. } => {
            assert_eq!(destination, &dest);
            assert_eq!(*dropped, 1);
        }
        other => panic!("expected overflow warning, got {other:?}"),
    }

    // The oldest event (seq 1) was the one evicted
    let sink = Collector::default();
    transport.flush(&dest, &sink, 0).await;
    let seen = sink.seen.lock().clone();
    assert_eq!(seen.len(), K);
    assert_eq!(seen.first(), Some(&2));
    assert_eq!(seen.last(), Some(&(K as u64 + 1)));
}

#[tokio::test]
async fn warning_does_not_repeat_within_one_episode() {
    let mut transport = Transport::new(
        WsName::from("ws1"),
        TransportConfig { queue_capacity: 4, unlink_timeout_ms: 60_000 },
    );
    transport.begin_run(RunNumber(1));
    let dest = WsName::from("mst");

    let mut warnings = 0;
    for n in 1..=20 {
        let e = event(&mut transport, n);
        if transport.enqueue(&dest, e, 0).is_some() {
            warnings += 1;
        }
    }
    assert_eq!(warnings, 1);

    // Draining ends the episode; a fresh overflow warns again
    let sink = Collector::default();
    transport.flush(&dest, &sink, 0).await;
    for n in 21..=26 {
        let e = event(&mut transport, n);
        if transport.enqueue(&dest, e, 0).is_some() {
            warnings += 1;
        }
    }
    assert_eq!(warnings, 2);
}
