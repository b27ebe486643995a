// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::arb_event_seq;
use proptest::prelude::*;

#[test]
fn run_number_ordering() {
    assert!(RunNumber(6) > RunNumber(5));
    assert_eq!(RunNumber(5).next(), RunNumber(6));
    assert_eq!(RunNumber(5).to_string(), "run#5");
}

#[test]
fn event_seq_orders_by_run_then_seq() {
    let a = EventSeq::new(RunNumber(1), 900);
    let b = EventSeq::new(RunNumber(2), 1);
    assert!(b > a);
    assert!(EventSeq::new(RunNumber(2), 2) > b);
}

#[test]
fn dedup_accepts_fresh_and_rejects_replay() {
    let mut index = DedupIndex::new();
    let src = WsName::from("ws1");

    assert!(index.try_advance(&src, EventSeq::new(RunNumber(1), 1)));
    assert!(index.try_advance(&src, EventSeq::new(RunNumber(1), 2)));
    // Exact replay
    assert!(!index.try_advance(&src, EventSeq::new(RunNumber(1), 2)));
    // Older than watermark
    assert!(!index.try_advance(&src, EventSeq::new(RunNumber(1), 1)));
    assert_eq!(index.watermark(&src), Some(EventSeq::new(RunNumber(1), 2)));
}

#[test]
fn dedup_tracks_sources_independently() {
    let mut index = DedupIndex::new();
    let a = WsName::from("ws-a");
    let b = WsName::from("ws-b");

    assert!(index.try_advance(&a, EventSeq::new(RunNumber(1), 5)));
    // Same stamp from a different source is fresh
    assert!(index.try_advance(&b, EventSeq::new(RunNumber(1), 5)));
}

#[test]
fn new_run_resets_effective_ordering() {
    let mut index = DedupIndex::new();
    let src = WsName::from("ws1");

    assert!(index.try_advance(&src, EventSeq::new(RunNumber(1), 500)));
    // Run 2 seq 1 sorts above run 1 seq 500
    assert!(index.try_advance(&src, EventSeq::new(RunNumber(2), 1)));
    assert!(!index.try_advance(&src, EventSeq::new(RunNumber(1), 501)));
}

#[test]
fn prune_before_drops_stale_runs() {
    let mut index = DedupIndex::new();
    let old = WsName::from("old");
    let live = WsName::from("live");
    index.try_advance(&old, EventSeq::new(RunNumber(1), 9));
    index.try_advance(&live, EventSeq::new(RunNumber(3), 1));

    index.prune_before(RunNumber(3));
    assert_eq!(index.watermark(&old), None);
    assert!(index.watermark(&live).is_some());
}

proptest! {
    /// Applying any stamp twice in a row: the second application is
    /// always rejected.
    #[test]
    fn replay_never_advances_twice(seq in arb_event_seq()) {
        let mut index = DedupIndex::new();
        let src = WsName::from("ws1");
        prop_assert!(index.try_advance(&src, seq));
        prop_assert!(!index.try_advance(&src, seq));
    }

    /// A monotonically increasing stream is fully accepted; any replayed
    /// prefix is fully rejected.
    #[test]
    fn fifo_stream_dedup(seqs in proptest::collection::vec(arb_event_seq(), 1..50)) {
        let mut sorted = seqs.clone();
        sorted.sort();
        sorted.dedup();

        let mut index = DedupIndex::new();
        let src = WsName::from("ws1");
        for seq in &sorted {
            prop_assert!(index.try_advance(&src, *seq));
        }
        for seq in &sorted {
            prop_assert!(!index.try_advance(&src, *seq));
        }
    }
}
