// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gp_core::{EventSeq, JobInstanceId, JobStatus, RunNumber};
use proptest::prelude::*;

fn event(n: u64) -> Event {
    Event::JobStatus {
        source: WsName::from("ws1"),
        seq: EventSeq::new(RunNumber(1), n),
        job: JobInstanceId::from(format!("s@0#j{n}")),
        status: JobStatus::Ready,
        exit_code: None,
        at_ms: n,
    }
}

fn seq_of(event: &Event) -> u64 {
    event.seq().map(|s| s.seq).unwrap_or(0)
}

#[test]
fn push_within_capacity_queues() {
    let mut queue = DestQueue::new(WsName::from("w"), 3);
    assert_eq!(queue.push(event(1)), PushOutcome::Queued);
    assert_eq!(queue.push(event(2)), PushOutcome::Queued);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.dropped_total(), 0);
}

#[test]
fn overflow_evicts_oldest_and_warns_once() {
    let capacity = 4;
    let mut queue = DestQueue::new(WsName::from("w"), capacity);
    for n in 1..=capacity as u64 {
        assert_eq!(queue.push(event(n)), PushOutcome::Queued);
    }

    // K+1th push: oldest evicted, warning raised exactly once
    let outcome = queue.push(event(5));
    assert_eq!(outcome, PushOutcome::Overflowed { dropped_total: 1, warn: true });
    assert_eq!(queue.len(), capacity);
    assert_eq!(seq_of(queue.front().unwrap()), 2);

    // Continued overflow in the same episode: no further warnings
    let outcome = queue.push(event(6));
    assert_eq!(outcome, PushOutcome::Overflowed { dropped_total: 2, warn: false });
}

#[test]
fn warning_rearms_after_drain() {
    let mut queue = DestQueue::new(WsName::from("w"), 1);
    queue.push(event(1));
    assert!(matches!(queue.push(event(2)), PushOutcome::Overflowed { warn: true, .. }));
    assert!(matches!(queue.push(event(3)), PushOutcome::Overflowed { warn: false, .. }));

    // Drain ends the episode
    queue.pop_front();
    assert!(queue.is_empty());

    queue.push(event(4));
    assert!(matches!(queue.push(event(5)), PushOutcome::Overflowed { warn: true, .. }));
}

#[test]
fn fifo_order_preserved() {
    let mut queue = DestQueue::new(WsName::from("w"), 10);
    for n in 1..=5 {
        queue.push(event(n));
    }
    let drained: Vec<u64> = std::iter::from_fn(|| queue.pop_front()).map(|e| seq_of(&e)).collect();
    assert_eq!(drained, vec![1, 2, 3, 4, 5]);
}

#[test]
fn zero_capacity_is_clamped_to_one() {
    let mut queue = DestQueue::new(WsName::from("w"), 0);
    assert_eq!(queue.capacity(), 1);
    assert_eq!(queue.push(event(1)), PushOutcome::Queued);
}

proptest! {
    /// Occupancy never exceeds capacity, whatever the push/pop pattern.
    #[test]
    fn occupancy_bounded(
        capacity in 1usize..16,
        ops in proptest::collection::vec(proptest::bool::ANY, 0..200),
    ) {
        let mut queue = DestQueue::new(WsName::from("w"), capacity);
        let mut n = 0u64;
        for push in ops {
            if push {
                n += 1;
                queue.push(event(n));
            } else {
                queue.pop_front();
            }
            prop_assert!(queue.len() <= capacity);
        }
    }

    /// Under pure overflow, the retained window is always the most
    /// recent `capacity` events in order.
    #[test]
    fn overflow_keeps_newest_window(capacity in 1usize..8, total in 1u64..40) {
        let mut queue = DestQueue::new(WsName::from("w"), capacity);
        for n in 1..=total {
            queue.push(event(n));
        }
        let drained: Vec<u64> =
            std::iter::from_fn(|| queue.pop_front()).map(|e| seq_of(&e)).collect();
        let expected: Vec<u64> =
            (total.saturating_sub(capacity as u64) + 1..=total).collect();
        prop_assert_eq!(drained, expected);
    }
}
