// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch admission control under burst load.
//!
//! Scenario: `MaxAllocsPerTimeSlot = 100`, `MaxAllocsInCache = 1000`,
//! 5000 requests submitted in one burst. Over 50 slots every request
//! is admitted exactly once, no slot exceeds its quota, and the cache
//! never exceeds its bound.

use gp_core::FakeClock;
use gp_dispatch::{
    AdvisorConfig, Broker, DispatchSpec, DispatcherConfig, ProcessingStatus, ResourceNeed,
};

fn broker() -> Broker<FakeClock> {
    let advisor = AdvisorConfig {
        slot_ms: 15_000,
        max_allocs_per_slot: 100,
        max_allocs_in_cache: 1_000,
        max_realloc_attempts: 3,
    };
    Broker::new(DispatcherConfig::default(), advisor, FakeClock::new()).unwrap()
}

fn spec(n: usize) -> DispatchSpec {
    DispatchSpec {
        job_name: format!("burst{n}").into(),
        command: "run.sh".into(),
        need: ResourceNeed { resource: "lin".into(), units: 1 },
    }
}

#[test]
fn burst_of_5000_drains_in_50_bounded_slots() {
    let mut broker = broker();
    broker.register_resource("lin", 10_000);

    let ids: Vec<_> = (0..5_000).map(|n| broker.submit(spec(n))).collect();

    let mut total_admitted = 0;
    for slot in 0..50 {
        let report = broker.run_slot();
        assert!(
            report.admitted <= 100,
            "slot {slot} admitted {} > MaxAllocsPerTimeSlot",
            report.admitted
        );
        assert!(
            report.cache_occupancy <= 1_000,
            "slot {slot} cache {} > MaxAllocsInCache",
            report.cache_occupancy
        );
        total_admitted += report.admitted;
    }

    assert_eq!(total_admitted, 5_000);
    assert_eq!(broker.backlog_len(), 0);
    assert_eq!(broker.cache_len(), 0);
    for id in &ids {
        assert_eq!(broker.status(id).map(|(s, _)| s), Some(ProcessingStatus::Execute));
    }
}

#[test]
fn admission_beyond_quota_is_deferred_not_dropped() {
    let mut broker = broker();
    broker.register_resource("lin", 10_000);
    for n in 0..250 {
        broker.submit(spec(n));
    }

    let first = broker.run_slot();
    assert_eq!(first.admitted, 100);
    let second = broker.run_slot();
    assert_eq!(second.admitted, 100);
    let third = broker.run_slot();
    assert_eq!(third.admitted, 50);
}

#[test]
fn starvation_is_bounded_by_the_retry_bound() {
    let mut broker = broker();
    // Capacity for nobody: every admission requeues until exhausted
    broker.register_resource("lin", 0);
    let id = broker.submit(spec(0));

    let mut slots = 0;
    loop {
        slots += 1;
        broker.run_slot();
        let (status, _) = broker.status(&id).unwrap();
        if status.is_terminal() {
            break;
        }
        assert!(slots < 10, "request should fail permanently within the bound");
    }

    let request = broker.request(&id).unwrap();
    assert_eq!(request.status, ProcessingStatus::Error);
    assert!(request.failure.as_deref().unwrap().contains("no eligible resource"));
}
