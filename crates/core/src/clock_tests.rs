// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_nonzero() {
    assert!(SystemClock.epoch_ms() > 0);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::at(10_000);
    assert_eq!(clock.epoch_ms(), 10_000);

    clock.advance(Duration::from_secs(15));
    assert_eq!(clock.epoch_ms(), 25_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::at(1);
    let other = clock.clone();
    clock.advance(Duration::from_millis(5));
    assert_eq!(other.epoch_ms(), 6);
}

#[test]
fn fake_clock_set_epoch() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}
