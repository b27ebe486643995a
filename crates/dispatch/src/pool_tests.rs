// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn register_and_allocate() {
    let mut pool = ResourcePool::new();
    pool.register("lin", 4);

    assert!(pool.is_registered("lin"));
    assert_eq!(pool.free("lin"), 4);
    assert!(pool.try_allocate("lin", 3));
    assert_eq!(pool.free("lin"), 1);
    assert!(!pool.try_allocate("lin", 2));

    pool.release("lin", 3);
    assert_eq!(pool.free("lin"), 4);
}

#[test]
fn unknown_resource_has_no_capacity() {
    let mut pool = ResourcePool::new();
    assert!(!pool.is_registered("ghost"));
    assert!(!pool.is_known("ghost"));
    assert!(!pool.try_allocate("ghost", 1));
}

#[test]
fn deregistered_resource_stays_known_but_unusable() {
    let mut pool = ResourcePool::new();
    pool.register("lin", 4);
    pool.deregister("lin");

    assert!(!pool.is_registered("lin"));
    assert!(pool.is_known("lin"));
    assert_eq!(pool.free("lin"), 0);
    assert!(!pool.try_allocate("lin", 1));
}

#[test]
fn reregistration_restores_capacity() {
    let mut pool = ResourcePool::new();
    pool.register("lin", 4);
    assert!(pool.try_allocate("lin", 2));
    pool.deregister("lin");

    pool.register("lin", 8);
    assert!(pool.is_registered("lin"));
    // Prior in-use units still tracked
    assert_eq!(pool.free("lin"), 6);
}

#[test]
fn release_never_underflows() {
    let mut pool = ResourcePool::new();
    pool.register("lin", 2);
    pool.release("lin", 5);
    assert_eq!(pool.free("lin"), 2);
}
