// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn allocator_hands_out_strictly_increasing_ids() {
    let alloc = IdAllocator::new();
    let a = alloc.allocate();
    let b = alloc.allocate();
    let c = alloc.allocate();
    assert!(a.get() < b.get());
    assert!(b.get() < c.get());
}

#[test]
fn observe_loaded_advances_past_max_loaded_id() {
    let alloc = IdAllocator::new();
    let loaded = vec![JobId::from_raw(5), JobId::from_raw(12), JobId::from_raw(3)];
    alloc.observe_loaded(loaded.into_iter());
    let next = alloc.allocate();
    assert_eq!(next.get(), 13);
}

#[test]
fn observe_loaded_never_moves_counter_backwards() {
    let alloc = IdAllocator::new();
    let first = alloc.allocate();
    assert_eq!(first.get(), 1);
    // A later, smaller reload must not rewind the counter.
    alloc.observe_loaded(std::iter::once(JobId::from_raw(1)));
    let next = alloc.allocate();
    assert!(next.get() > first.get());
}

#[test]
fn queue_job_id_from_pid() {
    let id = QueueJobId::from(4242u32);
    assert_eq!(id.as_str(), "4242");
}
