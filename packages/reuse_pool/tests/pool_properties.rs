//! Behavioral properties that both pool variants must satisfy.
//!
//! Every scenario is written once against the `Pool` trait and run against `LocalObjectPool`
//! and `ObjectPool`.

use std::sync::Arc;

use reuse_pool::{
    DropPolicy, LocalObjectPool, ObjectPool, Pool, PooledMut, ReleaseError, ReleaseValidation,
};
use testing::{LifecycleCounters, LifecycleProbe};

fn assert_counters_consistent<T>(pool: &impl Pool<T>) {
    let stats = pool.stats();

    assert!(stats.reuse_count <= stats.total_acquires);
    assert!(pool.free_count() <= pool.allocated_count());
    assert_eq!(
        pool.in_use_count(),
        pool.allocated_count() - pool.free_count()
    );
    assert!((pool.reuse_rate() - stats.reuse_rate()).abs() < f64::EPSILON);
    assert!((0.0..=1.0).contains(&pool.reuse_rate()));
}

fn round_trip_restores_in_use_count(pool: &impl Pool<String>) {
    let held = pool.acquire("held".to_string());

    let allocated_before = pool.allocated_count();
    let in_use_before = pool.in_use_count();

    let item = pool.acquire("temporary".to_string());
    pool.release(item);

    assert!(pool.allocated_count() >= allocated_before);
    assert_eq!(pool.in_use_count(), in_use_before);
    assert_counters_consistent(pool);

    pool.release(held);
}

fn reuse_is_last_in_first_out(pool: &impl Pool<u32>) {
    let a = pool.acquire(1);
    let b = pool.acquire(2);
    let a_ptr = a.ptr();
    let b_ptr = b.ptr();

    pool.release(a);
    pool.release(b);

    let next = pool.acquire(3);
    assert_eq!(next.ptr(), b_ptr);

    let after = pool.acquire(4);
    assert_eq!(after.ptr(), a_ptr);

    pool.release(next);
    pool.release(after);
}

fn no_growth_while_free_slots_exist(pool: &impl Pool<u32>) {
    pool.prewarm(3);

    // Keep everything checked out so each iteration sees one less free slot.
    let mut held = Vec::new();

    while pool.free_count() > 0 {
        let allocated_before = pool.allocated_count();
        held.push(pool.acquire(0));
        assert_eq!(pool.allocated_count(), allocated_before);
    }

    // Exhausted, so the next acquire grows by exactly one slot.
    let allocated_before = pool.allocated_count();
    held.push(pool.acquire(0));
    assert_eq!(pool.allocated_count(), allocated_before + 1);

    for item in held {
        pool.release(item);
    }
}

fn prewarm_shapes_empty_pool(pool: &impl Pool<Vec<u8>>) {
    pool.prewarm(10);

    assert_eq!(pool.allocated_count(), 10);
    assert_eq!(pool.free_count(), 10);
    assert_eq!(pool.in_use_count(), 0);

    let stats = pool.stats();
    assert_eq!(stats.total_acquires, 10);
    assert_eq!(stats.total_releases, 10);
    assert_eq!(stats.reuse_count, 0);
}

fn prewarm_reuses_existing_free_slots(pool: &impl Pool<Vec<u8>>) {
    pool.prewarm(4);
    pool.prewarm(6);

    // The second call reused the 4 free slots and only allocated 2 more.
    assert_eq!(pool.allocated_count(), 6);
    assert_eq!(pool.free_count(), 6);
    assert_eq!(pool.stats().total_acquires, 10);
    assert_eq!(pool.stats().reuse_count, 4);
}

fn clear_resets_fully(pool: &impl Pool<String>) {
    pool.prewarm(5);
    let item = pool.acquire("x".to_string());
    pool.release(item);

    pool.clear();

    assert_eq!(pool.allocated_count(), 0);
    assert_eq!(pool.free_count(), 0);

    let stats = pool.stats();
    assert_eq!(stats.total_acquires, 0);
    assert_eq!(stats.total_releases, 0);
    assert_eq!(stats.reuse_count, 0);
    assert!(pool.reuse_rate().abs() < f64::EPSILON);

    // The pool is fully usable after a clear.
    let item = pool.acquire("y".to_string());
    assert_eq!(pool.allocated_count(), 1);
    pool.release(item);
}

fn reset_stats_keeps_instances(pool: &impl Pool<u64>) {
    pool.prewarm(3);
    let item = pool.acquire(1);

    pool.reset_stats();

    assert_eq!(pool.stats().total_acquires, 0);
    assert_eq!(pool.stats().total_releases, 0);
    assert_eq!(pool.stats().reuse_count, 0);
    assert_eq!(pool.allocated_count(), 3);
    assert_eq!(pool.in_use_count(), 1);

    pool.release(item);
    assert_eq!(pool.stats().total_releases, 1);
}

fn concrete_scenario(pool: &impl Pool<char>) {
    let a = pool.acquire('a');
    let b = pool.acquire('b');
    let c = pool.acquire('c');
    assert_eq!(pool.allocated_count(), 3);
    assert_eq!(pool.free_count(), 0);

    let b_ptr = b.ptr();
    let b_slot = b.slot_index();
    pool.release(b);
    assert_eq!(pool.free_count(), 1);

    let d = pool.acquire('d');
    assert_eq!(d.ptr(), b_ptr);
    assert_eq!(d.slot_index(), b_slot);
    assert_eq!(*d, 'd');
    assert_eq!(pool.allocated_count(), 3);
    assert_eq!(pool.stats().reuse_count, 1);
    assert_eq!(pool.stats().total_acquires, 4);
    assert_counters_consistent(pool);

    for item in [a, c, d] {
        pool.release(item);
    }
}

fn foreign_release_is_rejected(pool: &impl Pool<u8>, other: &impl Pool<u8>) {
    let ours = pool.acquire(1);
    let theirs = other.acquire(2);

    let result = pool.try_release(theirs);
    assert!(matches!(result, Err(ReleaseError::ForeignObject { .. })));

    assert_eq!(pool.free_count(), 0);
    assert_eq!(pool.stats().total_releases, 0);
    // The foreign instance still counts as checked out of its own pool.
    assert_eq!(other.in_use_count(), 1);

    pool.release(ours);
}

fn stale_handle_after_clear_is_foreign(pool: &impl Pool<u8>) {
    let item = pool.acquire(1).into_shared();
    // SAFETY: Released once, the copy below is only used for the rejected release.
    unsafe { pool.release_shared(item) };
    pool.clear();

    let replacement = pool.acquire(2);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        // SAFETY: The pool rejects this handle before touching any state.
        unsafe { pool.release_shared(item) };
    }));
    assert!(result.is_err());
    assert_eq!(pool.in_use_count(), 1);

    pool.release(replacement);
}

fn instances_are_dropped_exactly_once(
    pool: &impl Pool<LifecycleProbe>,
    counters: &Arc<LifecycleCounters>,
) {
    let items = (0..4)
        .map(|i| pool.acquire_with(|| LifecycleProbe::new(counters, i)))
        .collect::<Vec<PooledMut<_>>>();

    for item in items {
        pool.release(item);
    }

    // Released instances stay constructed.
    assert_eq!(counters.alive(), 4);

    // Reuse drops the previous contents of the slot.
    let reused = pool.acquire_with(|| LifecycleProbe::new(counters, 10));
    assert_eq!(counters.constructed(), 5);
    assert_eq!(counters.dropped(), 1);
    assert_eq!(reused.value, 10);
    pool.release(reused);

    pool.clear();
    assert_eq!(counters.dropped(), 5);
    assert_eq!(counters.alive(), 0);
}

macro_rules! for_both_variants {
    ($($name:ident => $scenario:ident;)*) => {
        mod local {
            use super::*;

            $(
                #[test]
                fn $name() {
                    let pool = LocalObjectPool::builder().initial_capacity(0).build();
                    $scenario(&pool);
                }
            )*
        }

        mod locking {
            use super::*;

            $(
                #[test]
                fn $name() {
                    let pool = ObjectPool::builder().initial_capacity(0).build();
                    $scenario(&pool);
                }
            )*
        }
    };
}

for_both_variants! {
    round_trip => round_trip_restores_in_use_count;
    lifo_reuse => reuse_is_last_in_first_out;
    no_growth_on_reuse => no_growth_while_free_slots_exist;
    prewarm_on_empty_pool => prewarm_shapes_empty_pool;
    prewarm_after_prewarm => prewarm_reuses_existing_free_slots;
    clear => clear_resets_fully;
    reset_stats => reset_stats_keeps_instances;
    scenario_from_empty_pool => concrete_scenario;
    stale_handle => stale_handle_after_clear_is_foreign;
}

#[test]
fn foreign_release_local() {
    foreign_release_is_rejected(&LocalObjectPool::new(), &LocalObjectPool::new());
}

#[test]
fn foreign_release_locking() {
    foreign_release_is_rejected(&ObjectPool::new(), &ObjectPool::new());
}

#[test]
fn foreign_release_across_variants() {
    foreign_release_is_rejected(&LocalObjectPool::new(), &ObjectPool::new());
}

#[test]
fn drop_count_local() {
    let counters = LifecycleCounters::new();
    instances_are_dropped_exactly_once(&LocalObjectPool::new(), &counters);
}

#[test]
fn drop_count_locking() {
    let counters = LifecycleCounters::new();
    instances_are_dropped_exactly_once(&ObjectPool::new(), &counters);
}

#[test]
#[should_panic(expected = "double release")]
fn double_release_detected_local() {
    let pool = LocalObjectPool::<u32>::builder()
        .validation(ReleaseValidation::Enabled)
        .build();

    let item = pool.acquire(1).into_shared();

    // SAFETY: The second release is rejected by validation before it can corrupt anything.
    unsafe {
        pool.release_shared(item);
        pool.release_shared(item);
    }
}

#[test]
#[should_panic(expected = "double release")]
fn double_release_detected_locking() {
    let pool = ObjectPool::<u32>::builder()
        .validation(ReleaseValidation::Enabled)
        .build();

    let item = pool.acquire(1).into_shared();

    // SAFETY: The second release is rejected by validation before it can corrupt anything.
    unsafe {
        pool.release_shared(item);
        pool.release_shared(item);
    }
}

#[test]
#[should_panic(expected = "does not belong to this pool")]
fn foreign_release_panics() {
    let pool = ObjectPool::<u32>::new();
    let other = ObjectPool::<u32>::new();

    pool.release(other.acquire(1));
}

#[test]
#[should_panic(expected = "still in use")]
fn clear_with_outstanding_instance_panics() {
    let pool = LocalObjectPool::<u32>::new();

    let _item = pool.acquire(1);

    pool.clear();
}

#[test]
fn teardown_drops_free_instances_and_keeps_outstanding_ones_valid() {
    let counters = LifecycleCounters::new();
    let pool = ObjectPool::new();

    let kept = pool.acquire(LifecycleProbe::new(&counters, 1));
    let released = pool.acquire(LifecycleProbe::new(&counters, 2));
    pool.release(released);

    drop(pool);

    assert_eq!(counters.dropped(), 1);
    assert_eq!(kept.value, 1);
}

#[test]
#[should_panic(expected = "MustNotDropItems")]
fn teardown_with_outstanding_instance_panics_under_strict_policy() {
    let pool = LocalObjectPool::<u32>::builder()
        .drop_policy(DropPolicy::MustNotDropItems)
        .build();

    let _item = pool.acquire(1);

    drop(pool);
}

#[test]
fn teardown_drops_every_released_instance() {
    let counters = LifecycleCounters::new();

    {
        let pool = LocalObjectPool::builder()
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        for i in 0..8 {
            let item = pool.acquire(LifecycleProbe::new(&counters, i));
            pool.release(item);
        }

        // Each acquire after the first reused the same slot, dropping its previous contents.
        assert_eq!(pool.allocated_count(), 1);
        assert_eq!(counters.alive(), 1);
    }

    assert_eq!(counters.alive(), 0);
}

#[test]
fn memory_estimate_tracks_growth() {
    let pool = LocalObjectPool::<[u64; 32]>::new();
    assert_eq!(pool.estimate_memory_use(), 0);

    pool.prewarm(4);
    let four = pool.estimate_memory_use();
    assert!(four >= 4 * 256);

    pool.prewarm(8);
    assert!(pool.estimate_memory_use() > four);

    pool.clear();
    assert_eq!(pool.estimate_memory_use(), 0);
}

#[test]
fn pool_is_shareable_through_arc() {
    let pool = Arc::new(ObjectPool::<String>::new());
    let clone = Arc::clone(&pool);

    let item = clone.acquire("via clone".to_string());
    pool.release(item);

    assert_eq!(pool.free_count(), 1);
}
