//! Thread-safety behavior of `ObjectPool`.
//!
//! The pool lock covers only free list and counter bookkeeping. Constructors and destructors of
//! pooled values run unlocked, so they may interleave arbitrarily across threads. These tests
//! pin that behavior down.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use reuse_pool::{ObjectPool, Pool};
use testing::{LifecycleCounters, LifecycleProbe, with_watchdog};

const THREADS: usize = 4;

/// Runs one acquire per thread with a constructor that waits until every thread is inside its
/// constructor at the same time. Returns the highest number of constructors seen running at once.
fn max_concurrent_constructors(pool: &Arc<ObjectPool<u64>>) -> usize {
    let barrier = Arc::new(Barrier::new(THREADS));
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));

    let workers = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(pool);
            let barrier = Arc::clone(&barrier);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);

            thread::spawn(move || {
                let item = pool.acquire_with(|| {
                    let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now_active, Ordering::SeqCst);

                    // Deadlocks (and trips the watchdog) if construction were serialized.
                    barrier.wait();

                    active.fetch_sub(1, Ordering::SeqCst);
                    42
                });

                assert_eq!(*item, 42);
                pool.release(item);
            })
        })
        .collect::<Vec<_>>();

    for worker in workers {
        worker.join().unwrap();
    }

    max_active.load(Ordering::SeqCst)
}

#[test]
fn constructors_overlap_when_growing() {
    with_watchdog(|| {
        let pool = Arc::new(ObjectPool::<u64>::new());

        assert_eq!(max_concurrent_constructors(&pool), THREADS);
        assert_eq!(pool.allocated_count(), THREADS);
        assert_eq!(pool.stats().reuse_count, 0);
    });
}

#[test]
fn constructors_overlap_when_reusing() {
    with_watchdog(|| {
        let pool = Arc::new(ObjectPool::<u64>::new());
        pool.prewarm(THREADS);

        assert_eq!(max_concurrent_constructors(&pool), THREADS);

        // Every thread reused a distinct free slot, nothing new was allocated.
        assert_eq!(pool.allocated_count(), THREADS);
        assert_eq!(pool.stats().reuse_count, THREADS as u64);
    });
}

#[test]
fn hammering_keeps_bookkeeping_consistent() {
    const ITERATIONS: u64 = 1_000;

    with_watchdog(|| {
        let counters = LifecycleCounters::new();
        let pool = Arc::new(ObjectPool::<LifecycleProbe>::new());

        let workers = (0..THREADS)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let counters = Arc::clone(&counters);

                thread::spawn(move || {
                    for i in 0..ITERATIONS {
                        let first = pool.acquire_with(|| LifecycleProbe::new(&counters, i));
                        let second = pool.acquire_with(|| LifecycleProbe::new(&counters, i + 1));

                        assert_eq!(first.value, i);
                        assert_eq!(second.value, i + 1);

                        pool.release(second);
                        pool.release(first);
                    }
                })
            })
            .collect::<Vec<_>>();

        for worker in workers {
            worker.join().unwrap();
        }

        let stats = pool.stats();
        let expected_acquires = 2 * ITERATIONS * THREADS as u64;

        assert_eq!(stats.total_acquires, expected_acquires);
        assert_eq!(stats.total_releases, expected_acquires);
        assert!(stats.reuse_count <= stats.total_acquires);
        assert_eq!(
            stats.reuse_count,
            expected_acquires - pool.allocated_count() as u64
        );

        assert_eq!(pool.in_use_count(), 0);
        assert!(pool.allocated_count() <= 2 * THREADS);

        // Every constructed value is either alive in a slot or was dropped by a reuse.
        assert_eq!(counters.alive(), pool.allocated_count());

        pool.clear();
        assert_eq!(counters.alive(), 0);
    });
}

#[test]
fn handles_move_between_threads() {
    with_watchdog(|| {
        let pool = Arc::new(ObjectPool::<String>::new());

        let item = pool.acquire("made on main".to_string());

        let returned = {
            let pool = Arc::clone(&pool);

            thread::spawn(move || {
                let mut item = item;
                item.push_str(", edited on worker");
                let text = item.clone();
                pool.release(item);
                text
            })
            .join()
            .unwrap()
        };

        assert_eq!(returned, "made on main, edited on worker");
        assert_eq!(pool.free_count(), 1);
    });
}
