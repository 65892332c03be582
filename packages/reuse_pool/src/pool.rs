use std::any::type_name;
use std::fmt;

use parking_lot::Mutex;

use crate::raw::{self, RawObjectPool, StateLock};
use crate::{
    ObjectPoolBuilder, Pool, PoolOptions, PoolStats, Pooled, PooledMut, ReleaseError, release_failed,
};

/// A thread-safe object pool that recycles constructed instances of `T`.
///
/// All operations take `&self`, so the pool can be shared between threads (for example via
/// [`std::sync::Arc`] or a scoped thread). The free list, the slot list and the counters are
/// guarded by a lightweight mutex that is held only while they are updated. Constructors and
/// destructors of `T` always run with the mutex released, which keeps lock hold times short but
/// means that constructors and destructors of different instances may run concurrently. `T`'s
/// constructor and destructor must therefore be safe to run in parallel on distinct instances.
///
/// The operations are provided through the [`Pool`] trait.
///
/// For single-threaded use, [`LocalObjectPool`][crate::LocalObjectPool] avoids the locking.
///
/// # Examples
///
/// ```
/// use std::thread;
///
/// use reuse_pool::{ObjectPool, Pool};
///
/// let pool = ObjectPool::<Vec<u8>>::new();
/// pool.prewarm(4);
///
/// thread::scope(|s| {
///     for _ in 0..4 {
///         s.spawn(|| {
///             let mut buffer = pool.acquire_default();
///             buffer.extend_from_slice(b"payload");
///             pool.release(buffer);
///         });
///     }
/// });
///
/// assert_eq!(pool.in_use_count(), 0);
/// assert_eq!(pool.stats().total_acquires, 8);
/// ```
///
/// # Thread safety
///
/// The pool is [`Send`] and [`Sync`] if `T` is [`Send`].
pub struct ObjectPool<T> {
    state: Mutex<RawObjectPool<T>>,
}

impl<T> ObjectPool<T> {
    /// Creates a new [`ObjectPool`] with the default configuration.
    ///
    /// The pool starts empty; no instances are constructed until the first acquire.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{ObjectPool, Pool};
    ///
    /// let pool = ObjectPool::<String>::new();
    ///
    /// assert_eq!(pool.allocated_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new [`ObjectPool`] that reserves bookkeeping space for `initial_capacity`
    /// instances up front.
    ///
    /// The capacity is a performance hint, not a limit. No instances are constructed.
    #[must_use]
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self::builder().initial_capacity(initial_capacity).build()
    }

    /// Starts building a new [`ObjectPool`].
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{DropPolicy, ObjectPool, ReleaseValidation};
    ///
    /// let pool = ObjectPool::<u32>::builder()
    ///     .initial_capacity(128)
    ///     .validation(ReleaseValidation::Enabled)
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn builder() -> ObjectPoolBuilder<T> {
        ObjectPoolBuilder::new()
    }

    #[must_use]
    pub(crate) fn from_options(options: PoolOptions) -> Self {
        Self {
            state: Mutex::new(RawObjectPool::new(options)),
        }
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> for ObjectPool<T> {
    fn acquire_with<F>(&self, constructor: F) -> PooledMut<T>
    where
        F: FnOnce() -> T,
    {
        raw::acquire_with(&self.state, constructor)
    }

    #[allow(
        clippy::needless_pass_by_value,
        reason = "PooledMut must be consumed to prevent reuse"
    )]
    fn try_release(&self, item: PooledMut<T>) -> Result<(), ReleaseError> {
        self.state
            .with_state(|raw| raw.release(item.pool_id, item.slot_index, item.ptr))
    }

    unsafe fn release_shared(&self, item: Pooled<T>) {
        let result = self
            .state
            .with_state(|raw| raw.release(item.pool_id, item.slot_index, item.ptr));

        if let Err(e) = result {
            release_failed(&e);
        }
    }

    fn allocated_count(&self) -> usize {
        self.state.lock().allocated_count()
    }

    fn free_count(&self) -> usize {
        self.state.lock().free_count()
    }

    fn in_use_count(&self) -> usize {
        self.state.lock().in_use_count()
    }

    fn stats(&self) -> PoolStats {
        self.state.lock().stats()
    }

    fn reset_stats(&self) {
        self.state.lock().reset_stats();
    }

    fn clear(&self) {
        raw::clear(&self.state);
    }

    fn estimate_memory_use(&self) -> usize {
        self.state.lock().estimate_memory_use()
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use testing::with_watchdog;

    use super::*;
    use crate::{DropPolicy, ReleaseValidation};

    assert_impl_all!(ObjectPool<String>: Send, Sync);
    assert_impl_all!(ObjectPool<Cell<u8>>: Send, Sync);
    assert_not_impl_any!(ObjectPool<*const u8>: Send, Sync);

    #[test]
    fn smoke_test() {
        let pool = ObjectPool::<String>::with_capacity(0);

        let a = pool.acquire("a".to_string());
        let b = pool.acquire("b".to_string());
        let c = pool.acquire("c".to_string());
        assert_eq!(pool.allocated_count(), 3);
        assert_eq!(pool.free_count(), 0);

        let b_slot = b.slot_index();
        pool.release(b);
        assert_eq!(pool.free_count(), 1);

        let d = pool.acquire("d".to_string());
        assert_eq!(d.slot_index(), b_slot);
        assert_eq!(pool.allocated_count(), 3);
        assert_eq!(pool.stats().reuse_count, 1);
        assert_eq!(pool.stats().total_acquires, 4);

        pool.release(a);
        pool.release(c);
        pool.release(d);
        pool.state.lock().assert_invariants();
    }

    #[test]
    #[should_panic(expected = "does not belong to this pool")]
    fn release_to_other_pool_panics() {
        let pool = ObjectPool::<u32>::new();
        let other = ObjectPool::<u32>::new();

        let item = other.acquire(1);
        pool.release(item);
    }

    #[test]
    #[should_panic(expected = "double release")]
    fn double_release_panics_when_validating() {
        let pool = ObjectPool::<u32>::builder()
            .validation(ReleaseValidation::Enabled)
            .build();

        let shared = pool.acquire(1).into_shared();

        unsafe {
            pool.release_shared(shared);
            pool.release_shared(shared);
        }
    }

    #[test]
    fn handle_from_before_clear_is_foreign() {
        let pool = ObjectPool::<u32>::new();

        let shared = pool.acquire(1).into_shared();
        unsafe { pool.release_shared(shared) };
        pool.clear();

        let result = pool.state.with_state(|raw| {
            raw.release(shared.pool_id, shared.slot_index, shared.ptr)
        });
        assert!(matches!(result, Err(ReleaseError::ForeignObject { .. })));
    }

    #[test]
    fn debug_output_shows_counts() {
        let pool = ObjectPool::<u32>::new();
        pool.prewarm(2);

        let output = format!("{pool:?}");
        assert!(output.contains("allocated: 2"));
        assert!(output.contains("free: 2"));
    }

    #[test]
    fn concurrent_acquire_release_keeps_invariants() {
        const THREADS: usize = 4;
        const ITERATIONS: usize = 500;

        with_watchdog(|| {
            let pool = Arc::new(ObjectPool::<Vec<usize>>::new());

            let workers = (0..THREADS)
                .map(|thread_index| {
                    let pool = Arc::clone(&pool);

                    thread::spawn(move || {
                        for i in 0..ITERATIONS {
                            let mut item = pool.acquire_with(Vec::new);
                            item.push(thread_index);
                            item.push(i);
                            assert_eq!(*item, vec![thread_index, i]);
                            pool.release(item);
                        }
                    })
                })
                .collect::<Vec<_>>();

            for worker in workers {
                worker.join().unwrap();
            }

            let stats = pool.stats();
            assert_eq!(stats.total_acquires, (THREADS * ITERATIONS) as u64);
            assert_eq!(stats.total_releases, (THREADS * ITERATIONS) as u64);
            assert!(pool.allocated_count() <= THREADS);
            assert_eq!(pool.in_use_count(), 0);
            pool.state.lock().assert_invariants();
        });
    }

    #[test]
    fn constructors_run_outside_the_lock() {
        // Two threads reuse two different free slots. Each constructor waits for the other one
        // to start, which can only happen if neither holds the pool lock while constructing.
        with_watchdog(|| {
            let pool = ObjectPool::<u64>::new();
            pool.prewarm(2);

            let barrier = Barrier::new(2);
            let slots = thread::scope(|s| {
                let handles = (0..2)
                    .map(|_| {
                        s.spawn(|| {
                            let item = pool.acquire_with(|| {
                                barrier.wait();
                                7
                            });
                            let slot_index = item.slot_index();
                            pool.release(item);
                            slot_index
                        })
                    })
                    .collect::<Vec<_>>();

                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .collect::<Vec<_>>()
            });

            assert_ne!(slots.first(), slots.get(1));
            assert_eq!(pool.allocated_count(), 2);
            assert_eq!(pool.stats().reuse_count, 2);
        });
    }

    #[test]
    fn destructors_of_replaced_contents_run_outside_the_lock() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct InspectsPool<'a> {
            pool: Option<&'a ObjectPool<InspectsPool<'a>>>,
        }

        impl Drop for InspectsPool<'_> {
            fn drop(&mut self) {
                if let Some(pool) = self.pool {
                    // Would deadlock if the pool lock were held during the drop.
                    _ = pool.free_count();
                    DROPS.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        with_watchdog(|| {
            let pool = Box::leak(Box::new(ObjectPool::<InspectsPool<'static>>::new()));
            let pool: &'static ObjectPool<InspectsPool<'static>> = pool;

            let first = pool.acquire(InspectsPool { pool: Some(pool) });
            pool.release(first);

            let second = pool.acquire(InspectsPool { pool: None });
            assert_eq!(DROPS.load(Ordering::Relaxed), 1);
            pool.release(second);
        });
    }

    #[test]
    fn shared_across_threads_with_drop_policy() {
        with_watchdog(|| {
            let pool = ObjectPool::<String>::builder()
                .drop_policy(DropPolicy::MustNotDropItems)
                .build();

            thread::scope(|s| {
                for i in 0..4 {
                    let pool = &pool;
                    s.spawn(move || {
                        let item = pool.acquire(format!("worker {i}"));
                        assert!(item.starts_with("worker"));
                        pool.release(item);
                    });
                }
            });

            assert_eq!(pool.in_use_count(), 0);
        });
    }
}
