use std::iter;

use tracing::{debug, error};

use crate::{PoolStats, Pooled, PooledMut, ReleaseError};

/// The operations shared by [`ObjectPool`][crate::ObjectPool] and
/// [`LocalObjectPool`][crate::LocalObjectPool].
///
/// A pool hands out constructed instances of `T` and takes them back for reuse. Slots are
/// allocated when an acquire finds the free list empty and are only deallocated when the pool is
/// cleared or dropped. A released instance is not dropped at release time; its contents are
/// replaced (and the old contents dropped) when the slot is next acquired, or dropped when the
/// pool is cleared or dropped.
///
/// Reuse is last-in-first-out: the most recently released slot is the next one to be reused.
///
/// # Examples
///
/// Code that only needs pooling can be written once for both variants:
///
/// ```
/// use reuse_pool::{LocalObjectPool, ObjectPool, Pool};
///
/// fn render_frame(pool: &impl Pool<Vec<u8>>) -> usize {
///     let mut scratch = pool.acquire_with(|| Vec::with_capacity(1024));
///     scratch.extend_from_slice(b"frame");
///     let len = scratch.len();
///     pool.release(scratch);
///     len
/// }
///
/// assert_eq!(render_frame(&LocalObjectPool::new()), 5);
/// assert_eq!(render_frame(&ObjectPool::new()), 5);
/// ```
pub trait Pool<T> {
    /// Checks out an instance constructed by `constructor`.
    ///
    /// If a released slot is available, the most recently released one is reused: the
    /// constructor's value replaces the slot's previous contents, which are dropped. Otherwise a
    /// new slot is allocated for the value.
    ///
    /// The constructor (and the destructor of the replaced contents) run without any pool lock
    /// held. On a thread-safe pool, constructors and destructors of different instances may
    /// therefore run concurrently on different threads.
    ///
    /// If the constructor panics, the pool is left as it was before the call and the panic
    /// propagates.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{LocalObjectPool, Pool};
    ///
    /// let pool = LocalObjectPool::<Vec<u32>>::new();
    ///
    /// let buffer = pool.acquire_with(|| Vec::with_capacity(16));
    /// assert!(buffer.capacity() >= 16);
    /// # pool.release(buffer);
    /// ```
    fn acquire_with<F>(&self, constructor: F) -> PooledMut<T>
    where
        F: FnOnce() -> T;

    /// Checks out an instance holding `value`.
    ///
    /// See [`acquire_with()`][Self::acquire_with] for how slots are chosen.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{LocalObjectPool, Pool};
    ///
    /// let pool = LocalObjectPool::<u64>::with_capacity(0);
    ///
    /// let a = pool.acquire(1);
    /// let b = pool.acquire(2);
    /// assert_eq!(pool.allocated_count(), 2);
    ///
    /// pool.release(b);
    ///
    /// // The released slot is reused instead of allocating a new one.
    /// let c = pool.acquire(3);
    /// assert_eq!(pool.allocated_count(), 2);
    /// assert_eq!(*c, 3);
    /// # pool.release(a);
    /// # pool.release(c);
    /// ```
    fn acquire(&self, value: T) -> PooledMut<T> {
        self.acquire_with(|| value)
    }

    /// Checks out an instance holding `T::default()`.
    fn acquire_default(&self) -> PooledMut<T>
    where
        T: Default,
    {
        self.acquire_with(T::default)
    }

    /// Returns an instance to the pool, making its slot available for reuse.
    ///
    /// The instance is not dropped now. It stays constructed in the pool until its slot is
    /// reused, or until the pool is cleared or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::ForeignObject`] if the handle was not issued by this pool, or was
    /// issued before the pool was last cleared. The handle is consumed either way; a foreign
    /// instance stays owned by the pool that issued it.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{LocalObjectPool, Pool, ReleaseError};
    ///
    /// let pool = LocalObjectPool::<u8>::new();
    /// let other = LocalObjectPool::<u8>::new();
    ///
    /// let item = other.acquire(1);
    ///
    /// assert!(matches!(
    ///     pool.try_release(item),
    ///     Err(ReleaseError::ForeignObject { .. })
    /// ));
    /// ```
    fn try_release(&self, item: PooledMut<T>) -> Result<(), ReleaseError>;

    /// Returns an instance to the pool, making its slot available for reuse.
    ///
    /// The instance is not dropped now. It stays constructed in the pool until its slot is
    /// reused, or until the pool is cleared or dropped.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this pool, or was issued before the pool was last
    /// cleared. Such a release is a bug in the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{LocalObjectPool, Pool};
    ///
    /// let pool = LocalObjectPool::<String>::new();
    ///
    /// let name = pool.acquire("Alice".to_string());
    /// assert_eq!(pool.in_use_count(), 1);
    ///
    /// pool.release(name);
    /// assert_eq!(pool.in_use_count(), 0);
    /// assert_eq!(pool.free_count(), 1);
    /// ```
    fn release(&self, item: PooledMut<T>) {
        if let Err(e) = self.try_release(item) {
            release_failed(&e);
        }
    }

    /// Returns an instance to the pool through a shared handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this pool, or was issued before the pool was last
    /// cleared. If release validation is enabled, also panics if the instance is already in the
    /// free list.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that none of the copies of `item` are used after this call and
    /// that the instance is released only once. Without release validation, releasing the same
    /// instance twice corrupts the free list, causing the slot to be handed out twice.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{LocalObjectPool, Pool};
    ///
    /// let pool = LocalObjectPool::<u32>::new();
    ///
    /// let shared = pool.acquire(5).into_shared();
    /// let copy = shared;
    /// assert_eq!(*copy, 5);
    ///
    /// // SAFETY: The copies are not used afterwards and this is the only release.
    /// unsafe { pool.release_shared(shared) };
    /// ```
    unsafe fn release_shared(&self, item: Pooled<T>);

    /// Number of slots the pool has allocated, whether free or in use.
    #[must_use]
    fn allocated_count(&self) -> usize;

    /// Number of constructed instances waiting in the free list.
    #[must_use]
    fn free_count(&self) -> usize;

    /// Number of instances currently checked out.
    ///
    /// Computed from a single consistent view of the pool, even under concurrent use.
    #[must_use]
    fn in_use_count(&self) -> usize;

    /// A snapshot of the pool's usage counters.
    #[must_use]
    fn stats(&self) -> PoolStats;

    /// Share of acquires that were satisfied by reusing a slot, in the range `[0, 1]`.
    ///
    /// Returns 0 if nothing has been acquired since creation or the last reset.
    #[must_use]
    fn reuse_rate(&self) -> f64 {
        self.stats().reuse_rate()
    }

    /// Zeroes the usage counters without touching any instances.
    fn reset_stats(&self);

    /// Drops every instance and deallocates every slot, resetting the counters.
    ///
    /// Handles issued before the clear are considered foreign afterwards.
    ///
    /// # Panics
    ///
    /// Panics if any instance is still checked out.
    ///
    /// If the destructor of an instance panics, the remaining instances are still dropped and the
    /// pool is left empty before the panic propagates.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{ObjectPool, Pool};
    ///
    /// let pool = ObjectPool::<String>::new();
    /// pool.prewarm(8);
    /// assert_eq!(pool.allocated_count(), 8);
    ///
    /// pool.clear();
    /// assert_eq!(pool.allocated_count(), 0);
    /// assert_eq!(pool.stats().total_acquires, 0);
    /// ```
    fn clear(&self);

    /// Fills the free list with `count` default-constructed instances.
    ///
    /// Acquires `count` instances and then releases all of them, so existing free slots are
    /// reused first and only the remainder is newly allocated. Useful ahead of a
    /// latency-sensitive phase. The counters record the acquires and releases as usual.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{LocalObjectPool, Pool};
    ///
    /// let pool = LocalObjectPool::<[u8; 32]>::new();
    /// pool.prewarm(16);
    ///
    /// assert_eq!(pool.allocated_count(), 16);
    /// assert_eq!(pool.free_count(), 16);
    /// assert_eq!(pool.in_use_count(), 0);
    /// ```
    fn prewarm(&self, count: usize)
    where
        T: Default,
    {
        let instances = iter::repeat_with(|| self.acquire_default())
            .take(count)
            .collect::<Vec<_>>();

        for instance in instances {
            self.release(instance);
        }

        debug!(
            count,
            allocated = self.allocated_count(),
            "prewarmed pool"
        );
    }

    /// Approximate number of bytes used by the instances and the pool's bookkeeping.
    ///
    /// Does not account for allocator overhead, spare vector capacity or heap memory owned by
    /// the instances themselves.
    #[must_use]
    fn estimate_memory_use(&self) -> usize;
}

/// Reports a caller contract violation. The pool state has not been modified.
#[cold]
pub(crate) fn release_failed(error: &ReleaseError) -> ! {
    error!(%error, "invalid release to object pool");

    panic!("{error}");
}
