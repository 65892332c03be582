use std::any::type_name;
use std::cell::RefCell;
use std::fmt;

use crate::raw::{self, RawObjectPool, StateLock};
use crate::{
    LocalObjectPoolBuilder, Pool, PoolOptions, PoolStats, Pooled, PooledMut, ReleaseError,
    release_failed,
};

/// A single-threaded object pool that recycles constructed instances of `T`.
///
/// Behaves exactly like [`ObjectPool`][crate::ObjectPool] but without any locking. The pool can
/// be moved to another thread if `T` is [`Send`] but it can never be shared between threads.
///
/// Constructors passed to [`acquire_with()`][Pool::acquire_with] may themselves use the pool,
/// because the pool's bookkeeping is not borrowed while they run.
///
/// The operations are provided through the [`Pool`] trait.
///
/// # Examples
///
/// ```
/// use reuse_pool::{LocalObjectPool, Pool};
///
/// let pool = LocalObjectPool::<String>::new();
///
/// let a = pool.acquire("first".to_string());
/// let a_slot = a.slot_index();
/// pool.release(a);
///
/// // The released slot is reused for the next acquire.
/// let b = pool.acquire("second".to_string());
/// assert_eq!(b.slot_index(), a_slot);
/// assert_eq!(&*b, "second");
///
/// assert_eq!(pool.allocated_count(), 1);
/// assert!((pool.reuse_rate() - 0.5).abs() < f64::EPSILON);
/// # pool.release(b);
/// ```
pub struct LocalObjectPool<T> {
    state: RefCell<RawObjectPool<T>>,
}

impl<T> LocalObjectPool<T> {
    /// Creates a new [`LocalObjectPool`] with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new [`LocalObjectPool`] that reserves bookkeeping space for `initial_capacity`
    /// instances up front.
    ///
    /// The capacity is a performance hint, not a limit. No instances are constructed.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{LocalObjectPool, Pool};
    ///
    /// let pool = LocalObjectPool::<u64>::with_capacity(1024);
    /// assert_eq!(pool.allocated_count(), 0);
    /// ```
    #[must_use]
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self::builder().initial_capacity(initial_capacity).build()
    }

    /// Starts building a new [`LocalObjectPool`].
    pub fn builder() -> LocalObjectPoolBuilder<T> {
        LocalObjectPoolBuilder::new()
    }

    #[must_use]
    pub(crate) fn from_options(options: PoolOptions) -> Self {
        Self {
            state: RefCell::new(RawObjectPool::new(options)),
        }
    }
}

impl<T> Default for LocalObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> for LocalObjectPool<T> {
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
        self.state.borrow().allocated_count()
    }

    fn free_count(&self) -> usize {
        self.state.borrow().free_count()
    }

    fn in_use_count(&self) -> usize {
        self.state.borrow().in_use_count()
    }

    fn stats(&self) -> PoolStats {
        self.state.borrow().stats()
    }

    fn reset_stats(&self) {
        self.state.borrow_mut().reset_stats();
    }

    fn clear(&self) {
        raw::clear(&self.state);
    }

    fn estimate_memory_use(&self) -> usize {
        self.state.borrow().estimate_memory_use()
    }
}

impl<T> fmt::Debug for LocalObjectPool<T> {
    #[cfg_attr(test, mutants::skip)] // Debug output is not a contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("state", &*self.state.borrow())
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
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::ReleaseValidation;

    assert_impl_all!(LocalObjectPool<String>: Send);
    assert_not_impl_any!(LocalObjectPool<String>: Sync);
    assert_not_impl_any!(LocalObjectPool<Rc<u8>>: Send, Sync);

    #[test]
    fn constructor_may_use_the_pool() {
        let pool = LocalObjectPool::<u32>::new();

        let outer = pool.acquire_with(|| {
            // Re-entrant use from inside a constructor must not hit a RefCell borrow conflict.
            let inner = pool.acquire(1);
            let value = *inner + 1;
            pool.release(inner);
            value
        });

        assert_eq!(*outer, 2);
        assert_eq!(pool.allocated_count(), 2);
        assert_eq!(pool.free_count(), 1);

        pool.release(outer);
    }

    #[test]
    fn released_instances_are_dropped_by_clear() {
        struct CountsDrops(Rc<Cell<u32>>);

        impl Drop for CountsDrops {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let pool = LocalObjectPool::<CountsDrops>::new();

        let a = pool.acquire(CountsDrops(Rc::clone(&drops)));
        let b = pool.acquire(CountsDrops(Rc::clone(&drops)));
        pool.release(a);
        pool.release(b);

        // Release does not drop.
        assert_eq!(drops.get(), 0);

        pool.clear();
        assert_eq!(drops.get(), 2);
    }

    #[test]
    #[should_panic(expected = "double release")]
    fn double_release_panics_when_validating() {
        let pool = LocalObjectPool::<u32>::builder()
            .validation(ReleaseValidation::Enabled)
            .build();

        let shared = pool.acquire(1).into_shared();

        unsafe {
            pool.release_shared(shared);
            pool.release_shared(shared);
        }
    }

    #[test]
    #[should_panic(expected = "does not belong to this pool")]
    fn shared_release_to_other_pool_panics() {
        let pool = LocalObjectPool::<u32>::new();
        let other = LocalObjectPool::<u32>::new();

        let shared = other.acquire(1).into_shared();

        unsafe { pool.release_shared(shared) };
    }

    #[test]
    fn failed_release_leaves_state_untouched() {
        let pool = LocalObjectPool::<u32>::new();
        let other = LocalObjectPool::<u32>::new();

        let ours = pool.acquire(1);
        let before = pool.stats();

        assert!(pool.try_release(other.acquire(2)).is_err());

        assert_eq!(pool.stats(), before);
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.in_use_count(), 1);
        pool.state.borrow().assert_invariants();

        pool.release(ours);
    }

    #[test]
    fn default_is_empty() {
        let pool = LocalObjectPool::<u8>::default();

        assert_eq!(pool.allocated_count(), 0);
        assert_eq!(pool.stats(), PoolStats::default());
    }
}
