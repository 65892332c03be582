use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::Pooled;

/// Exclusive handle to an instance checked out of a pool.
///
/// Returned by the acquire methods of [`Pool`][crate::Pool]. The holder has exclusive access to
/// the instance until it hands the handle back via [`Pool::release()`][crate::Pool::release],
/// which consumes it. The handle cannot be copied or cloned, so a released instance can no longer
/// be reached through it.
///
/// The handle does not borrow the pool. The slot it points to stays allocated for as long as the
/// handle exists, even if the pool itself is dropped first (see
/// [`DropPolicy`][crate::DropPolicy]).
///
/// Dropping a handle without releasing it keeps the slot checked out for the rest of the pool's
/// lifetime.
///
/// # Examples
///
/// ```
/// use reuse_pool::{LocalObjectPool, Pool};
///
/// let pool = LocalObjectPool::<String>::new();
///
/// let mut greeting = pool.acquire("Hello".to_string());
/// greeting.push_str(", world");
/// assert_eq!(&*greeting, "Hello, world");
///
/// pool.release(greeting);
/// ```
#[must_use = "an acquired instance stays checked out until it is released to the pool"]
pub struct PooledMut<T> {
    /// Ensures this handle can only be returned to the pool it came from.
    pub(crate) pool_id: u64,

    pub(crate) slot_index: usize,

    pub(crate) ptr: NonNull<T>,
}

impl<T> PooledMut<T> {
    #[must_use]
    pub(crate) fn new(pool_id: u64, slot_index: usize, ptr: NonNull<T>) -> Self {
        Self {
            pool_id,
            slot_index,
            ptr,
        }
    }

    /// Returns a pointer to the instance.
    ///
    /// The pointer stays valid until the handle is released. The owner of the handle may create
    /// both shared and exclusive references through it.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Position of the slot in the pool's allocation order.
    ///
    /// Two handles with the same slot index from the same pool refer to the same storage, which
    /// is how reuse of a slot can be observed.
    #[must_use]
    #[inline]
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    /// Converts this exclusive handle to a shared handle that can be copied.
    ///
    /// Releasing a shared handle requires `unsafe` code because the pool cannot know whether
    /// copies of it are still in use.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{LocalObjectPool, Pool};
    ///
    /// let pool = LocalObjectPool::<u64>::new();
    ///
    /// let shared = pool.acquire(42).into_shared();
    /// let copy = shared;
    /// assert_eq!(*shared, *copy);
    ///
    /// // SAFETY: No copy of the handle is used after this and it is released only once.
    /// unsafe { pool.release_shared(copy) };
    /// ```
    #[inline]
    pub fn into_shared(self) -> Pooled<T> {
        Pooled::new(self.pool_id, self.slot_index, self.ptr)
    }
}

impl<T> Deref for PooledMut<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The slot holds a constructed T for as long as it is checked out and the pool
        // never touches a checked-out slot, so the handle is the only way to reach it.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for PooledMut<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: As in `deref()`, plus `&mut self` on an exclusive handle guarantees that no
        // other reference to the instance exists.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: fmt::Debug> fmt::Debug for PooledMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledMut")
            .field("pool_id", &self.pool_id)
            .field("slot_index", &self.slot_index)
            .field("value", &**self)
            .finish()
    }
}

// SAFETY: PooledMut<T> is an exclusive reference to a T that lives in its own heap allocation,
// so it can move between threads exactly when the T itself can.
unsafe impl<T: Send> Send for PooledMut<T> {}

// SAFETY: Sharing a PooledMut<T> only grants `&T`, which is thread-safe when T is Sync.
unsafe impl<T: Sync> Sync for PooledMut<T> {}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::Cell;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use crate::{LocalObjectPool, Pool, PooledMut};

    assert_impl_all!(PooledMut<String>: Send, Sync);
    assert_impl_all!(PooledMut<Cell<u8>>: Send);
    assert_not_impl_any!(PooledMut<Cell<u8>>: Sync);
    assert_not_impl_any!(PooledMut<*const u8>: Send, Sync);
    assert_not_impl_any!(PooledMut<u8>: Clone, Copy);

    #[test]
    fn deref_and_mutate() {
        let pool = LocalObjectPool::<Vec<u32>>::new();

        let mut item = pool.acquire(vec![1, 2]);
        item.push(3);

        assert_eq!(item.len(), 3);
        assert_eq!(unsafe { item.ptr().as_ref() }, &vec![1, 2, 3]);

        pool.release(item);
    }

    #[test]
    fn slot_index_follows_allocation_order() {
        let pool = LocalObjectPool::<u8>::new();

        let first = pool.acquire(1);
        let second = pool.acquire(2);

        assert_eq!(first.slot_index(), 0);
        assert_eq!(second.slot_index(), 1);

        pool.release(first);
        pool.release(second);
    }

    #[test]
    fn debug_output_includes_value() {
        let pool = LocalObjectPool::<u16>::new();

        let item = pool.acquire(515);
        let output = format!("{item:?}");

        assert!(output.contains("PooledMut"));
        assert!(output.contains("515"));

        pool.release(item);
    }
}
