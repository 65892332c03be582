use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;

/// Shared handle to an instance checked out of a pool.
///
/// Created from a [`PooledMut<T>`][crate::PooledMut] via
/// [`into_shared()`][crate::PooledMut::into_shared]. Shared handles can be copied freely and
/// only grant shared access to the instance.
///
/// Because copies may exist, returning a shared handle to the pool is `unsafe`: see
/// [`Pool::release_shared()`][crate::Pool::release_shared].
///
/// # Examples
///
/// ```
/// use reuse_pool::{ObjectPool, Pool};
///
/// let pool = ObjectPool::<String>::new();
///
/// let name = pool.acquire("shared".to_string()).into_shared();
/// let names = [name, name, name];
/// assert!(names.iter().all(|n| **n == "shared"));
///
/// // SAFETY: None of the copies is used after this and the instance is released only once.
/// unsafe { pool.release_shared(name) };
/// ```
pub struct Pooled<T> {
    pub(crate) pool_id: u64,

    pub(crate) slot_index: usize,

    pub(crate) ptr: NonNull<T>,
}

impl<T> Pooled<T> {
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
    /// Only shared references may be created through it while copies of the handle exist.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Position of the slot in the pool's allocation order.
    #[must_use]
    #[inline]
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }
}

impl<T> Clone for Pooled<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Pooled<T> {}

impl<T> Deref for Pooled<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The slot holds a constructed T until one of the copies is released, and the
        // release contract forbids using any copy after that.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("pool_id", &self.pool_id)
            .field("slot_index", &self.slot_index)
            .field("value", &**self)
            .finish()
    }
}

// SAFETY: Pooled<T> behaves like `&T`, which is Send when T is Sync.
unsafe impl<T: Sync> Send for Pooled<T> {}

// SAFETY: Pooled<T> behaves like `&T`, which is Sync when T is Sync.
unsafe impl<T: Sync> Sync for Pooled<T> {}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use crate::{LocalObjectPool, Pool, Pooled};

    assert_impl_all!(Pooled<String>: Send, Sync, Copy);
    assert_not_impl_any!(Pooled<Cell<u8>>: Send, Sync);

    #[test]
    fn copies_see_the_same_instance() {
        let pool = LocalObjectPool::<String>::new();

        let shared = pool.acquire("one".to_string()).into_shared();
        let copy = shared;

        assert_eq!(shared.ptr(), copy.ptr());
        assert_eq!(shared.slot_index(), copy.slot_index());
        assert_eq!(*copy, "one");

        // SAFETY: Released once, no copy used afterwards.
        unsafe { pool.release_shared(shared) };
        assert_eq!(pool.free_count(), 1);
    }
}
