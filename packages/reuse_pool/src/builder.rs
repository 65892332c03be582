use std::marker::PhantomData;

use crate::{DropPolicy, ObjectPool, PoolOptions, ReleaseValidation};

/// Builder for creating an instance of [`ObjectPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`ObjectPool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use reuse_pool::{DropPolicy, ObjectPool};
///
/// let pool = ObjectPool::<u32>::builder()
///     .initial_capacity(256)
///     .drop_policy(DropPolicy::MayDropItems)
///     .build();
/// ```
///
/// [1]: ObjectPool::new
#[must_use]
pub struct ObjectPoolBuilder<T> {
    options: PoolOptions,

    _item: PhantomData<T>,
}

impl<T> std::fmt::Debug for ObjectPoolBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPoolBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("options", &self.options)
            .finish()
    }
}

impl<T> ObjectPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            options: PoolOptions::default(),
            _item: PhantomData,
        }
    }

    /// Sets how many instances the pool reserves bookkeeping space for up front.
    ///
    /// This is a performance hint, not a limit, and no instances are constructed eagerly.
    /// Zero skips the reservation. Defaults to 32.
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.options.initial_capacity = initial_capacity;
        self
    }

    /// Sets whether releases scan the free list to detect double releases.
    ///
    /// See [`ReleaseValidation`] for the default.
    pub fn validation(mut self, validation: ReleaseValidation) -> Self {
        self.options.validation = validation;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat instances
    /// that are still checked out when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.options.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{ObjectPool, Pool};
    ///
    /// let pool = ObjectPool::<u32>::builder().build();
    /// assert_eq!(pool.allocated_count(), 0);
    /// ```
    #[must_use]
    pub fn build(self) -> ObjectPool<T> {
        ObjectPool::from_options(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_are_recorded() {
        let builder = ObjectPool::<u8>::builder()
            .initial_capacity(5)
            .validation(ReleaseValidation::Disabled)
            .drop_policy(DropPolicy::MustNotDropItems);

        assert_eq!(
            builder.options,
            PoolOptions {
                initial_capacity: 5,
                validation: ReleaseValidation::Disabled,
                drop_policy: DropPolicy::MustNotDropItems,
            }
        );
    }

    #[test]
    fn debug_names_item_type() {
        let output = format!("{:?}", ObjectPool::<u16>::builder());

        assert!(output.contains("ObjectPoolBuilder"));
        assert!(output.contains("u16"));
    }
}
