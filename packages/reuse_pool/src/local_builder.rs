use std::marker::PhantomData;

use crate::{DropPolicy, LocalObjectPool, PoolOptions, ReleaseValidation};

/// Builder for creating an instance of [`LocalObjectPool`].
///
/// Offers the same settings as [`ObjectPoolBuilder`][crate::ObjectPoolBuilder].
///
/// # Examples
///
/// ```
/// use reuse_pool::{LocalObjectPool, ReleaseValidation};
///
/// let pool = LocalObjectPool::<String>::builder()
///     .initial_capacity(0)
///     .validation(ReleaseValidation::Disabled)
///     .build();
/// ```
#[must_use]
pub struct LocalObjectPoolBuilder<T> {
    options: PoolOptions,

    _item: PhantomData<T>,
}

impl<T> std::fmt::Debug for LocalObjectPoolBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalObjectPoolBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("options", &self.options)
            .finish()
    }
}

impl<T> LocalObjectPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            options: PoolOptions::default(),
            _item: PhantomData,
        }
    }

    /// Sets how many instances the pool reserves bookkeeping space for up front.
    ///
    /// This is a performance hint, not a limit. Zero skips the reservation. Defaults to 32.
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.options.initial_capacity = initial_capacity;
        self
    }

    /// Sets whether releases scan the free list to detect double releases.
    pub fn validation(mut self, validation: ReleaseValidation) -> Self {
        self.options.validation = validation;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.options.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> LocalObjectPool<T> {
        LocalObjectPool::from_options(self.options)
    }
}
