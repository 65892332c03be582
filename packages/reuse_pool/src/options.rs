use crate::DropPolicy;

/// The initial capacity used by [`ObjectPool::new()`][crate::ObjectPool::new] and
/// [`LocalObjectPool::new()`][crate::LocalObjectPool::new].
pub(crate) const DEFAULT_INITIAL_CAPACITY: usize = 32;

/// Whether a pool scans its free list on every release to detect double releases.
///
/// Ownership of a released handle (that it was issued by this pool and points to a slot the
/// pool still owns) is always verified because that check is O(1). Detecting a double release
/// requires a linear scan of the free list, which is what this setting controls.
///
/// The default is [`Enabled`][Self::Enabled] in builds with debug assertions and
/// [`Disabled`][Self::Disabled] otherwise.
///
/// # Examples
///
/// ```
/// use reuse_pool::{LocalObjectPool, ReleaseValidation};
///
/// let pool = LocalObjectPool::<String>::builder()
///     .validation(ReleaseValidation::Enabled)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReleaseValidation {
    /// Every release scans the free list and rejects a slot that is already in it.
    Enabled,

    /// Releases skip the free list scan.
    Disabled,
}

impl Default for ReleaseValidation {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

/// Configuration shared by both pool builders.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct PoolOptions {
    pub(crate) initial_capacity: usize,
    pub(crate) validation: ReleaseValidation,
    pub(crate) drop_policy: DropPolicy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            validation: ReleaseValidation::default(),
            drop_policy: DropPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validation_follows_debug_assertions() {
        let expected = if cfg!(debug_assertions) {
            ReleaseValidation::Enabled
        } else {
            ReleaseValidation::Disabled
        };

        assert_eq!(ReleaseValidation::default(), expected);
    }

    #[test]
    fn default_options() {
        let options = PoolOptions::default();

        assert_eq!(options.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert_eq!(options.drop_policy, DropPolicy::MayDropItems);
    }
}
