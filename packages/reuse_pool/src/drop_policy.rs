/// Determines what happens to checked-out instances when a pool is dropped.
///
/// Instances sitting in the free list are always dropped together with the pool. This policy
/// only governs instances that a caller acquired and never released.
///
/// # Examples
///
/// ```
/// use reuse_pool::{DropPolicy, ObjectPool};
///
/// let pool = ObjectPool::<u32>::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Instances that are still checked out when the pool is dropped are leaked: they are
    /// neither dropped nor deallocated, so any handle that still points to them stays valid.
    /// This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if any instance is still checked out when the pool is dropped.
    ///
    /// This is valuable when every acquire is expected to be paired with a release and an
    /// imbalance indicates a bug in the caller.
    MustNotDropItems,
}
