use thiserror::Error;

/// A caller contract violation detected while returning an instance to a pool.
///
/// These indicate a bug in the calling code. [`Pool::release()`][1] turns them into a panic;
/// [`Pool::try_release()`][2] hands them back to the caller instead. Either way, the pool state
/// is left exactly as it was before the call.
///
/// [1]: crate::Pool::release
/// [2]: crate::Pool::try_release
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReleaseError {
    /// The handle was not issued by this pool, or was issued before the pool was last cleared.
    #[error(
        "released object does not belong to this pool (handle pool ID: {handle_pool_id}, slot {slot_index}; current pool ID: {pool_id})"
    )]
    ForeignObject {
        /// Identifier of the pool that issued the handle.
        handle_pool_id: u64,

        /// Slot index recorded in the handle.
        slot_index: usize,

        /// Identifier of the pool the handle was released to.
        pool_id: u64,
    },

    /// The slot is already in the free list.
    #[error("object in slot {slot_index} was already released (double release)")]
    DoubleFree {
        /// Index of the slot that was released twice.
        slot_index: usize,
    },
}
