use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use scopeguard::ScopeGuard;
use tracing::{debug, trace};

use crate::{DropPolicy, PoolOptions, PoolStats, PooledMut, ReleaseError, ReleaseValidation};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The bookkeeping shared by both pool variants: the slots, the free list and the counters.
///
/// This type knows nothing about locking. The public pools wrap it in a [`StateLock`] and only
/// ever touch it through short critical sections; constructors and destructors of `T` run
/// outside of those sections (see [`acquire_with()`] and [`clear()`]).
///
/// Every slot is a separate heap allocation, so the address of an instance never changes even
/// when `all_instances` reallocates. Slots are only deallocated by [`clear()`] and by dropping
/// the pool, never by a release.
pub(crate) struct RawObjectPool<T> {
    /// Identifies the pool (and its current generation, as `clear()` assigns a new one) so
    /// that handles can only be returned to the pool that issued them.
    pool_id: u64,

    /// Every slot the pool has allocated since creation or the last clear, in allocation order.
    /// Each slot holds a constructed `T` at all times.
    all_instances: Vec<NonNull<T>>,

    /// Indexes into `all_instances` of the slots available for reuse. Used as a stack, so the
    /// most recently released slot is reused first.
    free_instances: Vec<usize>,

    options: PoolOptions,

    stats: PoolStats,

    /// Incremented whenever `stats` is zeroed, so an acquire that is being undone can tell
    /// whether its counter increments are still part of `stats`.
    stats_generation: u64,
}

impl<T> RawObjectPool<T> {
    pub(crate) fn new(options: PoolOptions) -> Self {
        let mut raw = Self {
            pool_id: generate_pool_id(),
            all_instances: Vec::new(),
            free_instances: Vec::new(),
            options,
            stats: PoolStats::default(),
            stats_generation: 0,
        };

        raw.reserve_initial_capacity();
        raw
    }

    pub(crate) fn allocated_count(&self) -> usize {
        self.all_instances.len()
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free_instances.len()
    }

    pub(crate) fn in_use_count(&self) -> usize {
        self.all_instances
            .len()
            .checked_sub(self.free_instances.len())
            .expect("the free list can never be longer than the list of allocated slots")
    }

    pub(crate) fn stats(&self) -> PoolStats {
        self.stats
    }

    #[cfg_attr(test, mutants::skip)] // Reservation is a hint, growth works without it.
    fn reserve_initial_capacity(&mut self) {
        if self.options.initial_capacity > 0 {
            self.all_instances.reserve(self.options.initial_capacity);
            self.free_instances.reserve(self.options.initial_capacity);
        }
    }

    pub(crate) fn reset_stats(&mut self) {
        debug!(pool_id = self.pool_id, stats = ?self.stats, "resetting pool statistics");

        self.stats = PoolStats::default();
        self.stats_generation = self.stats_generation.wrapping_add(1);
    }

    pub(crate) fn estimate_memory_use(&self) -> usize {
        let allocated = self.all_instances.len();
        let free = self.free_instances.len();

        size_of::<T>()
            .saturating_mul(allocated)
            .saturating_add(size_of::<NonNull<T>>().saturating_mul(allocated))
            .saturating_add(size_of::<usize>().saturating_mul(free))
    }

    /// Pops the most recently released slot, if there is one, and counts a reusing acquire.
    ///
    /// The returned handle still points to the previous contents of the slot. The caller is
    /// responsible for replacing them. The second value is the stats generation the acquire was
    /// counted in, to be passed back to `restore_free_slot()` if the acquire is abandoned.
    fn take_free_slot(&mut self) -> Option<(PooledMut<T>, u64)> {
        let slot_index = self.free_instances.pop()?;

        let ptr = *self
            .all_instances
            .get(slot_index)
            .expect("free list only contains indexes of allocated slots");

        // A u64 counter incremented once per operation cannot realistically overflow.
        self.stats.total_acquires = self.stats.total_acquires.wrapping_add(1);
        self.stats.reuse_count = self.stats.reuse_count.wrapping_add(1);

        Some((
            PooledMut::new(self.pool_id, slot_index, ptr),
            self.stats_generation,
        ))
    }

    /// Puts a slot taken via `take_free_slot()` back on the free list and uncounts the acquire.
    ///
    /// Used when the constructor for the new contents panicked, in which case the slot still
    /// holds its previous contents. If the stats were reset since the acquire was counted, the
    /// acquire is no longer part of them and the counters are left alone.
    fn restore_free_slot(&mut self, slot_index: usize, stats_generation: u64) {
        debug_assert!(slot_index < self.all_instances.len());

        self.free_instances.push(slot_index);

        if stats_generation == self.stats_generation {
            self.stats.total_acquires = self.stats.total_acquires.wrapping_sub(1);
            self.stats.reuse_count = self.stats.reuse_count.wrapping_sub(1);
        }
    }

    /// Puts a slot whose acquire completed back on the free list, counting it as released.
    ///
    /// Used when dropping the previous contents of a reused slot panicked after the new contents
    /// were already in place. The caller never received the handle, so the slot is returned on
    /// its behalf.
    fn return_abandoned_slot(&mut self, slot_index: usize) {
        debug_assert!(slot_index < self.all_instances.len());

        self.free_instances.push(slot_index);
        self.stats.total_releases = self.stats.total_releases.wrapping_add(1);
    }

    /// Takes ownership of a newly allocated slot and counts a growing acquire.
    fn adopt_slot(&mut self, ptr: NonNull<T>) -> PooledMut<T> {
        let slot_index = self.all_instances.len();
        self.all_instances.push(ptr);

        self.stats.total_acquires = self.stats.total_acquires.wrapping_add(1);

        trace!(
            pool_id = self.pool_id,
            slot_index,
            item_type = type_name::<T>(),
            "allocated new pool slot"
        );

        PooledMut::new(self.pool_id, slot_index, ptr)
    }

    /// Records a checked-out slot as free again.
    ///
    /// Ownership is always verified. The free list is scanned for a double release only if
    /// validation is enabled. On error, the pool state is unchanged.
    pub(crate) fn release(
        &mut self,
        pool_id: u64,
        slot_index: usize,
        ptr: NonNull<T>,
    ) -> Result<(), ReleaseError> {
        let owned = pool_id == self.pool_id && self.all_instances.get(slot_index) == Some(&ptr);

        if !owned {
            return Err(ReleaseError::ForeignObject {
                handle_pool_id: pool_id,
                slot_index,
                pool_id: self.pool_id,
            });
        }

        if self.options.validation == ReleaseValidation::Enabled
            && self.free_instances.contains(&slot_index)
        {
            return Err(ReleaseError::DoubleFree { slot_index });
        }

        self.free_instances.push(slot_index);
        self.stats.total_releases = self.stats.total_releases.wrapping_add(1);

        Ok(())
    }

    /// Empties the pool and hands all of its slots to the caller for deallocation.
    ///
    /// # Panics
    ///
    /// Panics if any slot is still checked out.
    fn detach_all(&mut self) -> Vec<NonNull<T>> {
        assert!(
            self.in_use_count() == 0,
            "cannot clear a pool while {} of its instances are still in use",
            self.in_use_count()
        );

        debug!(
            pool_id = self.pool_id,
            allocated = self.all_instances.len(),
            "clearing pool"
        );

        let detached = std::mem::take(&mut self.all_instances);
        self.free_instances.clear();
        self.reserve_initial_capacity();

        // Any handle from before the clear now refers to memory we no longer own.
        self.pool_id = generate_pool_id();
        self.stats = PoolStats::default();
        self.stats_generation = self.stats_generation.wrapping_add(1);

        detached
    }

    #[cfg(test)]
    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Checks the data model invariants. For use in tests only.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert!(self.free_instances.len() <= self.all_instances.len());
        assert!(self.stats.reuse_count <= self.stats.total_acquires);

        let mut seen = vec![false; self.all_instances.len()];

        for &slot_index in &self.free_instances {
            let seen_before = seen
                .get_mut(slot_index)
                .expect("free list entry must refer to an allocated slot");

            assert!(!*seen_before, "slot {slot_index} is in the free list twice");
            *seen_before = true;
        }
    }
}

impl<T> Drop for RawObjectPool<T> {
    fn drop(&mut self) {
        let in_use = self.in_use_count();

        if self.options.drop_policy == DropPolicy::MustNotDropItems {
            assert!(
                in_use == 0,
                "dropped a pool with {in_use} instances still in use, which is forbidden by DropPolicy::MustNotDropItems"
            );
        }

        debug!(
            pool_id = self.pool_id,
            allocated = self.all_instances.len(),
            leaked = in_use,
            stats = ?self.stats,
            "dropping pool"
        );

        if in_use == 0 {
            deallocate_slots(std::mem::take(&mut self.all_instances));
            return;
        }

        // Slots still checked out stay allocated (and constructed) so that outstanding handles
        // remain valid. Only the free ones are released.
        let free_slots = self
            .free_instances
            .iter()
            .filter_map(|&slot_index| self.all_instances.get(slot_index).copied())
            .collect::<Vec<_>>();

        deallocate_slots(free_slots);
    }
}

impl<T> fmt::Debug for RawObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("pool_id", &self.pool_id)
            .field("allocated", &self.all_instances.len())
            .field("free", &self.free_instances.len())
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish()
    }
}

// SAFETY: The pool owns its slots exclusively, so moving it to another thread moves the T
// values with it. That is sound whenever T is Send.
unsafe impl<T: Send> Send for RawObjectPool<T> {}

/// Drops the contents of the given slots and returns their memory to the allocator.
///
/// If the destructor of one instance panics, the remaining instances are still dropped before the
/// panic propagates.
fn deallocate_slots<T>(slots: Vec<NonNull<T>>) {
    let boxed = slots
        .into_iter()
        .map(|ptr| {
            // SAFETY: Every slot was created by `Box::leak()` in `acquire_with()` and the caller
            // hands us exclusive ownership of it, so turning it back into a box is sound.
            unsafe { Box::from_raw(ptr.as_ptr()) }
        })
        .collect::<Vec<_>>();

    // Dropping a Vec keeps dropping the later elements when an earlier one panics.
    drop(boxed);
}

/// Grants exclusive access to a [`RawObjectPool`] for the duration of a closure.
///
/// This is the seam where the two pool variants differ: the single-threaded one borrows a
/// `RefCell`, the thread-safe one takes a mutex. Everything else is shared.
pub(crate) trait StateLock<T> {
    fn with_state<R>(&self, f: impl FnOnce(&mut RawObjectPool<T>) -> R) -> R;
}

impl<T> StateLock<T> for RefCell<RawObjectPool<T>> {
    #[inline]
    fn with_state<R>(&self, f: impl FnOnce(&mut RawObjectPool<T>) -> R) -> R {
        f(&mut self.borrow_mut())
    }
}

impl<T> StateLock<T> for Mutex<RawObjectPool<T>> {
    #[inline]
    fn with_state<R>(&self, f: impl FnOnce(&mut RawObjectPool<T>) -> R) -> R {
        f(&mut self.lock())
    }
}

/// Checks out an instance, reusing the most recently released slot if there is one.
///
/// The state lock is held only while the free list and counters are updated. The constructor,
/// and the destructor of a reused slot's previous contents, run with the lock released, so they
/// may run concurrently with other pool operations (including constructors of other instances
/// of the same pool on other threads).
///
/// On the reuse path the new value is constructed before the previous contents are dropped. If
/// the constructor panics, the slot goes back on the free list with its previous contents intact.
/// If dropping the previous contents panics, the slot goes back on the free list holding the new
/// value, as if the caller had acquired and immediately released it.
pub(crate) fn acquire_with<T, L>(state: &L, constructor: impl FnOnce() -> T) -> PooledMut<T>
where
    L: StateLock<T>,
{
    if let Some((recycled, stats_generation)) = state.with_state(RawObjectPool::take_free_slot) {
        let recycled = scopeguard::guard(recycled, |recycled| {
            state.with_state(|raw| raw.restore_free_slot(recycled.slot_index, stats_generation));
        });

        let value = constructor();

        let recycled = ScopeGuard::into_inner(recycled);

        // SAFETY: The slot was just taken off the free list, so nobody else can reach it, and
        // it holds a constructed T that we are allowed to replace.
        let previous = unsafe { recycled.ptr.as_ptr().replace(value) };

        let recycled = scopeguard::guard(recycled, |recycled| {
            state.with_state(|raw| raw.return_abandoned_slot(recycled.slot_index));
        });

        drop(previous);

        return ScopeGuard::into_inner(recycled);
    }

    let value = constructor();

    // Allocation failure is fatal here, as it is for any Box.
    let ptr = NonNull::from(Box::leak(Box::new(value)));

    state.with_state(|raw| raw.adopt_slot(ptr))
}

/// Empties the pool. The instances are dropped after the state lock has been released.
pub(crate) fn clear<T, L>(state: &L)
where
    L: StateLock<T>,
{
    let detached = state.with_state(RawObjectPool::detach_all);
    deallocate_slots(detached);
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    use super::*;

    fn new_state<T>(options: PoolOptions) -> RefCell<RawObjectPool<T>> {
        RefCell::new(RawObjectPool::new(options))
    }

    fn validating() -> PoolOptions {
        PoolOptions {
            validation: ReleaseValidation::Enabled,
            ..PoolOptions::default()
        }
    }

    fn release<T>(state: &RefCell<RawObjectPool<T>>, item: PooledMut<T>) {
        state
            .borrow_mut()
            .release(item.pool_id, item.slot_index, item.ptr)
            .expect("release of an owned handle must succeed");
    }

    /// Counts how many values are alive, so we can see when the pool drops them.
    struct Tracked {
        alive: Rc<Cell<usize>>,
        value: u32,
    }

    impl Tracked {
        fn new(alive: &Rc<Cell<usize>>, value: u32) -> Self {
            alive.set(alive.get() + 1);
            Self {
                alive: Rc::clone(alive),
                value,
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.alive.set(self.alive.get() - 1);
        }
    }

    /// Panics when dropped if `armed` is set.
    struct PanicsOnDrop {
        armed: bool,
    }

    impl Drop for PanicsOnDrop {
        fn drop(&mut self) {
            assert!(!self.armed, "destructor failed");
        }
    }

    #[test]
    fn new_pool_is_empty() {
        let raw = RawObjectPool::<u32>::new(PoolOptions::default());

        assert_eq!(raw.allocated_count(), 0);
        assert_eq!(raw.free_count(), 0);
        assert_eq!(raw.in_use_count(), 0);
        assert_eq!(raw.stats(), PoolStats::default());
        assert_eq!(raw.estimate_memory_use(), 0);
    }

    #[test]
    fn initial_capacity_reserves_without_constructing() {
        let raw = RawObjectPool::<u32>::new(PoolOptions {
            initial_capacity: 64,
            ..PoolOptions::default()
        });

        assert!(raw.all_instances.capacity() >= 64);
        assert!(raw.free_instances.capacity() >= 64);
        assert_eq!(raw.allocated_count(), 0);
    }

    #[test]
    fn zero_initial_capacity_reserves_nothing() {
        let raw = RawObjectPool::<u32>::new(PoolOptions {
            initial_capacity: 0,
            ..PoolOptions::default()
        });

        assert_eq!(raw.all_instances.capacity(), 0);
        assert_eq!(raw.free_instances.capacity(), 0);
    }

    #[test]
    fn pools_get_distinct_ids() {
        let a = RawObjectPool::<u8>::new(PoolOptions::default());
        let b = RawObjectPool::<u8>::new(PoolOptions::default());

        assert_ne!(a.pool_id(), b.pool_id());
    }

    #[test]
    fn growth_then_reuse() {
        let state = new_state::<u32>(validating());

        let a = acquire_with(&state, || 1);
        let b = acquire_with(&state, || 2);
        assert_eq!(state.borrow().allocated_count(), 2);

        let b_ptr = b.ptr();
        release(&state, b);

        let c = acquire_with(&state, || 3);
        assert_eq!(c.ptr(), b_ptr);
        assert_eq!(c.slot_index(), 1);
        assert_eq!(*c, 3);

        let stats = state.borrow().stats();
        assert_eq!(stats.total_acquires, 3);
        assert_eq!(stats.reuse_count, 1);
        assert_eq!(stats.total_releases, 1);
        state.borrow().assert_invariants();

        release(&state, a);
        release(&state, c);
    }

    #[test]
    fn reuse_drops_previous_contents_after_constructing_new() {
        let alive = Rc::new(Cell::new(0));
        let state = new_state::<Tracked>(validating());

        let first = acquire_with(&state, || Tracked::new(&alive, 1));
        release(&state, first);

        // Released instances stay constructed until reused.
        assert_eq!(alive.get(), 1);

        let observed_during_construction = Cell::new(0);
        let second = acquire_with(&state, || {
            observed_during_construction.set(alive.get());
            Tracked::new(&alive, 2)
        });

        // The old value was still alive while the new one was being constructed.
        assert_eq!(observed_during_construction.get(), 1);
        assert_eq!(alive.get(), 1);
        assert_eq!(second.value, 2);

        release(&state, second);
        drop(state);
        assert_eq!(alive.get(), 0);
    }

    #[test]
    fn panicking_constructor_on_reuse_restores_slot() {
        let state = new_state::<String>(validating());

        let item = acquire_with(&state, || "previous".to_string());
        let ptr = item.ptr();
        release(&state, item);

        let result = catch_unwind(AssertUnwindSafe(|| {
            acquire_with::<String, _>(&state, || panic!("constructor failed"))
        }));
        assert!(result.is_err());

        {
            let raw = state.borrow();
            assert_eq!(raw.free_count(), 1);
            assert_eq!(raw.allocated_count(), 1);
            assert_eq!(raw.stats().total_acquires, 1);
            assert_eq!(raw.stats().reuse_count, 0);
            raw.assert_invariants();
        }

        // The slot kept its previous contents and can be reused normally.
        assert_eq!(unsafe { ptr.as_ref() }, "previous");

        let again = acquire_with(&state, || "next".to_string());
        assert_eq!(again.ptr(), ptr);
        release(&state, again);
    }

    #[test]
    fn panicking_constructor_on_growth_allocates_nothing() {
        let state = new_state::<String>(validating());

        let result = catch_unwind(AssertUnwindSafe(|| {
            acquire_with::<String, _>(&state, || panic!("constructor failed"))
        }));
        assert!(result.is_err());

        let raw = state.borrow();
        assert_eq!(raw.allocated_count(), 0);
        assert_eq!(raw.stats().total_acquires, 0);
    }

    #[test]
    fn release_rejects_handle_from_other_pool() {
        let state = new_state::<u32>(validating());
        let other = new_state::<u32>(validating());

        let ours = acquire_with(&state, || 1);
        let theirs = acquire_with(&other, || 2);

        let result = state
            .borrow_mut()
            .release(theirs.pool_id, theirs.slot_index, theirs.ptr);

        assert!(matches!(
            result,
            Err(ReleaseError::ForeignObject { slot_index: 0, .. })
        ));
        assert_eq!(state.borrow().free_count(), 0);
        assert_eq!(state.borrow().stats().total_releases, 0);

        release(&state, ours);
        release(&other, theirs);
    }

    #[test]
    fn release_rejects_mismatched_slot_pointer() {
        let state = new_state::<u32>(validating());

        let a = acquire_with(&state, || 1);
        let b = acquire_with(&state, || 2);

        // Right pool, right index range, but the pointer belongs to another slot.
        let result = state.borrow_mut().release(a.pool_id, 0, b.ptr);
        assert!(matches!(result, Err(ReleaseError::ForeignObject { .. })));

        // Index beyond the allocated slots.
        let result = state.borrow_mut().release(a.pool_id, 99, a.ptr);
        assert!(matches!(result, Err(ReleaseError::ForeignObject { .. })));

        release(&state, a);
        release(&state, b);
    }

    #[test]
    fn double_release_detected_when_validating() {
        let state = new_state::<u32>(validating());

        let item = acquire_with(&state, || 1).into_shared();

        state
            .borrow_mut()
            .release(item.pool_id, item.slot_index, item.ptr)
            .unwrap();

        let result = state
            .borrow_mut()
            .release(item.pool_id, item.slot_index, item.ptr);

        assert_eq!(result, Err(ReleaseError::DoubleFree { slot_index: 0 }));
        assert_eq!(state.borrow().free_count(), 1);
        assert_eq!(state.borrow().stats().total_releases, 1);
    }

    #[test]
    fn double_release_not_scanned_when_not_validating() {
        let state = new_state::<u32>(PoolOptions {
            validation: ReleaseValidation::Disabled,
            ..PoolOptions::default()
        });

        let item = acquire_with(&state, || 1).into_shared();

        let mut raw = state.borrow_mut();
        raw.release(item.pool_id, item.slot_index, item.ptr).unwrap();
        raw.release(item.pool_id, item.slot_index, item.ptr).unwrap();

        // The corruption goes unnoticed, which is the point of disabling validation.
        assert_eq!(raw.free_count(), 2);

        // Leave a consistent state behind for the drop logic.
        raw.free_instances.truncate(1);
    }

    #[test]
    fn clear_drops_everything_and_changes_identity() {
        let alive = Rc::new(Cell::new(0));
        let state = new_state::<Tracked>(validating());

        let a = acquire_with(&state, || Tracked::new(&alive, 1));
        let b = acquire_with(&state, || Tracked::new(&alive, 2));
        let stale = b.pool_id;
        release(&state, a);
        release(&state, b);
        assert_eq!(alive.get(), 2);

        clear(&state);

        let raw = state.borrow();
        assert_eq!(alive.get(), 0);
        assert_eq!(raw.allocated_count(), 0);
        assert_eq!(raw.free_count(), 0);
        assert_eq!(raw.stats(), PoolStats::default());
        assert_ne!(raw.pool_id(), stale);
    }

    #[test]
    #[should_panic(expected = "still in use")]
    fn clear_with_instances_in_use_panics() {
        let state = new_state::<u32>(validating());

        let _item = acquire_with(&state, || 1);

        clear(&state);
    }

    #[test]
    fn estimate_counts_instances_and_bookkeeping() {
        let state = new_state::<[u64; 4]>(validating());

        let a = acquire_with(&state, || [0; 4]);
        let b = acquire_with(&state, || [0; 4]);
        release(&state, a);

        let expected = 2 * size_of::<[u64; 4]>() + 2 * size_of::<usize>() + size_of::<usize>();
        assert_eq!(state.borrow().estimate_memory_use(), expected);

        release(&state, b);
    }

    #[test]
    fn drop_leaks_instances_still_in_use() {
        let alive = Rc::new(Cell::new(0));
        let state = new_state::<Tracked>(validating());

        let kept = acquire_with(&state, || Tracked::new(&alive, 7));
        let released = acquire_with(&state, || Tracked::new(&alive, 8));
        release(&state, released);

        drop(state);

        // The released instance was dropped, the checked-out one is still usable.
        assert_eq!(alive.get(), 1);
        assert_eq!(kept.value, 7);

        // SAFETY: The pool leaked this slot to us, so we are now its only owner.
        drop(unsafe { Box::from_raw(kept.ptr().as_ptr()) });
        assert_eq!(alive.get(), 0);
    }

    #[test]
    #[should_panic(expected = "MustNotDropItems")]
    fn drop_with_instances_in_use_panics_if_policy_must_not_drop() {
        let state = new_state::<u32>(PoolOptions {
            drop_policy: DropPolicy::MustNotDropItems,
            ..PoolOptions::default()
        });

        let _item = acquire_with(&state, || 1);

        drop(state);
    }

    #[test]
    fn drop_without_instances_in_use_is_fine_if_policy_must_not_drop() {
        let state = new_state::<u32>(PoolOptions {
            drop_policy: DropPolicy::MustNotDropItems,
            ..PoolOptions::default()
        });

        let item = acquire_with(&state, || 1);
        release(&state, item);

        drop(state);
    }

    #[test]
    fn reset_stats_keeps_slots() {
        let state = new_state::<u32>(validating());

        let item = acquire_with(&state, || 1);
        release(&state, item);

        state.borrow_mut().reset_stats();

        let raw = state.borrow();
        assert_eq!(raw.stats(), PoolStats::default());
        assert_eq!(raw.allocated_count(), 1);
        assert_eq!(raw.free_count(), 1);
    }

    #[test]
    fn zero_sized_items_are_pooled() {
        let state = new_state::<()>(validating());

        let a = acquire_with(&state, || ());
        let b = acquire_with(&state, || ());
        release(&state, a);
        release(&state, b);

        let c = acquire_with(&state, || ());
        assert_eq!(c.slot_index(), 1);
        release(&state, c);

        clear(&state);
    }

    #[test]
    fn panicking_destructor_on_reuse_returns_slot_to_free_list() {
        let state = new_state::<PanicsOnDrop>(validating());

        let item = acquire_with(&state, || PanicsOnDrop { armed: true });
        release(&state, item);

        let result = catch_unwind(AssertUnwindSafe(|| {
            acquire_with(&state, || PanicsOnDrop { armed: false })
        }));
        assert!(result.is_err());

        {
            let raw = state.borrow();
            assert_eq!(raw.allocated_count(), 1);
            assert_eq!(raw.free_count(), 1);
            assert_eq!(raw.in_use_count(), 0);
            assert_eq!(raw.stats().total_acquires, 2);
            assert_eq!(raw.stats().reuse_count, 1);
            assert_eq!(raw.stats().total_releases, 2);
            raw.assert_invariants();
        }

        // The slot now holds the new value, so it can be reused and cleared normally.
        let again = acquire_with(&state, || PanicsOnDrop { armed: false });
        assert_eq!(again.slot_index(), 0);
        release(&state, again);

        clear(&state);
        assert_eq!(state.borrow().allocated_count(), 0);
    }

    #[test]
    fn stats_reset_during_failed_constructor_keeps_later_acquires() {
        let state = new_state::<u32>(validating());

        let item = acquire_with(&state, || 0);
        release(&state, item);

        let result = catch_unwind(AssertUnwindSafe(|| {
            acquire_with::<u32, _>(&state, || {
                state.borrow_mut().reset_stats();

                let inner = acquire_with(&state, || 1);
                release(&state, inner);

                panic!("constructor failed");
            })
        }));
        assert!(result.is_err());

        let raw = state.borrow();
        assert_eq!(raw.allocated_count(), 2);
        assert_eq!(raw.free_count(), 2);
        assert_eq!(raw.stats().total_acquires, 1);
        assert_eq!(raw.stats().reuse_count, 0);
        assert_eq!(raw.stats().total_releases, 1);
        raw.assert_invariants();
    }

    #[test]
    fn failed_constructor_without_stats_reset_uncounts_acquire() {
        let state = new_state::<u32>(validating());

        let item = acquire_with(&state, || 0);
        release(&state, item);

        let result = catch_unwind(AssertUnwindSafe(|| {
            acquire_with::<u32, _>(&state, || {
                let inner = acquire_with(&state, || 1);
                release(&state, inner);

                panic!("constructor failed");
            })
        }));
        assert!(result.is_err());

        let stats = state.borrow().stats();
        assert_eq!(stats.total_acquires, 2);
        assert_eq!(stats.reuse_count, 0);
        assert_eq!(stats.total_releases, 2);
    }

    #[test]
    fn clear_drops_remaining_instances_when_one_destructor_panics() {
        let alive = Rc::new(Cell::new(0));
        let state = new_state::<(Tracked, PanicsOnDrop)>(validating());

        for (value, armed) in [(1, false), (2, true), (3, false)] {
            let item = acquire_with(&state, || {
                (Tracked::new(&alive, value), PanicsOnDrop { armed })
            });
            release(&state, item);
        }
        assert_eq!(alive.get(), 3);

        let result = catch_unwind(AssertUnwindSafe(|| clear(&state)));
        assert!(result.is_err());

        // Nothing was leaked: every instance was dropped, including those after the failing one.
        assert_eq!(alive.get(), 0);

        let raw = state.borrow();
        assert_eq!(raw.allocated_count(), 0);
        assert_eq!(raw.free_count(), 0);
    }
}
