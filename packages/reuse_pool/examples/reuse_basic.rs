//! Basic usage of the `reuse_pool` crate:
//!
//! * Creating a pool.
//! * Acquiring instances, which allocates slots on demand.
//! * Releasing instances, which makes their slots available for reuse.
//! * Inspecting the pool's statistics.

use reuse_pool::{LocalObjectPool, Pool};

fn main() {
    let pool = LocalObjectPool::<String>::new();

    // The first acquires find the free list empty, so each allocates a new slot.
    let alice = pool.acquire("Alice".to_string());
    let bob = pool.acquire("Bob".to_string());

    println!(
        "Pool has {} slots, {} in use",
        pool.allocated_count(),
        pool.in_use_count()
    );

    // Releasing does not drop the value yet, it just puts the slot on the free list.
    pool.release(bob);
    println!("After releasing Bob, {} slot is free", pool.free_count());

    // The next acquire reuses Bob's slot. Bob's old value is dropped at this point.
    let charlie = pool.acquire("Charlie".to_string());
    println!(
        "Charlie reused slot {} and the pool still has {} slots",
        charlie.slot_index(),
        pool.allocated_count()
    );

    pool.release(alice);
    pool.release(charlie);

    let stats = pool.stats();
    println!(
        "{} acquires, {} releases, reuse rate {:.0}%",
        stats.total_acquires,
        stats.total_releases,
        stats.reuse_rate() * 100.0
    );
}
