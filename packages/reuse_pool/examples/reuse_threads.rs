//! Sharing an `ObjectPool` between threads.
//!
//! The pool is prewarmed before the worker threads start so that the steady state never
//! allocates. Construction of the recycled values happens outside the pool's lock, so workers
//! do not serialize on each other's constructors.

use std::sync::Arc;
use std::thread;

use reuse_pool::{ObjectPool, Pool};

const WORKERS: usize = 4;
const ITERATIONS: usize = 10_000;

fn main() {
    let pool = Arc::new(ObjectPool::<Vec<u8>>::with_capacity(WORKERS));
    pool.prewarm(WORKERS);

    let workers = (0..WORKERS)
        .map(|worker| {
            let pool = Arc::clone(&pool);

            thread::spawn(move || {
                for i in 0..ITERATIONS {
                    let mut buffer = pool.acquire_with(|| Vec::with_capacity(64));
                    buffer.extend_from_slice(format!("worker {worker} message {i}").as_bytes());
                    pool.release(buffer);
                }
            })
        })
        .collect::<Vec<_>>();

    for worker in workers {
        worker.join().expect("worker thread panicked");
    }

    println!(
        "{} slots served {} acquires with a reuse rate of {:.2}",
        pool.allocated_count(),
        pool.stats().total_acquires,
        pool.reuse_rate()
    );
}
