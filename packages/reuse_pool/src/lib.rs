//! An object pool that amortizes the cost of constructing expensive values by recycling them.
//!
//! A pool hands out constructed instances and takes them back when the caller is done. Released
//! instances stay constructed in a free list and their slots are reused, most recently released
//! first, by later acquires. Memory is only returned to the allocator when the pool is cleared
//! or dropped.
//!
//! Two variants share one set of operations, the [`Pool`] trait:
//!
//! - [`ObjectPool<T>`] is thread-safe. Its bookkeeping is guarded by a lightweight mutex that is
//!   never held while `T` is being constructed or dropped.
//! - [`LocalObjectPool<T>`] is single-threaded and does no locking.
//!
//! # Handles
//!
//! Acquiring returns a [`PooledMut<T>`], an exclusive handle with [`Deref`][std::ops::Deref] and
//! [`DerefMut`][std::ops::DerefMut] access to the instance. Releasing consumes it, so a released
//! instance cannot be reached through it anymore. A [`Pooled<T>`] is a copyable shared handle
//! created via [`PooledMut::into_shared()`]; releasing one requires `unsafe` code.
//!
//! # Release validation
//!
//! Releasing a handle to a pool that did not issue it is always detected. Releasing the same
//! instance twice (only possible with shared handles) is detected when
//! [`ReleaseValidation::Enabled`] is in effect, which is the default in debug builds. Both are
//! caller bugs and [`Pool::release()`] panics on them.
//!
//! # Examples
//!
//! ```
//! use reuse_pool::{ObjectPool, Pool};
//!
//! #[derive(Default)]
//! struct Transform {
//!     matrix: [[f32; 4]; 4],
//! }
//!
//! let pool = ObjectPool::<Transform>::new();
//!
//! // Populate the free list before a latency-sensitive phase.
//! pool.prewarm(64);
//!
//! let mut transform = pool.acquire_default();
//! transform.matrix[0][0] = 1.0;
//! pool.release(transform);
//!
//! assert_eq!(pool.allocated_count(), 64);
//! assert_eq!(pool.in_use_count(), 0);
//! assert!(pool.reuse_rate() > 0.0);
//! ```

mod api;
mod builder;
mod drop_policy;
mod error;
mod local_builder;
mod local_pool;
mod options;
mod pool;
mod pooled;
mod pooled_mut;
mod raw;
mod stats;

pub use api::Pool;
pub(crate) use api::release_failed;
pub use builder::*;
pub use drop_policy::*;
pub use error::*;
pub use local_builder::*;
pub use local_pool::*;
pub(crate) use options::PoolOptions;
pub use options::ReleaseValidation;
pub use pool::*;
pub use pooled::*;
pub use pooled_mut::*;
pub use stats::*;
