/// A snapshot of the usage counters of a pool.
///
/// All three counters grow monotonically until reset via
/// [`Pool::reset_stats()`][crate::Pool::reset_stats] or [`Pool::clear()`][crate::Pool::clear].
/// The snapshot is taken under the pool's lock, so the counters are consistent with each other.
///
/// # Examples
///
/// ```
/// use reuse_pool::{LocalObjectPool, Pool};
///
/// let pool = LocalObjectPool::<u64>::new();
///
/// let a = pool.acquire(1);
/// pool.release(a);
/// let b = pool.acquire(2);
///
/// let stats = pool.stats();
/// assert_eq!(stats.total_acquires, 2);
/// assert_eq!(stats.total_releases, 1);
/// assert_eq!(stats.reuse_count, 1);
/// assert!((stats.reuse_rate() - 0.5).abs() < f64::EPSILON);
/// # pool.release(b);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct PoolStats {
    /// Number of successful acquires, whether satisfied from the free list or by growth.
    pub total_acquires: u64,

    /// Number of successful releases.
    pub total_releases: u64,

    /// Number of acquires that were satisfied by reusing a free slot.
    pub reuse_count: u64,
}

impl PoolStats {
    /// Share of acquires that were satisfied by reusing a slot, in the range `[0, 1]`.
    ///
    /// Returns 0 if nothing has been acquired yet.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "an efficiency ratio does not need exact integer precision"
    )]
    pub fn reuse_rate(&self) -> f64 {
        if self.total_acquires == 0 {
            return 0.0;
        }

        self.reuse_count as f64 / self.total_acquires as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_rate_of_empty_stats_is_zero() {
        assert!(PoolStats::default().reuse_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn reuse_rate_is_ratio_of_reuses_to_acquires() {
        let stats = PoolStats {
            total_acquires: 8,
            total_releases: 5,
            reuse_count: 2,
        };

        assert!((stats.reuse_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn full_reuse_is_one() {
        let stats = PoolStats {
            total_acquires: 3,
            total_releases: 3,
            reuse_count: 3,
        };

        assert!((stats.reuse_rate() - 1.0).abs() < f64::EPSILON);
    }
}
