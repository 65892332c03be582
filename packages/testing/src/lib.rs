#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests, benchmarks and examples in this workspace.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs a test on a separate thread and fails it if it does not finish in time.
///
/// Pool tests that exercise locking use this so that a lock held for too long (for example,
/// across a constructor that waits on another thread) shows up as a failure instead of a hang.
///
/// The timeout is 10 seconds, or 60 seconds under Miri where thread synchronization is much
/// slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the test function runs
/// directly on the calling thread so that mutation testing can detect hanging mutations.
///
/// # Panics
///
/// Panics if the test panics or exceeds the timeout.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 6 * 7);
/// assert_eq!(answer, 42);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // The receiver is gone if we already timed out, nobody cares about the result then.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded the {timeout:?} watchdog timeout");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected without a result"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}

/// Shared counters for [`LifecycleProbe`] instances.
#[derive(Debug, Default)]
pub struct LifecycleCounters {
    constructed: AtomicUsize,
    dropped: AtomicUsize,
}

impl LifecycleCounters {
    /// Creates a fresh set of counters, shareable between threads.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How many probes have been constructed with these counters.
    #[must_use]
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::Relaxed)
    }

    /// How many probes constructed with these counters have been dropped.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// How many probes constructed with these counters are still alive.
    #[must_use]
    pub fn alive(&self) -> usize {
        self.constructed().saturating_sub(self.dropped())
    }
}

/// A value that records its construction and destruction in shared [`LifecycleCounters`].
///
/// Used to observe when a pool constructs and drops the instances it manages.
#[derive(Debug)]
pub struct LifecycleProbe {
    counters: Arc<LifecycleCounters>,

    /// Arbitrary payload so tests can tell probes apart.
    pub value: u64,
}

impl LifecycleProbe {
    /// Constructs a probe, counting the construction.
    #[must_use]
    pub fn new(counters: &Arc<LifecycleCounters>, value: u64) -> Self {
        counters.constructed.fetch_add(1, Ordering::Relaxed);

        Self {
            counters: Arc::clone(counters),
            value,
        }
    }
}

impl Drop for LifecycleProbe {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn watchdog_returns_result() {
        assert_eq!(with_watchdog(|| "done"), "done");
    }

    #[test]
    #[should_panic(expected = "inner failure")]
    fn watchdog_propagates_panics() {
        with_watchdog::<_, ()>(|| panic!("inner failure"));
    }

    #[test]
    fn probe_counts_lifecycle() {
        let counters = LifecycleCounters::new();

        let a = LifecycleProbe::new(&counters, 1);
        let b = LifecycleProbe::new(&counters, 2);
        assert_eq!(counters.constructed(), 2);
        assert_eq!(counters.alive(), 2);

        drop(a);
        assert_eq!(counters.dropped(), 1);
        assert_eq!(b.value, 2);

        drop(b);
        assert_eq!(counters.alive(), 0);
    }
}
