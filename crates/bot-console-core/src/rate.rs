//! Inbound message rate counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counts events observed since the last sample.
///
/// Writers call [`RateCounter::increment`] from any thread; the sampler calls
/// [`RateCounter::take`], which reads and resets in one atomic step. An event
/// racing the reset lands in either the closing or the next window.
#[derive(Debug, Default)]
pub struct RateCounter {
    count: AtomicU64,
}

impl RateCounter {
    /// Create a counter starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// Record one event.
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset to zero, discarding the current window.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    /// Read the current window and start a new one.
    #[must_use]
    pub fn take(&self) -> u64 {
        self.count.swap(0, Ordering::Relaxed)
    }

    /// Current count without resetting.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Extrapolate `count` events seen over `interval` to events per minute.
#[must_use]
pub fn per_minute(count: u64, interval: Duration) -> u64 {
    let interval_ms = interval.as_millis().max(1);
    let rate = u128::from(count) * 60_000 / interval_ms;
    u64::try_from(rate).unwrap_or(u64::MAX)
}
