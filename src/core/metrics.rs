//! Listener metrics for observability
//!
//! Counters describing what the listener worker did: how many events it
//! dispatched, how many sink writes failed, and how many stop sentinels it
//! skipped because they were addressed to an earlier worker.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a [`QueueListener`](super::QueueListener)
///
/// # Example
///
/// ```
/// use rust_queue_logger::ListenerMetrics;
///
/// let metrics = ListenerMetrics::new();
/// metrics.record_dispatched();
/// metrics.record_sink_failure();
///
/// assert_eq!(metrics.events_dispatched(), 1);
/// assert_eq!(metrics.sink_failures(), 1);
/// ```
#[derive(Debug)]
pub struct ListenerMetrics {
    /// Events taken off the queue and offered to the appenders
    events_dispatched: AtomicU64,

    /// Appender calls that returned an error or panicked
    sink_failures: AtomicU64,

    /// Stop sentinels ignored because of a generation mismatch
    stale_sentinels: AtomicU64,
}

impl ListenerMetrics {
    pub const fn new() -> Self {
        Self {
            events_dispatched: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            stale_sentinels: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn stale_sentinels(&self) -> u64 {
        self.stale_sentinels.load(Ordering::Relaxed)
    }

    /// Returns the previous count
    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_stale_sentinel(&self) -> u64 {
        self.stale_sentinels.fetch_add(1, Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.events_dispatched.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.stale_sentinels.store(0, Ordering::Relaxed);
    }
}

impl Default for ListenerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ListenerMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            events_dispatched: AtomicU64::new(self.events_dispatched()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            stale_sentinels: AtomicU64::new(self.stale_sentinels()),
        }
    }
}
