//! Dispatch counters and the serializable snapshot exposed by the bus.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of bus activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Messages accepted by `publish`
    pub published: u64,
    /// Successful callback invocations
    pub delivered: u64,
    /// Callback invocations that panicked or returned an error
    pub failed: u64,
    /// Topic subscribers skipped because their payload type differed
    pub mismatched: u64,
    /// Messages discarded because no subscriber matched them
    pub dropped: u64,
    /// Messages waiting in the delivery queue
    pub pending: usize,
    /// Live dispatch workers
    pub workers: usize,
    /// Whether the bus is accepting work for its workers
    pub running: bool,
}

#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    mismatched: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchCounters {
    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mismatched(&self) {
        self.mismatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, pending: usize, workers: usize, running: bool) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            mismatched: self.mismatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pending,
            workers,
            running,
        }
    }
}
