//! Push core counters.
//!
//! Counters are monotonic for the lifetime of the process and reset on
//! restart. Active counts are never stored here; they are derived from the
//! registry by [`stats::StatsAggregator`].

pub mod stats;

use std::sync::atomic::{AtomicU64, Ordering};

/// Engine-level counters shared by the registry, heartbeat and dispatcher.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Channels ever admitted.
    pub connections_total: AtomicU64,
    /// Channels removed after a failed write.
    pub errors: AtomicU64,
    /// Admissions for a user who disconnected within the reconnect window.
    pub reconnections: AtomicU64,
    /// Channels closed to honor the per-user ceiling.
    pub evictions: AtomicU64,
    /// Channels pruned by the staleness sweep.
    pub timeouts: AtomicU64,
    /// Admissions refused by the rate limiter.
    pub rate_limited: AtomicU64,
    /// Admissions refused at the global ceiling.
    pub capacity_rejections: AtomicU64,
    /// Push frames successfully queued on a channel.
    pub messages_sent: AtomicU64,
}

impl EngineMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admitted channel.
    pub fn inc_connections(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a channel removed after a write failure.
    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reconnection.
    pub fn inc_reconnections(&self) {
        self.reconnections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction.
    pub fn inc_evictions(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a heartbeat timeout.
    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rate-limited admission.
    pub fn inc_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a capacity rejection.
    pub fn inc_capacity_rejections(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` queued frames.
    pub fn add_messages_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Read a counter.
    pub fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
