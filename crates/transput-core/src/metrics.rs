//! Atomic counters for transput observability.
//!
//! All counters use relaxed ordering; they are diagnostic only.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operation counters for one channel (or a group of channels sharing them).
pub struct TransputMetrics {
    /// Pictures rendered by a write.
    pub pictures_written: AtomicU64,
    /// Pictures parsed by a read.
    pub pictures_read: AtomicU64,
    /// Insertion directives executed by the selector.
    pub insertions: AtomicU64,
    /// Frames opened (outermost and embedded).
    pub frames_opened: AtomicU64,
    /// Outermost formats reinitialised after exhaustion.
    pub restarts: AtomicU64,
    /// Embedded frames popped back to their parent.
    pub embedded_returns: AtomicU64,
    /// Value errors raised, recovered or not.
    pub value_errors: AtomicU64,
    /// Format errors raised (mismatch, unused pictures).
    pub format_errors: AtomicU64,
    /// Fixed/float renderings that succeeded only after reducing the fraction width.
    pub fraction_recoveries: AtomicU64,
}

impl TransputMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pictures_written: AtomicU64::new(0),
            pictures_read: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
            frames_opened: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            embedded_returns: AtomicU64::new(0),
            value_errors: AtomicU64::new(0),
            format_errors: AtomicU64::new(0),
            fraction_recoveries: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pictures_written: Self::get(&self.pictures_written),
            pictures_read: Self::get(&self.pictures_read),
            insertions: Self::get(&self.insertions),
            frames_opened: Self::get(&self.frames_opened),
            restarts: Self::get(&self.restarts),
            embedded_returns: Self::get(&self.embedded_returns),
            value_errors: Self::get(&self.value_errors),
            format_errors: Self::get(&self.format_errors),
            fraction_recoveries: Self::get(&self.fraction_recoveries),
        }
    }
}

impl Default for TransputMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub pictures_written: u64,
    pub pictures_read: u64,
    pub insertions: u64,
    pub frames_opened: u64,
    pub restarts: u64,
    pub embedded_returns: u64,
    pub value_errors: u64,
    pub format_errors: u64,
    pub fraction_recoveries: u64,
}

impl MetricsSnapshot {
    /// Field-wise sum, used to aggregate per-case snapshots.
    #[must_use]
    pub const fn merged(self, other: Self) -> Self {
        Self {
            pictures_written: self.pictures_written + other.pictures_written,
            pictures_read: self.pictures_read + other.pictures_read,
            insertions: self.insertions + other.insertions,
            frames_opened: self.frames_opened + other.frames_opened,
            restarts: self.restarts + other.restarts,
            embedded_returns: self.embedded_returns + other.embedded_returns,
            value_errors: self.value_errors + other.value_errors,
            format_errors: self.format_errors + other.format_errors,
            fraction_recoveries: self.fraction_recoveries + other.fraction_recoveries,
        }
    }
}
