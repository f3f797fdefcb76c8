//! Lifetime frame counters shared by the workers and the drain step.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters, updated lock-free from every pipeline context.
#[derive(Debug, Default)]
pub struct PipelineStats {
    acquired: AtomicU64,
    dropped: AtomicU64,
    transformed: AtomicU64,
    presented: AtomicU64,
    acquire_failures: AtomicU64,
    transform_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames successfully produced by the acquisition stage.
    pub acquired: u64,
    /// Acquired frames discarded because no idle slot was free.
    pub dropped: u64,
    /// Frames the transform stage completed without error.
    pub transformed: u64,
    /// Frames passed to the presentation stage.
    pub presented: u64,
    /// Acquisition calls that reported failure.
    pub acquire_failures: u64,
    /// Transform calls that reported failure.
    pub transform_failures: u64,
}

impl PipelineStats {
    pub(crate) fn record_acquired(&self) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transformed(&self) {
        self.transformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_presented(&self) {
        self.presented.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_acquire_failure(&self) {
        self.acquire_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transform_failure(&self) {
        self.transform_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            acquired: self.acquired.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            transformed: self.transformed.load(Ordering::Relaxed),
            presented: self.presented.load(Ordering::Relaxed),
            acquire_failures: self.acquire_failures.load(Ordering::Relaxed),
            transform_failures: self.transform_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_records() {
        let stats = PipelineStats::default();
        stats.record_acquired();
        stats.record_acquired();
        stats.record_dropped();
        stats.record_transform_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.acquired, 2);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.transform_failures, 1);
        assert_eq!(snap.presented, 0);
    }
}
