//! Storage pool statistics tracking

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Snapshot of pool activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Successful acquisitions
    pub acquisitions: u64,
    /// Acquisitions served by a free member
    pub reuses: u64,
    /// Acquisitions that allocated a new member
    pub allocations: u64,
    /// Members handed back by their holders
    pub releases: u64,
    /// Acquisitions refused because the pool was full
    pub capacity_failures: u64,
    /// Members currently owned by the pool
    pub members: usize,
    /// Members currently handed out
    pub in_use: usize,
    /// Highest number of members handed out at once
    pub peak_in_use: usize,
}

impl PoolStats {
    pub fn new() -> Self {
        Default::default()
    }

    /// Share of acquisitions served without allocating (0.0 to 1.0)
    pub fn reuse_rate(&self) -> f64 {
        if self.acquisitions == 0 {
            return 0.0;
        }
        self.reuses as f64 / self.acquisitions as f64
    }

    /// Share of members handed out (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        if self.members == 0 {
            return 0.0;
        }
        self.in_use as f64 / self.members as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "PoolStats {{ members: {}, in_use: {}, peak: {}, acquisitions: {}, \
             reuses: {}, releases: {}, capacity_failures: {}, reuse_rate: {:.2}% }}",
            self.members,
            self.in_use,
            self.peak_in_use,
            self.acquisitions,
            self.reuses,
            self.releases,
            self.capacity_failures,
            self.reuse_rate() * 100.0
        )
    }
}

/// Thread-safe counters behind [`PoolStats`]
#[derive(Debug, Default)]
pub struct AtomicPoolStats {
    acquisitions: AtomicU64,
    reuses: AtomicU64,
    allocations: AtomicU64,
    releases: AtomicU64,
    capacity_failures: AtomicU64,
    in_use: AtomicUsize,
    peak_in_use: AtomicUsize,
}

impl AtomicPoolStats {
    pub fn new() -> Self {
        Default::default()
    }

    fn record_acquisition(&self) {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        let in_use = self.in_use.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_use.fetch_max(in_use, Ordering::Relaxed);
    }

    pub fn record_reuse(&self) {
        self.reuses.fetch_add(1, Ordering::Relaxed);
        self.record_acquisition();
    }

    pub fn record_allocation(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.record_acquisition();
    }

    pub fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
        // Saturating; a release racing with dispose must not wrap
        let _ = self
            .in_use
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn record_capacity_failure(&self) {
        self.capacity_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset_in_use(&self) {
        self.in_use.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self, members: usize) -> PoolStats {
        PoolStats {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            capacity_failures: self.capacity_failures.load(Ordering::Relaxed),
            members,
            in_use: self.in_use.load(Ordering::Relaxed),
            peak_in_use: self.peak_in_use.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = AtomicPoolStats::new();
        stats.record_allocation();
        stats.record_allocation();
        stats.record_release();
        stats.record_reuse();
        stats.record_capacity_failure();

        let snapshot = stats.snapshot(2);
        assert_eq!(snapshot.acquisitions, 3);
        assert_eq!(snapshot.reuses, 1);
        assert_eq!(snapshot.allocations, 2);
        assert_eq!(snapshot.in_use, 2);
        assert_eq!(snapshot.peak_in_use, 2);
        assert_eq!(snapshot.utilization(), 1.0);
        assert!(snapshot.summary().contains("capacity_failures: 1"));
    }

    #[test]
    fn test_release_never_underflows() {
        let stats = AtomicPoolStats::new();
        stats.record_release();
        assert_eq!(stats.snapshot(0).in_use, 0);
        assert_eq!(PoolStats::new().reuse_rate(), 0.0);
    }
}
