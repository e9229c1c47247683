//! Bounded pool of reusable storage regions

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::error::{Result, VellumError};
use crate::storage::{OffHeapStorage, RegionCore, RegionId, ReleaseObserver};

use super::config::PoolConfig;
use super::stats::{AtomicPoolStats, PoolStats};

struct PoolShared {
    config: PoolConfig,
    members: Mutex<Vec<Arc<RegionCore>>>,
    stats: AtomicPoolStats,
    disposed: AtomicBool,
}

impl ReleaseObserver for PoolShared {
    fn on_release(&self, region: RegionId) {
        self.stats.record_release();
        trace!("Pool {} got region {} back", self.config.name, region);
    }
}

/// A set of equally sized regions handed out and taken back.
///
/// Closing a storage obtained from [`acquire`](Self::acquire) zeroes the
/// region and returns it to the free set; the memory itself is only freed
/// by [`dispose`](Self::dispose) or when the last reference goes away.
pub struct StoragePool {
    shared: Arc<PoolShared>,
}

impl StoragePool {
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            "Created storage pool {} ({} byte regions, capacity {})",
            config.name,
            config.region_size,
            if config.is_bounded() {
                config.capacity.to_string()
            } else {
                "unbounded".to_string()
            }
        );
        Ok(Self {
            shared: Arc::new(PoolShared {
                config,
                members: Mutex::new(Vec::new()),
                stats: AtomicPoolStats::new(),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Pool of `capacity` regions of `region_size` bytes; 0 means unbounded
    pub fn with_capacity(region_size: usize, capacity: usize) -> Result<Self> {
        Self::new(
            PoolConfig::default()
                .with_region_size(region_size)
                .with_capacity(capacity),
        )
    }

    /// Hand out a free region, allocating one if the capacity allows
    pub fn acquire(&self) -> Result<OffHeapStorage> {
        let shared = &self.shared;
        let mut members = shared.members.lock();
        if shared.disposed.load(Ordering::Acquire) {
            return Err(VellumError::closed("storage pool"));
        }

        for core in members.iter() {
            if core.is_in_use() {
                continue;
            }
            if let Ok(generation) = core.reutilize() {
                shared.stats.record_reuse();
                trace!("Pool {} reused region {}", shared.config.name, core.id());
                return Ok(OffHeapStorage::from_core(Arc::clone(core), generation));
            }
        }

        if shared.config.is_bounded() && members.len() >= shared.config.capacity {
            shared.stats.record_capacity_failure();
            return Err(VellumError::capacity_exceeded(shared.config.capacity));
        }

        let strong: Arc<dyn ReleaseObserver> = self.shared.clone();
        let observer: Weak<dyn ReleaseObserver> = Arc::downgrade(&strong);
        let core = RegionCore::pooled(shared.config.region_size, observer)?;
        let generation = core.generation();
        members.push(Arc::clone(&core));
        shared.stats.record_allocation();
        trace!(
            "Pool {} allocated region {} ({} members)",
            shared.config.name,
            core.id(),
            members.len()
        );
        Ok(OffHeapStorage::from_core(core, generation))
    }

    /// Free every member and refuse further acquisitions. Idempotent.
    ///
    /// Storages still held by callers behave as closed afterwards.
    pub fn dispose(&self) {
        let members = {
            let mut members = self.shared.members.lock();
            if self.shared.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *members)
        };
        for core in &members {
            core.dispose();
        }
        self.shared.stats.reset_in_use();
        debug!(
            "Disposed storage pool {} ({} regions)",
            self.shared.config.name,
            members.len()
        );
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Regions currently owned by the pool
    pub fn len(&self) -> usize {
        self.shared.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Regions currently handed out
    pub fn in_use_count(&self) -> usize {
        self.shared
            .members
            .lock()
            .iter()
            .filter(|core| core.is_in_use())
            .count()
    }

    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats.snapshot(self.len())
    }
}

impl std::fmt::Debug for StoragePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragePool")
            .field("config", &self.shared.config)
            .field("members", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
