//! Integration tests for the storage pool

use std::sync::{Arc, Barrier};
use std::thread;

use vellum::{
    Modifiers, PoolConfig, PoolConfigBuilder, RecordStore, Storage, StoragePool, VellumError,
    WireRead,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_region_comes_back_with_the_same_id() {
        let pool = StoragePool::with_capacity(1024, 1).unwrap();
        let first = pool.acquire().unwrap();
        let id = first.id();
        first.set_long(0, 99).unwrap();

        assert!(matches!(
            pool.acquire(),
            Err(VellumError::CapacityExceeded { capacity: 1 })
        ));

        first.close().unwrap();
        let second = pool.acquire().unwrap();
        assert_eq!(second.id(), id);
        assert_eq!(second.size(), 1024);
        assert_eq!(second.get_long(0).unwrap(), 0);

        // The old tenant cannot see the new one
        assert!(first.get_long(0).unwrap_err().is_state());
        assert!(first.close().is_ok());
        assert!(!second.is_closed());

        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 1);
        assert_eq!(stats.capacity_failures, 1);
        second.close().unwrap();
        pool.dispose();
    }

    #[test]
    fn test_dropping_a_pooled_storage_returns_it() {
        let pool = StoragePool::with_capacity(256, 1).unwrap();
        let storage = pool.acquire().unwrap();
        drop(storage);
        assert_eq!(pool.in_use_count(), 0);
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn test_record_store_on_pooled_storage() {
        let pool = StoragePool::with_capacity(512, 2).unwrap();
        let store = RecordStore::new(pool.acquire().unwrap()).unwrap();
        store.add_field("count", 3i32, Modifiers::PUBLIC).unwrap();
        let region = store.storage().id();
        store.close().unwrap();

        // The region is zeroed on its way back, so no image survives
        let reused = pool.acquire().unwrap();
        assert_eq!(reused.id(), region);
        assert!(RecordStore::from_storage(reused, None).is_err());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_dispose_invalidates_everything() {
        let pool = StoragePool::new(
            PoolConfigBuilder::new("disposable")
                .region_size(128)
                .capacity(4)
                .build()
                .unwrap(),
        )
        .unwrap();
        let held = pool.acquire().unwrap();
        let mut stream = held.input_stream(true).unwrap();

        pool.dispose();
        pool.dispose();
        assert!(pool.is_disposed());
        assert!(pool.is_empty());
        assert!(held.is_closed());
        assert!(stream.read_value().unwrap_err().is_state());
        assert!(pool.acquire().unwrap_err().is_state());
        assert!(held.close().is_ok());
    }

    #[test]
    fn test_invalid_configurations() {
        assert!(StoragePool::new(PoolConfig::new("zero").with_region_size(0)).is_err());
        assert!(StoragePool::new(
            PoolConfig::new("huge")
                .with_region_size(vellum::storage::max_safe_allocation() + 1)
                .with_capacity(4)
        )
        .is_err());
        assert!(StoragePool::new(
            PoolConfig::new("huge-but-allowed")
                .with_region_size(vellum::storage::max_safe_allocation() + 1)
                .with_capacity(4)
                .with_allow_exceeding_limit(true)
        )
        .is_ok());
    }

    #[test]
    fn test_unbounded_pool_under_contention() {
        let pool = Arc::new(StoragePool::with_capacity(64, 0).unwrap());
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for round in 0..50 {
                        let storage = pool.acquire().unwrap();
                        storage.set_int(0, (t * 1000 + round) as i32).unwrap();
                        assert_eq!(storage.get_int(0).unwrap(), (t * 1000 + round) as i32);
                        storage.close().unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.acquisitions, (threads * 50) as u64);
        assert_eq!(stats.releases, (threads * 50) as u64);
        assert_eq!(stats.in_use, 0);
        assert!(pool.len() <= threads);
        assert!(stats.peak_in_use <= threads);
        pool.dispose();
    }
}
