//! Pools of reusable storage regions

pub mod config;
pub mod pool;
pub mod stats;

pub use config::{PoolConfig, PoolConfigBuilder};
pub use pool::StoragePool;
pub use stats::{AtomicPoolStats, PoolStats};
