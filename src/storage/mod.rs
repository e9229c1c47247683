//! Raw storage regions and their access surface

pub mod config;
mod raw;
pub mod handle;
pub(crate) mod monitor;
mod primitive;
pub mod region;
pub mod slice;
mod span;
pub mod traits;

pub use self::raw::RegionId;
pub(crate) use self::raw::{RegionCore, ReleaseObserver};
pub use config::{max_safe_allocation, ByteOrder, MappedBacking, MappingConfig, RegionKind};
pub use handle::StorageHandle;
pub use region::OffHeapStorage;
pub use slice::StorageSlice;
pub(crate) use span::{check_bounds, Span};
pub use traits::Storage;
