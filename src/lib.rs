//! # Vellum - Off-Heap Storage with Self-Describing Records
//!
//! Vellum manages raw memory regions outside normal Rust ownership of the
//! data they hold, and persists named, typed field tables into them with a
//! compact, bit-exact wire encoding.
//!
//! ## Features
//!
//! - **Storage regions**: zero-filled heap blocks, file or memfd mappings,
//!   pooled regions, and bounds-checked slices over any of them
//! - **Streams**: byte streams and a positional channel over a region, with
//!   linked streams force-closed when their region closes
//! - **Wire format**: 8-byte big-endian type ids, a process-wide type
//!   registry and built-in encodings for primitives, strings, arrays and enums
//! - **Record stores**: field tables flushed into storage after every change,
//!   with compare-and-swap as the concurrent mutation primitive
//! - **Structs**: typed overlays over Rust types and synthetic structs built
//!   at runtime
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │   structs (typed / synthetic)                    │
//! ├──────────────────────────────────────────────────┤
//! │   object (record store, inspector)               │
//! ├────────────────────────┬─────────────────────────┤
//! │   wire (codec,         │   stream (input, output,│
//! │   registry)            │   channel)              │
//! ├────────────────────────┴─────────────────────────┤
//! │   storage (regions, slices, handles)  │  pool    │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod diagnostics;

// Core modules
pub mod error;
pub mod storage;
pub mod stream;
pub mod wire;

// Record layer
pub mod object;
pub mod structs;

pub mod pool;

// Main API re-exports
pub use error::{Result, VellumError};
pub use object::{
    FieldFilter, FieldInspector, FieldMetadata, FieldSpec, Modifiers, RecordStore, Source,
    StoreLayout,
};
pub use pool::{PoolConfig, PoolConfigBuilder, PoolStats, StoragePool};
pub use storage::{
    ByteOrder, MappedBacking, MappingConfig, OffHeapStorage, RegionKind, Storage, StorageHandle,
    StorageSlice,
};
pub use stream::{StorageChannel, StorageInputStream, StorageOutputStream};
pub use structs::{DeclaredField, StructBuilder, StructLayout, SyntheticStruct, TypedStruct};
pub use wire::{
    read_as, read_object, read_value, write_object, write_value, EnumValue, TypeRegistry,
    TypeTag, WireArray, WireEnum, WireRead, WireType, WireValue, WireWrite,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration constants
pub mod config {
    const TWO_GIB: u64 = 2 * 1024 * 1024 * 1024;

    /// Largest allocation permitted without the override flag: 2 GiB, or
    /// `isize::MAX` on targets where that is smaller
    pub const DEFAULT_MAX_SAFE_ALLOCATION: usize = if (isize::MAX as u64) < TWO_GIB {
        isize::MAX as usize
    } else {
        TWO_GIB as usize
    };

    /// Chunk size for file and stream copies
    pub const FILE_CHUNK_SIZE: usize = 4096;

    /// Alignment of heap regions
    pub const DEFAULT_ALIGNMENT: usize = 8;

    /// Permission bits for files created by mappings
    pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;
}
