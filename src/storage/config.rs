//! Configuration types for storage regions

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::OnceLock};

use crate::config::{DEFAULT_FILE_PERMISSIONS, DEFAULT_MAX_SAFE_ALLOCATION};
use crate::error::{Result, VellumError};

/// Environment variable overriding the allocation safety ceiling (bytes)
pub const MAX_SAFE_ALLOCATION_ENV: &str = "VELLUM_MAX_SAFE_ALLOCATION";

static MAX_SAFE_ALLOCATION: OnceLock<usize> = OnceLock::new();

/// Largest allocation permitted without the explicit override flag
pub fn max_safe_allocation() -> usize {
    *MAX_SAFE_ALLOCATION.get_or_init(|| match std::env::var(MAX_SAFE_ALLOCATION_ENV) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => limit,
            _ => {
                log::warn!(
                    "Ignoring {}={:?}, using default of {} bytes",
                    MAX_SAFE_ALLOCATION_ENV,
                    raw,
                    DEFAULT_MAX_SAFE_ALLOCATION
                );
                DEFAULT_MAX_SAFE_ALLOCATION
            }
        },
        Err(_) => DEFAULT_MAX_SAFE_ALLOCATION,
    })
}

/// Byte order for multi-byte accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// Byte order of the running platform
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// The opposite of the platform order
    pub const fn reversed() -> Self {
        match Self::native() {
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
        }
    }

    pub fn is_native(&self) -> bool {
        *self == Self::native()
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

/// Lifetime policy of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionKind {
    /// Heap allocation, zeroed and freed on close
    Heap,
    /// Memory-mapped file or memfd, unmapped on close
    Mapped,
    /// Pool member, zeroed and recycled on close
    Pooled,
}

impl RegionKind {
    pub fn name(&self) -> &'static str {
        match self {
            RegionKind::Heap => "heap",
            RegionKind::Mapped => "mapped",
            RegionKind::Pooled => "pooled",
        }
    }
}

/// Types of mapping backing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappedBacking {
    /// Regular file on disk
    FileBacked,
    /// Anonymous memory file descriptor (Linux-specific)
    #[cfg(target_os = "linux")]
    MemFd,
}

impl Default for MappedBacking {
    fn default() -> Self {
        Self::FileBacked
    }
}

impl MappedBacking {
    /// Get a human-readable name for the backing type
    pub fn name(&self) -> &'static str {
        match self {
            MappedBacking::FileBacked => "file-backed",
            #[cfg(target_os = "linux")]
            MappedBacking::MemFd => "memfd",
        }
    }
}

/// Configuration for mapped storage
#[derive(Debug, Clone)]
pub struct MappingConfig {
    /// Mapping length in bytes; 0 means "use the existing file length"
    pub size: usize,
    pub backing: MappedBacking,
    /// File to map for file-backed regions
    pub file_path: Option<PathBuf>,
    /// Name given to the memfd
    pub memfd_name: String,
    /// Create (and size) the file when it does not exist
    pub create: bool,
    /// Unix permissions for created files
    pub permissions: u32,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            size: 0,
            backing: MappedBacking::default(),
            file_path: None,
            memfd_name: "vellum".to_string(),
            create: true,
            permissions: DEFAULT_FILE_PERMISSIONS,
        }
    }
}

impl MappingConfig {
    /// Map `path` with the given length
    pub fn file(path: impl Into<PathBuf>, size: usize) -> Self {
        Self {
            size,
            file_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Map an anonymous memfd of the given length
    #[cfg(target_os = "linux")]
    pub fn memfd(name: impl Into<String>, size: usize) -> Self {
        Self {
            size,
            backing: MappedBacking::MemFd,
            memfd_name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.backing {
            MappedBacking::FileBacked => {
                if self.file_path.is_none() {
                    return Err(VellumError::invalid_parameter(
                        "file_path",
                        "File path must be specified for file-backed mappings",
                    ));
                }
                if self.size == 0 && self.create {
                    return Err(VellumError::invalid_parameter(
                        "size",
                        "Size must be given when the file may be created",
                    ));
                }
            }
            #[cfg(target_os = "linux")]
            MappedBacking::MemFd => {
                if self.size == 0 {
                    return Err(VellumError::invalid_parameter(
                        "size",
                        "Memfd mappings need a size greater than 0",
                    ));
                }
                if self.memfd_name.contains('\0') {
                    return Err(VellumError::invalid_parameter(
                        "memfd_name",
                        "Name contains null bytes",
                    ));
                }
            }
        }
        Ok(())
    }
}
