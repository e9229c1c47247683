//! Owning storage handles

use std::{fmt, sync::Arc};

use crate::diagnostics::diag;
use crate::error::{Result, VellumError};

use super::config::{max_safe_allocation, MappingConfig, RegionKind};
use super::raw::RegionCore;
use super::span::Span;
use super::traits::{sealed, Storage};

/// The owning handle of a storage region.
///
/// Heap regions are zero-filled on allocation and zeroed then freed on
/// close. Mapped regions are flushed and unmapped on close. Pool members
/// are zeroed and handed back to their pool on close.
///
/// Dropping a handle that was never closed closes it; this is a safety net
/// and logs a diagnostic, not the intended release path.
pub struct OffHeapStorage {
    span: Span,
}

impl OffHeapStorage {
    /// Allocate `size` zeroed bytes, refusing sizes above the safety ceiling
    pub fn allocate(size: usize) -> Result<Self> {
        Self::allocate_with(size, false)
    }

    /// Allocate `size` zeroed bytes, optionally allowing sizes above the ceiling
    pub fn allocate_with(size: usize, allow_exceeding_limit: bool) -> Result<Self> {
        if size < 1 {
            return Err(VellumError::invalid_parameter(
                "size",
                "Storage size must be at least 1 byte",
            ));
        }
        let limit = max_safe_allocation();
        if size > limit && !allow_exceeding_limit {
            return Err(VellumError::allocation_limit(size, limit));
        }
        Ok(Self::from_core(RegionCore::heap(size)?, 0))
    }

    /// Map a file or memfd
    pub fn map(config: &MappingConfig) -> Result<Self> {
        Ok(Self::from_core(RegionCore::mapped(config)?, 0))
    }

    pub(crate) fn from_core(core: Arc<RegionCore>, generation: u64) -> Self {
        Self {
            span: Span::whole(core, generation),
        }
    }

    /// Pool members report whether they are currently handed out
    pub fn is_in_use(&self) -> bool {
        match self.span.core().kind() {
            RegionKind::Pooled => {
                !self.span.is_closed() && self.span.core().is_in_use()
            }
            _ => false,
        }
    }

    /// Flush a mapped region to its file; a no-op for heap and pooled regions
    pub fn flush(&self) -> Result<()> {
        self.span.core().flush(self.span.generation())
    }
}

impl sealed::Sealed for OffHeapStorage {
    fn span(&self) -> &Span {
        &self.span
    }
}

impl Storage for OffHeapStorage {
    fn close(&self) -> Result<()> {
        self.span.core().close(self.span.generation());
        Ok(())
    }
}

impl Drop for OffHeapStorage {
    fn drop(&mut self) {
        if !self.span.is_closed() {
            diag!(
                "Reclaiming {} region {} that was never closed",
                self.span.core().kind().name(),
                self.span.core().id()
            );
            self.span.core().close(self.span.generation());
        }
    }
}

impl fmt::Debug for OffHeapStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffHeapStorage")
            .field("id", &self.id())
            .field("size", &self.size())
            .field("kind", &self.kind())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ByteOrder;

    #[test]
    fn test_allocate_rejects_zero_and_oversized() {
        assert!(matches!(
            OffHeapStorage::allocate(0),
            Err(VellumError::InvalidParameter { .. })
        ));
        let limit = max_safe_allocation();
        assert!(matches!(
            OffHeapStorage::allocate(limit + 1),
            Err(VellumError::AllocationLimit { .. })
        ));
    }

    #[test]
    fn test_get_after_set_all_widths() {
        let storage = OffHeapStorage::allocate(64).unwrap();
        storage.set_byte(0, 0xAB).unwrap();
        storage.set_short(1, -1234).unwrap();
        storage.set_char(3, 0x263A).unwrap();
        storage.set_int(5, 0x1234_5678).unwrap();
        storage.set_long(9, -0x0102_0304_0506_0708).unwrap();
        storage.set_float(17, 3.5).unwrap();
        storage.set_double(21, -2.25e10).unwrap();

        assert_eq!(storage.get_byte(0).unwrap(), 0xAB);
        assert_eq!(storage.get_short(1).unwrap(), -1234);
        assert_eq!(storage.get_char(3).unwrap(), 0x263A);
        assert_eq!(storage.get_int(5).unwrap(), 0x1234_5678);
        assert_eq!(storage.get_long(9).unwrap(), -0x0102_0304_0506_0708);
        assert_eq!(storage.get_float(17).unwrap(), 3.5);
        assert_eq!(storage.get_double(21).unwrap(), -2.25e10);
        storage.close().unwrap();
    }

    #[test]
    fn test_big_endian_layout_is_exact() {
        let storage = OffHeapStorage::allocate(8).unwrap();
        storage
            .set_int_ordered(0, 0x0102_0304, ByteOrder::BigEndian)
            .unwrap();
        let mut bytes = [0u8; 4];
        storage.get_bytes(0, &mut bytes).unwrap();
        assert_eq!(bytes, [1, 2, 3, 4]);
        assert_eq!(
            storage.get_int_ordered(0, ByteOrder::LittleEndian).unwrap(),
            0x0403_0201
        );
        storage.close().unwrap();
    }

    #[test]
    fn test_drop_without_close_releases_region() {
        let storage = OffHeapStorage::allocate(16).unwrap();
        let handle = storage.handle();
        drop(storage);
        assert!(handle.is_closed());
        assert!(handle.is_reclaimed());
    }
}
