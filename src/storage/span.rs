//! A bounds-checked window onto a region for one tenancy

use std::{ptr, sync::Arc};

use crate::error::{Result, VellumError};

use super::config::ByteOrder;
use super::raw::RegionCore;
use super::handle::StorageHandle;
use super::primitive::Primitive;

/// `[base, base + len)` of a region, valid while `generation` is current
#[derive(Debug, Clone)]
pub struct Span {
    core: Arc<RegionCore>,
    base: usize,
    len: usize,
    generation: u64,
}

pub(crate) fn check_bounds(offset: usize, width: usize, size: usize) -> Result<()> {
    match offset.checked_add(width) {
        Some(end) if end <= size => Ok(()),
        _ => Err(VellumError::out_of_bounds(offset, width, size)),
    }
}

impl Span {
    pub(crate) fn new(core: Arc<RegionCore>, base: usize, len: usize, generation: u64) -> Self {
        Self {
            core,
            base,
            len,
            generation,
        }
    }

    /// Whole-region span for the current tenancy
    pub(crate) fn whole(core: Arc<RegionCore>, generation: u64) -> Self {
        let len = core.size();
        Self::new(core, 0, len, generation)
    }

    pub(crate) fn core(&self) -> &Arc<RegionCore> {
        &self.core
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_closed(&self) -> bool {
        !self.core.is_live(self.generation)
    }

    pub(crate) fn handle(&self) -> StorageHandle {
        StorageHandle::new(
            Arc::downgrade(&self.core),
            self.core.id(),
            self.base,
            self.len,
            self.generation,
        )
    }

    /// Sub-span relative to this one
    pub(crate) fn sub(&self, offset: usize, len: usize) -> Result<Span> {
        if len == 0 {
            return Err(VellumError::invalid_parameter(
                "size",
                "Slice size must be at least 1 byte",
            ));
        }
        if self.is_closed() {
            return Err(VellumError::closed("storage"));
        }
        check_bounds(offset, len, self.len)?;
        Ok(Span::new(
            Arc::clone(&self.core),
            self.base + offset,
            len,
            self.generation,
        ))
    }

    /// Run `f` on the address of `[offset, offset + width)` inside this span
    pub(crate) fn with_bytes<R>(
        &self,
        offset: usize,
        width: usize,
        f: impl FnOnce(*mut u8) -> R,
    ) -> Result<R> {
        self.core.access(self.generation, |base| {
            check_bounds(offset, width, self.len)?;
            Ok(f(unsafe { base.add(self.base + offset) }))
        })
    }

    pub(crate) fn read<T: Primitive>(&self, offset: usize, order: ByteOrder) -> Result<T> {
        let value = self.with_bytes(offset, T::WIDTH, |src| unsafe { T::load(src) })?;
        Ok(if order.is_native() { value } else { value.swapped() })
    }

    pub(crate) fn write<T: Primitive>(&self, offset: usize, value: T, order: ByteOrder) -> Result<()> {
        let value = if order.is_native() { value } else { value.swapped() };
        self.with_bytes(offset, T::WIDTH, |dst| unsafe { value.store(dst) })
    }

    pub(crate) fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.with_bytes(offset, dst.len(), |src| unsafe {
            ptr::copy_nonoverlapping(src, dst.as_mut_ptr(), dst.len())
        })
    }

    pub(crate) fn write_from(&self, offset: usize, src: &[u8]) -> Result<()> {
        self.with_bytes(offset, src.len(), |dst| unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len())
        })
    }

    pub(crate) fn fill(&self, offset: usize, len: usize, byte: u8) -> Result<()> {
        self.with_bytes(offset, len, |dst| unsafe { ptr::write_bytes(dst, byte, len) })
    }
}
