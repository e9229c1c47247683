//! Generation-checked, non-owning reference to a region
//!
//! Streams and channels keep a `StorageHandle` instead of an owning
//! reference. Resolving it fails with [`VellumError::Reclaimed`] once the
//! region is gone, and with a closed-state error once the tenancy it was
//! issued for has ended (closed, released to a pool, or disposed).

use std::sync::{Arc, Weak};

use crate::error::{Result, VellumError};

use super::raw::{RegionCore, RegionId};
use super::span::Span;

#[derive(Debug, Clone)]
pub struct StorageHandle {
    core: Weak<RegionCore>,
    region: RegionId,
    base: usize,
    len: usize,
    generation: u64,
}

impl StorageHandle {
    pub(crate) fn new(
        core: Weak<RegionCore>,
        region: RegionId,
        base: usize,
        len: usize,
        generation: u64,
    ) -> Self {
        Self {
            core,
            region,
            base,
            len,
            generation,
        }
    }

    /// Identity of the region this handle was issued for
    pub fn region_id(&self) -> RegionId {
        self.region
    }

    /// Addressable length behind the handle
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The region no longer exists at all
    pub fn is_reclaimed(&self) -> bool {
        self.core.strong_count() == 0
    }

    /// The region is gone or the tenancy this handle belongs to has ended
    pub fn is_closed(&self) -> bool {
        match self.core.upgrade() {
            Some(core) => !core.is_live(self.generation),
            None => true,
        }
    }

    pub(crate) fn core(&self) -> Result<Arc<RegionCore>> {
        self.core.upgrade().ok_or(VellumError::Reclaimed)
    }

    /// Resolve to a live span, failing deterministically otherwise
    pub(crate) fn resolve(&self) -> Result<Span> {
        let core = self.core()?;
        if !core.is_live(self.generation) {
            return Err(VellumError::closed("storage"));
        }
        Ok(Span::new(core, self.base, self.len, self.generation))
    }

    /// Close the tenancy this handle belongs to.
    ///
    /// A region that has already been reclaimed counts as closed.
    pub(crate) fn close_storage(&self) -> bool {
        match self.core.upgrade() {
            Some(core) => core.close(self.generation),
            None => false,
        }
    }
}
