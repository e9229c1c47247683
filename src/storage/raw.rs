//! The memory block behind every storage handle
//!
//! A `RegionCore` owns the raw allocation (heap block or mapping) and its
//! lifecycle state. Owners, slices and streams all reach memory through
//! it, and every access is checked against the tenancy generation the
//! caller was issued: closing a region bumps the generation, so handles
//! from an earlier tenancy fail deterministically afterwards.

use std::{
    alloc::{self, Layout},
    fmt,
    fs::{File, OpenOptions},
    os::fd::OwnedFd,
    os::unix::fs::OpenOptionsExt,
    ptr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use memmap2::{MmapMut, MmapOptions};
use parking_lot::RwLock;

use crate::config::DEFAULT_ALIGNMENT;
use crate::error::{Result, VellumError};

use super::config::{MappedBacking, MappingConfig, RegionKind};
use super::monitor::StreamMonitor;

/// Process-unique identity of a region
pub type RegionId = u64;

fn next_region_id() -> RegionId {
    static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Told when a pooled region is released by its holder
pub(crate) trait ReleaseObserver: Send + Sync {
    fn on_release(&self, region: RegionId);
}

enum Backing {
    Heap {
        layout: Layout,
    },
    Mapped {
        mmap: MmapMut,
        _file: Option<File>,
        _owned_fd: Option<OwnedFd>,
    },
    Released,
}

struct RegionState {
    ptr: *mut u8,
    backing: Backing,
    closed: bool,
    in_use: bool,
    generation: u64,
}

impl RegionState {
    fn zero(&mut self, size: usize) {
        if !self.ptr.is_null() {
            unsafe { ptr::write_bytes(self.ptr, 0, size) };
        }
    }

    fn flush_mapping(&self) {
        if let Backing::Mapped { mmap, .. } = &self.backing {
            if let Err(e) = mmap.flush() {
                log::warn!("Failed to flush mapping before unmapping: {}", e);
            }
        }
    }

    /// Give the memory back: deallocate heap blocks, unmap mappings
    fn release(&mut self) {
        match std::mem::replace(&mut self.backing, Backing::Released) {
            Backing::Heap { layout } => unsafe { alloc::dealloc(self.ptr, layout) },
            Backing::Mapped { mmap, .. } => drop(mmap),
            Backing::Released => {}
        }
        self.ptr = ptr::null_mut();
    }
}

pub(crate) struct RegionCore {
    id: RegionId,
    size: usize,
    kind: RegionKind,
    state: RwLock<RegionState>,
    monitor: StreamMonitor,
    observer: Option<Weak<dyn ReleaseObserver>>,
}

impl RegionCore {
    fn with_state(
        size: usize,
        kind: RegionKind,
        ptr: *mut u8,
        backing: Backing,
        observer: Option<Weak<dyn ReleaseObserver>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: next_region_id(),
            size,
            kind,
            state: RwLock::new(RegionState {
                ptr,
                backing,
                closed: false,
                in_use: kind == RegionKind::Pooled,
                generation: 0,
            }),
            monitor: StreamMonitor::default(),
            observer,
        })
    }

    fn allocate_zeroed(size: usize) -> Result<(*mut u8, Layout)> {
        let layout = Layout::from_size_align(size, DEFAULT_ALIGNMENT)
            .map_err(|e| VellumError::invalid_parameter("size", e.to_string()))?;
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(VellumError::memory(format!(
                "Failed to allocate {} bytes",
                size
            )));
        }
        Ok((ptr, layout))
    }

    /// Zero-filled heap region
    pub(crate) fn heap(size: usize) -> Result<Arc<Self>> {
        let (ptr, layout) = Self::allocate_zeroed(size)?;
        log::trace!("Allocated {} byte heap region", size);
        Ok(Self::with_state(
            size,
            RegionKind::Heap,
            ptr,
            Backing::Heap { layout },
            None,
        ))
    }

    /// Zero-filled heap region owned by a pool
    pub(crate) fn pooled(size: usize, observer: Weak<dyn ReleaseObserver>) -> Result<Arc<Self>> {
        let (ptr, layout) = Self::allocate_zeroed(size)?;
        Ok(Self::with_state(
            size,
            RegionKind::Pooled,
            ptr,
            Backing::Heap { layout },
            Some(observer),
        ))
    }

    /// Region mapped from a file or memfd
    pub(crate) fn mapped(config: &MappingConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let (mut mmap, file, owned_fd, size) = match config.backing {
            MappedBacking::FileBacked => {
                let (file, size) = Self::open_file_backing(config)?;
                let mmap = Self::create_mapping(&file, size)?;
                (mmap, Some(file), None, size)
            }
            #[cfg(target_os = "linux")]
            MappedBacking::MemFd => {
                let owned_fd = Self::create_memfd_backing(config)?;
                let mmap = Self::create_mapping(&owned_fd, config.size)?;
                (mmap, None, Some(owned_fd), config.size)
            }
        };

        let ptr = mmap.as_mut_ptr();
        log::debug!(
            "Mapped {} byte region ({})",
            size,
            config.backing.name()
        );
        Ok(Self::with_state(
            size,
            RegionKind::Mapped,
            ptr,
            Backing::Mapped {
                mmap,
                _file: file,
                _owned_fd: owned_fd,
            },
            None,
        ))
    }

    fn open_file_backing(config: &MappingConfig) -> Result<(File, usize)> {
        let path = config.file_path.as_ref().ok_or_else(|| {
            VellumError::invalid_parameter("file_path", "No file path configured")
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(config.create)
            .truncate(false)
            .mode(config.permissions)
            .open(path)
            .map_err(|e| VellumError::from_io(e, "Failed to open mapped file"))?;

        let current = file
            .metadata()
            .map_err(|e| VellumError::from_io(e, "Failed to stat mapped file"))?
            .len() as usize;

        let size = if config.size == 0 { current } else { config.size };
        if size == 0 {
            return Err(VellumError::invalid_parameter(
                "size",
                "Cannot map an empty file",
            ));
        }

        if current < size {
            file.set_len(size as u64)
                .map_err(|e| VellumError::from_io(e, "Failed to set file size"))?;
        }

        Ok((file, size))
    }

    #[cfg(target_os = "linux")]
    fn create_memfd_backing(config: &MappingConfig) -> Result<OwnedFd> {
        use nix::{
            sys::memfd::{memfd_create, MemFdCreateFlag},
            unistd::ftruncate,
        };
        use std::ffi::CString;

        let name = CString::new(config.memfd_name.clone())
            .map_err(|_| VellumError::invalid_parameter("memfd_name", "Name contains null bytes"))?;

        let owned_fd = memfd_create(&name, MemFdCreateFlag::MFD_CLOEXEC)
            .map_err(|e| VellumError::memory(format!("Failed to create memfd: {}", e)))?;

        ftruncate(&owned_fd, config.size as i64)
            .map_err(|e| VellumError::memory(format!("Failed to set memfd size: {}", e)))?;

        Ok(owned_fd)
    }

    fn create_mapping<T: std::os::fd::AsRawFd>(backing: &T, size: usize) -> Result<MmapMut> {
        unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(backing)
                .map_err(|e| VellumError::from_io(e, "Failed to create memory mapping"))
        }
    }

    pub(crate) fn id(&self) -> RegionId {
        self.id
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn kind(&self) -> RegionKind {
        self.kind
    }

    pub(crate) fn monitor(&self) -> &StreamMonitor {
        &self.monitor
    }

    /// Generation of the current tenancy
    pub(crate) fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Whether a handle issued for `generation` may still touch memory
    pub(crate) fn is_live(&self, generation: u64) -> bool {
        let state = self.state.read();
        !state.closed && state.generation == generation && !state.ptr.is_null()
    }

    pub(crate) fn is_in_use(&self) -> bool {
        self.state.read().in_use
    }

    /// Run `f` with the base pointer while the region is guaranteed alive
    pub(crate) fn access<R>(
        &self,
        generation: u64,
        f: impl FnOnce(*mut u8) -> Result<R>,
    ) -> Result<R> {
        let state = self.state.read();
        if state.closed || state.generation != generation || state.ptr.is_null() {
            return Err(VellumError::closed("storage"));
        }
        f(state.ptr)
    }

    /// Close the tenancy identified by `generation`.
    ///
    /// Returns false when that tenancy was already closed. Heap regions are
    /// zeroed and freed, mappings are flushed and unmapped, pooled regions
    /// are zeroed and handed back to their pool. Linked streams are
    /// force-closed in every case.
    pub(crate) fn close(&self, generation: u64) -> bool {
        {
            let mut state = self.state.write();
            if state.closed || state.generation != generation {
                return false;
            }
            match self.kind {
                RegionKind::Heap => {
                    state.zero(self.size);
                    state.release();
                }
                RegionKind::Mapped => {
                    state.flush_mapping();
                    state.release();
                }
                RegionKind::Pooled => {
                    state.zero(self.size);
                    state.in_use = false;
                }
            }
            state.closed = true;
            state.generation += 1;
        }

        let streams = self.monitor.close_all();
        log::trace!(
            "Closed {} region {} ({} linked streams)",
            self.kind.name(),
            self.id,
            streams
        );

        if let Some(observer) = self.observer.as_ref().and_then(Weak::upgrade) {
            observer.on_release(self.id);
        }
        true
    }

    /// Start a new pool tenancy, returning its generation
    pub(crate) fn reutilize(&self) -> Result<u64> {
        let mut state = self.state.write();
        if state.ptr.is_null() {
            return Err(VellumError::closed("pooled storage"));
        }
        if state.in_use {
            return Err(VellumError::invalid_parameter(
                "region",
                "Pooled region is still in use",
            ));
        }
        state.closed = false;
        state.in_use = true;
        Ok(state.generation)
    }

    /// Free the memory regardless of tenancy
    pub(crate) fn dispose(&self) {
        {
            let mut state = self.state.write();
            if state.ptr.is_null() {
                return;
            }
            state.zero(self.size);
            state.release();
            state.closed = true;
            state.in_use = false;
            state.generation += 1;
        }
        self.monitor.close_all();
    }

    /// Flush a mapping to its file; a no-op for heap regions
    pub(crate) fn flush(&self, generation: u64) -> Result<()> {
        let state = self.state.read();
        if state.closed || state.generation != generation {
            return Err(VellumError::closed("storage"));
        }
        match &state.backing {
            Backing::Mapped { mmap, .. } => mmap
                .flush()
                .map_err(|e| VellumError::from_io(e, "Failed to flush memory mapping")),
            _ => Ok(()),
        }
    }
}

impl Drop for RegionCore {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.ptr.is_null() {
            if matches!(state.backing, Backing::Heap { .. }) {
                state.zero(self.size);
            }
            state.release();
        }
    }
}

impl fmt::Debug for RegionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionCore")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .finish()
    }
}

// The raw pointer is only dereferenced under the state lock.
unsafe impl Send for RegionCore {}
unsafe impl Sync for RegionCore {}
