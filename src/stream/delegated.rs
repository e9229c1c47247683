//! Wire records over any `std::io` reader or writer

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use crate::error::{Result, VellumError};
use crate::wire::{global, TypeRegistry, WireRead, WireWrite};

/// Reads wire records from an arbitrary [`Read`]
#[derive(Debug)]
pub struct IoWireReader<R: Read> {
    inner: R,
    registry: Option<Arc<TypeRegistry>>,
}

impl<R: Read> IoWireReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            registry: None,
        }
    }

    /// Resolve ids through `registry` instead of the global one
    pub fn with_registry(inner: R, registry: Arc<TypeRegistry>) -> Self {
        Self {
            inner,
            registry: Some(registry),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> WireRead for IoWireReader<R> {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => VellumError::decode("Record truncated", e),
            _ => VellumError::from_io(e, "Failed to read record"),
        })
    }

    fn registry(&self) -> &TypeRegistry {
        self.registry.as_deref().unwrap_or_else(|| global())
    }
}

/// Writes wire records to an arbitrary [`Write`]
#[derive(Debug)]
pub struct IoWireWriter<W: Write> {
    inner: W,
    registry: Option<Arc<TypeRegistry>>,
}

impl<W: Write> IoWireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            registry: None,
        }
    }

    pub fn with_registry(inner: W, registry: Arc<TypeRegistry>) -> Self {
        Self {
            inner,
            registry: Some(registry),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| VellumError::from_io(e, "Failed to flush record writer"))
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> WireWrite for IoWireWriter<W> {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner
            .write_all(bytes)
            .map_err(|e| VellumError::from_io(e, "Failed to write record"))
    }

    fn registry(&self) -> &TypeRegistry {
        self.registry.as_deref().unwrap_or_else(|| global())
    }
}
