//! Dependent views into a region

use std::fmt;

use crate::error::{Result, VellumError};

use crate::stream::{StorageInputStream, StorageOutputStream};

use super::span::Span;
use super::traits::{sealed, Storage};

/// A window onto part of another region.
///
/// Offsets are relative to the start of the slice. A slice never owns
/// memory: [`close`](Storage::close) is rejected and
/// [`is_closed`](Storage::is_closed) follows the owning region. Streams
/// over a slice cannot be linked, since closing a linked stream would
/// close the region the slice borrows from.
#[derive(Clone)]
pub struct StorageSlice {
    span: Span,
}

impl StorageSlice {
    pub(crate) fn new(span: Span) -> Self {
        Self { span }
    }
}

impl sealed::Sealed for StorageSlice {
    fn span(&self) -> &Span {
        &self.span
    }
}

fn reject_linked(linked: bool) -> Result<()> {
    if linked {
        return Err(VellumError::unsupported(
            "streams over a slice cannot be linked to the region",
        ));
    }
    Ok(())
}

impl Storage for StorageSlice {
    fn close(&self) -> Result<()> {
        Err(VellumError::unsupported(
            "a slice cannot be closed; close the region it belongs to",
        ))
    }

    fn input_stream(&self, linked: bool) -> Result<StorageInputStream> {
        reject_linked(linked)?;
        StorageInputStream::new(&self.span, false)
    }

    fn output_stream(&self, linked: bool) -> Result<StorageOutputStream> {
        reject_linked(linked)?;
        StorageOutputStream::new(&self.span, false)
    }
}

impl fmt::Debug for StorageSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSlice")
            .field("region", &self.id())
            .field("size", &self.size())
            .field("closed", &self.is_closed())
            .finish()
    }
}
