//! Sequential reader over a storage view

use std::io;

use crate::error::{Result, VellumError};
use crate::storage::{check_bounds, Span};
use crate::wire::WireRead;

use super::Attachment;

/// Cursor-based reader.
///
/// Plain reads stop at the end of the view; wire reads treat running out of
/// bytes as a truncated record.
#[derive(Debug)]
pub struct StorageInputStream {
    attachment: Attachment,
    offset: usize,
}

impl StorageInputStream {
    pub(crate) fn new(span: &Span, linked: bool) -> Result<Self> {
        Ok(Self {
            attachment: Attachment::new(span, linked)?,
            offset: 0,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move the cursor; `offset` may equal the length (end of stream)
    pub fn set_offset(&mut self, offset: usize) -> Result<()> {
        if offset > self.attachment.len() {
            return Err(VellumError::out_of_bounds(offset, 0, self.attachment.len()));
        }
        self.attachment.span()?;
        self.offset = offset;
        Ok(())
    }

    /// Bytes between the cursor and the end of the view
    pub fn available(&self) -> usize {
        self.attachment.len() - self.offset
    }

    /// Advance by up to `n` bytes, returning how far the cursor moved
    pub fn skip(&mut self, n: usize) -> Result<usize> {
        self.attachment.span()?;
        let step = n.min(self.available());
        self.offset += step;
        Ok(step)
    }

    /// Copy up to `buf.len()` bytes, returning the count (0 at the end)
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let span = self.attachment.span()?;
        let n = buf.len().min(self.available());
        if n > 0 {
            span.read_into(self.offset, &mut buf[..n])?;
            self.offset += n;
        }
        Ok(n)
    }

    /// Whether closing this stream also closes its storage
    pub fn is_linked(&self) -> bool {
        self.attachment.linked
    }

    pub fn is_closed(&self) -> bool {
        self.attachment.is_closed()
    }

    /// Close the stream (and its storage, when linked). Idempotent.
    pub fn close(&mut self) {
        self.attachment.close();
    }
}

impl io::Read for StorageInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

impl WireRead for StorageInputStream {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        let span = self.attachment.span()?;
        check_bounds(self.offset, buf.len(), self.attachment.len())
            .map_err(|e| VellumError::decode("Record truncated", e))?;
        span.read_into(self.offset, buf)?;
        self.offset += buf.len();
        Ok(())
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.available())
    }
}
