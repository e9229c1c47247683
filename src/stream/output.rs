//! Sequential writer over a storage view

use std::io;

use crate::error::{Result, VellumError};
use crate::storage::{check_bounds, Span};
use crate::wire::WireWrite;

use super::Attachment;

/// Cursor-based writer; writing past the end of the view fails
#[derive(Debug)]
pub struct StorageOutputStream {
    attachment: Attachment,
    offset: usize,
}

impl StorageOutputStream {
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

    /// Room left between the cursor and the end of the view
    pub fn remaining(&self) -> usize {
        self.attachment.len() - self.offset
    }

    /// Write all of `bytes` at the cursor
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let span = self.attachment.span()?;
        check_bounds(self.offset, bytes.len(), self.attachment.len())?;
        span.write_from(self.offset, bytes)?;
        self.offset += bytes.len();
        Ok(())
    }

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

impl io::Write for StorageOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        if n == 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "storage output stream is full",
            ));
        }
        self.write_bytes(&buf[..n])?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.attachment.span()?;
        Ok(())
    }
}

impl WireWrite for StorageOutputStream {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_bytes(bytes)
    }
}
