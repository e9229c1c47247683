//! Random-access reader/writer over a storage view

use crate::error::{Result, VellumError};
use crate::storage::{check_bounds, ByteOrder, Span, StorageHandle};
use crate::wire::{WireRead, WireWrite};

macro_rules! channel_accessors {
    ($(($ty:ty, $read:ident, $write:ident)),* $(,)?) => {
        $(
            #[doc = concat!("Read a `", stringify!($ty), "` at the position and advance past it")]
            pub fn $read(&mut self) -> Result<$ty> {
                let span = self.span()?;
                let value = span.read::<$ty>(self.position, self.order)?;
                self.position += std::mem::size_of::<$ty>();
                Ok(value)
            }

            #[doc = concat!("Write a `", stringify!($ty), "` at the position and advance past it")]
            pub fn $write(&mut self, value: $ty) -> Result<()> {
                let span = self.span()?;
                span.write::<$ty>(self.position, value, self.order)?;
                self.position += std::mem::size_of::<$ty>();
                Ok(())
            }
        )*
    };
}

/// Bidirectional cursor over a storage view.
///
/// Typed accessors use the channel's byte order (native unless changed);
/// wire records are always big-endian. Closing a channel never closes the
/// storage.
#[derive(Debug)]
pub struct StorageChannel {
    handle: StorageHandle,
    position: usize,
    order: ByteOrder,
    closed: bool,
}

impl StorageChannel {
    pub(crate) fn new(span: &Span) -> Result<Self> {
        if span.is_closed() {
            return Err(VellumError::closed("storage"));
        }
        Ok(Self {
            handle: span.handle(),
            position: 0,
            order: ByteOrder::native(),
            closed: false,
        })
    }

    fn span(&self) -> Result<Span> {
        if self.closed {
            return Err(VellumError::closed("channel"));
        }
        self.handle.resolve()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.handle.len() {
            return Err(VellumError::out_of_bounds(position, 0, self.handle.len()));
        }
        self.position = position;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn remaining(&self) -> usize {
        self.handle.len() - self.position
    }

    pub fn size(&self) -> usize {
        self.handle.len()
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    pub fn is_closed(&self) -> bool {
        self.closed || self.handle.is_closed()
    }

    /// Detach from the storage; the storage itself stays open
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let span = self.span()?;
        let value = span.read::<u8>(self.position, self.order)?;
        self.position += 1;
        Ok(value)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        let span = self.span()?;
        span.write::<u8>(self.position, value, self.order)?;
        self.position += 1;
        Ok(())
    }

    channel_accessors! {
        (i16, read_short, write_short),
        (u16, read_char, write_char),
        (i32, read_int, write_int),
        (i64, read_long, write_long),
        (f32, read_float, write_float),
        (f64, read_double, write_double),
    }

    /// Fill `dst` from the position
    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        let span = self.span()?;
        span.read_into(self.position, dst)?;
        self.position += dst.len();
        Ok(())
    }

    /// Copy `src` to the position
    pub fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        let span = self.span()?;
        span.write_from(self.position, src)?;
        self.position += src.len();
        Ok(())
    }
}

impl WireWrite for StorageChannel {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_bytes(bytes)
    }
}

impl WireRead for StorageChannel {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        let span = self.span()?;
        check_bounds(self.position, buf.len(), self.handle.len())
            .map_err(|e| VellumError::decode("Record truncated", e))?;
        span.read_into(self.position, buf)?;
        self.position += buf.len();
        Ok(())
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.remaining())
    }
}
