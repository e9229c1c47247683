//! The accessor surface shared by owned regions and slices

use std::{
    fmt,
    fs::File,
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::config::FILE_CHUNK_SIZE;
use crate::error::{Result, VellumError};
use crate::stream::{StorageChannel, StorageInputStream, StorageOutputStream};

use super::config::{ByteOrder, RegionKind};
use super::raw::RegionId;
use super::handle::StorageHandle;
use super::slice::StorageSlice;
use super::span::{check_bounds, Span};

pub(crate) mod sealed {
    pub trait Sealed {
        fn span(&self) -> &super::Span;
    }
}

macro_rules! primitive_accessors {
    ($(($ty:ty, $get:ident, $set:ident, $get_ordered:ident, $set_ordered:ident)),* $(,)?) => {
        $(
            #[doc = concat!("Read a native-order `", stringify!($ty), "` at `offset`")]
            fn $get(&self, offset: usize) -> Result<$ty> {
                self.span().read::<$ty>(offset, ByteOrder::native())
            }

            #[doc = concat!("Write a native-order `", stringify!($ty), "` at `offset`")]
            fn $set(&self, offset: usize, value: $ty) -> Result<()> {
                self.span().write::<$ty>(offset, value, ByteOrder::native())
            }

            #[doc = concat!("Read a `", stringify!($ty), "` at `offset` in the given byte order")]
            fn $get_ordered(&self, offset: usize, order: ByteOrder) -> Result<$ty> {
                self.span().read::<$ty>(offset, order)
            }

            #[doc = concat!("Write a `", stringify!($ty), "` at `offset` in the given byte order")]
            fn $set_ordered(&self, offset: usize, value: $ty, order: ByteOrder) -> Result<()> {
                self.span().write::<$ty>(offset, value, order)
            }
        )*
    };
}

/// Raw, bounds-checked access to a storage region.
///
/// Every accessor fails with [`VellumError::OutOfBounds`] when
/// `offset + width` exceeds [`size`](Storage::size) and with a closed-state
/// error once the region (or, for a slice, its parent) has been closed.
///
/// Concurrent writers to overlapping ranges must be serialized by the
/// caller.
pub trait Storage: sealed::Sealed + Send + Sync + fmt::Debug {
    /// Close the region. Calling this a second time is a no-op.
    fn close(&self) -> Result<()>;

    /// Identity of the underlying region
    fn id(&self) -> RegionId {
        self.span().core().id()
    }

    /// Addressable length in bytes
    fn size(&self) -> usize {
        self.span().len()
    }

    fn kind(&self) -> RegionKind {
        self.span().core().kind()
    }

    fn is_closed(&self) -> bool {
        self.span().is_closed()
    }

    /// Linked streams that will be force-closed with this region
    fn linked_streams(&self) -> usize {
        self.span().core().monitor().len()
    }

    /// Non-owning, generation-checked handle for this view
    fn handle(&self) -> StorageHandle {
        self.span().handle()
    }

    fn get_byte(&self, offset: usize) -> Result<u8> {
        self.span().read::<u8>(offset, ByteOrder::native())
    }

    fn set_byte(&self, offset: usize, value: u8) -> Result<()> {
        self.span().write::<u8>(offset, value, ByteOrder::native())
    }

    primitive_accessors! {
        (i16, get_short, set_short, get_short_ordered, set_short_ordered),
        (u16, get_char, set_char, get_char_ordered, set_char_ordered),
        (i32, get_int, set_int, get_int_ordered, set_int_ordered),
        (i64, get_long, set_long, get_long_ordered, set_long_ordered),
        (f32, get_float, set_float, get_float_ordered, set_float_ordered),
        (f64, get_double, set_double, get_double_ordered, set_double_ordered),
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`
    fn get_bytes(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.span().read_into(offset, dst)
    }

    /// Copy `src` into the region starting at `offset`
    fn set_bytes(&self, offset: usize, src: &[u8]) -> Result<()> {
        self.span().write_from(offset, src)
    }

    /// Set `len` bytes starting at `offset` to `byte`
    fn fill(&self, offset: usize, len: usize, byte: u8) -> Result<()> {
        self.span().fill(offset, len, byte)
    }

    /// Dependent view of `[offset, offset + size)`.
    ///
    /// The slice shares this region's memory, cannot be closed on its own and
    /// reports closed as soon as the owning region is closed.
    fn slice(&self, offset: usize, size: usize) -> Result<StorageSlice> {
        Ok(StorageSlice::new(self.span().sub(offset, size)?))
    }

    /// Sequential reader over this view
    fn input_stream(&self, linked: bool) -> Result<StorageInputStream> {
        StorageInputStream::new(self.span(), linked)
    }

    /// Sequential writer over this view
    fn output_stream(&self, linked: bool) -> Result<StorageOutputStream> {
        StorageOutputStream::new(self.span(), linked)
    }

    /// Random-access reader/writer over this view
    fn channel(&self) -> Result<StorageChannel> {
        StorageChannel::new(self.span())
    }

    /// Write `len` bytes starting at `offset` to `path`, replacing its contents
    fn to_file(&self, path: &Path, offset: usize, len: usize) -> Result<()> {
        let span = self.span();
        if span.is_closed() {
            return Err(VellumError::closed("storage"));
        }
        check_bounds(offset, len, span.len())?;
        if len == 0 {
            return Ok(());
        }

        let mut file = File::create(path)
            .map_err(|e| VellumError::from_io(e, "Failed to create output file"))?;
        let mut chunk = vec![0u8; FILE_CHUNK_SIZE.min(len)];
        let mut copied = 0;
        while copied < len {
            let n = chunk.len().min(len - copied);
            span.read_into(offset + copied, &mut chunk[..n])?;
            file.write_all(&chunk[..n])
                .map_err(|e| VellumError::from_io(e, "Failed to write output file"))?;
            copied += n;
        }
        file.flush()
            .map_err(|e| VellumError::from_io(e, "Failed to flush output file"))
    }

    /// Read `len` bytes of `path`, starting at `file_offset`, into this view at `offset`
    fn from_file(&self, path: &Path, file_offset: u64, len: usize, offset: usize) -> Result<()> {
        let span = self.span();
        if span.is_closed() {
            return Err(VellumError::closed("storage"));
        }
        check_bounds(offset, len, span.len())?;
        if len == 0 {
            return Ok(());
        }

        let mut file =
            File::open(path).map_err(|e| VellumError::from_io(e, "Failed to open input file"))?;
        file.seek(SeekFrom::Start(file_offset))
            .map_err(|e| VellumError::from_io(e, "Failed to seek input file"))?;

        let mut chunk = vec![0u8; FILE_CHUNK_SIZE.min(len)];
        let mut copied = 0;
        while copied < len {
            let want = chunk.len().min(len - copied);
            let n = file
                .read(&mut chunk[..want])
                .map_err(|e| VellumError::from_io(e, "Failed to read input file"))?;
            if n == 0 {
                return Err(VellumError::invalid_parameter(
                    "len",
                    format!("File ended after {} of {} bytes", copied, len),
                ));
            }
            span.write_from(offset + copied, &chunk[..n])?;
            copied += n;
        }
        Ok(())
    }
}
