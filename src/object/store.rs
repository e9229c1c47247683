//! Record store: a named field table persisted inside a storage region
//!
//! The persisted image, written from offset 0 of the backing storage, is a
//! sequence of wire records:
//!
//! ```text
//! Long  storage size
//! Int   field count (sentinel excluded)
//! per field:
//!   String  name
//!   <value> any registered record
//!   Int     modifier bits
//!   Long    stream offset of <value>
//! ```
//!
//! Every successful add or set rewrites the whole image.

use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use log::trace;
use parking_lot::Mutex;

use crate::config::FILE_CHUNK_SIZE;
use crate::diagnostics::diag;
use crate::error::{Result, VellumError};
use crate::storage::{OffHeapStorage, Storage};
use crate::wire::{codec, WireRead, WireType, WireValue, WireWrite};

use super::layout::{FieldMetadata, Source, StoreLayout};
use super::modifiers::Modifiers;
use super::table::FieldTable;

/// Bytes taken by the size and count records at the start of an image
pub const HEADER_LEN: usize = 16 + 12;

/// A field to add as part of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub value: WireValue,
    pub modifiers: Modifiers,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, value: impl Into<WireValue>, modifiers: Modifiers) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            modifiers,
        }
    }

    /// A field that starts out null
    pub fn empty(name: impl Into<String>, modifiers: Modifiers) -> Self {
        Self::new(name, WireValue::Null, modifiers)
    }
}

/// Named, typed fields kept in sync with a storage region.
///
/// `compare_and_swap_field` is the only mutation that is atomic with respect
/// to other threads. Adds, sets and flushes rewrite several rows and must be
/// serialized by the caller when they can race.
pub struct RecordStore {
    storage: OffHeapStorage,
    table: FieldTable,
    flush_lock: Mutex<()>,
    closed: AtomicBool,
}

fn expect_long(value: WireValue, what: &str) -> Result<i64> {
    match value {
        WireValue::Long(v) => Ok(v),
        other => Err(VellumError::corrupt(format!(
            "Expected a long record for the {}, found {}",
            what,
            other.type_name()
        ))),
    }
}

fn expect_int(value: WireValue, what: &str) -> Result<i32> {
    match value {
        WireValue::Int(v) => Ok(v),
        other => Err(VellumError::corrupt(format!(
            "Expected an int record for the {}, found {}",
            what,
            other.type_name()
        ))),
    }
}

impl RecordStore {
    /// Empty store backed by `storage`
    pub fn new(storage: OffHeapStorage) -> Result<Self> {
        if storage.is_closed() {
            return Err(VellumError::closed("storage"));
        }
        Ok(Self {
            storage,
            table: FieldTable::with_sentinel(),
            flush_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Empty store backed by a freshly allocated region of `size` bytes
    pub fn allocate(size: usize) -> Result<Self> {
        Self::new(OffHeapStorage::allocate(size)?)
    }

    /// Rebuild a store from the image already present in `storage`.
    ///
    /// When `expected_size` is given, both the storage and the size recorded
    /// in the image must match it.
    pub fn from_storage(storage: OffHeapStorage, expected_size: Option<usize>) -> Result<Self> {
        if let Some(expected) = expected_size {
            if storage.size() != expected {
                return Err(VellumError::invalid_parameter(
                    "size",
                    format!("Storage holds {} bytes, expected {}", storage.size(), expected),
                ));
            }
        }
        let table = Self::hydrate(&storage, expected_size)?;
        Ok(Self {
            storage,
            table,
            flush_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    fn hydrate(storage: &OffHeapStorage, expected_size: Option<usize>) -> Result<FieldTable> {
        let mut input = storage.input_stream(false)?;
        let size = expect_long(input.read_value()?, "storage size")?;
        if let Some(expected) = expected_size {
            if size != expected as i64 {
                return Err(VellumError::invalid_parameter(
                    "size",
                    format!("Image declares {} bytes, expected {}", size, expected),
                ));
            }
        }
        let count = expect_int(input.read_value()?, "field count")?;
        if count < 0 {
            return Err(VellumError::corrupt(format!("Negative field count {}", count)));
        }

        let table = FieldTable::hydrated();
        for _ in 0..count {
            let name = match input.read_value()? {
                WireValue::Str(name) => name,
                other => {
                    return Err(VellumError::corrupt(format!(
                        "Expected a field name, found {}",
                        other.type_name()
                    )))
                }
            };
            let value = input.read_value()?;
            let modifiers = Modifiers::from(expect_int(input.read_value()?, "modifiers")?);
            let offset = expect_long(input.read_value()?, "field offset")?;
            table
                .push(name, value, modifiers, offset)
                .map_err(|e| VellumError::decode("Persisted image repeats a field", e))?;
        }
        Ok(table)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(VellumError::closed("record store"));
        }
        if self.storage.is_closed() {
            return Err(VellumError::closed("storage"));
        }
        Ok(())
    }

    fn check_modifiers(name: &str, modifiers: Modifiers) -> Result<Modifiers> {
        let modifiers = modifiers.masked();
        if !modifiers.is_persistable() {
            return Err(VellumError::invalid_parameter(
                name,
                "Static and transient fields cannot be stored",
            ));
        }
        Ok(modifiers)
    }

    /// Add a field and flush, returning its id.
    ///
    /// If the flush fails (for instance because the image no longer fits)
    /// the field is removed again.
    pub fn add_field(
        &self,
        name: impl Into<String>,
        value: impl Into<WireValue>,
        modifiers: Modifiers,
    ) -> Result<usize> {
        self.ensure_open()?;
        let name = name.into();
        let modifiers = Self::check_modifiers(&name, modifiers)?;
        let id = self.table.push(name, value.into(), modifiers, -1)?;
        if let Err(e) = self.flush() {
            self.table.truncate(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Add every field or none, then flush once
    pub fn add_fields(&self, fields: Vec<FieldSpec>) -> Result<Vec<usize>> {
        self.ensure_open()?;
        let rows = fields
            .into_iter()
            .map(|spec| {
                let modifiers = Self::check_modifiers(&spec.name, spec.modifiers)?;
                Ok((spec.name, spec.value, modifiers))
            })
            .collect::<Result<Vec<_>>>()?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids = self.table.push_all(rows)?;
        if let Err(e) = self.flush() {
            self.table.truncate(ids[0]);
            return Err(e);
        }
        Ok(ids)
    }

    pub fn get_field(&self, id: usize) -> Result<WireValue> {
        self.ensure_open()?;
        self.table.with_row(id, |row| row.value.lock().clone())
    }

    /// Replace the value of a mutable field and flush
    pub fn set_field(&self, id: usize, value: impl Into<WireValue>) -> Result<()> {
        self.ensure_open()?;
        let value = value.into();
        let previous = self.table.with_row(id, |row| {
            if row.modifiers.is_final() {
                return Err(VellumError::immutable_field(row.name.clone()));
            }
            Ok(std::mem::replace(&mut *row.value.lock(), value))
        })??;
        self.flush_or_restore(id, previous)
    }

    /// Flush, putting `previous` back into row `id` if the flush fails
    fn flush_or_restore(&self, id: usize, previous: WireValue) -> Result<()> {
        if let Err(e) = self.flush() {
            self.table.with_row(id, |row| *row.value.lock() = previous)?;
            return Err(e);
        }
        Ok(())
    }

    /// Replace a value even if the field is immutable, then flush
    pub fn force_set_field(&self, id: usize, value: impl Into<WireValue>) -> Result<()> {
        self.ensure_open()?;
        let previous = self.table.with_row(id, |row| {
            if row.modifiers.is_final() {
                diag!("Forcing a new value into immutable field {}", row.name);
            }
            std::mem::replace(&mut *row.value.lock(), value.into())
        })?;
        self.flush_or_restore(id, previous)
    }

    /// Overwrite a row without flushing; immutability is not checked
    pub(crate) fn replace_unflushed(&self, id: usize, value: WireValue) -> Result<()> {
        self.table.with_row(id, |row| *row.value.lock() = value)
    }

    /// Atomically replace the value of field `id` if it equals `expected`.
    ///
    /// Returns whether the swap happened; only a successful swap flushes.
    /// Immutable fields are rejected just like with [`set_field`](Self::set_field).
    pub fn compare_and_swap_field(
        &self,
        id: usize,
        expected: &WireValue,
        new_value: impl Into<WireValue>,
    ) -> Result<bool> {
        self.ensure_open()?;
        let new_value = new_value.into();
        let swapped = self.table.with_row(id, |row| {
            if row.modifiers.is_final() {
                return Err(VellumError::immutable_field(row.name.clone()));
            }
            let mut slot = row.value.lock();
            if *slot == *expected {
                *slot = new_value;
                Ok(true)
            } else {
                Ok(false)
            }
        })??;
        if swapped {
            self.flush_or_restore(id, expected.clone())?;
        }
        Ok(swapped)
    }

    pub fn field_id(&self, name: &str) -> Result<usize> {
        self.ensure_open()?;
        self.table
            .id_of(name)
            .ok_or_else(|| VellumError::unknown_field(name))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.table.id_of(name).is_some()
    }

    fn public_id(&self, name: &str) -> Result<usize> {
        let id = self.field_id(name)?;
        if !self.modifiers(id)?.is_public() {
            return Err(VellumError::access_denied(name));
        }
        Ok(id)
    }

    /// Read a public field by name
    pub fn get(&self, name: &str) -> Result<WireValue> {
        let id = self.public_id(name)?;
        self.get_field(id)
    }

    /// Write a public field by name
    pub fn set(&self, name: &str, value: impl Into<WireValue>) -> Result<()> {
        let id = self.public_id(name)?;
        self.set_field(id, value)
    }

    /// Fields excluding the sentinel row
    pub fn field_count(&self) -> usize {
        self.table.row_count() - 1
    }

    pub fn modifiers(&self, id: usize) -> Result<Modifiers> {
        self.table.with_row(id, |row| row.modifiers)
    }

    pub fn field_metadata(&self) -> Vec<FieldMetadata> {
        self.table.visit(|rows| {
            rows.iter()
                .enumerate()
                .map(|(index, row)| FieldMetadata {
                    id: index + 1,
                    name: row.name.clone(),
                    modifiers: row.modifiers,
                    offset: row.offset.load(Ordering::Relaxed),
                    type_name: row.value.lock().type_name().to_string(),
                })
                .collect()
        })
    }

    pub fn layout(&self) -> StoreLayout {
        self.layout_named("RecordStore")
    }

    pub(crate) fn layout_named(&self, type_name: &str) -> StoreLayout {
        StoreLayout {
            type_name: type_name.to_string(),
            storage_size: self.storage.size(),
            source: self.source(),
            fields: self.field_metadata(),
        }
    }

    /// Whether this store was built by its constructor or rebuilt from an image
    pub fn source(&self) -> Source {
        if self.table.is_constructor_born() {
            Source::Constructor
        } else {
            Source::Serialization
        }
    }

    /// Rewrite the whole image into the backing storage
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.flush_lock.lock();
        self.flush_locked()
    }

    /// Encode the image off to the side and copy it in only once it is
    /// known to fit, so a failed flush leaves the previous image intact
    fn flush_locked(&self) -> Result<()> {
        let mut image: Vec<u8> = Vec::with_capacity(self.storage.size().min(FILE_CHUNK_SIZE));
        codec::write_value(&mut image, &WireValue::Long(self.storage.size() as i64))?;
        let offsets = self.table.visit(|rows| {
            let count = i32::try_from(rows.len()).map_err(|_| {
                VellumError::invalid_parameter("fields", "Too many fields for one store")
            })?;
            codec::write_value(&mut image, &WireValue::Int(count))?;
            let mut offsets = Vec::with_capacity(rows.len());
            for row in rows {
                codec::write_value(&mut image, &WireValue::Str(row.name.clone()))?;
                let offset = image.len() as i64;
                let value = row.value.lock().clone();
                codec::write_value(&mut image, &value)?;
                codec::write_value(&mut image, &WireValue::Int(row.modifiers.bits() as i32))?;
                codec::write_value(&mut image, &WireValue::Long(offset))?;
                offsets.push(offset);
            }
            Ok::<_, VellumError>(offsets)
        })?;
        if image.len() > self.storage.size() {
            return Err(VellumError::out_of_bounds(0, image.len(), self.storage.size()));
        }

        self.storage.set_bytes(0, &image)?;
        self.table.visit(|rows| {
            for (row, offset) in rows.iter().zip(offsets) {
                row.offset.store(offset, Ordering::Relaxed);
            }
        });
        trace!(
            "Flushed record store into region {} ({} of {} bytes)",
            self.storage.id(),
            image.len(),
            self.storage.size()
        );
        Ok(())
    }

    /// Flush, then copy the entire storage image to `out`
    pub fn write_body(&self, out: &mut dyn WireWrite) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.flush_lock.lock();
        self.flush_locked()?;

        let size = self.storage.size();
        let mut chunk = vec![0u8; FILE_CHUNK_SIZE.min(size)];
        let mut copied = 0;
        while copied < size {
            let n = chunk.len().min(size - copied);
            self.storage.get_bytes(copied, &mut chunk[..n])?;
            out.write_raw(&chunk[..n])?;
            copied += n;
        }
        Ok(())
    }

    /// Read an image written by [`write_body`](Self::write_body) into a new
    /// region sized from the image itself
    pub fn read_body(input: &mut dyn WireRead) -> Result<Self> {
        let size = expect_long(codec::read_value(input)?, "storage size")?;
        let size = usize::try_from(size)
            .ok()
            .filter(|size| *size >= HEADER_LEN)
            .ok_or_else(|| VellumError::corrupt(format!("Invalid storage size {}", size)))?;
        let count = expect_int(codec::read_value(input)?, "field count")?;
        let body_len = size - HEADER_LEN;
        if let Some(remaining) = input.remaining_hint() {
            if body_len > remaining {
                return Err(VellumError::corrupt(format!(
                    "Image of {} bytes is longer than the {} bytes left",
                    size,
                    remaining + HEADER_LEN
                )));
            }
        }

        let storage = OffHeapStorage::allocate_with(size, true)?;
        let table = match Self::transfer(&storage, input, size, count, body_len)
            .and_then(|_| Self::hydrate(&storage, Some(size)))
        {
            Ok(table) => table,
            Err(e) => {
                storage.close()?;
                return Err(e);
            }
        };
        Ok(Self {
            storage,
            table,
            flush_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    fn transfer(
        storage: &OffHeapStorage,
        input: &mut dyn WireRead,
        size: usize,
        count: i32,
        body_len: usize,
    ) -> Result<()> {
        let mut out = storage.output_stream(false)?;
        out.write_value(&WireValue::Long(size as i64))?;
        out.write_value(&WireValue::Int(count))?;
        let mut chunk = vec![0u8; FILE_CHUNK_SIZE.min(body_len.max(1))];
        let mut copied = 0;
        while copied < body_len {
            let n = chunk.len().min(body_len - copied);
            input.read_raw(&mut chunk[..n])?;
            out.write_bytes(&chunk[..n])?;
            copied += n;
        }
        Ok(())
    }

    pub fn storage(&self) -> &OffHeapStorage {
        &self.storage
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.storage.is_closed()
    }

    /// Close the store and its storage. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.storage.close()
    }

    /// Give up the store and keep its storage open
    pub fn into_storage(self) -> OffHeapStorage {
        self.storage
    }
}

impl PartialEq for RecordStore {
    /// Same field names, modifiers and values, in the same order
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let theirs: Vec<(String, Modifiers, WireValue)> = other.table.visit(|rows| {
            rows.iter()
                .map(|row| (row.name.clone(), row.modifiers, row.value.lock().clone()))
                .collect()
        });
        self.table.visit(|mine| {
            mine.len() == theirs.len()
                && mine.iter().zip(&theirs).all(|(a, (name, modifiers, value))| {
                    a.name == *name && a.modifiers == *modifiers && *a.value.lock() == *value
                })
        })
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("storage", &self.storage)
            .field("fields", &self.field_count())
            .field("source", &self.source())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl WireType for RecordStore {
    const TYPE_NAME: &'static str = "record_store";

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        self.write_body(out)
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        Self::read_body(input)
    }
}
