//! In-memory field table of a record store
//!
//! Row 0 is the sentinel. A table built programmatically carries the
//! pristine sentinel `("null", Null, 0, -1)`; a table rebuilt from storage
//! carries a blank row instead, which is how provenance is told apart.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{Result, VellumError};
use crate::wire::WireValue;

use super::modifiers::Modifiers;

const SENTINEL_NAME: &str = "null";
const SENTINEL_OFFSET: i64 = -1;

#[derive(Debug)]
pub(crate) struct FieldRow {
    pub(crate) name: String,
    pub(crate) value: Mutex<WireValue>,
    pub(crate) modifiers: Modifiers,
    /// Stream offset of the value as of the last flush
    pub(crate) offset: AtomicI64,
}

impl FieldRow {
    fn new(name: String, value: WireValue, modifiers: Modifiers, offset: i64) -> Self {
        Self {
            name,
            value: Mutex::new(value),
            modifiers,
            offset: AtomicI64::new(offset),
        }
    }
}

#[derive(Debug)]
pub(crate) struct FieldTable {
    rows: RwLock<Vec<FieldRow>>,
}

impl FieldTable {
    /// Table for a store created by its constructor
    pub(crate) fn with_sentinel() -> Self {
        Self {
            rows: RwLock::new(vec![FieldRow::new(
                SENTINEL_NAME.to_string(),
                WireValue::Null,
                Modifiers::NONE,
                SENTINEL_OFFSET,
            )]),
        }
    }

    /// Table for a store rebuilt from storage
    pub(crate) fn hydrated() -> Self {
        Self {
            rows: RwLock::new(vec![FieldRow::new(
                String::new(),
                WireValue::Null,
                Modifiers::NONE,
                0,
            )]),
        }
    }

    pub(crate) fn is_constructor_born(&self) -> bool {
        let rows = self.rows.read();
        let sentinel = &rows[0];
        sentinel.name == SENTINEL_NAME
            && sentinel.value.lock().is_null()
            && sentinel.modifiers == Modifiers::NONE
            && sentinel.offset.load(Ordering::Relaxed) == SENTINEL_OFFSET
    }

    /// Rows including the sentinel
    pub(crate) fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    pub(crate) fn id_of(&self, name: &str) -> Option<usize> {
        self.rows
            .read()
            .iter()
            .skip(1)
            .position(|row| row.name == name)
            .map(|index| index + 1)
    }

    /// Append a row, returning its id
    pub(crate) fn push(
        &self,
        name: String,
        value: WireValue,
        modifiers: Modifiers,
        offset: i64,
    ) -> Result<usize> {
        let mut rows = self.rows.write();
        if rows.iter().skip(1).any(|row| row.name == name) {
            return Err(VellumError::duplicate_field(name));
        }
        rows.push(FieldRow::new(name, value, modifiers, offset));
        Ok(rows.len() - 1)
    }

    /// Append all rows or none
    pub(crate) fn push_all(&self, fields: Vec<(String, WireValue, Modifiers)>) -> Result<Vec<usize>> {
        let mut rows = self.rows.write();
        for (index, (name, _, _)) in fields.iter().enumerate() {
            let taken = rows.iter().skip(1).any(|row| &row.name == name)
                || fields[..index].iter().any(|(earlier, _, _)| earlier == name);
            if taken {
                return Err(VellumError::duplicate_field(name.clone()));
            }
        }
        let first = rows.len();
        for (name, value, modifiers) in fields {
            rows.push(FieldRow::new(name, value, modifiers, -1));
        }
        Ok((first..rows.len()).collect())
    }

    /// Drop rows added after `len`
    pub(crate) fn truncate(&self, len: usize) {
        let mut rows = self.rows.write();
        if len >= 1 {
            rows.truncate(len);
        }
    }

    fn check_id(rows: &[FieldRow], id: usize) -> Result<()> {
        if id == 0 || id >= rows.len() {
            return Err(VellumError::unknown_field(format!("#{}", id)));
        }
        Ok(())
    }

    /// Run `f` on a user row; the sentinel and out-of-range ids are rejected
    pub(crate) fn with_row<R>(&self, id: usize, f: impl FnOnce(&FieldRow) -> R) -> Result<R> {
        let rows = self.rows.read();
        Self::check_id(&rows, id)?;
        Ok(f(&rows[id]))
    }

    /// Run `f` on every user row (id order) under one read lock
    pub(crate) fn visit<R>(&self, f: impl FnOnce(&[FieldRow]) -> R) -> R {
        let rows = self.rows.read();
        f(&rows[1..])
    }
}
