//! Field metadata snapshots and the printable store layout

use std::fmt;

use serde::{Deserialize, Serialize};

use super::modifiers::Modifiers;

/// How a record store came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Built field by field; the sentinel row is untouched
    Constructor,
    /// Rebuilt from a persisted image
    Serialization,
}

/// One field row as of the last flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub id: usize,
    pub name: String,
    pub modifiers: Modifiers,
    /// Stream offset of the value record; -1 before the first flush
    pub offset: i64,
    pub type_name: String,
}

impl fmt::Display for FieldMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FieldMetadata{{\"{}\" | @{} | mod:\"{}\"}}",
            self.name, self.offset, self.modifiers
        )
    }
}

/// Snapshot of a store's fields, printable as a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreLayout {
    pub type_name: String,
    pub storage_size: usize,
    pub source: Source,
    pub fields: Vec<FieldMetadata>,
}

impl fmt::Display for StoreLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} bytes, {:?})",
            self.type_name, self.storage_size, self.source
        )?;
        let name_width = self
            .fields
            .iter()
            .map(|m| m.name.len())
            .max()
            .unwrap_or(0)
            .max("name".len());
        writeln!(
            f,
            "  {:<4} | {:<width$} | {:<8} | {:<21} | offset",
            "id",
            "name",
            "type",
            "modifiers",
            width = name_width
        )?;
        for meta in &self.fields {
            writeln!(
                f,
                "  {:<4} | {:<width$} | {:<8} | {:<21} | @{}",
                meta.id,
                meta.name,
                meta.type_name,
                meta.modifiers.to_string(),
                meta.offset,
                width = name_width
            )?;
        }
        Ok(())
    }
}
