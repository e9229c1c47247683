//! Filtered views over a store's field metadata

use std::{fmt, sync::Arc};

use crate::error::{Result, VellumError};
use crate::wire::WireValue;

use super::layout::FieldMetadata;
use super::store::RecordStore;

/// A composable predicate over field metadata
#[derive(Clone)]
pub struct FieldFilter {
    predicate: Arc<dyn Fn(&FieldMetadata) -> bool + Send + Sync>,
}

impl FieldFilter {
    pub fn new(predicate: impl Fn(&FieldMetadata) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Matches every field
    pub fn any() -> Self {
        Self::new(|_| true)
    }

    pub fn public() -> Self {
        Self::new(|meta| meta.modifiers.is_public())
    }

    /// Fields without the immutable modifier
    pub fn mutable() -> Self {
        Self::new(|meta| !meta.modifiers.is_final())
    }

    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |meta| meta.name == name)
    }

    pub fn and(self, other: FieldFilter) -> Self {
        Self::new(move |meta| self.matches(meta) && other.matches(meta))
    }

    pub fn or(self, other: FieldFilter) -> Self {
        Self::new(move |meta| self.matches(meta) || other.matches(meta))
    }

    pub fn xor(self, other: FieldFilter) -> Self {
        Self::new(move |meta| self.matches(meta) != other.matches(meta))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::new(move |meta| !self.matches(meta))
    }

    pub fn matches(&self, meta: &FieldMetadata) -> bool {
        (self.predicate)(meta)
    }
}

impl fmt::Debug for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldFilter")
    }
}

/// A field together with its current value
#[derive(Debug, Clone, PartialEq)]
pub struct InspectedField {
    pub meta: FieldMetadata,
    pub value: WireValue,
}

impl fmt::Display for InspectedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.meta, self.value)
    }
}

/// Read-only inspection of a record store
#[derive(Debug)]
pub struct FieldInspector<'a> {
    store: &'a RecordStore,
}

impl<'a> FieldInspector<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    pub fn field_count(&self) -> usize {
        self.store.field_count()
    }

    pub fn metadata(&self) -> Vec<FieldMetadata> {
        self.store.field_metadata()
    }

    /// Metadata matching `filter`, in id order
    pub fn filtered(&self, filter: &FieldFilter) -> Vec<FieldMetadata> {
        self.metadata()
            .into_iter()
            .filter(|meta| filter.matches(meta))
            .collect()
    }

    pub fn public_fields(&self) -> Vec<FieldMetadata> {
        self.filtered(&FieldFilter::public())
    }

    pub fn mutable_fields(&self) -> Vec<FieldMetadata> {
        self.filtered(&FieldFilter::mutable())
    }

    /// One field by name, with its value
    pub fn field(&self, name: &str) -> Result<InspectedField> {
        let meta = self
            .metadata()
            .into_iter()
            .find(|meta| meta.name == name)
            .ok_or_else(|| VellumError::unknown_field(name))?;
        let value = self.store.get_field(meta.id)?;
        Ok(InspectedField { meta, value })
    }

    /// Every field with its value
    pub fn fields(&self) -> Result<Vec<InspectedField>> {
        self.metadata()
            .into_iter()
            .map(|meta| {
                let value = self.store.get_field(meta.id)?;
                Ok(InspectedField { meta, value })
            })
            .collect()
    }

    /// One line per field
    pub fn summary(&self) -> Result<String> {
        Ok(self
            .fields()?
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
