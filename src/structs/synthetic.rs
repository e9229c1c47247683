//! Structs whose field set is declared at runtime

use std::{fmt, sync::Arc};

use log::debug;

use crate::error::{Result, VellumError};
use crate::object::{FieldSpec, Modifiers, RecordStore, StoreLayout};
use crate::storage::{OffHeapStorage, Storage};
use crate::wire::{codec, WireRead, WireType, WireValue, WireWrite};

/// Construction logic run once when a synthetic struct is created
pub type ConstructorFn = Arc<dyn Fn(&SyntheticStruct, &[WireValue]) -> Result<()> + Send + Sync>;

/// A record store with a named, programmatically declared field set.
///
/// The optional constructor runs exactly once for every instance created
/// through [`create_new`](Self::create_new) or
/// [`StructBuilder::build`](super::StructBuilder::build). Decoding never runs
/// it; a decoded instance carries no constructor at all.
pub struct SyntheticStruct {
    name: String,
    store: RecordStore,
    template: Vec<FieldSpec>,
    constructor: Option<ConstructorFn>,
}

impl SyntheticStruct {
    /// Create an instance in `storage` from a field template, then run the
    /// constructor with `args`.
    ///
    /// If the constructor fails, the storage is closed again.
    pub fn create_empty(
        name: impl Into<String>,
        storage: OffHeapStorage,
        template: Vec<FieldSpec>,
        constructor: Option<ConstructorFn>,
        args: &[WireValue],
    ) -> Result<Self> {
        let store = RecordStore::new(storage)?;
        if let Err(e) = store.add_fields(template.clone()) {
            store.close()?;
            return Err(e);
        }
        let instance = Self {
            name: name.into(),
            store,
            template,
            constructor,
        };
        if let Some(constructor) = instance.constructor.clone() {
            if let Err(e) = constructor(&instance, args) {
                instance.store.close()?;
                return Err(e);
            }
        }
        debug!(
            "Created synthetic struct {} with {} fields in region {}",
            instance.name,
            instance.template.len(),
            instance.store.storage().id()
        );
        Ok(instance)
    }

    /// A fresh instance with this struct's template and constructor
    pub fn create_new(&self, storage: OffHeapStorage, args: &[WireValue]) -> Result<Self> {
        Self::create_empty(
            self.name.clone(),
            storage,
            self.template.clone(),
            self.constructor.clone(),
            args,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_synthetic(&self) -> bool {
        true
    }

    /// Whether this instance can run construction logic for new instances
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn template(&self) -> &[FieldSpec] {
        &self.template
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Add a field to this instance only; the template is unchanged
    pub fn add_field(
        &self,
        name: impl Into<String>,
        value: impl Into<WireValue>,
        modifiers: Modifiers,
    ) -> Result<usize> {
        self.store.add_field(name, value, modifiers)
    }

    /// Read a field by name regardless of its visibility
    pub fn get_field(&self, name: &str) -> Result<WireValue> {
        let id = self.store.field_id(name)?;
        self.store.get_field(id)
    }

    /// Write a mutable field by name regardless of its visibility
    pub fn set_field(&self, name: &str, value: impl Into<WireValue>) -> Result<()> {
        let id = self.store.field_id(name)?;
        self.store.set_field(id, value)
    }

    pub fn layout(&self) -> StoreLayout {
        self.store.layout_named(&self.name)
    }

    pub fn close(&self) -> Result<()> {
        self.store.close()
    }
}

impl PartialEq for SyntheticStruct {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.store == other.store
    }
}

impl fmt::Debug for SyntheticStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticStruct")
            .field("name", &self.name)
            .field("store", &self.store)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

impl WireType for SyntheticStruct {
    const TYPE_NAME: &'static str = "synthetic_struct";

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        codec::write_value(out, &WireValue::Str(self.name.clone()))?;
        codec::write_value(out, &WireValue::Bool(true))?;
        self.store.write_body(out)
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        let name = match codec::read_value(input)? {
            WireValue::Str(name) => name,
            other => {
                return Err(VellumError::corrupt(format!(
                    "Expected a struct name, found {}",
                    other.type_name()
                )))
            }
        };
        match codec::read_value(input)? {
            WireValue::Bool(true) => {}
            other => {
                return Err(VellumError::corrupt(format!(
                    "Struct {} is not marked synthetic ({})",
                    name, other
                )))
            }
        }
        let store = RecordStore::read_body(input)?;
        let template = store
            .field_metadata()
            .into_iter()
            .map(|meta| FieldSpec::empty(meta.name, meta.modifiers))
            .collect();
        Ok(Self {
            name,
            store,
            template,
            constructor: None,
        })
    }
}
