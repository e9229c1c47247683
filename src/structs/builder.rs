//! Builder for synthetic structs

use std::sync::Arc;

use crate::error::{Result, VellumError};
use crate::object::{FieldSpec, Modifiers};
use crate::storage::OffHeapStorage;
use crate::wire::WireValue;

use super::synthetic::{ConstructorFn, SyntheticStruct};

/// Declares the fields and construction logic of a synthetic struct
#[derive(Clone)]
pub struct StructBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    constructor: Option<ConstructorFn>,
}

impl Default for StructBuilder {
    fn default() -> Self {
        Self::new("null")
    }
}

impl StructBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            constructor: None,
        }
    }

    /// Declare a field with its initial value
    pub fn field(
        mut self,
        name: impl Into<String>,
        modifiers: Modifiers,
        value: impl Into<WireValue>,
    ) -> Self {
        self.fields.push(FieldSpec::new(name, value, modifiers));
        self
    }

    /// Declare a field that starts out null
    pub fn empty_field(mut self, name: impl Into<String>, modifiers: Modifiers) -> Self {
        self.fields.push(FieldSpec::empty(name, modifiers));
        self
    }

    /// Forget every declaration of `name`
    pub fn remove_field(mut self, name: &str) -> Self {
        self.fields.retain(|field| field.name != name);
        self
    }

    /// Logic run once for each created instance, with the creation arguments
    pub fn constructor(
        mut self,
        constructor: impl Fn(&SyntheticStruct, &[WireValue]) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn validate(&self) -> Result<()> {
        for (index, field) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|f| f.name == field.name) {
                return Err(VellumError::duplicate_field(field.name.clone()));
            }
            if !field.modifiers.is_persistable() {
                return Err(VellumError::invalid_parameter(
                    field.name.clone(),
                    "Static and transient fields cannot be stored",
                ));
            }
        }
        Ok(())
    }

    /// Create an instance in `storage`, running the constructor with `args`
    pub fn build(&self, storage: OffHeapStorage, args: &[WireValue]) -> Result<SyntheticStruct> {
        self.validate()?;
        SyntheticStruct::create_empty(
            self.name.clone(),
            storage,
            self.fields.clone(),
            self.constructor.clone(),
            args,
        )
    }
}

impl std::fmt::Debug for StructBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructBuilder")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}
