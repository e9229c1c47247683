//! Type id registry
//!
//! Maps stable wire ids to Rust types and back. Both directions are kept in
//! one lock so they can never disagree. The built-in bindings are seeded at
//! construction and cannot be removed.

use std::{
    any::TypeId,
    collections::HashMap,
    sync::OnceLock,
};

use log::debug;
use parking_lot::RwLock;

use crate::error::{Result, VellumError};
use crate::structs::SyntheticStruct;

use super::ids::{self, TypeTag};
use super::traits::{decode_as, DecodeFn, WireType};
use super::value::{EnumValue, WireArray};

/// One id <-> type binding
#[derive(Clone, Copy)]
pub struct TypeBinding {
    id: TypeTag,
    name: &'static str,
    type_id: TypeId,
    decode: DecodeFn,
    builtin: bool,
}

impl TypeBinding {
    fn of<T: WireType>(id: TypeTag, builtin: bool) -> Self {
        Self {
            id,
            name: T::TYPE_NAME,
            type_id: TypeId::of::<T>(),
            decode: decode_as::<T>,
            builtin,
        }
    }

    pub fn id(&self) -> TypeTag {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn decode(&self) -> DecodeFn {
        self.decode
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }
}

impl std::fmt::Debug for TypeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeBinding")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("builtin", &self.builtin)
            .finish()
    }
}

#[derive(Default)]
struct Bindings {
    by_id: HashMap<TypeTag, TypeBinding>,
    by_type: HashMap<TypeId, TypeTag>,
}

impl Bindings {
    fn insert(&mut self, binding: TypeBinding) {
        self.by_type.insert(binding.type_id, binding.id);
        self.by_id.insert(binding.id, binding);
    }
}

/// Bidirectional id registry with its own locking
pub struct TypeRegistry {
    inner: RwLock<Bindings>,
}

impl TypeRegistry {
    /// A registry holding only the built-in bindings
    pub fn new() -> Self {
        let mut bindings = Bindings::default();
        bindings.insert(TypeBinding::of::<()>(ids::NULL, true));
        bindings.insert(TypeBinding::of::<f64>(ids::DOUBLE, true));
        bindings.insert(TypeBinding::of::<i64>(ids::LONG, true));
        bindings.insert(TypeBinding::of::<i32>(ids::INT, true));
        bindings.insert(TypeBinding::of::<u16>(ids::CHAR, true));
        bindings.insert(TypeBinding::of::<String>(ids::STRING, true));
        bindings.insert(TypeBinding::of::<WireArray>(ids::ARRAY, true));
        bindings.insert(TypeBinding::of::<EnumValue>(ids::ENUM, true));
        bindings.insert(TypeBinding::of::<bool>(ids::BOOLEAN, true));
        bindings.insert(TypeBinding::of::<SyntheticStruct>(ids::SYNTHETIC_STRUCT, true));
        Self {
            inner: RwLock::new(bindings),
        }
    }

    /// Bind `T` to `id`.
    ///
    /// Fails if the id is reserved for the unknown marker, if the id is
    /// already bound, or if `T` is already bound to any id.
    pub fn register<T: WireType>(&self, id: TypeTag) -> Result<()> {
        if id == ids::UNKNOWN {
            return Err(VellumError::registry(
                "Id 0 is reserved for unregistered types",
            ));
        }
        let mut inner = self.inner.write();
        if let Some(existing) = inner.by_id.get(&id) {
            return Err(VellumError::registry(format!(
                "Id {} is already bound to {}",
                id, existing.name
            )));
        }
        if let Some(existing) = inner.by_type.get(&TypeId::of::<T>()) {
            return Err(VellumError::registry(format!(
                "{} is already bound to id {}",
                T::TYPE_NAME,
                existing
            )));
        }
        inner.insert(TypeBinding::of::<T>(id, false));
        debug!("Registered wire type {} as id {}", T::TYPE_NAME, id);
        Ok(())
    }

    /// Remove `T`'s binding and return the id it had
    pub fn unregister<T: WireType>(&self) -> Result<TypeTag> {
        let mut inner = self.inner.write();
        let id = *inner.by_type.get(&TypeId::of::<T>()).ok_or_else(|| {
            VellumError::registry(format!("{} is not registered", T::TYPE_NAME))
        })?;
        if ids::is_reserved(id) {
            return Err(VellumError::registry(format!(
                "Built-in type {} cannot be unregistered",
                T::TYPE_NAME
            )));
        }
        inner.by_type.remove(&TypeId::of::<T>());
        inner.by_id.remove(&id);
        debug!("Unregistered wire type {} (id {})", T::TYPE_NAME, id);
        Ok(id)
    }

    pub fn lookup_id<T: WireType>(&self) -> Option<TypeTag> {
        self.id_of_type(TypeId::of::<T>())
    }

    pub fn id_of_type(&self, type_id: TypeId) -> Option<TypeTag> {
        self.inner.read().by_type.get(&type_id).copied()
    }

    /// Binding for `id`, if any
    pub fn lookup_type(&self, id: TypeTag) -> Option<TypeBinding> {
        self.inner.read().by_id.get(&id).copied()
    }

    pub(crate) fn binding(&self, id: TypeTag) -> Option<TypeBinding> {
        self.lookup_type(id)
    }

    pub fn is_registered(&self, id: TypeTag) -> bool {
        self.inner.read().by_id.contains_key(&id)
    }

    pub fn builtin_ids(&self) -> &'static [TypeTag] {
        &ids::BUILTIN
    }

    /// Every binding, ordered by id
    pub fn bindings(&self) -> Vec<TypeBinding> {
        let mut all: Vec<_> = self.inner.read().by_id.values().copied().collect();
        all.sort_by_key(TypeBinding::id);
        all
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("bindings", &self.len())
            .finish()
    }
}

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// The process-wide registry
pub fn global() -> &'static TypeRegistry {
    GLOBAL.get_or_init(TypeRegistry::new)
}

/// Register `T` in the global registry
pub fn register<T: WireType>(id: TypeTag) -> Result<()> {
    global().register::<T>(id)
}

/// Unregister `T` from the global registry
pub fn unregister<T: WireType>() -> Result<TypeTag> {
    global().unregister::<T>()
}
