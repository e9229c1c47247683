//! Values carried by wire records

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

use crate::error::{Result, VellumError};

use super::traits::{WireObject, WireType};

/// A decoded (or to-be-encoded) wire record.
///
/// The built-in variants cover the permanently registered types. Any other
/// registered type travels as [`WireValue::Object`].
#[derive(Clone)]
pub enum WireValue {
    Null,
    Double(f64),
    Long(i64),
    Int(i32),
    /// A UTF-16 code unit
    Char(u16),
    Str(String),
    Bool(bool),
    Array(WireArray),
    Enum(EnumValue),
    Object(Arc<dyn WireObject>),
}

impl WireValue {
    /// Wrap any registered type. Built-in types land in their own variant,
    /// so `object(5i64)` is `Long(5)`.
    pub fn object<T: WireType>(value: T) -> Self {
        value.into_value()
    }

    /// Rust type the registry binds this value's id to
    pub fn type_key(&self) -> TypeId {
        match self {
            WireValue::Null => TypeId::of::<()>(),
            WireValue::Double(_) => TypeId::of::<f64>(),
            WireValue::Long(_) => TypeId::of::<i64>(),
            WireValue::Int(_) => TypeId::of::<i32>(),
            WireValue::Char(_) => TypeId::of::<u16>(),
            WireValue::Str(_) => TypeId::of::<String>(),
            WireValue::Bool(_) => TypeId::of::<bool>(),
            WireValue::Array(_) => TypeId::of::<WireArray>(),
            WireValue::Enum(_) => TypeId::of::<EnumValue>(),
            WireValue::Object(obj) => obj.as_any().type_id(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Double(_) => "double",
            WireValue::Long(_) => "long",
            WireValue::Int(_) => "int",
            WireValue::Char(_) => "char",
            WireValue::Str(_) => "string",
            WireValue::Bool(_) => "boolean",
            WireValue::Array(_) => "array",
            WireValue::Enum(_) => "enum",
            WireValue::Object(obj) => obj.wire_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            WireValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            WireValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            WireValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<u16> {
        match self {
            WireValue::Char(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&WireArray> {
        match self {
            WireValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            WireValue::Enum(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow an object payload as its concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            WireValue::Object(obj) => obj.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Share an object payload as its concrete type
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            WireValue::Object(obj) => Arc::clone(obj).into_any_arc().downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl PartialEq for WireValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (WireValue::Null, WireValue::Null) => true,
            // Bitwise, so NaN payloads compare equal to themselves
            (WireValue::Double(a), WireValue::Double(b)) => a.to_bits() == b.to_bits(),
            (WireValue::Long(a), WireValue::Long(b)) => a == b,
            (WireValue::Int(a), WireValue::Int(b)) => a == b,
            (WireValue::Char(a), WireValue::Char(b)) => a == b,
            (WireValue::Str(a), WireValue::Str(b)) => a == b,
            (WireValue::Bool(a), WireValue::Bool(b)) => a == b,
            (WireValue::Array(a), WireValue::Array(b)) => a == b,
            (WireValue::Enum(a), WireValue::Enum(b)) => a == b,
            (WireValue::Object(a), WireValue::Object(b)) => a.dyn_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Debug for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Null => f.write_str("Null"),
            WireValue::Double(v) => f.debug_tuple("Double").field(v).finish(),
            WireValue::Long(v) => f.debug_tuple("Long").field(v).finish(),
            WireValue::Int(v) => f.debug_tuple("Int").field(v).finish(),
            WireValue::Char(v) => f.debug_tuple("Char").field(v).finish(),
            WireValue::Str(v) => f.debug_tuple("Str").field(v).finish(),
            WireValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            WireValue::Array(v) => f.debug_tuple("Array").field(v).finish(),
            WireValue::Enum(v) => f.debug_tuple("Enum").field(v).finish(),
            WireValue::Object(v) => f.debug_tuple("Object").field(v).finish(),
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Null => f.write_str("null"),
            WireValue::Double(v) => write!(f, "{}", v),
            WireValue::Long(v) => write!(f, "{}", v),
            WireValue::Int(v) => write!(f, "{}", v),
            WireValue::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{}'", c),
                None => write!(f, "\\u{:04x}", v),
            },
            WireValue::Str(v) => write!(f, "{:?}", v),
            WireValue::Bool(v) => write!(f, "{}", v),
            WireValue::Array(v) => write!(f, "[{} elements]", v.len()),
            WireValue::Enum(v) => write!(f, "{}#{}", v.type_name(), v.ordinal()),
            WireValue::Object(v) => write!(f, "<{}>", v.wire_name()),
        }
    }
}

impl Default for WireValue {
    fn default() -> Self {
        WireValue::Null
    }
}

macro_rules! wire_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for WireValue {
                fn from(value: $ty) -> Self {
                    WireValue::$variant(value)
                }
            }
        )*
    };
}

wire_value_from! {
    f64 => Double,
    i64 => Long,
    i32 => Int,
    u16 => Char,
    String => Str,
    bool => Bool,
    WireArray => Array,
    EnumValue => Enum,
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        WireValue::Str(value.to_string())
    }
}

impl<T: Into<WireValue>> From<Option<T>> for WireValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(WireValue::Null, Into::into)
    }
}

/// A homogeneous (or untyped) sequence of records
#[derive(Debug, Clone, PartialEq)]
pub struct WireArray {
    component: Option<TypeId>,
    elements: Vec<WireValue>,
}

impl WireArray {
    /// Untyped array; encoded with the unknown component id
    pub fn new(elements: Vec<WireValue>) -> Self {
        Self {
            component: None,
            elements,
        }
    }

    /// Array whose elements must all be `T` (or null)
    pub fn of<T: Any>(elements: Vec<WireValue>) -> Result<Self> {
        Self::with_component(Some(TypeId::of::<T>()), elements)
    }

    pub(crate) fn with_component(component: Option<TypeId>, elements: Vec<WireValue>) -> Result<Self> {
        if let Some(component) = component {
            if let Some((index, bad)) = elements
                .iter()
                .enumerate()
                .find(|(_, e)| !e.is_null() && e.type_key() != component)
            {
                return Err(VellumError::invalid_parameter(
                    "elements",
                    format!("Element {} has type {} which does not match the array", index, bad.type_name()),
                ));
            }
        }
        Ok(Self {
            component,
            elements,
        })
    }

    pub fn component(&self) -> Option<TypeId> {
        self.component
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WireValue> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WireValue> {
        self.elements.iter()
    }

    pub fn elements(&self) -> &[WireValue] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<WireValue> {
        self.elements
    }
}

/// Rust enums that travel as enum records
pub trait WireEnum: Sized {
    /// Stable name written in front of the ordinal
    const TYPE_NAME: &'static str;

    fn ordinal(&self) -> i32;

    fn from_ordinal(ordinal: i32) -> Option<Self>;
}

/// An enum record: type name plus ordinal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    type_name: String,
    ordinal: i32,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, ordinal: i32) -> Self {
        Self {
            type_name: type_name.into(),
            ordinal,
        }
    }

    pub fn of<E: WireEnum>(value: &E) -> Self {
        Self::new(E::TYPE_NAME, value.ordinal())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn ordinal(&self) -> i32 {
        self.ordinal
    }

    /// Convert back into `E`, checking both the type name and the ordinal
    pub fn to<E: WireEnum>(&self) -> Result<E> {
        if self.type_name != E::TYPE_NAME {
            return Err(VellumError::corrupt(format!(
                "Enum record of type {} cannot become {}",
                self.type_name,
                E::TYPE_NAME
            )));
        }
        E::from_ordinal(self.ordinal).ok_or_else(|| {
            VellumError::corrupt(format!(
                "Ordinal {} is out of range for {}",
                self.ordinal,
                E::TYPE_NAME
            ))
        })
    }
}
