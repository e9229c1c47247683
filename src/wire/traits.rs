//! Traits implemented by types that travel as wire records

use std::{any::Any, fmt, sync::Arc};

use crate::error::Result;

use super::codec::{WireRead, WireWrite};
use super::value::WireValue;

/// A type with a registered wire id.
///
/// `write_payload` writes everything after the 8-byte id; `read_payload`
/// is its inverse and must build a complete value from the bytes alone.
pub trait WireType: Sized + Send + Sync + fmt::Debug + PartialEq + 'static {
    /// Name used in diagnostics and registry listings
    const TYPE_NAME: &'static str;

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()>;

    fn read_payload(input: &mut dyn WireRead) -> Result<Self>;

    /// Lift into a [`WireValue`]
    fn into_value(self) -> WireValue {
        WireValue::Object(Arc::new(self))
    }
}

/// Object-safe view of a [`WireType`], stored inside [`WireValue::Object`]
pub trait WireObject: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn wire_name(&self) -> &'static str;

    /// Write the payload (without the id)
    fn write_body(&self, out: &mut dyn WireWrite) -> Result<()>;

    fn dyn_eq(&self, other: &dyn WireObject) -> bool;
}

impl<T: WireType> WireObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn wire_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn write_body(&self, out: &mut dyn WireWrite) -> Result<()> {
        self.write_payload(out)
    }

    fn dyn_eq(&self, other: &dyn WireObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }
}

/// Decoder stored in the registry for one id
pub type DecodeFn = fn(&mut dyn WireRead) -> Result<WireValue>;

pub(crate) fn decode_as<T: WireType>(input: &mut dyn WireRead) -> Result<WireValue> {
    T::read_payload(input).map(WireType::into_value)
}
