//! Wire bindings for the permanently registered types

use crate::error::Result;

use super::codec::{
    read_array_payload, read_bool_payload, read_enum_payload, read_str_payload,
    write_array_payload, write_enum_payload, write_str_payload, WireRead, WireWrite,
};
use super::traits::WireType;
use super::value::{EnumValue, WireArray, WireValue};

impl WireType for () {
    const TYPE_NAME: &'static str = "null";

    fn write_payload(&self, _out: &mut dyn WireWrite) -> Result<()> {
        Ok(())
    }

    fn read_payload(_input: &mut dyn WireRead) -> Result<Self> {
        Ok(())
    }

    fn into_value(self) -> WireValue {
        WireValue::Null
    }
}

macro_rules! numeric_wire_type {
    ($($ty:ty => ($name:literal, $variant:ident, $write:ident, $read:ident)),* $(,)?) => {
        $(
            impl WireType for $ty {
                const TYPE_NAME: &'static str = $name;

                fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
                    out.$write(*self)
                }

                fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
                    input.$read()
                }

                fn into_value(self) -> WireValue {
                    WireValue::$variant(self)
                }
            }
        )*
    };
}

numeric_wire_type! {
    f64 => ("double", Double, write_f64, read_f64),
    i64 => ("long", Long, write_i64, read_i64),
    i32 => ("int", Int, write_i32, read_i32),
    u16 => ("char", Char, write_u16, read_u16),
}

impl WireType for String {
    const TYPE_NAME: &'static str = "string";

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        write_str_payload(out, self)
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        read_str_payload(input)
    }

    fn into_value(self) -> WireValue {
        WireValue::Str(self)
    }
}

impl WireType for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        out.write_u8(u8::from(*self))
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        read_bool_payload(input)
    }

    fn into_value(self) -> WireValue {
        WireValue::Bool(self)
    }
}

impl WireType for WireArray {
    const TYPE_NAME: &'static str = "array";

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        write_array_payload(out, self)
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        read_array_payload(input)
    }

    fn into_value(self) -> WireValue {
        WireValue::Array(self)
    }
}

impl WireType for EnumValue {
    const TYPE_NAME: &'static str = "enum";

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        write_enum_payload(out, self)
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        read_enum_payload(input)
    }

    fn into_value(self) -> WireValue {
        WireValue::Enum(self)
    }
}
