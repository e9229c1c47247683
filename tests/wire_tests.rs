//! Integration tests for the wire format and the type registry

use std::sync::Arc;

use vellum::{
    read_object, read_value, stream::IoWireReader, stream::IoWireWriter, wire, EnumValue,
    OffHeapStorage, Result, Storage, TypeRegistry, VellumError, WireArray, WireEnum, WireRead,
    WireType, WireValue, WireWrite,
};

#[derive(Debug, Clone, PartialEq)]
struct Vector3 {
    x: f64,
    y: f64,
    z: f64,
}

impl WireType for Vector3 {
    const TYPE_NAME: &'static str = "Vector3";

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        out.write_f64(self.x)?;
        out.write_f64(self.y)?;
        out.write_f64(self.z)
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        Ok(Self {
            x: input.read_f64()?,
            y: input.read_f64()?,
            z: input.read_f64()?,
        })
    }
}

#[derive(Debug, PartialEq)]
struct Unbound(u8);

impl WireType for Unbound {
    const TYPE_NAME: &'static str = "Unbound";

    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        out.write_u8(self.0)
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        Ok(Self(input.read_u8()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Idle,
    Running,
    Stopped,
}

impl WireEnum for Mode {
    const TYPE_NAME: &'static str = "Mode";

    fn ordinal(&self) -> i32 {
        *self as i32
    }

    fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(Mode::Idle),
            1 => Some(Mode::Running),
            2 => Some(Mode::Stopped),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &WireValue) -> WireValue {
        let mut bytes = Vec::new();
        bytes.write_value(value).unwrap();
        let mut input: &[u8] = &bytes;
        let decoded = input.read_value().unwrap();
        assert!(input.is_empty());
        decoded
    }

    #[test]
    fn test_builtin_records_through_storage() {
        let storage = OffHeapStorage::allocate(512).unwrap();
        let values = vec![
            WireValue::Null,
            WireValue::Double(-12.75),
            WireValue::Long(i64::MIN),
            WireValue::Int(123_456),
            WireValue::Char(0x263A),
            WireValue::from("snow \u{2603} and \u{1F600}"),
            WireValue::Bool(true),
            WireValue::Enum(EnumValue::of(&Mode::Stopped)),
            WireValue::Array(WireArray::new(vec![
                WireValue::Int(1),
                WireValue::from("two"),
                WireValue::Null,
            ])),
        ];

        let mut out = storage.output_stream(false).unwrap();
        for value in &values {
            out.write_value(value).unwrap();
        }
        let written = out.offset();

        let mut input = storage.input_stream(false).unwrap();
        for value in &values {
            assert_eq!(&input.read_value().unwrap(), value);
        }
        assert_eq!(input.offset(), written);
        storage.close().unwrap();
    }

    #[test]
    fn test_null_is_only_an_id() {
        let mut bytes = Vec::new();
        bytes.write_value(&WireValue::Null).unwrap();
        assert_eq!(bytes, 1i64.to_be_bytes());
    }

    #[test]
    fn test_string_encoding_is_utf16_be() {
        let mut bytes = Vec::new();
        bytes.write_value(&WireValue::from("Hi")).unwrap();
        assert_eq!(&bytes[..8], &(-5i64).to_be_bytes());
        assert_eq!(&bytes[8..12], &4i32.to_be_bytes());
        assert_eq!(&bytes[12..], &[0, b'H', 0, b'i']);

        // A supplementary character is a surrogate pair
        let mut bytes = Vec::new();
        bytes.write_value(&WireValue::from("\u{1F600}")).unwrap();
        assert_eq!(&bytes[8..12], &4i32.to_be_bytes());
        assert_eq!(round_trip(&WireValue::from("")), WireValue::from(""));
    }

    #[test]
    fn test_invalid_boolean_byte() {
        let mut bytes = (-8i64).to_be_bytes().to_vec();
        bytes.push(2);
        let mut input: &[u8] = &bytes;
        assert!(read_value(&mut input).unwrap_err().is_decode());
    }

    #[test]
    fn test_typed_array_carries_component() {
        let array = WireArray::of::<i64>(vec![WireValue::Long(3), WireValue::Null]).unwrap();
        let mut bytes = Vec::new();
        bytes.write_value(&WireValue::Array(array.clone())).unwrap();
        // Array id, then the raw component id of long
        assert_eq!(&bytes[..8], &(-6i64).to_be_bytes());
        assert_eq!(&bytes[8..16], &(-2i64).to_be_bytes());

        let mut input: &[u8] = &bytes;
        let decoded = input.read_value().unwrap();
        assert_eq!(decoded, WireValue::Array(array));
        assert_eq!(
            decoded.as_array().unwrap().component(),
            Some(std::any::TypeId::of::<i64>())
        );
    }

    #[test]
    fn test_enum_round_trip() {
        let decoded = round_trip(&WireValue::Enum(EnumValue::of(&Mode::Running)));
        assert_eq!(decoded.as_enum().unwrap().to::<Mode>().unwrap(), Mode::Running);
    }

    #[test]
    fn test_unknown_id_and_truncation_are_decode_errors() {
        let bytes = 12345i64.to_be_bytes();
        let mut input: &[u8] = &bytes;
        assert!(read_value(&mut input).unwrap_err().is_decode());

        let mut bytes = Vec::new();
        bytes.write_value(&WireValue::Long(9)).unwrap();
        bytes.truncate(12);
        let mut input: &[u8] = &bytes;
        assert!(read_value(&mut input).unwrap_err().is_decode());

        // A string length beyond the available bytes
        let mut bytes = (-5i64).to_be_bytes().to_vec();
        bytes.extend_from_slice(&1000i32.to_be_bytes());
        let mut input: &[u8] = &bytes;
        assert!(read_value(&mut input).unwrap_err().is_decode());
    }

    #[test]
    fn test_hostile_nesting_is_a_decode_error() {
        // Array of unknown component whose single element is another array
        let mut bytes = Vec::new();
        for _ in 0..200_000 {
            bytes.extend_from_slice(&(-6i64).to_be_bytes());
            bytes.extend_from_slice(&0i64.to_be_bytes());
            bytes.extend_from_slice(&(-3i64).to_be_bytes());
            bytes.extend_from_slice(&1i32.to_be_bytes());
        }
        let mut input: &[u8] = &bytes;
        assert!(matches!(
            read_value(&mut input),
            Err(VellumError::Deserialization { .. })
        ));

        let storage = OffHeapStorage::allocate(bytes.len()).unwrap();
        storage.set_bytes(0, &bytes).unwrap();
        let mut input = storage.input_stream(false).unwrap();
        assert!(input.read_value().unwrap_err().is_decode());
        storage.close().unwrap();
    }

    #[test]
    fn test_registered_type_round_trip() {
        wire::register::<Vector3>(4242).unwrap();
        assert!(matches!(
            wire::register::<Vector3>(4243),
            Err(VellumError::Registry { .. })
        ));
        assert!(matches!(
            wire::register::<Unbound>(4242),
            Err(VellumError::Registry { .. })
        ));

        let v = Vector3 {
            x: 1.0,
            y: -2.0,
            z: 0.5,
        };
        let storage = OffHeapStorage::allocate(64).unwrap();
        let mut out = storage.output_stream(false).unwrap();
        out.write_object(&v).unwrap();
        out.write_value(&WireValue::object(v.clone())).unwrap();

        let mut input = storage.input_stream(false).unwrap();
        assert_eq!(read_object::<Vector3>(&mut input).unwrap(), v);
        let value = input.read_value().unwrap();
        assert_eq!(value.type_name(), "Vector3");
        assert_eq!(value.downcast_ref::<Vector3>(), Some(&v));
        storage.close().unwrap();

        assert_eq!(wire::unregister::<Vector3>().unwrap(), 4242);
        assert!(!wire::global().is_registered(4242));
    }

    #[test]
    fn test_unregistered_type_cannot_be_written() {
        let mut bytes = Vec::new();
        assert!(matches!(
            bytes.write_object(&Unbound(1)),
            Err(VellumError::Registry { .. })
        ));
        assert!(wire::unregister::<String>().is_err());
        assert!(wire::unregister::<Unbound>().is_err());
    }

    #[test]
    fn test_private_registry_over_io() {
        let registry = Arc::new(TypeRegistry::new());
        registry.register::<Unbound>(77).unwrap();

        let mut writer = IoWireWriter::with_registry(Vec::new(), Arc::clone(&registry));
        writer.write_object(&Unbound(9)).unwrap();
        writer.write_value(&WireValue::Int(5)).unwrap();
        let bytes = writer.into_inner();

        let mut reader = IoWireReader::with_registry(bytes.as_slice(), Arc::clone(&registry));
        assert_eq!(reader.read_object::<Unbound>().unwrap(), Unbound(9));
        assert_eq!(reader.read_value().unwrap(), WireValue::Int(5));
        assert!(reader.read_value().unwrap_err().is_decode());

        // The global registry does not know id 77
        let mut input: &[u8] = &bytes;
        assert!(read_value(&mut input).unwrap_err().is_decode());
    }
}
