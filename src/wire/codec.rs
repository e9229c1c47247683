//! Record encoding and decoding
//!
//! A record is `[8-byte big-endian type id][payload]`. Writers look the id up
//! from the value's Rust type; readers dispatch on the id to the decoder the
//! registry holds for it. All multi-byte wire integers are big-endian.

use std::{any::TypeId, cell::Cell};

use crate::diagnostics::diag;
use crate::error::{Result, VellumError};

use super::ids::{self, TypeTag};
use super::registry::{global, TypeRegistry};
use super::traits::WireType;
use super::value::{EnumValue, WireArray, WireValue};

/// Records nested deeper than this are rejected while decoding
pub const MAX_NESTING_DEPTH: usize = 128;

thread_local! {
    static DECODE_DEPTH: Cell<usize> = Cell::new(0);
}

/// One level of record nesting on the current thread
struct NestingGuard;

impl NestingGuard {
    fn enter() -> Result<Self> {
        DECODE_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= MAX_NESTING_DEPTH {
                return Err(VellumError::corrupt(format!(
                    "Records nested more than {} levels deep",
                    MAX_NESTING_DEPTH
                )));
            }
            depth.set(current + 1);
            Ok(NestingGuard)
        })
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// A destination for wire records
pub trait WireWrite {
    /// Write all of `bytes` or fail
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Registry used to resolve type ids
    fn registry(&self) -> &TypeRegistry {
        global()
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_raw(&value.to_be_bytes())
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_raw(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_raw(&value.to_be_bytes())
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_raw(&value.to_bits().to_be_bytes())
    }

    /// Write `value` as a complete record
    fn write_value(&mut self, value: &WireValue) -> Result<()>
    where
        Self: Sized,
    {
        write_value(self, value)
    }

    /// Write a registered type as a complete record
    fn write_object<T: WireType>(&mut self, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        write_object(self, value)
    }
}

/// A source of wire records
pub trait WireRead {
    /// Fill all of `buf` or fail with a decode error
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Bytes left, when the source knows
    fn remaining_hint(&self) -> Option<usize> {
        None
    }

    /// Registry used to resolve type ids
    fn registry(&self) -> &TypeRegistry {
        global()
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_raw(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_raw(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_raw(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_raw(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_raw(&mut buf)?;
        Ok(f64::from_bits(u64::from_be_bytes(buf)))
    }

    /// Read one complete record, dispatching on its id
    fn read_value(&mut self) -> Result<WireValue>
    where
        Self: Sized,
    {
        read_value(self)
    }

    /// Read a record that must carry `T`'s registered id
    fn read_object<T: WireType>(&mut self) -> Result<T>
    where
        Self: Sized,
    {
        read_object(self)
    }

    /// Skip the id and interpret the payload as `T`.
    ///
    /// Nothing checks that the payload really is a `T`; a mismatch yields
    /// garbage or a decode error.
    fn read_as<T: WireType>(&mut self) -> Result<T>
    where
        Self: Sized,
    {
        read_as(self)
    }
}

fn id_for(registry: &TypeRegistry, key: TypeId, name: &str) -> Result<TypeTag> {
    registry
        .id_of_type(key)
        .ok_or_else(|| VellumError::registry(format!("Type {} is not registered", name)))
}

/// Write `value` as `[id][payload]`
pub fn write_value(out: &mut dyn WireWrite, value: &WireValue) -> Result<()> {
    let id = id_for(out.registry(), value.type_key(), value.type_name())?;
    out.write_i64(id)?;
    match value {
        WireValue::Null => Ok(()),
        WireValue::Double(v) => out.write_f64(*v),
        WireValue::Long(v) => out.write_i64(*v),
        WireValue::Int(v) => out.write_i32(*v),
        WireValue::Char(v) => out.write_u16(*v),
        WireValue::Str(v) => write_str_payload(out, v),
        WireValue::Bool(v) => out.write_u8(u8::from(*v)),
        WireValue::Array(v) => write_array_payload(out, v),
        WireValue::Enum(v) => write_enum_payload(out, v),
        WireValue::Object(obj) => obj.write_body(out),
    }
}

/// Write a registered type as `[id][payload]`
pub fn write_object<T: WireType>(out: &mut dyn WireWrite, value: &T) -> Result<()> {
    let id = id_for(out.registry(), TypeId::of::<T>(), T::TYPE_NAME)?;
    out.write_i64(id)?;
    value.write_payload(out)
}

/// Read one record, resolving its decoder through the registry
pub fn read_value(input: &mut dyn WireRead) -> Result<WireValue> {
    let _level = NestingGuard::enter()?;
    let id = input.read_i64()?;
    let binding = input
        .registry()
        .binding(id)
        .ok_or_else(|| VellumError::corrupt(format!("Type id {} is not registered", id)))?;
    (binding.decode())(input).map_err(|e| {
        if e.is_decode() {
            e
        } else {
            VellumError::decode(format!("Failed to decode {} record", binding.name()), e)
        }
    })
}

/// Read a record whose id must match `T`'s binding
pub fn read_object<T: WireType>(input: &mut dyn WireRead) -> Result<T> {
    let expected = id_for(input.registry(), TypeId::of::<T>(), T::TYPE_NAME)?;
    let id = input.read_i64()?;
    if id != expected {
        return Err(VellumError::corrupt(format!(
            "Expected a {} record (id {}), found id {}",
            T::TYPE_NAME,
            expected,
            id
        )));
    }
    T::read_payload(input)
}

/// Skip the id and decode the payload as `T` without checking it
pub fn read_as<T: WireType>(input: &mut dyn WireRead) -> Result<T> {
    let id = input.read_i64()?;
    diag!("Interpreting record with id {} as {}", id, T::TYPE_NAME);
    T::read_payload(input)
}

pub(crate) fn write_str_payload(out: &mut dyn WireWrite, value: &str) -> Result<()> {
    let units: Vec<u16> = value.encode_utf16().collect();
    let byte_len = i32::try_from(units.len() * 2).map_err(|_| {
        VellumError::invalid_parameter("string", "String is too long for a wire record")
    })?;
    out.write_i32(byte_len)?;
    let mut bytes = Vec::with_capacity(units.len() * 2);
    for unit in units {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    out.write_raw(&bytes)
}

pub(crate) fn read_str_payload(input: &mut dyn WireRead) -> Result<String> {
    let byte_len = input.read_i32()?;
    if byte_len < 0 || byte_len % 2 != 0 {
        return Err(VellumError::corrupt(format!(
            "Invalid string length {}",
            byte_len
        )));
    }
    let byte_len = byte_len as usize;
    if let Some(remaining) = input.remaining_hint() {
        if byte_len > remaining {
            return Err(VellumError::corrupt(format!(
                "String of {} bytes exceeds the {} bytes remaining",
                byte_len, remaining
            )));
        }
    }
    let mut bytes = vec![0u8; byte_len];
    input.read_raw(&mut bytes)?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| VellumError::decode("Invalid UTF-16 in string record", e))
}

pub(crate) fn read_bool_payload(input: &mut dyn WireRead) -> Result<bool> {
    match input.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(VellumError::corrupt(format!(
            "Invalid boolean byte {}",
            other
        ))),
    }
}

pub(crate) fn write_array_payload(out: &mut dyn WireWrite, array: &WireArray) -> Result<()> {
    let component = match array.component() {
        Some(key) => id_for(out.registry(), key, "array component")?,
        None => ids::UNKNOWN,
    };
    out.write_i64(component)?;
    let len = i32::try_from(array.len())
        .map_err(|_| VellumError::invalid_parameter("array", "Array is too long for a wire record"))?;
    write_value(out, &WireValue::Int(len))?;
    for element in array.iter() {
        write_value(out, element)?;
    }
    Ok(())
}

pub(crate) fn read_array_payload(input: &mut dyn WireRead) -> Result<WireArray> {
    let component_id = input.read_i64()?;
    let component = if component_id == ids::UNKNOWN {
        None
    } else {
        let binding = input.registry().binding(component_id).ok_or_else(|| {
            VellumError::corrupt(format!(
                "Array component id {} is not registered",
                component_id
            ))
        })?;
        Some(binding.type_id())
    };

    let len = match read_value(input)? {
        WireValue::Int(len) if len >= 0 => len as usize,
        other => {
            return Err(VellumError::corrupt(format!(
                "Invalid array length record {:?}",
                other
            )))
        }
    };
    // Every element takes at least its 8-byte id
    if let Some(remaining) = input.remaining_hint() {
        if len.saturating_mul(8) > remaining {
            return Err(VellumError::corrupt(format!(
                "Array of {} elements cannot fit in {} bytes",
                len, remaining
            )));
        }
    }

    let mut elements = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        elements.push(read_value(input)?);
    }
    WireArray::with_component(component, elements)
        .map_err(|e| VellumError::decode("Array element does not match its component type", e))
}

pub(crate) fn write_enum_payload(out: &mut dyn WireWrite, value: &EnumValue) -> Result<()> {
    write_value(out, &WireValue::Str(value.type_name().to_string()))?;
    write_value(out, &WireValue::Int(value.ordinal()))
}

pub(crate) fn read_enum_payload(input: &mut dyn WireRead) -> Result<EnumValue> {
    let name = match read_value(input)? {
        WireValue::Str(name) => name,
        other => {
            return Err(VellumError::corrupt(format!(
                "Expected enum type name, found {:?}",
                other
            )))
        }
    };
    match read_value(input)? {
        WireValue::Int(ordinal) => Ok(EnumValue::new(name, ordinal)),
        other => Err(VellumError::corrupt(format!(
            "Expected enum ordinal, found {:?}",
            other
        ))),
    }
}

impl WireWrite for Vec<u8> {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl WireRead for &[u8] {
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() > self.len() {
            return Err(VellumError::corrupt(format!(
                "Record truncated: needed {} bytes, {} left",
                buf.len(),
                self.len()
            )));
        }
        let (head, tail) = self.split_at(buf.len());
        buf.copy_from_slice(head);
        *self = tail;
        Ok(())
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &WireValue) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_value(value).unwrap();
        out
    }

    fn decode(bytes: &[u8]) -> Result<WireValue> {
        let mut input = bytes;
        input.read_value()
    }

    #[test]
    fn test_null_is_bare_id() {
        assert_eq!(encode(&WireValue::Null), 1i64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_string_layout_is_utf16be() {
        let bytes = encode(&WireValue::from("Hi"));
        let mut expected = (-5i64).to_be_bytes().to_vec();
        expected.extend_from_slice(&4i32.to_be_bytes());
        expected.extend_from_slice(&[0x00, b'H', 0x00, b'i']);
        assert_eq!(bytes, expected);
        assert_eq!(decode(&bytes).unwrap(), WireValue::from("Hi"));
    }

    #[test]
    fn test_bool_layout() {
        let bytes = encode(&WireValue::Bool(true));
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[8], 1);

        let mut bad = bytes.clone();
        bad[8] = 2;
        assert!(decode(&bad).unwrap_err().is_decode());
    }

    #[test]
    fn test_primitive_round_trips() {
        let values = [
            WireValue::Double(-2.5),
            WireValue::Long(i64::MIN),
            WireValue::Int(42),
            WireValue::Char(0x263A),
            WireValue::Str("Zoë 😀".into()),
            WireValue::Bool(false),
        ];
        for value in &values {
            assert_eq!(&decode(&encode(value)).unwrap(), value);
        }
    }

    #[test]
    fn test_array_and_enum() {
        let array = WireArray::of::<i32>(vec![
            WireValue::Int(1),
            WireValue::Null,
            WireValue::Int(3),
        ])
        .unwrap();
        let value = WireValue::Array(array);
        let bytes = encode(&value);
        // Raw component id right after the array id
        assert_eq!(&bytes[8..16], &(-3i64).to_be_bytes());
        assert_eq!(decode(&bytes).unwrap(), value);

        let value = WireValue::Enum(EnumValue::new("Color", 2));
        assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn test_unknown_id_is_decode_error() {
        let bytes = 12345i64.to_be_bytes();
        assert!(decode(&bytes).unwrap_err().is_decode());
    }

    #[test]
    fn test_truncated_string_is_decode_error() {
        let mut bytes = encode(&WireValue::from("truncate me"));
        bytes.truncate(bytes.len() - 3);
        assert!(decode(&bytes).unwrap_err().is_decode());
    }

    #[test]
    fn test_read_object_checks_id() {
        let bytes = encode(&WireValue::Int(9));
        let mut input: &[u8] = &bytes;
        assert!(input.read_object::<i64>().is_err());

        let mut input: &[u8] = &bytes;
        assert_eq!(input.read_object::<i32>().unwrap(), 9);
    }

    #[test]
    fn test_deeply_nested_arrays_are_rejected() {
        let mut bytes = Vec::new();
        for _ in 0..10_000 {
            bytes.extend_from_slice(&(-6i64).to_be_bytes());
            bytes.extend_from_slice(&ids::UNKNOWN.to_be_bytes());
            bytes.extend_from_slice(&(-3i64).to_be_bytes());
            bytes.extend_from_slice(&1i32.to_be_bytes());
        }
        let err = decode(&bytes).unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("nested"));

        // The depth counter unwinds, so ordinary records still decode
        assert_eq!(decode(&encode(&WireValue::Int(3))).unwrap(), WireValue::Int(3));
    }

    #[test]
    fn test_nesting_within_the_limit() {
        let mut value = WireValue::Int(0);
        for _ in 0..MAX_NESTING_DEPTH - 1 {
            value = WireValue::Array(WireArray::new(vec![value]));
        }
        assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn test_read_as_skips_id() {
        let bytes = encode(&WireValue::Long(0x0000_0007_0000_0008));
        let mut input: &[u8] = &bytes;
        // The first four payload bytes reinterpreted as an int
        assert_eq!(input.read_as::<i32>().unwrap(), 7);
    }
}
