//! Reserved type ids of the wire format
//!
//! Every record starts with one of these as an 8-byte big-endian `i64`.
//! Negative ids and `i64::MAX` are permanently bound to built-in types.

/// Wire type id
pub type TypeTag = i64;

/// Never bound; marks an unregistered type
pub const UNKNOWN: TypeTag = 0;
/// Absence of a value, no payload
pub const NULL: TypeTag = 1;
pub const DOUBLE: TypeTag = -1;
pub const LONG: TypeTag = -2;
pub const INT: TypeTag = -3;
pub const CHAR: TypeTag = -4;
pub const STRING: TypeTag = -5;
pub const ARRAY: TypeTag = -6;
pub const ENUM: TypeTag = -7;
pub const BOOLEAN: TypeTag = -8;
/// Programmatically declared structs
pub const SYNTHETIC_STRUCT: TypeTag = i64::MAX;

/// Ids that can never be unregistered or rebound
pub const BUILTIN: [TypeTag; 10] = [
    NULL,
    DOUBLE,
    LONG,
    INT,
    CHAR,
    STRING,
    ARRAY,
    ENUM,
    BOOLEAN,
    SYNTHETIC_STRUCT,
];

pub fn is_reserved(id: TypeTag) -> bool {
    id == UNKNOWN || BUILTIN.contains(&id)
}
