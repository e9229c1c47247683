//! Self-describing wire records
//!
//! Every value is written as an 8-byte big-endian type id followed by a
//! type-specific payload. The [`registry`] resolves ids to decoders, and
//! [`codec`] holds the reader/writer traits plus the built-in encodings.

mod builtin;
pub mod codec;
pub mod ids;
pub mod registry;
pub mod traits;
pub mod value;

pub use codec::{read_as, read_object, read_value, write_object, write_value, WireRead, WireWrite};
pub use ids::TypeTag;
pub use registry::{global, register, unregister, TypeBinding, TypeRegistry};
pub use traits::{DecodeFn, WireObject, WireType};
pub use value::{EnumValue, WireArray, WireEnum, WireValue};
