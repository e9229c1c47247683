//! Record stores: named field tables persisted with the wire format

pub mod inspector;
pub mod layout;
pub mod modifiers;
pub mod store;
mod table;

pub use inspector::{FieldFilter, FieldInspector, InspectedField};
pub use layout::{FieldMetadata, Source, StoreLayout};
pub use modifiers::Modifiers;
pub use store::{FieldSpec, RecordStore, HEADER_LEN};
