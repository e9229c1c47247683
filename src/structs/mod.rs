//! Structs layered over record stores
//!
//! [`TypedStruct`] binds a store to the members of a Rust type that lists
//! its persisted fields. [`SyntheticStruct`] carries a field set declared
//! at runtime through [`StructBuilder`].

pub mod builder;
pub mod synthetic;
pub mod typed;

pub use builder::StructBuilder;
pub use synthetic::{ConstructorFn, SyntheticStruct};
pub use typed::{DeclaredField, StructLayout, TypedStruct};
