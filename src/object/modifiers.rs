//! Field modifier flags
//!
//! The bit values are part of the persisted layout (they are written as the
//! modifiers int of every field row) and must not change.

use std::fmt;

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Modifier bits of a record store field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        /// Immutable after creation
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
    }
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers::empty();

    /// Every bit a field may carry; anything else is dropped on add
    pub const FIELD_MASK: Modifiers = Modifiers::all();

    pub fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    /// Static and transient fields never reach storage
    pub fn is_persistable(self) -> bool {
        !self.intersects(Self::STATIC.union(Self::TRANSIENT))
    }

    pub(crate) fn masked(self) -> Self {
        self & Self::FIELD_MASK
    }
}

impl From<i32> for Modifiers {
    fn from(bits: i32) -> Self {
        Modifiers::from_bits_retain(bits as u32)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Modifiers, &str); 7] = [
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
            (Modifiers::TRANSIENT, "transient"),
            (Modifiers::VOLATILE, "volatile"),
        ];
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
