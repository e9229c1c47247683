//! Record stores whose field set is declared by a Rust type

use std::any::{type_name, TypeId};

use crate::diagnostics::diag;
use crate::error::{Result, VellumError};
use crate::object::{FieldSpec, Modifiers, RecordStore, StoreLayout};
use crate::storage::OffHeapStorage;
use crate::wire::{codec, global, WireRead, WireType, WireValue, WireWrite};

/// One declared member of a struct layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredField {
    pub name: &'static str,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub modifiers: Modifiers,
}

impl DeclaredField {
    /// A member holding values of type `T`
    pub fn of<T: 'static>(name: &'static str, modifiers: Modifiers) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            modifiers,
        }
    }

    /// Whether `value` may be written into this member
    pub fn accepts(&self, value: &WireValue) -> bool {
        value.is_null() || value.type_key() == self.type_id
    }
}

/// The program-level slots of a typed struct.
///
/// `declared_fields` is the explicit list of members that take part in
/// persistence; `slot` and `store_slot` move values in and out of them by
/// name.
pub trait StructLayout: Send + Sync + std::fmt::Debug + Sized + 'static {
    const NAME: &'static str;

    fn declared_fields() -> Vec<DeclaredField>;

    /// Current value of member `name`
    fn slot(&self, name: &str) -> Option<WireValue>;

    /// Overwrite member `name`; values were already checked against the
    /// declared type
    fn store_slot(&mut self, name: &str, value: WireValue);

    /// Slots in their default state, used when decoding
    fn blank() -> Self;
}

/// A record store bound to the members of `T`
#[derive(Debug)]
pub struct TypedStruct<T: StructLayout> {
    store: RecordStore,
    slots: T,
}

impl<T: StructLayout> TypedStruct<T> {
    /// Create the store and register every usable declared member.
    ///
    /// Static or transient members and members whose type has no wire
    /// binding are skipped with a diagnostic.
    pub fn new(storage: OffHeapStorage, slots: T) -> Result<Self> {
        let store = RecordStore::new(storage)?;
        let specs: Vec<FieldSpec> = Self::usable_fields()
            .into_iter()
            .map(|field| {
                let value = slots.slot(field.name).unwrap_or(WireValue::Null);
                FieldSpec::new(field.name, value, field.modifiers)
            })
            .collect();
        store.add_fields(specs)?;
        Ok(Self { store, slots })
    }

    fn usable_fields() -> Vec<DeclaredField> {
        let registry = global();
        T::declared_fields()
            .into_iter()
            .filter(|field| {
                if !field.modifiers.is_persistable() {
                    diag!("{}.{} is static or transient, skipping", T::NAME, field.name);
                    return false;
                }
                if registry.id_of_type(field.type_id).is_none() {
                    diag!(
                        "{}.{} uses an incompatible type {}, skipping",
                        T::NAME,
                        field.name,
                        field.type_name
                    );
                    return false;
                }
                true
            })
            .collect()
    }

    pub fn slots(&self) -> &T {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut T {
        &mut self.slots
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn is_synthetic(&self) -> bool {
        false
    }

    /// Copy every member into the field table, then flush once
    pub fn flush_fields(&self) -> Result<()> {
        for meta in self.store.field_metadata() {
            match self.slots.slot(&meta.name) {
                Some(value) => self.store.replace_unflushed(meta.id, value)?,
                None => diag!("{} has no member named {}", T::NAME, meta.name),
            }
        }
        self.store.flush()
    }

    /// Copy field values back into the members.
    ///
    /// A value whose type does not match its member leaves the member
    /// unchanged and emits a diagnostic.
    pub fn load_fields(&mut self) -> Result<()> {
        let declared = T::declared_fields();
        for meta in self.store.field_metadata() {
            let Some(field) = declared.iter().find(|f| f.name == meta.name) else {
                diag!("{} has no member named {}", T::NAME, meta.name);
                continue;
            };
            let value = self.store.get_field(meta.id)?;
            if field.accepts(&value) {
                self.slots.store_slot(field.name, value);
            } else {
                diag!(
                    "{}.{} expects {}, found {}; leaving it unchanged",
                    T::NAME,
                    field.name,
                    field.type_name,
                    value.type_name()
                );
            }
        }
        Ok(())
    }

    pub fn layout(&self) -> StoreLayout {
        self.store.layout_named(T::NAME)
    }

    pub fn close(&self) -> Result<()> {
        self.store.close()
    }

    pub fn into_parts(self) -> (RecordStore, T) {
        (self.store, self.slots)
    }
}

impl<T: StructLayout> PartialEq for TypedStruct<T> {
    fn eq(&self, other: &Self) -> bool {
        self.store == other.store
    }
}

impl<T: StructLayout> WireType for TypedStruct<T> {
    const TYPE_NAME: &'static str = T::NAME;

    /// Synthetic flag, then the store image with the members flushed in
    fn write_payload(&self, out: &mut dyn WireWrite) -> Result<()> {
        self.flush_fields()?;
        codec::write_value(out, &WireValue::Bool(false))?;
        self.store.write_body(out)
    }

    fn read_payload(input: &mut dyn WireRead) -> Result<Self> {
        match codec::read_value(input)? {
            WireValue::Bool(false) => {}
            WireValue::Bool(true) => {
                return Err(VellumError::corrupt(format!(
                    "Synthetic struct data cannot become {}",
                    T::NAME
                )))
            }
            other => {
                return Err(VellumError::corrupt(format!(
                    "Expected the synthetic flag, found {}",
                    other.type_name()
                )))
            }
        }
        let store = RecordStore::read_body(input)?;
        let mut typed = Self {
            store,
            slots: T::blank(),
        };
        typed.load_fields()?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Sensor {
        label: String,
        reading: f64,
        scratch: Vec<u8>,
    }

    impl StructLayout for Sensor {
        const NAME: &'static str = "Sensor";

        fn declared_fields() -> Vec<DeclaredField> {
            vec![
                DeclaredField::of::<String>("label", Modifiers::PUBLIC | Modifiers::FINAL),
                DeclaredField::of::<f64>("reading", Modifiers::PUBLIC),
                // No wire binding for Vec<u8>
                DeclaredField::of::<Vec<u8>>("scratch", Modifiers::PUBLIC),
                DeclaredField::of::<f64>("cache", Modifiers::TRANSIENT),
            ]
        }

        fn slot(&self, name: &str) -> Option<WireValue> {
            match name {
                "label" => Some(WireValue::from(self.label.as_str())),
                "reading" => Some(WireValue::Double(self.reading)),
                _ => None,
            }
        }

        fn store_slot(&mut self, name: &str, value: WireValue) {
            match (name, value) {
                ("label", WireValue::Str(label)) => self.label = label,
                ("reading", WireValue::Double(reading)) => self.reading = reading,
                _ => {}
            }
        }

        fn blank() -> Self {
            Self::default()
        }
    }

    #[test]
    fn test_discovery_skips_unusable_members() {
        let sensor = Sensor {
            label: "gauge".into(),
            reading: 1.5,
            scratch: vec![1],
        };
        let typed = TypedStruct::new(OffHeapStorage::allocate(256).unwrap(), sensor).unwrap();
        let names: Vec<_> = typed
            .store()
            .field_metadata()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["label", "reading"]);
        assert_eq!(typed.store().get("label").unwrap(), WireValue::from("gauge"));
        typed.close().unwrap();
    }

    #[test]
    fn test_flush_and_load_fields() {
        let mut typed =
            TypedStruct::new(OffHeapStorage::allocate(256).unwrap(), Sensor::default()).unwrap();
        typed.slots_mut().reading = 20.25;
        typed.slots_mut().label = "renamed".into();
        typed.flush_fields().unwrap();
        // Immutable members are still copied by flush_fields
        assert_eq!(typed.store().get("label").unwrap(), WireValue::from("renamed"));

        typed.store().set("reading", 7.0f64).unwrap();
        typed.load_fields().unwrap();
        assert_eq!(typed.slots().reading, 7.0);

        // An incompatible value leaves the member alone
        typed.store().set("reading", 3i32).unwrap();
        typed.load_fields().unwrap();
        assert_eq!(typed.slots().reading, 7.0);
        typed.close().unwrap();
    }

    #[test]
    fn test_repeated_flush_keeps_members_immutable() {
        let mut typed =
            TypedStruct::new(OffHeapStorage::allocate(256).unwrap(), Sensor::default()).unwrap();
        for round in 0..3 {
            typed.slots_mut().label = format!("round {}", round);
            typed.flush_fields().unwrap();
        }
        let label = typed.store().field_id("label").unwrap();
        assert_eq!(typed.store().get_field(label).unwrap(), WireValue::from("round 2"));
        // Flushing members is not a way around FINAL for callers
        assert!(matches!(
            typed.store().set_field(label, "other"),
            Err(VellumError::ImmutableField { .. })
        ));

        let mut bytes = Vec::new();
        typed.store().write_body(&mut bytes).unwrap();
        let mut input: &[u8] = &bytes;
        let rebuilt = RecordStore::read_body(&mut input).unwrap();
        assert_eq!(rebuilt.get_field(label).unwrap(), WireValue::from("round 2"));
        typed.close().unwrap();
        rebuilt.close().unwrap();
    }

    #[test]
    fn test_payload_round_trip() {
        let typed = TypedStruct::new(
            OffHeapStorage::allocate(256).unwrap(),
            Sensor {
                label: "a".into(),
                reading: -1.0,
                scratch: Vec::new(),
            },
        )
        .unwrap();

        let mut bytes = Vec::new();
        typed.write_payload(&mut bytes).unwrap();
        // Boolean record first
        assert_eq!(&bytes[..8], &(-8i64).to_be_bytes());
        assert_eq!(bytes[8], 0);

        let mut input: &[u8] = &bytes;
        let copy = TypedStruct::<Sensor>::read_payload(&mut input).unwrap();
        assert_eq!(copy.slots().label, "a");
        assert_eq!(copy.slots().reading, -1.0);
        assert_eq!(copy, typed);
        typed.close().unwrap();
        copy.close().unwrap();
    }
}
