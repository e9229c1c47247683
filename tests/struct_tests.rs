//! Integration tests for typed structs, synthetic structs and the builder

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vellum::{
    read_object, wire, DeclaredField, Modifiers, OffHeapStorage, Source, Storage, StructBuilder,
    StructLayout, SyntheticStruct, TypedStruct, VellumError, WireRead, WireValue, WireWrite,
};

#[derive(Debug, Default, PartialEq)]
struct Account {
    owner: String,
    balance: i64,
    frozen: bool,
}

impl StructLayout for Account {
    const NAME: &'static str = "Account";

    fn declared_fields() -> Vec<DeclaredField> {
        vec![
            DeclaredField::of::<String>("owner", Modifiers::PUBLIC | Modifiers::FINAL),
            DeclaredField::of::<i64>("balance", Modifiers::PUBLIC),
            DeclaredField::of::<bool>("frozen", Modifiers::PRIVATE),
        ]
    }

    fn slot(&self, name: &str) -> Option<WireValue> {
        match name {
            "owner" => Some(WireValue::from(self.owner.as_str())),
            "balance" => Some(WireValue::Long(self.balance)),
            "frozen" => Some(WireValue::Bool(self.frozen)),
            _ => None,
        }
    }

    fn store_slot(&mut self, name: &str, value: WireValue) {
        match (name, value) {
            ("owner", WireValue::Str(owner)) => self.owner = owner,
            ("balance", WireValue::Long(balance)) => self.balance = balance,
            ("frozen", WireValue::Bool(frozen)) => self.frozen = frozen,
            _ => {}
        }
    }

    fn blank() -> Self {
        Self::default()
    }
}

fn account() -> TypedStruct<Account> {
    TypedStruct::new(
        OffHeapStorage::allocate(512).unwrap(),
        Account {
            owner: "Zaphod".into(),
            balance: 42,
            frozen: false,
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_struct_round_trip_through_storage() {
        wire::register::<TypedStruct<Account>>(7001).unwrap();

        let mut original = account();
        original.slots_mut().balance = 1_000;
        original.slots_mut().frozen = true;

        let region = OffHeapStorage::allocate(2048).unwrap();
        let mut out = region.output_stream(false).unwrap();
        out.write_object(&original).unwrap();
        out.write_value(&WireValue::Null).unwrap();

        let mut input = region.input_stream(false).unwrap();
        let copy = read_object::<TypedStruct<Account>>(&mut input).unwrap();
        assert_eq!(copy.slots(), original.slots());
        assert_eq!(copy, original);
        assert!(!copy.is_synthetic());
        assert_eq!(copy.store().source(), Source::Serialization);
        assert_eq!(input.read_value().unwrap(), WireValue::Null);

        // Private members are persisted but hidden from by-name access
        assert!(matches!(
            copy.store().get("frozen"),
            Err(VellumError::AccessDenied { .. })
        ));
        assert_eq!(copy.layout().type_name, "Account");

        original.close().unwrap();
        copy.close().unwrap();
        region.close().unwrap();
        wire::unregister::<TypedStruct<Account>>().unwrap();
    }

    #[test]
    fn test_typed_struct_respects_final_members() {
        let typed = account();
        let owner = typed.store().field_id("owner").unwrap();
        assert!(matches!(
            typed.store().set_field(owner, "Trillian"),
            Err(VellumError::ImmutableField { .. })
        ));
        typed.store().set("balance", 7i64).unwrap();
        assert_eq!(typed.store().get("balance").unwrap(), WireValue::Long(7));
        typed.close().unwrap();
    }

    #[test]
    fn test_builder_constructor_and_decode() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let builder = StructBuilder::new("Ship")
            .field("name", Modifiers::PUBLIC, "Heart of Gold")
            .field("crew", Modifiers::PUBLIC, 0i32)
            .empty_field("captain", Modifiers::PRIVATE)
            .constructor(move |ship, args| {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(crew) = args.first() {
                    ship.set_field("crew", crew.clone())?;
                }
                Ok(())
            });

        let ship = builder
            .build(OffHeapStorage::allocate(512).unwrap(), &[WireValue::Int(4)])
            .unwrap();
        assert_eq!(ship.name(), "Ship");
        assert!(ship.is_synthetic());
        assert!(ship.has_constructor());
        assert_eq!(ship.get_field("crew").unwrap(), WireValue::Int(4));
        assert_eq!(ship.get_field("captain").unwrap(), WireValue::Null);

        let sister = ship
            .create_new(OffHeapStorage::allocate(512).unwrap(), &[])
            .unwrap();
        assert_eq!(sister.get_field("crew").unwrap(), WireValue::Int(0));
        assert_eq!(created.load(Ordering::SeqCst), 2);

        // Synthetic structs decode through the built-in binding
        let mut bytes = Vec::new();
        bytes.write_object(&ship).unwrap();
        assert_eq!(&bytes[..8], &i64::MAX.to_be_bytes());

        let mut input: &[u8] = &bytes;
        let value = vellum::read_value(&mut input).unwrap();
        let decoded = value.downcast_ref::<SyntheticStruct>().unwrap();
        assert_eq!(decoded, &ship);
        assert!(!decoded.has_constructor());
        assert_eq!(decoded.template().len(), 3);
        assert_eq!(created.load(Ordering::SeqCst), 2);

        ship.close().unwrap();
        sister.close().unwrap();
        decoded.close().unwrap();
    }

    #[test]
    fn test_builder_validation() {
        let duplicate = StructBuilder::new("Dup")
            .empty_field("a", Modifiers::PUBLIC)
            .empty_field("a", Modifiers::PRIVATE);
        assert!(matches!(
            duplicate.build(OffHeapStorage::allocate(128).unwrap(), &[]),
            Err(VellumError::DuplicateField { .. })
        ));

        let fixed = duplicate.remove_field("a").empty_field("a", Modifiers::PUBLIC);
        let built = fixed
            .build(OffHeapStorage::allocate(128).unwrap(), &[])
            .unwrap();
        assert_eq!(built.store().field_count(), 1);
        built.close().unwrap();

        let transient = StructBuilder::new("T").empty_field("t", Modifiers::TRANSIENT);
        assert!(transient
            .build(OffHeapStorage::allocate(128).unwrap(), &[])
            .is_err());
    }

    #[test]
    fn test_failing_constructor_releases_storage() {
        let builder = StructBuilder::new("Broken")
            .empty_field("x", Modifiers::PUBLIC)
            .constructor(|_, _| Err(VellumError::invalid_parameter("x", "refused")));
        let storage = OffHeapStorage::allocate(128).unwrap();
        let handle = storage.handle();
        assert!(builder.build(storage, &[]).is_err());
        assert!(handle.is_closed());
    }

    #[test]
    fn test_image_too_small_for_the_fields() {
        let builder = StructBuilder::new("Big").field("blob", Modifiers::PUBLIC, "x".repeat(64));
        let storage = OffHeapStorage::allocate(64).unwrap();
        let handle = storage.handle();
        assert!(matches!(
            builder.build(storage, &[]),
            Err(VellumError::OutOfBounds { .. })
        ));
        assert!(handle.is_closed());
    }
}
