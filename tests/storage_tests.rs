//! Integration tests for storage regions, slices and file copies

use tempfile::TempDir;
use vellum::{
    ByteOrder, MappingConfig, OffHeapStorage, RegionKind, Storage, VellumError, WireRead,
    WireValue, WireWrite,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_width_in_both_orders() {
        let storage = OffHeapStorage::allocate(64).unwrap();
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
            storage.set_short_ordered(0, -2, order).unwrap();
            storage.set_char_ordered(2, 0xFEFF, order).unwrap();
            storage.set_int_ordered(4, i32::MIN, order).unwrap();
            storage.set_long_ordered(8, 0x0102_0304_0506_0708, order).unwrap();
            storage.set_float_ordered(16, 1.25, order).unwrap();
            storage.set_double_ordered(24, -0.5, order).unwrap();

            assert_eq!(storage.get_short_ordered(0, order).unwrap(), -2);
            assert_eq!(storage.get_char_ordered(2, order).unwrap(), 0xFEFF);
            assert_eq!(storage.get_int_ordered(4, order).unwrap(), i32::MIN);
            assert_eq!(
                storage.get_long_ordered(8, order).unwrap(),
                0x0102_0304_0506_0708
            );
            assert_eq!(storage.get_float_ordered(16, order).unwrap(), 1.25);
            assert_eq!(storage.get_double_ordered(24, order).unwrap(), -0.5);
        }

        storage
            .set_long_ordered(32, 0x0102_0304_0506_0708, ByteOrder::BigEndian)
            .unwrap();
        assert_eq!(storage.get_byte(32).unwrap(), 0x01);
        assert_eq!(storage.get_byte(39).unwrap(), 0x08);
        assert_eq!(
            storage.get_long_ordered(32, ByteOrder::LittleEndian).unwrap(),
            0x0807_0605_0403_0201
        );
        storage.close().unwrap();
    }

    #[test]
    fn test_bounds_are_checked() {
        let storage = OffHeapStorage::allocate(16).unwrap();
        assert!(storage.set_long(8, 1).is_ok());
        assert!(matches!(
            storage.set_long(9, 1),
            Err(VellumError::OutOfBounds { .. })
        ));
        assert!(matches!(
            storage.get_byte(16),
            Err(VellumError::OutOfBounds { .. })
        ));
        assert!(storage.get_int(usize::MAX - 1).is_err());
        let mut buf = [0u8; 4];
        assert!(storage.get_bytes(14, &mut buf).is_err());
        storage.close().unwrap();
    }

    #[test]
    fn test_new_region_is_zeroed_and_closes_once() {
        let storage = OffHeapStorage::allocate(128).unwrap();
        assert_eq!(storage.kind(), RegionKind::Heap);
        let mut buf = [0xFFu8; 128];
        storage.get_bytes(0, &mut buf).unwrap();
        assert!(buf.iter().all(|b| *b == 0));

        storage.fill(0, 128, 7).unwrap();
        storage.close().unwrap();
        storage.close().unwrap();
        assert!(storage.is_closed());
        assert!(storage.get_byte(0).unwrap_err().is_state());
        assert!(storage.set_byte(0, 1).unwrap_err().is_state());
    }

    #[test]
    fn test_slices_follow_their_parent() {
        let storage = OffHeapStorage::allocate(32).unwrap();
        let slice = storage.slice(8, 16).unwrap();
        assert_eq!(slice.size(), 16);
        assert_eq!(slice.id(), storage.id());

        slice.set_int(0, 99).unwrap();
        assert_eq!(storage.get_int(8).unwrap(), 99);
        assert!(slice.set_int(13, 1).is_err());

        let nested = slice.slice(4, 4).unwrap();
        nested.set_int(0, 5).unwrap();
        assert_eq!(storage.get_int(12).unwrap(), 5);
        assert!(slice.slice(10, 8).is_err());

        assert!(matches!(slice.close(), Err(VellumError::Unsupported { .. })));
        assert!(!storage.is_closed());

        storage.close().unwrap();
        assert!(slice.is_closed());
        assert!(nested.get_int(0).unwrap_err().is_state());
    }

    #[test]
    fn test_streams_over_a_slice_never_close_the_parent() {
        let parent = OffHeapStorage::allocate(64).unwrap();
        let slice = parent.slice(16, 32).unwrap();

        assert!(matches!(
            slice.input_stream(true),
            Err(VellumError::Unsupported { .. })
        ));
        assert!(matches!(
            slice.output_stream(true),
            Err(VellumError::Unsupported { .. })
        ));

        let mut out = slice.output_stream(false).unwrap();
        out.write_value(&WireValue::Int(8)).unwrap();
        out.close();
        let mut input = slice.input_stream(false).unwrap();
        assert_eq!(input.read_value().unwrap(), WireValue::Int(8));
        input.close();

        assert!(!parent.is_closed());
        assert!(!slice.is_closed());
        assert_eq!(parent.get_long_ordered(16, ByteOrder::BigEndian).unwrap(), -3);
        parent.close().unwrap();
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.bin");

        let storage = OffHeapStorage::allocate(10_000).unwrap();
        for i in 0..10_000 {
            storage.set_byte(i, (i % 251) as u8).unwrap();
        }
        storage.to_file(&path, 100, 9_000).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 9_000);

        let copy = OffHeapStorage::allocate(9_500).unwrap();
        copy.from_file(&path, 0, 9_000, 500).unwrap();
        assert_eq!(copy.get_byte(500).unwrap(), 100);
        assert_eq!(copy.get_byte(9_499).unwrap(), ((9_099) % 251) as u8);
        assert_eq!(copy.get_byte(0).unwrap(), 0);

        // Reading past the end of the file fails
        assert!(copy.from_file(&path, 8_000, 2_000, 0).is_err());
        assert!(storage.to_file(&path, 9_000, 2_000).is_err());

        storage.close().unwrap();
        copy.close().unwrap();
    }

    #[test]
    fn test_mapped_file_persists_after_close() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapped.bin");

        let mapped = OffHeapStorage::map(&MappingConfig::file(&path, 4096)).unwrap();
        assert_eq!(mapped.kind(), RegionKind::Mapped);
        assert_eq!(mapped.size(), 4096);
        mapped.set_long_ordered(0, 42, ByteOrder::BigEndian).unwrap();
        mapped.flush().unwrap();
        mapped.close().unwrap();
        assert!(mapped.get_byte(0).is_err());

        let reopened =
            OffHeapStorage::map(&MappingConfig::file(&path, 0).with_create(false)).unwrap();
        assert_eq!(reopened.size(), 4096);
        assert_eq!(reopened.get_long_ordered(0, ByteOrder::BigEndian).unwrap(), 42);
        reopened.close().unwrap();
    }

    #[test]
    fn test_mapping_requires_existing_file_without_create() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.bin");
        assert!(OffHeapStorage::map(&MappingConfig::file(&missing, 0).with_create(false)).is_err());
        assert!(OffHeapStorage::map(&MappingConfig::file(&missing, 0)).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_memfd_mapping() {
        let storage = OffHeapStorage::map(&MappingConfig::memfd("vellum-test", 8192)).unwrap();
        assert_eq!(storage.size(), 8192);
        storage.set_double(8184, 6.5).unwrap();
        assert_eq!(storage.get_double(8184).unwrap(), 6.5);
        storage.close().unwrap();
    }

    #[test]
    fn test_allocation_limit() {
        assert!(matches!(
            OffHeapStorage::allocate(vellum::storage::max_safe_allocation() + 1),
            Err(VellumError::AllocationLimit { .. })
        ));
        assert!(OffHeapStorage::allocate(0).is_err());
    }

    #[test]
    fn test_handle_tracks_tenancy() {
        let storage = OffHeapStorage::allocate(8).unwrap();
        let handle = storage.handle();
        assert!(!handle.is_closed());
        assert_eq!(handle.region_id(), storage.id());
        storage.close().unwrap();
        assert!(handle.is_closed());
        assert!(!handle.is_reclaimed());
        drop(storage);
        assert!(handle.is_reclaimed());
    }
}
