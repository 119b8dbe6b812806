//! Property-based tests for the file adapter
//!
//! Uses proptest to check that reads see exactly what earlier writes put
//! there, across random offsets, sizes and truncations.

use hostvfs::vfs::{HostVfs, IoFailure, VfsFile, VfsFileSystem};
use hostvfs::MemoryFileSystem;
use libsqlite3_sys as ffi;
use proptest::prelude::*;
use std::sync::Arc;

const RWC: i32 = ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;

fn apply(model: &mut Vec<u8>, data: &[u8], offset: usize) {
    let end = offset + data.len();
    if model.len() < end {
        model.resize(end, 0);
    }
    model[offset..end].copy_from_slice(data);
}

proptest! {
    #[test]
    fn prop_reads_match_model(
        writes in prop::collection::vec(
            (0usize..16_384, prop::collection::vec(any::<u8>(), 1..2048)),
            1..20
        )
    ) {
        let fs = MemoryFileSystem::new();
        let vfs = HostVfs::new(Arc::new(fs.clone()));
        let (mut file, _) = vfs.open(Some("/prop.db"), RWC).unwrap();
        let mut model = Vec::new();

        for (offset, data) in &writes {
            file.write(data, *offset as u64).unwrap();
            apply(&mut model, data, *offset);
        }

        prop_assert_eq!(file.file_size().unwrap(), model.len() as u64);

        let mut buf = vec![0u8; model.len()];
        file.read(&mut buf, 0).unwrap();
        prop_assert_eq!(&buf, &model);
        prop_assert_eq!(fs.contents("/prop.db").unwrap(), model);
    }

    #[test]
    fn prop_truncate_sets_size_and_short_reads_zero_fill(
        initial in 0usize..8192,
        target in 0usize..8192,
        read_len in 1usize..512
    ) {
        let fs = MemoryFileSystem::new();
        fs.insert("/t.db", &vec![0xABu8; initial]);
        let vfs = HostVfs::new(Arc::new(fs));
        let (mut file, _) = vfs.open(Some("/t.db"), RWC).unwrap();

        file.truncate(target as u64).unwrap();
        prop_assert_eq!(file.file_size().unwrap(), target as u64);

        // Read straddling the end of file
        let offset = target.saturating_sub(read_len / 2);
        let mut buf = vec![0xEEu8; read_len];
        let result = file.read(&mut buf, offset as u64);

        let available = target - offset;
        if available >= read_len {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(IoFailure::ShortRead));
            prop_assert!(buf[available..].iter().all(|&b| b == 0));
        }
        let kept = initial.min(target);
        for (i, &b) in buf[..available.min(read_len)].iter().enumerate() {
            let expected = if offset + i < kept { 0xAB } else { 0 };
            prop_assert_eq!(b, expected);
        }
    }
}
