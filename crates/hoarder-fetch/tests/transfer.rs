//! End-to-end fetcher and mirror behaviour over the in-memory remote.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;

use hoarder_fetch::{
    FetchError, FetchOptions, FileProgressStore, MultiStreamFetcher, TreeMirror, partition,
    sidecar_path,
};
use hoarder_test_support::{MemoryRemote, ReadBudget};

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn options(workers: u32, chunk_size: usize) -> FetchOptions {
    FetchOptions {
        workers,
        file_mode: 0o644,
        chunk_size,
    }
}

proptest! {
    #[test]
    fn partitions_cover_the_whole_range_without_overlap(
        size in 0_u64..10_000_000,
        workers in 1_u32..64,
    ) {
        let ranges = partition(size, workers);
        prop_assert_eq!(ranges.len(), workers as usize);
        prop_assert_eq!(ranges[0].0, 0);
        prop_assert_eq!(ranges[ranges.len() - 1].1, size);
        for window in ranges.windows(2) {
            // Contiguous and non-overlapping: each stop is the next start.
            prop_assert_eq!(window[0].1, window[1].0);
        }
        for &(start, stop) in &ranges {
            prop_assert!(start <= stop);
        }
    }
}

#[test]
fn fetch_reproduces_source_bytes_and_removes_sidecar() {
    let remote = MemoryRemote::new();
    let bytes = payload(1_048_576);
    remote.add_file("/remote/payload.bin", bytes.clone());

    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("payload.bin");
    let fetcher = MultiStreamFetcher::new(
        remote.clone(),
        Arc::new(FileProgressStore),
        options(4, 64 * 1024),
    );

    fetcher
        .fetch(Path::new("/remote/payload.bin"), &dest)
        .expect("fetch succeeds");

    assert_eq!(fs::read(&dest).expect("dest readable"), bytes);
    assert!(!sidecar_path(&dest).exists(), "sidecar must be removed");
}

#[test]
fn interrupted_fetch_resumes_to_identical_bytes() {
    let remote = MemoryRemote::new();
    let bytes = payload(512 * 1024);
    remote.add_file("/remote/payload.bin", bytes.clone());

    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("payload.bin");
    let opts = options(4, 8 * 1024);
    let fetcher = MultiStreamFetcher::new(
        remote.clone(),
        Arc::new(FileProgressStore),
        opts,
    );

    // Let every worker land a few checkpoints, then cut the connection.
    let budget = ReadBudget::new(24);
    remote.set_budget(budget.clone());
    fetcher
        .fetch(Path::new("/remote/payload.bin"), &dest)
        .expect_err("injected cut must fail the fetch");
    assert!(
        sidecar_path(&dest).exists(),
        "failed fetch leaves the sidecar for resumption"
    );

    budget.reset(i64::MAX);
    fetcher
        .fetch(Path::new("/remote/payload.bin"), &dest)
        .expect("resumed fetch succeeds");

    assert_eq!(fs::read(&dest).expect("dest readable"), bytes);
    assert!(!sidecar_path(&dest).exists());
}

#[test]
fn premature_eof_is_reported_not_looped() {
    let remote = MemoryRemote::new();
    remote.add_file("/remote/short.bin", payload(1024));
    // Stat keeps reporting 1024 bytes while reads run dry at 512.
    remote.set_served_len(Some(512));

    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("short.bin");
    let fetcher = MultiStreamFetcher::new(
        remote.clone(),
        Arc::new(FileProgressStore),
        options(1, 256),
    );

    let err = fetcher
        .fetch(Path::new("/remote/short.bin"), &dest)
        .expect_err("zero-length read before the boundary must error");
    assert!(matches!(err, FetchError::PrematureEof { .. }));
    assert!(
        sidecar_path(&dest).exists(),
        "failure leaves the sidecar in place"
    );
}

#[test]
fn mirror_rebuilds_directory_layout() {
    let remote = MemoryRemote::new();
    remote.add_file("/seed/show/episode-1.mkv", payload(4096));
    remote.add_file("/seed/show/extras/notes.txt", payload(128));

    let dir = tempfile::tempdir().expect("tempdir");
    let mirror = TreeMirror::new(
        remote.clone(),
        Arc::new(FileProgressStore),
        options(2, 1024),
    );

    mirror
        .mirror(Path::new("/seed/show"), dir.path())
        .expect("mirror succeeds");

    assert!(dir.path().join("show/episode-1.mkv").is_file());
    assert!(dir.path().join("show/extras/notes.txt").is_file());
    assert_eq!(
        fs::read(dir.path().join("show/extras/notes.txt")).expect("read"),
        payload(128)
    );
}

#[test]
fn mirror_delegates_single_files_to_basename() {
    let remote = MemoryRemote::new();
    remote.add_file("/seed/payload.bin", payload(2048));

    let dir = tempfile::tempdir().expect("tempdir");
    let mirror = TreeMirror::new(
        remote.clone(),
        Arc::new(FileProgressStore),
        options(1, 1024),
    );

    mirror
        .mirror(Path::new("/seed/payload.bin"), dir.path())
        .expect("mirror succeeds");

    assert_eq!(
        fs::read(dir.path().join("payload.bin")).expect("read"),
        payload(2048)
    );
}

#[test]
fn mirror_replaces_kind_mismatched_local_entries() {
    let remote = MemoryRemote::new();
    remote.add_file("/seed/show/episode-1.mkv", payload(1024));

    let dir = tempfile::tempdir().expect("tempdir");
    // A stray local *directory* where the remote has a file.
    fs::create_dir_all(dir.path().join("show/episode-1.mkv")).expect("collision dir");

    let mirror = TreeMirror::new(
        remote.clone(),
        Arc::new(FileProgressStore),
        options(1, 1024),
    );
    mirror
        .mirror(Path::new("/seed/show"), dir.path())
        .expect("mirror succeeds");

    assert!(dir.path().join("show/episode-1.mkv").is_file());
}
