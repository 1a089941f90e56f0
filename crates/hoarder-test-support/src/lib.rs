#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Shared fixtures for workspace tests: an in-memory remote filesystem, a
//! scripted torrent client, disk-usage stubs and metainfo builders.

mod fixtures;
mod remote;
mod torrent;

pub use fixtures::metainfo_fixture;
pub use remote::{MemoryRemote, ReadBudget};
pub use torrent::FakeTorrentClient;

use std::path::Path;

use hoarder_remote::{DiskUsage, RemoteResult};

/// Disk-usage stub reporting a fixed number of free bytes for every path.
#[derive(Debug, Clone, Copy)]
pub struct FixedDiskUsage(pub u64);

impl DiskUsage for FixedDiskUsage {
    fn free_bytes(&self, _path: &Path) -> RemoteResult<u64> {
        Ok(self.0)
    }
}
