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

//! Remote filesystem access for payload transfer: object-safe SFTP session
//! contracts, the ssh2-backed production implementation, and the disk-usage
//! query used by the admission gate.

mod disk;
mod error;
mod session;
mod ssh;

pub use disk::{DiskUsage, LocalDiskUsage};
pub use error::{RemoteError, RemoteResult};
pub use session::{RemoteConnector, RemoteEntry, RemoteMetadata, RemoteRead, RemoteSession};
pub use ssh::SshConnector;
