//! Session contracts consumed by the fetcher, mirror and scheduler.
//!
//! The traits are synchronous on purpose: byte-range workers run on blocking
//! threads against ssh2's synchronous API, and async callers hop through
//! `spawn_blocking` at the crate boundary.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::RemoteResult;

/// Stat subset the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// Size in bytes; zero for directories.
    pub size: u64,
    /// Whether the path is a directory.
    pub is_dir: bool,
}

/// One entry discovered while walking a remote tree.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    /// Absolute remote path of the entry.
    pub path: PathBuf,
    /// Stat data captured during the walk.
    pub metadata: RemoteMetadata,
}

/// Readable, seekable remote file handle.
pub trait RemoteRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> RemoteRead for T {}

/// One live connection to the remote host.
///
/// Implementations must tolerate concurrent calls: the multi-stream fetcher
/// opens one read handle per byte-range worker against a single shared
/// session.
pub trait RemoteSession: Send + Sync {
    /// Stat a remote path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or the session failed.
    fn stat(&self, path: &Path) -> RemoteResult<RemoteMetadata>;

    /// Open a remote file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    fn open_read(&self, path: &Path) -> RemoteResult<Box<dyn RemoteRead>>;

    /// Walk a remote directory depth-first, parents before children.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory listing fails.
    fn walk(&self, path: &Path) -> RemoteResult<Vec<RemoteEntry>>;
}

impl std::fmt::Debug for dyn RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn RemoteSession")
    }
}

/// Factory for [`RemoteSession`] values; the scheduler connects lazily and
/// drops the session when no download is in flight.
pub trait RemoteConnector: Send + Sync {
    /// Establish a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be established or
    /// authentication fails.
    fn connect(&self) -> RemoteResult<Arc<dyn RemoteSession>>;
}
