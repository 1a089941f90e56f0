//! Free-space query backing the scheduler's admission gate.

use std::path::Path;

use crate::error::{RemoteError, RemoteResult};

/// Contract for the disk-usage query; faked in scheduler tests.
pub trait DiskUsage: Send + Sync {
    /// Bytes available to unprivileged writers on the filesystem holding
    /// `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be statted.
    fn free_bytes(&self, path: &Path) -> RemoteResult<u64>;
}

/// Production implementation over `fs2::available_space`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDiskUsage;

impl DiskUsage for LocalDiskUsage {
    fn free_bytes(&self, path: &Path) -> RemoteResult<u64> {
        fs2::available_space(path).map_err(|source| RemoteError::Io {
            operation: "available_space",
            path: path.to_path_buf(),
            source,
        })
    }
}
