//! # Design
//!
//! - One taxonomy for the whole transfer pipeline; the scheduler only needs
//!   success/failure, tests discriminate on variants.
//! - Constant messages, context in fields, sources preserved.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use hoarder_remote::RemoteError;

/// Result alias for transfer operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors produced by the progress store, fetcher and mirror.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A remote session operation failed.
    #[error("remote operation failed")]
    Remote {
        /// Operation identifier.
        operation: &'static str,
        /// Remote path involved.
        path: PathBuf,
        /// Underlying session error.
        source: RemoteError,
    },
    /// A local filesystem operation failed.
    #[error("local io failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Local path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A sidecar operation failed.
    #[error("progress sidecar io failed")]
    Progress {
        /// Operation identifier.
        operation: &'static str,
        /// Sidecar path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The remote stream ended before the worker's partition boundary.
    #[error("remote stream ended before partition boundary")]
    PrematureEof {
        /// Remote path being read.
        path: PathBuf,
        /// Offset the worker had reached.
        offset: u64,
        /// Partition boundary that was never reached.
        stop: u64,
    },
    /// A byte-range worker panicked.
    #[error("byte-range worker panicked")]
    WorkerPanic {
        /// One-based worker index.
        worker: u32,
    },
}

impl FetchError {
    pub(crate) fn io(operation: &'static str, path: &std::path::Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn remote(
        operation: &'static str,
        path: &std::path::Path,
        source: RemoteError,
    ) -> Self {
        Self::Remote {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}
