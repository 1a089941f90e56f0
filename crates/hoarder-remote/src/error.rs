//! # Design
//!
//! - Constant messages, context in fields, sources preserved.
//! - Connection-phase failures are distinguished so startup can treat them as
//!   fatal while the scheduler treats mid-run failures as transient.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors produced by the remote session and disk-usage adapters.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The configured address did not resolve to a socket address.
    #[error("ssh address did not resolve")]
    Resolve {
        /// Configured `host:port` value.
        addr: String,
    },
    /// TCP connect failed or timed out.
    #[error("ssh connect failed")]
    Connect {
        /// Configured `host:port` value.
        addr: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// SSH handshake or authentication failed.
    #[error("ssh authentication failed")]
    Auth {
        /// Phase identifier (`handshake`, `pubkey`, `password`).
        operation: &'static str,
        /// Underlying libssh2 error.
        source: ssh2::Error,
    },
    /// An SFTP operation failed.
    #[error("sftp operation failed")]
    Sftp {
        /// Operation identifier.
        operation: &'static str,
        /// Remote path involved.
        path: PathBuf,
        /// Underlying libssh2 error.
        source: ssh2::Error,
    },
    /// A local IO operation failed (disk-usage query).
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Local path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl RemoteError {
    pub(crate) fn sftp(operation: &'static str, path: &std::path::Path, source: ssh2::Error) -> Self {
        Self::Sftp {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}
