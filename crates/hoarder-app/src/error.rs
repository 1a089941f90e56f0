//! # Design
//!
//! - Centralize application-level errors for bootstrap and shutdown.
//! - Keep error messages constant while carrying context fields.
//! - Everything here is startup- or shutdown-fatal; mid-run failures are
//!   handled (and logged) inside the engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub(crate) type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    /// Configuration loading or validation failed.
    #[error("configuration failed")]
    Config {
        /// Source configuration error.
        source: hoarder_config::ConfigError,
    },
    /// The rtorrent client could not be constructed.
    #[error("rtorrent client construction failed")]
    Rtorrent {
        /// Source adapter error.
        source: hoarder_rtorrent::RtorrentError,
    },
    /// The status socket could not be bound or queried.
    #[error("status socket operation failed")]
    StatusSocket {
        /// Operation identifier.
        operation: &'static str,
        /// Socket path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The filesystem watcher could not be installed.
    #[error("filesystem watcher installation failed")]
    Watcher {
        /// Directory being watched.
        path: PathBuf,
        /// Underlying notify error.
        source: notify::Error,
    },
    /// The initial blackhole scan failed.
    #[error("initial watch directory scan failed")]
    InitialScan {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The scheduler task ended abnormally.
    #[error("scheduler task failed")]
    Scheduler {
        /// Rendered failure chain.
        detail: String,
    },
    /// The status reply was not valid for the wire protocol.
    #[error("malformed status reply")]
    StatusProtocol {
        /// What was being decoded.
        detail: &'static str,
    },
}

impl From<hoarder_config::ConfigError> for AppError {
    fn from(source: hoarder_config::ConfigError) -> Self {
        Self::Config { source }
    }
}
