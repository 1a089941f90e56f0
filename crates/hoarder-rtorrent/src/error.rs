//! # Design
//!
//! - Every failure here is transient from the scheduler's point of view: it
//!   logs, keeps the previous registry snapshot, and retries next cycle.

use thiserror::Error;

/// Result alias for rtorrent operations.
pub type RtorrentResult<T> = Result<T, RtorrentError>;

/// Errors produced by the rtorrent adapter.
#[derive(Debug, Error)]
pub enum RtorrentError {
    /// The HTTP client could not be constructed.
    #[error("http client construction failed")]
    Client {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The XMLRPC call failed at the transport or fault level.
    #[error("xmlrpc call failed")]
    Call {
        /// Method that was invoked.
        method: &'static str,
        /// Underlying xmlrpc error.
        source: xmlrpc::Error,
    },
    /// The response did not have the expected shape.
    #[error("unexpected xmlrpc response structure")]
    UnexpectedStructure {
        /// Method that was invoked.
        method: &'static str,
        /// What was being decoded when the mismatch surfaced.
        detail: &'static str,
    },
}
