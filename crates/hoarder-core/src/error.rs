//! # Design
//!
//! - Constant error messages with context carried in fields.
//! - Kept deliberately small: richer taxonomies live in the crates that own
//!   the failing operations.

use thiserror::Error;

/// Errors produced by the shared vocabulary types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A candidate info-hash failed validation.
    #[error("invalid info hash")]
    InvalidInfoHash {
        /// Machine-readable reason (`length` or `charset`).
        reason: &'static str,
        /// The offending input.
        value: String,
    },
}
