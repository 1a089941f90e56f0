//! # Design
//!
//! - Configuration failures are startup-fatal; the process reports them and
//!   exits non-zero.
//! - Constant messages with the offending field carried as context.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document could not be read from disk.
    #[error("failed to read configuration file")]
    Io {
        /// Path of the document.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The document is not valid TOML for the expected model.
    #[error("failed to parse configuration")]
    Parse {
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A required field is missing or empty.
    #[error("missing required configuration field")]
    MissingField {
        /// Dotted key of the field.
        field: &'static str,
    },
    /// A field is present but its value is unusable.
    #[error("invalid configuration value")]
    InvalidValue {
        /// Dotted key of the field.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
        /// Offending value when representable.
        value: Option<String>,
    },
}
