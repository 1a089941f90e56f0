//! Logging initialisation.
//!
//! # Design
//! - One entry point installing the global subscriber; pretty output in
//!   debug builds, JSON in release, `RUST_LOG` overriding the default level.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

/// Default logging target when `RUST_LOG` is not provided.
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LogFormat {
    /// Structured JSON objects.
    Json,
    /// Human-readable output.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    pub(crate) const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if another subscriber was already installed.
pub(crate) fn init_logging(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let builder = fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
    .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_builds_prefer_pretty_output() {
        let format = LogFormat::infer();
        if cfg!(debug_assertions) {
            assert!(matches!(format, LogFormat::Pretty));
        } else {
            assert!(matches!(format, LogFormat::Json));
        }
    }
}
