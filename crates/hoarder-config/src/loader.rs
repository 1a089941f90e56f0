//! Configuration file loading.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Config;
use crate::validate;

/// Load, parse and validate the configuration document at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load(path: &Path) -> ConfigResult<Config> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = load_from_str(&raw)?;
    info!(
        path = %path.display(),
        watches = config.watch_to_download_paths.len(),
        download_jobs = config.download_jobs(),
        "configuration loaded"
    );
    Ok(config)
}

/// Parse and validate a configuration document held in memory.
///
/// # Errors
///
/// Returns an error if the document cannot be parsed or validated.
pub fn load_from_str(raw: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
    validate::validate(config)
}
