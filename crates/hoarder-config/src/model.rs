//! Typed configuration model.
//!
//! # Design
//! - Pure data carriers; IO lives in `loader.rs`, checks in `validate.rs`.
//! - Interval fields are nanosecond integers on the wire and [`Duration`]s in
//!   memory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Top-level configuration document.
///
/// Field names match the on-disk keys exactly; optional sections fall back to
/// conservative defaults so a minimal document stays short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote rtorrent endpoint and credentials.
    pub rtorrent: RtorrentConfig,
    /// SSH endpoint and credentials used for SFTP payload transfer.
    pub ssh: SshConfig,
    /// Numeric mode applied to files and directories created by downloads.
    #[serde(default = "default_filemode")]
    pub file_download_filemode: u32,
    /// Byte-range workers per file download; zero coerces to one.
    #[serde(default = "default_file_workers")]
    pub file_download_workers: u32,
    /// Watched blackhole directory mapped to the payload destination root.
    pub watch_to_download_paths: BTreeMap<PathBuf, PathBuf>,
    /// Optional staging root; payloads land here first and are renamed into
    /// place on success.
    #[serde(default)]
    pub temp_download_path: Option<PathBuf>,
    /// Watched directory mapped to a metainfo archive directory; metainfo
    /// files from unlisted watches are deleted on success instead.
    #[serde(default)]
    pub watch_to_finish_path: BTreeMap<PathBuf, PathBuf>,
    /// Interval between registry refreshes, nanoseconds on the wire.
    #[serde(with = "nanos")]
    pub rtorrent_update_interval: Duration,
    /// Ceiling on concurrently running downloads; zero coerces to one.
    #[serde(default)]
    pub download_jobs: u32,
    /// Enables the on-disk progress store for resumable downloads.
    #[serde(default)]
    pub resume_downloads: bool,
    /// Unix socket path for the status inspection endpoint.
    pub rpc_socket_path: PathBuf,
    /// Enables the free-space admission gate.
    #[serde(default)]
    pub check_disk_space: bool,
    /// Bytes that must stay free after admitting a download; zero means the
    /// gate only requires `free > required`.
    #[serde(default)]
    pub min_disk_space: u64,
}

impl Config {
    /// Effective download concurrency (zero coerces to one).
    #[must_use]
    pub const fn download_jobs(&self) -> u32 {
        if self.download_jobs == 0 {
            1
        } else {
            self.download_jobs
        }
    }

    /// Effective per-file worker count (zero coerces to one).
    #[must_use]
    pub const fn file_download_workers(&self) -> u32 {
        if self.file_download_workers == 0 {
            1
        } else {
            self.file_download_workers
        }
    }

    /// Destination root bound to a watched directory, if any.
    #[must_use]
    pub fn download_path_for(&self, watch_dir: &std::path::Path) -> Option<&PathBuf> {
        self.watch_to_download_paths.get(watch_dir)
    }

    /// Metainfo archive directory bound to a watched directory, if any.
    #[must_use]
    pub fn finish_path_for(&self, watch_dir: &std::path::Path) -> Option<&PathBuf> {
        self.watch_to_finish_path.get(watch_dir)
    }
}

/// rtorrent XMLRPC endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtorrentConfig {
    /// `http(s)://` URL or an SCGI unix socket path.
    pub addr: String,
    /// Accept invalid TLS certificates on the HTTP transport.
    #[serde(default)]
    pub insecure_cert: bool,
    /// Basic-auth username; empty disables authentication.
    #[serde(default)]
    pub username: String,
    /// Basic-auth password.
    #[serde(default)]
    pub password: String,
}

/// SSH/SFTP endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Login user.
    pub username: String,
    /// Password; ignored when a private key is configured.
    #[serde(default)]
    pub password: String,
    /// Optional private key path used in preference to the password.
    #[serde(default)]
    pub privkey_path: Option<PathBuf>,
    /// `host:port` of the SSH daemon.
    pub addr: String,
    /// TCP connect timeout, nanoseconds on the wire; zero falls back to the
    /// built-in default.
    #[serde(default, with = "nanos")]
    pub connect_timeout: Duration,
}

impl SshConfig {
    /// Connect timeout with the zero value replaced by the default.
    #[must_use]
    pub fn effective_connect_timeout(&self) -> Duration {
        if self.connect_timeout.is_zero() {
            DEFAULT_CONNECT_TIMEOUT
        } else {
            self.connect_timeout
        }
    }
}

/// Fallback when `ssh.connect_timeout` is absent or zero.
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const fn default_filemode() -> u32 {
    0o777
}

const fn default_file_workers() -> u32 {
    4
}

mod nanos {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    pub(crate) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
