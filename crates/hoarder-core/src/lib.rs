#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Shared vocabulary types and adapter contracts used across the workspace.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod error;

pub use error::CoreError;

/// Canonical torrent identity: 40 hexadecimal characters, stored uppercase.
///
/// Comparisons are case-insensitive by construction because every accepted
/// value is normalised to uppercase before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfoHash(String);

impl InfoHash {
    /// Length of a hex-encoded SHA-1 digest.
    pub const HEX_LEN: usize = 40;

    /// Parse and normalise a hex digest of any case.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not exactly 40 hex characters.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        if value.len() != Self::HEX_LEN {
            return Err(CoreError::InvalidInfoHash {
                reason: "length",
                value: value.to_string(),
            });
        }
        if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidInfoHash {
                reason: "charset",
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_ascii_uppercase()))
    }

    /// View the canonical uppercase hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<[u8; 20]> for InfoHash {
    fn from(digest: [u8; 20]) -> Self {
        Self(hex::encode_upper(digest))
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for InfoHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InfoHash {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InfoHash> for String {
    fn from(hash: InfoHash) -> Self {
        hash.0
    }
}

impl AsRef<str> for InfoHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One torrent as reported by the remote rtorrent instance.
///
/// A record lives for one registry refresh; the registry replaces its whole
/// snapshot rather than merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTorrent {
    /// Canonical identity of the torrent.
    pub hash: InfoHash,
    /// Display name reported by rtorrent.
    pub name: String,
    /// Absolute payload path on the remote host.
    pub path: PathBuf,
    /// Total payload size in bytes.
    pub size: u64,
    /// Whether rtorrent reports the download as complete.
    pub completed: bool,
}

/// Filesystem notification reduced to what the scheduler consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A metainfo file appeared or changed under a watched directory.
    Added(PathBuf),
    /// A metainfo file was removed from a watched directory.
    Removed(PathBuf),
}

/// Tagged completion sentinel pushed by download tasks.
///
/// The scheduler drops the in-flight marker for both variants and removes the
/// queue entry only on success, so a failed hash is retried next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The payload was mirrored and relocated, metainfo disposition applied.
    Succeeded(InfoHash),
    /// Any step of the download task failed; the queue entry is kept.
    Failed(InfoHash),
}

impl DownloadOutcome {
    /// The info-hash the outcome refers to.
    #[must_use]
    pub const fn hash(&self) -> &InfoHash {
        match self {
            Self::Succeeded(hash) | Self::Failed(hash) => hash,
        }
    }
}

/// Contract for the remote torrent daemon (rtorrent over XMLRPC).
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Fetch the complete torrent list from the daemon.
    async fn list_torrents(&self) -> anyhow::Result<Vec<RemoteTorrent>>;

    /// Upload raw metainfo bytes and start the torrent.
    async fn add_torrent(&self, metainfo: &[u8]) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_hash_normalises_to_uppercase() {
        let mixed = "aBcDeF0123456789aBcDeF0123456789aBcDeF01";
        let hash = InfoHash::parse(mixed).expect("valid hash");
        assert_eq!(hash.as_str(), mixed.to_ascii_uppercase());
    }

    #[test]
    fn info_hash_comparisons_ignore_input_case() {
        let upper = InfoHash::parse("ABCDEF0123456789ABCDEF0123456789ABCDEF01").expect("upper");
        let lower = InfoHash::parse("abcdef0123456789abcdef0123456789abcdef01").expect("lower");
        assert_eq!(upper, lower);
    }

    #[test]
    fn info_hash_rejects_bad_length_and_charset() {
        assert!(matches!(
            InfoHash::parse("abc"),
            Err(CoreError::InvalidInfoHash { reason: "length", .. })
        ));
        assert!(matches!(
            InfoHash::parse("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(CoreError::InvalidInfoHash { reason: "charset", .. })
        ));
    }

    #[test]
    fn info_hash_serde_round_trip_normalises() {
        let json = "\"abcdef0123456789abcdef0123456789abcdef01\"";
        let hash: InfoHash = serde_json::from_str(json).expect("deserialise");
        assert_eq!(hash.as_str(), "ABCDEF0123456789ABCDEF0123456789ABCDEF01");
        let back = serde_json::to_string(&hash).expect("serialise");
        assert_eq!(back, "\"ABCDEF0123456789ABCDEF0123456789ABCDEF01\"");
    }

    #[test]
    fn outcome_exposes_hash_for_both_variants() {
        let hash = InfoHash::parse("ABCDEF0123456789ABCDEF0123456789ABCDEF01").expect("hash");
        assert_eq!(DownloadOutcome::Succeeded(hash.clone()).hash(), &hash);
        assert_eq!(DownloadOutcome::Failed(hash.clone()).hash(), &hash);
    }
}
