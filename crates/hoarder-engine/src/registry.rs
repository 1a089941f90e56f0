//! Cached snapshot of the remote torrent list.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use hoarder_core::{InfoHash, RemoteTorrent};

/// Scheduler-owned cache of rtorrent's torrent list.
///
/// Only the scheduler's refresh path mutates the map; every refresh replaces
/// the snapshot wholesale. A failed refresh leaves the previous snapshot (and
/// its timestamp) untouched so the next cycle retries.
#[derive(Debug, Default)]
pub struct TorrentRegistry {
    torrents: HashMap<InfoHash, RemoteTorrent>,
    last_refresh: Option<Instant>,
}

impl TorrentRegistry {
    /// Empty registry that reports itself stale.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a torrent by canonical hash.
    #[must_use]
    pub fn get(&self, hash: &InfoHash) -> Option<&RemoteTorrent> {
        self.torrents.get(hash)
    }

    /// Replace the snapshot wholesale and stamp the refresh time.
    pub fn replace(&mut self, records: Vec<RemoteTorrent>) {
        self.torrents = records
            .into_iter()
            .map(|record| (record.hash.clone(), record))
            .collect();
        self.last_refresh = Some(Instant::now());
    }

    /// Whether `interval` has elapsed since the last successful refresh.
    #[must_use]
    pub fn is_stale(&self, interval: Duration) -> bool {
        self.last_refresh
            .is_none_or(|last| last.elapsed() >= interval)
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.torrents.len()
    }

    /// Whether the cache holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.torrents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, completed: bool) -> RemoteTorrent {
        RemoteTorrent {
            hash: InfoHash::parse(hash).expect("hash"),
            name: "payload".to_string(),
            path: "/seed/payload".into(),
            size: 1024,
            completed,
        }
    }

    #[test]
    fn fresh_registry_is_stale() {
        let registry = TorrentRegistry::new();
        assert!(registry.is_stale(Duration::from_secs(3600)));
        assert!(registry.is_empty());
    }

    #[test]
    fn replace_is_wholesale() {
        let mut registry = TorrentRegistry::new();
        let first = record("ABCDEF0123456789ABCDEF0123456789ABCDEF01", false);
        let second = record("0123456789ABCDEF0123456789ABCDEF01234567", true);

        registry.replace(vec![first.clone()]);
        assert!(registry.get(&first.hash).is_some());

        registry.replace(vec![second.clone()]);
        assert!(registry.get(&first.hash).is_none(), "old records dropped");
        assert!(registry.get(&second.hash).is_some());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_stale(Duration::from_secs(3600)));
    }
}
