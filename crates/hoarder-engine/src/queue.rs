//! The download queue: a bijection between info-hashes and queued metainfo
//! paths, plus lifecycle markers.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use hoarder_core::InfoHash;

/// Result of inserting a metainfo entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// The hash was not known; an upload attempt should follow.
    Inserted,
    /// The hash was already queued; admission is idempotent.
    AlreadyKnown,
}

/// Scheduler-owned queue state.
///
/// Entries stay in the queue across failed download attempts; only a
/// successful completion (or a filesystem removal of a queued metainfo)
/// removes them.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    by_hash: HashMap<InfoHash, PathBuf>,
    by_path: HashMap<PathBuf, InfoHash>,
    running: HashSet<InfoHash>,
    failed: HashSet<InfoHash>,
}

impl DownloadQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a hash ↔ path pair; idempotent on hash.
    ///
    /// A path that re-hashes to a different value (the metainfo file was
    /// rewritten in place) replaces its previous entry to keep the bijection.
    pub fn insert(&mut self, hash: InfoHash, path: PathBuf) -> AdmitOutcome {
        if self.by_hash.contains_key(&hash) {
            return AdmitOutcome::AlreadyKnown;
        }
        if let Some(stale) = self.by_path.remove(&path) {
            debug!(path = %path.display(), stale = %stale, "metainfo path re-hashed; dropping stale entry");
            self.by_hash.remove(&stale);
            self.running.remove(&stale);
            self.failed.remove(&stale);
        }
        self.by_path.insert(path.clone(), hash.clone());
        self.by_hash.insert(hash, path);
        AdmitOutcome::Inserted
    }

    /// Drop a queued (not running) entry by metainfo path.
    pub fn forget(&mut self, path: &Path) {
        let Some(hash) = self.by_path.get(path).cloned() else {
            return;
        };
        if self.running.contains(&hash) {
            debug!(hash = %hash, "metainfo removed while download runs; keeping entry");
            return;
        }
        self.by_path.remove(path);
        self.by_hash.remove(&hash);
        self.failed.remove(&hash);
    }

    /// Mark a hash as having a running download.
    pub fn mark_running(&mut self, hash: &InfoHash) {
        self.running.insert(hash.clone());
        self.failed.remove(hash);
    }

    /// Remove a completed hash entirely.
    pub fn mark_done(&mut self, hash: &InfoHash) {
        self.running.remove(hash);
        self.failed.remove(hash);
        if let Some(path) = self.by_hash.remove(hash) {
            self.by_path.remove(&path);
        }
    }

    /// Record a failed attempt: the entry stays queued for a retry, the
    /// running marker is dropped.
    pub fn mark_failed(&mut self, hash: &InfoHash) {
        self.running.remove(hash);
        if self.by_hash.contains_key(hash) {
            self.failed.insert(hash.clone());
        }
    }

    /// Metainfo path for a hash, if queued.
    #[must_use]
    pub fn path_for(&self, hash: &InfoHash) -> Option<&PathBuf> {
        self.by_hash.get(hash)
    }

    /// Whether a download for this hash is currently running.
    #[must_use]
    pub fn is_running(&self, hash: &InfoHash) -> bool {
        self.running.contains(hash)
    }

    /// Whether the last attempt for this hash failed.
    #[must_use]
    pub fn is_failed(&self, hash: &InfoHash) -> bool {
        self.failed.contains(hash)
    }

    /// Snapshot of entries with no running download, for candidate iteration.
    ///
    /// A snapshot (rather than an iterator over the live map) lets the caller
    /// re-admit entries mid-iteration without mutating the map it walks.
    #[must_use]
    pub fn queued_snapshot(&self) -> Vec<(InfoHash, PathBuf)> {
        let mut entries: Vec<(InfoHash, PathBuf)> = self
            .by_hash
            .iter()
            .filter(|(hash, _)| !self.running.contains(*hash))
            .map(|(hash, path)| (hash.clone(), path.clone()))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        entries
    }

    /// Total queued entries, running or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Whether the queue holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: char) -> InfoHash {
        InfoHash::parse(&byte.to_string().repeat(40)).expect("hash")
    }

    #[test]
    fn insert_is_idempotent_on_hash() {
        let mut queue = DownloadQueue::new();
        assert_eq!(
            queue.insert(hash('A'), "/watch/a.torrent".into()),
            AdmitOutcome::Inserted
        );
        assert_eq!(
            queue.insert(hash('A'), "/watch/a.torrent".into()),
            AdmitOutcome::AlreadyKnown
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn rewritten_path_replaces_stale_entry() {
        let mut queue = DownloadQueue::new();
        queue.insert(hash('A'), "/watch/a.torrent".into());
        queue.insert(hash('B'), "/watch/a.torrent".into());
        assert_eq!(queue.len(), 1);
        assert!(queue.path_for(&hash('A')).is_none());
        assert_eq!(
            queue.path_for(&hash('B')),
            Some(&PathBuf::from("/watch/a.torrent"))
        );
    }

    #[test]
    fn forget_spares_running_downloads() {
        let mut queue = DownloadQueue::new();
        queue.insert(hash('A'), "/watch/a.torrent".into());
        queue.mark_running(&hash('A'));
        queue.forget(Path::new("/watch/a.torrent"));
        assert_eq!(queue.len(), 1, "running entry survives removal");

        queue.mark_failed(&hash('A'));
        queue.forget(Path::new("/watch/a.torrent"));
        assert!(queue.is_empty());
    }

    #[test]
    fn failure_keeps_the_entry_for_retry() {
        let mut queue = DownloadQueue::new();
        queue.insert(hash('A'), "/watch/a.torrent".into());
        queue.mark_running(&hash('A'));
        queue.mark_failed(&hash('A'));

        assert!(!queue.is_running(&hash('A')));
        assert!(queue.is_failed(&hash('A')));
        assert_eq!(queue.queued_snapshot().len(), 1, "retry next cycle");

        queue.mark_running(&hash('A'));
        assert!(!queue.is_failed(&hash('A')), "running clears the marker");
        queue.mark_done(&hash('A'));
        assert!(queue.is_empty());
    }

    #[test]
    fn snapshot_excludes_running_entries() {
        let mut queue = DownloadQueue::new();
        queue.insert(hash('A'), "/watch/a.torrent".into());
        queue.insert(hash('B'), "/watch/b.torrent".into());
        queue.mark_running(&hash('A'));

        let snapshot = queue.queued_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, hash('B'));
    }
}
