//! Scripted torrent-client fake.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use async_trait::async_trait;

use hoarder_core::{RemoteTorrent, TorrentClient};

/// Records uploads and serves a scripted torrent list.
#[derive(Default)]
pub struct FakeTorrentClient {
    torrents: Mutex<Vec<RemoteTorrent>>,
    uploads: Mutex<Vec<Vec<u8>>>,
    fail_listing: AtomicBool,
}

impl FakeTorrentClient {
    /// Empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the scripted torrent list.
    pub fn set_torrents(&self, torrents: Vec<RemoteTorrent>) {
        *self.torrents.lock().expect("torrents lock") = torrents;
    }

    /// Make every subsequent `list_torrents` call fail.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Metainfo blobs received through `add_torrent`, in call order.
    pub fn uploads(&self) -> Vec<Vec<u8>> {
        self.uploads.lock().expect("uploads lock").clone()
    }
}

#[async_trait]
impl TorrentClient for FakeTorrentClient {
    async fn list_torrents(&self) -> anyhow::Result<Vec<RemoteTorrent>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            bail!("scripted listing failure");
        }
        Ok(self.torrents.lock().expect("torrents lock").clone())
    }

    async fn add_torrent(&self, metainfo: &[u8]) -> anyhow::Result<()> {
        self.uploads
            .lock()
            .expect("uploads lock")
            .push(metainfo.to_vec());
        Ok(())
    }
}
