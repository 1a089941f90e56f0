//! Remote tree mirroring: reproduce a remote payload's directory layout
//! locally and hand every file to the multi-stream fetcher.

use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use hoarder_remote::RemoteSession;

use crate::error::{FetchError, FetchResult};
use crate::fetcher::{FetchOptions, MultiStreamFetcher};
use crate::progress::ProgressStore;

/// Mirrors one remote path (file or directory) under a local parent.
pub struct TreeMirror {
    session: Arc<dyn RemoteSession>,
    fetcher: MultiStreamFetcher,
    dir_mode: u32,
}

impl TreeMirror {
    /// Build a mirror sharing the fetcher's session and checkpoint store.
    #[must_use]
    pub fn new(
        session: Arc<dyn RemoteSession>,
        progress: Arc<dyn ProgressStore>,
        options: FetchOptions,
    ) -> Self {
        let fetcher = MultiStreamFetcher::new(Arc::clone(&session), progress, options);
        Self {
            session,
            fetcher,
            dir_mode: options.file_mode,
        }
    }

    /// Mirror `remote` into `local_parent`.
    ///
    /// Files land at `local_parent/basename(remote)`; directories are walked
    /// and rebuilt relative to the remote path's parent. Local entries whose
    /// kind disagrees with the remote are replaced.
    ///
    /// # Errors
    ///
    /// Returns the first stat, walk, mkdir or fetch failure.
    pub fn mirror(&self, remote: &Path, local_parent: &Path) -> FetchResult<()> {
        let stat = self
            .session
            .stat(remote)
            .map_err(|source| FetchError::remote("stat", remote, source))?;

        self.make_dir_all(local_parent)?;

        if !stat.is_dir {
            let dest = join_basename(local_parent, remote);
            self.replace_mismatched_kind(&dest, false)?;
            return self.fetcher.fetch(remote, &dest);
        }

        let base = remote.parent().unwrap_or_else(|| Path::new("/"));
        let root = join_basename(local_parent, remote);
        self.replace_mismatched_kind(&root, true)?;
        self.make_dir_all(&root)?;

        let entries = self
            .session
            .walk(remote)
            .map_err(|source| FetchError::remote("walk", remote, source))?;
        debug!(
            remote = %remote.display(),
            local = %root.display(),
            entries = entries.len(),
            "mirroring remote tree"
        );

        for entry in entries {
            let relative = entry.path.strip_prefix(base).unwrap_or(&entry.path);
            let local = local_parent.join(relative);
            if entry.metadata.is_dir {
                self.replace_mismatched_kind(&local, true)?;
                self.make_dir_all(&local)?;
            } else {
                self.replace_mismatched_kind(&local, false)?;
                self.fetcher.fetch(&entry.path, &local)?;
            }
        }
        Ok(())
    }

    fn make_dir_all(&self, path: &Path) -> FetchResult<()> {
        if path.is_dir() {
            return Ok(());
        }
        fs::DirBuilder::new()
            .recursive(true)
            .mode(self.dir_mode)
            .create(path)
            .map_err(|source| FetchError::io("mkdir", path, source))
    }

    /// Remove a pre-existing local entry whose kind contradicts the remote.
    fn replace_mismatched_kind(&self, local: &Path, remote_is_dir: bool) -> FetchResult<()> {
        let Ok(meta) = fs::symlink_metadata(local) else {
            return Ok(());
        };
        if meta.is_dir() == remote_is_dir {
            return Ok(());
        }
        warn!(
            path = %local.display(),
            remote_is_dir,
            "replacing local entry with mismatched kind"
        );
        if meta.is_dir() {
            fs::remove_dir_all(local).map_err(|source| FetchError::io("remove_dir", local, source))
        } else {
            fs::remove_file(local).map_err(|source| FetchError::io("remove_file", local, source))
        }
    }
}

fn join_basename(parent: &Path, remote: &Path) -> std::path::PathBuf {
    remote
        .file_name()
        .map_or_else(|| parent.to_path_buf(), |name| parent.join(name))
}
