//! Multi-stream byte-range fetcher.
//!
//! One remote file is copied by N workers, each owning a contiguous byte
//! range. A worker checkpoints the offset it is *about to read* before every
//! chunk, so a resumed run re-reads at most one chunk per worker.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info};

use hoarder_remote::RemoteSession;

use crate::error::{FetchError, FetchResult};
use crate::progress::ProgressStore;

/// Chunk size for range reads; the final chunk of a partition shrinks to fit.
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Knobs shared by every fetch issued for one download.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Byte-range workers per file, at least one.
    pub workers: u32,
    /// Unix mode for created files.
    pub file_mode: u32,
    /// Read granularity; tests shrink it to exercise many checkpoints.
    pub chunk_size: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            file_mode: 0o777,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Byte ranges `[start, stop)` covering `[0, size)` without gaps or overlap.
///
/// The floor arithmetic must stay exactly as written: resumed downloads
/// recompute their boundaries from it.
#[must_use]
pub fn partition(size: u64, workers: u32) -> Vec<(u64, u64)> {
    let n = u128::from(workers.max(1));
    let size_wide = u128::from(size);
    (1..=n)
        .map(|i| {
            let start = u64::try_from(size_wide * (i - 1) / n).unwrap_or(size);
            let stop = u64::try_from(size_wide * i / n).unwrap_or(size);
            (start, stop)
        })
        .collect()
}

/// Coordinates N parallel range readers into one destination file.
pub struct MultiStreamFetcher {
    session: Arc<dyn RemoteSession>,
    progress: Arc<dyn ProgressStore>,
    options: FetchOptions,
}

impl MultiStreamFetcher {
    /// Build a fetcher over a live session and checkpoint store.
    #[must_use]
    pub fn new(
        session: Arc<dyn RemoteSession>,
        progress: Arc<dyn ProgressStore>,
        options: FetchOptions,
    ) -> Self {
        Self {
            session,
            progress,
            options,
        }
    }

    /// Copy `remote` to `dest`, resuming from any existing checkpoints.
    ///
    /// On success every checkpoint is removed; on failure the sidecar stays
    /// behind for the next attempt.
    ///
    /// # Errors
    ///
    /// Returns the first worker failure, a remote stat/open failure, or a
    /// local IO failure.
    pub fn fetch(&self, remote: &Path, dest: &Path) -> FetchResult<()> {
        let stat = self
            .session
            .stat(remote)
            .map_err(|source| FetchError::remote("stat", remote, source))?;
        let ranges = partition(stat.size, self.options.workers);
        debug!(
            remote = %remote.display(),
            dest = %dest.display(),
            size = stat.size,
            workers = ranges.len(),
            "starting multi-stream fetch"
        );

        let outcomes: Vec<FetchResult<()>> = thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .iter()
                .enumerate()
                .map(|(index, &(start, stop))| {
                    let worker = u32::try_from(index + 1).unwrap_or(u32::MAX);
                    scope.spawn(move || self.run_worker(remote, dest, worker, start, stop))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| {
                    handle.join().unwrap_or(Err(FetchError::WorkerPanic {
                        worker: u32::try_from(index + 1).unwrap_or(u32::MAX),
                    }))
                })
                .collect()
        });

        for outcome in outcomes {
            outcome?;
        }

        self.progress.destroy(dest)?;
        info!(
            remote = %remote.display(),
            dest = %dest.display(),
            size = stat.size,
            "fetch complete"
        );
        Ok(())
    }

    fn run_worker(
        &self,
        remote: &Path,
        dest: &Path,
        worker: u32,
        start: u64,
        stop: u64,
    ) -> FetchResult<()> {
        let resumed = self.progress.read(dest, worker)?;
        let mut offset = resumed
            .and_then(|saved| u64::try_from(saved).ok())
            .unwrap_or(start);
        if resumed.is_some() {
            debug!(worker, offset, "resuming from checkpoint");
        }

        let mut reader = self
            .session
            .open_read(remote)
            .map_err(|source| FetchError::remote("open", remote, source))?;
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|source| FetchError::io("seek_remote", remote, source))?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .mode(self.options.file_mode)
            .open(dest)
            .map_err(|source| FetchError::io("open_dest", dest, source))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| FetchError::io("seek_dest", dest, source))?;

        let mut buf = vec![0_u8; self.options.chunk_size.max(1)];
        while offset < stop {
            // Checkpoint before the read: bytes below this offset are already
            // issued to the destination descriptor.
            self.progress
                .write(dest, to_checkpoint(offset), worker)?;
            let want = usize::try_from((stop - offset).min(buf.len() as u64)).unwrap_or(buf.len());
            let read = reader
                .read(&mut buf[..want])
                .map_err(|source| FetchError::io("read_remote", remote, source))?;
            if read == 0 {
                return Err(FetchError::PrematureEof {
                    path: remote.to_path_buf(),
                    offset,
                    stop,
                });
            }
            file.write_all(&buf[..read])
                .map_err(|source| FetchError::io("write_dest", dest, source))?;
            offset += read as u64;
        }

        self.progress.write(dest, to_checkpoint(offset), worker)?;
        Ok(())
    }
}

fn to_checkpoint(offset: u64) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_covers_exact_division() {
        assert_eq!(partition(100, 4), vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
    }

    #[test]
    fn partition_floors_uneven_division() {
        assert_eq!(partition(10, 3), vec![(0, 3), (3, 6), (6, 10)]);
    }

    #[test]
    fn partition_handles_degenerate_sizes() {
        assert_eq!(partition(0, 4), vec![(0, 0); 4]);
        assert_eq!(partition(3, 8)[7], (2, 3));
        assert_eq!(partition(5, 1), vec![(0, 5)]);
    }

    #[test]
    fn partition_treats_zero_workers_as_one() {
        assert_eq!(partition(42, 0), vec![(0, 42)]);
    }
}
