//! On-disk progress checkpoints for resumable downloads.
//!
//! Each destination gets a hidden sidecar holding one big-endian `i64` per
//! worker at byte offset `8 × (worker − 1)`. Workers write only their own
//! slot, so concurrent positional writes never overlap.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::error::{FetchError, FetchResult};

const SLOT_SIZE: u64 = 8;

/// Checkpoint storage contract; `NullProgressStore` backs runs with
/// resumption disabled.
pub trait ProgressStore: Send + Sync {
    /// Last flushed offset for `worker`, or `None` when no usable checkpoint
    /// exists (absent sidecar, empty file, short read).
    ///
    /// # Errors
    ///
    /// Returns an error only for IO failures other than a missing or short
    /// sidecar.
    fn read(&self, dest: &Path, worker: u32) -> FetchResult<Option<i64>>;

    /// Record `offset` as worker's checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the sidecar cannot be created or written.
    fn write(&self, dest: &Path, offset: i64, worker: u32) -> FetchResult<()>;

    /// Remove the sidecar; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error for unlink failures other than `NotFound`.
    fn destroy(&self, dest: &Path) -> FetchResult<()>;
}

/// Sidecar path rule: hide the file next to its destination.
#[must_use]
pub fn sidecar_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
    let sidecar = format!(".{name}.progress");
    dest.parent()
        .map_or_else(|| PathBuf::from(&sidecar), |parent| parent.join(&sidecar))
}

/// Production store writing the sidecar format described above.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProgressStore;

impl FileProgressStore {
    fn open_for_write(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).write(true).open(path)
    }

    const fn slot_offset(worker: u32) -> u64 {
        (worker as u64 - 1) * SLOT_SIZE
    }
}

impl ProgressStore for FileProgressStore {
    fn read(&self, dest: &Path, worker: u32) -> FetchResult<Option<i64>> {
        let path = sidecar_path(dest);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(FetchError::Progress {
                    operation: "open",
                    path,
                    source,
                });
            }
        };
        let mut slot = [0_u8; SLOT_SIZE as usize];
        match file.read_exact_at(&mut slot, Self::slot_offset(worker)) {
            Ok(()) => Ok(Some(i64::from_be_bytes(slot))),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(source) => Err(FetchError::Progress {
                operation: "read",
                path,
                source,
            }),
        }
    }

    fn write(&self, dest: &Path, offset: i64, worker: u32) -> FetchResult<()> {
        let path = sidecar_path(dest);
        let file = Self::open_for_write(&path).map_err(|source| FetchError::Progress {
            operation: "create",
            path: path.clone(),
            source,
        })?;
        file.write_all_at(&offset.to_be_bytes(), Self::slot_offset(worker))
            .map_err(|source| FetchError::Progress {
                operation: "write",
                path,
                source,
            })
    }

    fn destroy(&self, dest: &Path) -> FetchResult<()> {
        let path = sidecar_path(dest);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FetchError::Progress {
                operation: "unlink",
                path,
                source,
            }),
        }
    }
}

/// No-op store used when `resume_downloads` is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressStore;

impl ProgressStore for NullProgressStore {
    fn read(&self, _dest: &Path, _worker: u32) -> FetchResult<Option<i64>> {
        Ok(None)
    }

    fn write(&self, _dest: &Path, _offset: i64, _worker: u32) -> FetchResult<()> {
        Ok(())
    }

    fn destroy(&self, _dest: &Path) -> FetchResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_sits_hidden_next_to_destination() {
        assert_eq!(
            sidecar_path(Path::new("/dest/payload.bin")),
            PathBuf::from("/dest/.payload.bin.progress")
        );
    }

    #[test]
    fn slots_round_trip_independently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("payload.bin");
        let store = FileProgressStore;

        store.write(&dest, 1024, 2).expect("write slot 2");
        store.write(&dest, 77, 1).expect("write slot 1");

        assert_eq!(store.read(&dest, 1).expect("read"), Some(77));
        assert_eq!(store.read(&dest, 2).expect("read"), Some(1024));
    }

    #[test]
    fn absent_and_short_sidecars_read_as_no_progress() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("payload.bin");
        let store = FileProgressStore;

        assert_eq!(store.read(&dest, 1).expect("absent"), None);

        store.write(&dest, 512, 1).expect("write slot 1");
        // Slot 3 is past the end of the one-slot file.
        assert_eq!(store.read(&dest, 3).expect("short"), None);
    }

    #[test]
    fn destroy_tolerates_missing_sidecar() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("payload.bin");
        let store = FileProgressStore;

        store.destroy(&dest).expect("missing is fine");
        store.write(&dest, 1, 1).expect("write");
        store.destroy(&dest).expect("unlink");
        assert!(!sidecar_path(&dest).exists());
    }

    #[test]
    fn negative_offsets_survive_the_encoding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("payload.bin");
        let store = FileProgressStore;

        store.write(&dest, -1, 1).expect("write");
        assert_eq!(store.read(&dest, 1).expect("read"), Some(-1));
    }
}
