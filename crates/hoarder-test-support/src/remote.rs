//! In-memory implementation of the remote session contracts.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use hoarder_remote::{
    RemoteConnector, RemoteEntry, RemoteError, RemoteMetadata, RemoteRead, RemoteResult,
    RemoteSession,
};

/// Shared countdown of read calls; when it reaches zero every further read
/// fails, simulating a connection cut mid-download.
#[derive(Debug, Clone)]
pub struct ReadBudget(Arc<AtomicI64>);

impl ReadBudget {
    /// Allow `reads` successful read calls before injecting failures.
    #[must_use]
    pub fn new(reads: i64) -> Self {
        Self(Arc::new(AtomicI64::new(reads)))
    }

    /// Lift the cut, allowing a subsequent run to complete.
    pub fn reset(&self, reads: i64) {
        self.0.store(reads, Ordering::SeqCst);
    }

    fn consume(&self) -> bool {
        self.0.fetch_sub(1, Ordering::SeqCst) > 0
    }
}

/// In-memory remote tree used by fetcher, mirror and scheduler tests.
#[derive(Default)]
pub struct MemoryRemote {
    files: Mutex<BTreeMap<PathBuf, Arc<Vec<u8>>>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    budget: Mutex<Option<ReadBudget>>,
    served_len: Mutex<Option<usize>>,
    connect_count: AtomicI64,
}

impl MemoryRemote {
    /// Empty remote tree.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert a file, creating every ancestor directory.
    pub fn add_file(self: &Arc<Self>, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        let path = path.into();
        let mut ancestor = path.parent();
        let mut dirs = self.dirs.lock().expect("dirs lock");
        while let Some(dir) = ancestor {
            if !dir.as_os_str().is_empty() {
                dirs.insert(dir.to_path_buf());
            }
            ancestor = dir.parent();
        }
        drop(dirs);
        self.files
            .lock()
            .expect("files lock")
            .insert(path, Arc::new(bytes));
    }

    /// Install a read budget for fault injection.
    pub fn set_budget(self: &Arc<Self>, budget: ReadBudget) {
        *self.budget.lock().expect("budget lock") = Some(budget);
    }

    /// Serve at most `len` bytes per file while `stat` keeps reporting the
    /// full size, simulating a remote file that shrank mid-transfer.
    pub fn set_served_len(self: &Arc<Self>, len: Option<usize>) {
        *self.served_len.lock().expect("served_len lock") = len;
    }

    /// Number of `connect` calls observed.
    pub fn connect_count(self: &Arc<Self>) -> i64 {
        self.connect_count.load(Ordering::SeqCst)
    }

    fn lookup(&self, path: &Path) -> Option<Arc<Vec<u8>>> {
        self.files.lock().expect("files lock").get(path).cloned()
    }

    fn not_found(operation: &'static str, path: &Path) -> RemoteError {
        RemoteError::Io {
            operation,
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such remote path"),
        }
    }
}

impl RemoteSession for MemoryRemote {
    fn stat(&self, path: &Path) -> RemoteResult<RemoteMetadata> {
        if let Some(bytes) = self.lookup(path) {
            return Ok(RemoteMetadata {
                size: bytes.len() as u64,
                is_dir: false,
            });
        }
        if self.dirs.lock().expect("dirs lock").contains(path) {
            return Ok(RemoteMetadata {
                size: 0,
                is_dir: true,
            });
        }
        Err(Self::not_found("stat", path))
    }

    fn open_read(&self, path: &Path) -> RemoteResult<Box<dyn RemoteRead>> {
        let bytes = self
            .lookup(path)
            .ok_or_else(|| Self::not_found("open", path))?;
        let budget = self.budget.lock().expect("budget lock").clone();
        let mut served = bytes.to_vec();
        if let Some(len) = *self.served_len.lock().expect("served_len lock") {
            served.truncate(len);
        }
        Ok(Box::new(BudgetedReader {
            inner: Cursor::new(served),
            budget,
        }))
    }

    fn walk(&self, path: &Path) -> RemoteResult<Vec<RemoteEntry>> {
        let files = self.files.lock().expect("files lock");
        let dirs = self.dirs.lock().expect("dirs lock");
        let mut entries: Vec<RemoteEntry> = dirs
            .iter()
            .filter(|dir| dir.starts_with(path) && dir.as_path() != path)
            .map(|dir| RemoteEntry {
                path: dir.clone(),
                metadata: RemoteMetadata {
                    size: 0,
                    is_dir: true,
                },
            })
            .chain(
                files
                    .iter()
                    .filter(|(file, _)| file.starts_with(path))
                    .map(|(file, bytes)| RemoteEntry {
                        path: file.clone(),
                        metadata: RemoteMetadata {
                            size: bytes.len() as u64,
                            is_dir: false,
                        },
                    }),
            )
            .collect();
        // Parents must precede children for mkdir-before-fetch ordering.
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

impl RemoteConnector for MemoryRemote {
    fn connect(&self) -> RemoteResult<Arc<dyn RemoteSession>> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let files = self.files.lock().expect("files lock").clone();
        let dirs = self.dirs.lock().expect("dirs lock").clone();
        let budget = self.budget.lock().expect("budget lock").clone();
        let served_len = *self.served_len.lock().expect("served_len lock");
        Ok(Arc::new(Self {
            files: Mutex::new(files),
            dirs: Mutex::new(dirs),
            budget: Mutex::new(budget),
            served_len: Mutex::new(served_len),
            connect_count: AtomicI64::new(0),
        }))
    }
}

struct BudgetedReader {
    inner: Cursor<Vec<u8>>,
    budget: Option<ReadBudget>,
}

impl Read for BudgetedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(budget) = &self.budget
            && !budget.consume()
        {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected read failure",
            ));
        }
        self.inner.read(buf)
    }
}

impl Seek for BudgetedReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
