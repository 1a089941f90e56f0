//! The reconciliation loop.
//!
//! A single task owns the queue, registry and in-flight set; download tasks
//! report back over a bounded completion channel instead of mutating shared
//! state. One cycle drains watcher events, serves status requests, refreshes
//! the registry on its interval, reaps completions and launches eligible
//! downloads up to the concurrency ceiling. Idle cycles sleep about a second.

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use hoarder_config::{Config, normalize_path};
use hoarder_core::{DownloadOutcome, InfoHash, RemoteTorrent, TorrentClient, WatchEvent};
use hoarder_fetch::{
    DEFAULT_CHUNK_SIZE, FetchOptions, FileProgressStore, NullProgressStore, ProgressStore,
    TreeMirror,
};
use hoarder_remote::{DiskUsage, RemoteConnector, RemoteSession};

use crate::queue::{AdmitOutcome, DownloadQueue};
use crate::registry::TorrentRegistry;
use crate::status::{DownloadSnapshot, render_status};

const IDLE_SLEEP: Duration = Duration::from_secs(1);
const STATUS_QUEUE_DEPTH: usize = 8;

/// A status-endpoint query; the scheduler replies with the rendered view.
#[derive(Debug)]
pub struct StatusRequest {
    /// Channel the rendered snapshot is sent back on.
    pub reply: oneshot::Sender<String>,
}

/// Channel ends handed to the embedding application.
pub struct SchedulerHandles {
    /// Feed of reduced filesystem events.
    pub watch_tx: mpsc::UnboundedSender<WatchEvent>,
    /// Feed of status-endpoint queries.
    pub status_tx: mpsc::Sender<StatusRequest>,
    /// Stop signal; set to `true` to request a clean exit.
    pub stop_tx: watch::Sender<bool>,
}

struct InFlight {
    name: String,
    dest: PathBuf,
    size: u64,
    started_at: Instant,
}

/// The supervisory task driving reconciliation.
pub struct Scheduler {
    config: Arc<Config>,
    client: Arc<dyn TorrentClient>,
    connector: Arc<dyn RemoteConnector>,
    disk: Arc<dyn DiskUsage>,
    registry: TorrentRegistry,
    queue: DownloadQueue,
    in_flight: HashMap<InfoHash, InFlight>,
    session: Option<Arc<dyn RemoteSession>>,
    watch_rx: mpsc::UnboundedReceiver<WatchEvent>,
    status_rx: mpsc::Receiver<StatusRequest>,
    outcome_tx: mpsc::Sender<DownloadOutcome>,
    outcome_rx: mpsc::Receiver<DownloadOutcome>,
    stop_rx: watch::Receiver<bool>,
}

impl Scheduler {
    /// Build a scheduler and the channel handles the application wires up.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        client: Arc<dyn TorrentClient>,
        connector: Arc<dyn RemoteConnector>,
        disk: Arc<dyn DiskUsage>,
    ) -> (Self, SchedulerHandles) {
        let (watch_tx, watch_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::channel(STATUS_QUEUE_DEPTH);
        let outcome_depth = config.download_jobs() as usize + 1;
        let (outcome_tx, outcome_rx) = mpsc::channel(outcome_depth);
        let (stop_tx, stop_rx) = watch::channel(false);

        let scheduler = Self {
            config,
            client,
            connector,
            disk,
            registry: TorrentRegistry::new(),
            queue: DownloadQueue::new(),
            in_flight: HashMap::new(),
            session: None,
            watch_rx,
            status_rx,
            outcome_tx,
            outcome_rx,
            stop_rx,
        };
        let handles = SchedulerHandles {
            watch_tx,
            status_tx,
            stop_tx,
        };
        (scheduler, handles)
    }

    /// Drive reconciliation until the stop signal is observed.
    ///
    /// # Errors
    ///
    /// Currently never fails mid-run; failures inside a cycle are logged and
    /// retried. The `Result` shape leaves room for fatal conditions.
    pub async fn run(mut self) -> Result<()> {
        info!(
            download_jobs = self.config.download_jobs(),
            workers = self.config.file_download_workers(),
            "scheduler started"
        );
        loop {
            let busy = self.cycle().await;
            if *self.stop_rx.borrow() {
                break;
            }
            if !busy {
                let sleep = tokio::time::sleep(IDLE_SLEEP);
                tokio::pin!(sleep);
                tokio::select! {
                    () = &mut sleep => {}
                    _ = self.stop_rx.changed() => {}
                }
            }
        }
        self.shutdown();
        Ok(())
    }

    /// One reconciliation pass; returns whether any channel had work.
    async fn cycle(&mut self) -> bool {
        let mut busy = self.drain_watch_events().await;
        busy |= self.serve_status_requests();
        if *self.stop_rx.borrow() {
            return busy;
        }
        if self
            .registry
            .is_stale(self.config.rtorrent_update_interval)
        {
            self.refresh_registry().await;
        }
        busy |= self.drain_outcomes();
        if self.in_flight.is_empty() && self.session.take().is_some() {
            // Idle release is best effort; the next launch reconnects.
            debug!("closed idle sftp session");
        }
        busy |= self.launch_candidates().await;
        busy
    }

    async fn drain_watch_events(&mut self) -> bool {
        let mut busy = false;
        while let Ok(event) = self.watch_rx.try_recv() {
            busy = true;
            match event {
                WatchEvent::Added(path) => self.admit_path(path).await,
                WatchEvent::Removed(path) => self.queue.forget(&normalize_path(&path)),
            }
        }
        busy
    }

    async fn admit_path(&mut self, path: PathBuf) {
        let path = normalize_path(&path);
        if !is_metainfo(&path) {
            return;
        }
        let Some(watch_dir) = path.parent() else {
            return;
        };
        if self.config.download_path_for(watch_dir).is_none() {
            debug!(path = %path.display(), "event outside bound watch directories");
            return;
        }
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to read metainfo");
                return;
            }
        };
        let hash = match hoarder_metainfo::info_hash(&bytes) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(error = %err, path = %path.display(), "dropping unparseable metainfo");
                return;
            }
        };
        match self.queue.insert(hash.clone(), path.clone()) {
            AdmitOutcome::AlreadyKnown => debug!(hash = %hash, "metainfo already queued"),
            AdmitOutcome::Inserted => {
                let name = hoarder_metainfo::display_name(&bytes);
                info!(
                    hash = %hash,
                    path = %path.display(),
                    name = name.as_deref().unwrap_or("<unnamed>"),
                    "metainfo admitted"
                );
                if self.registry.get(&hash).is_none() {
                    self.upload_metainfo(&hash, &bytes).await;
                }
            }
        }
    }

    async fn upload_metainfo(&self, hash: &InfoHash, bytes: &[u8]) {
        match self.client.add_torrent(bytes).await {
            Ok(()) => info!(hash = %hash, "metainfo uploaded to rtorrent"),
            Err(err) => warn!(error = %err, hash = %hash, "metainfo upload failed; will retry"),
        }
    }

    fn serve_status_requests(&mut self) -> bool {
        let mut busy = false;
        while let Ok(request) = self.status_rx.try_recv() {
            busy = true;
            let snapshots: Vec<DownloadSnapshot> = self
                .in_flight
                .values()
                .map(|flight| DownloadSnapshot {
                    name: flight.name.clone(),
                    dest: flight.dest.clone(),
                    expected: flight.size,
                })
                .collect();
            let _ = request.reply.send(render_status(&snapshots));
        }
        busy
    }

    async fn refresh_registry(&mut self) {
        match self.client.list_torrents().await {
            Ok(records) => {
                debug!(torrents = records.len(), "registry refreshed");
                self.registry.replace(records);
            }
            Err(err) => {
                warn!(error = %err, "registry refresh failed; keeping previous snapshot");
            }
        }
    }

    fn drain_outcomes(&mut self) -> bool {
        let mut busy = false;
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            busy = true;
            let hash = outcome.hash().clone();
            let flight = self.in_flight.remove(&hash);
            match outcome {
                DownloadOutcome::Succeeded(_) => {
                    self.queue.mark_done(&hash);
                    if let Some(flight) = flight {
                        info!(
                            hash = %hash,
                            name = %flight.name,
                            elapsed_ms = flight.started_at.elapsed().as_millis(),
                            "download complete"
                        );
                    }
                }
                DownloadOutcome::Failed(_) => {
                    self.queue.mark_failed(&hash);
                    warn!(hash = %hash, "download failed; entry kept for retry");
                }
            }
        }
        busy
    }

    async fn launch_candidates(&mut self) -> bool {
        let jobs = self.config.download_jobs() as usize;
        if self.in_flight.len() >= jobs {
            return false;
        }
        let candidates = self.finished_candidates().await;
        let mut launched = false;
        for (hash, metainfo_path, record) in candidates {
            if self.in_flight.len() >= jobs {
                break;
            }
            if self.in_flight.contains_key(&hash) {
                continue;
            }
            let Some(watch_dir) = metainfo_path.parent().map(Path::to_path_buf) else {
                continue;
            };
            let Some(dest_dir) = self.config.download_path_for(&watch_dir).cloned() else {
                warn!(
                    path = %metainfo_path.display(),
                    "no destination bound for watch directory"
                );
                continue;
            };
            let Some(session) = self.ensure_session().await else {
                // Connect failed; defer every remaining candidate to the next
                // cycle rather than hammering the endpoint.
                break;
            };
            if !self.admit_disk_space(&record, &dest_dir) {
                debug!(hash = %hash, size = record.size, "insufficient disk space; deferred");
                continue;
            }
            self.spawn_download(session, hash, metainfo_path, record, &watch_dir, dest_dir);
            launched = true;
        }
        launched
    }

    /// Queued hashes whose registry record reports completion. Hashes missing
    /// from the registry are re-uploaded. Iterates a snapshot so re-admission
    /// never mutates the map being walked.
    async fn finished_candidates(&mut self) -> Vec<(InfoHash, PathBuf, RemoteTorrent)> {
        let mut candidates = Vec::new();
        for (hash, path) in self.queue.queued_snapshot() {
            match self.registry.get(&hash) {
                Some(record) if record.completed => {
                    candidates.push((hash, path, record.clone()));
                }
                Some(_) => {}
                None => match tokio::fs::read(&path).await {
                    Ok(bytes) => self.upload_metainfo(&hash, &bytes).await,
                    Err(err) => {
                        warn!(
                            error = %err,
                            path = %path.display(),
                            "queued metainfo unreadable during re-admission"
                        );
                    }
                },
            }
        }
        candidates
    }

    async fn ensure_session(&mut self) -> Option<Arc<dyn RemoteSession>> {
        if let Some(session) = &self.session {
            return Some(Arc::clone(session));
        }
        let connector = Arc::clone(&self.connector);
        match spawn_blocking(move || connector.connect()).await {
            Ok(Ok(session)) => {
                self.session = Some(Arc::clone(&session));
                Some(session)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "sftp connect failed; downloads deferred");
                None
            }
            Err(err) => {
                warn!(error = %err, "sftp connect task aborted");
                None
            }
        }
    }

    fn admit_disk_space(&self, record: &RemoteTorrent, dest_dir: &Path) -> bool {
        if !self.config.check_disk_space {
            return true;
        }
        let in_flight_total: u64 = self.in_flight.values().map(|flight| flight.size).sum();
        let required = record.size.saturating_add(in_flight_total);

        let mut roots: Vec<&Path> = vec![dest_dir];
        if let Some(temp) = self.config.temp_download_path.as_deref() {
            roots.push(temp);
        }
        for root in roots {
            let probe = nearest_existing(root);
            match self.disk.free_bytes(&probe) {
                Ok(free) => {
                    if !space_ok(free, required, self.config.min_disk_space) {
                        return false;
                    }
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        path = %probe.display(),
                        "disk usage query failed; candidate deferred"
                    );
                    return false;
                }
            }
        }
        true
    }

    fn spawn_download(
        &mut self,
        session: Arc<dyn RemoteSession>,
        hash: InfoHash,
        metainfo_path: PathBuf,
        record: RemoteTorrent,
        watch_dir: &Path,
        dest_dir: PathBuf,
    ) {
        let staging_root = self
            .config
            .temp_download_path
            .as_deref()
            .map(|temp| rebase_under(temp, &dest_dir));
        let download_dir = staging_root.clone().unwrap_or_else(|| dest_dir.clone());
        let status_dest = record
            .path
            .file_name()
            .map_or_else(|| download_dir.clone(), |name| download_dir.join(name));

        let progress: Arc<dyn ProgressStore> = if self.config.resume_downloads {
            Arc::new(FileProgressStore)
        } else {
            Arc::new(NullProgressStore)
        };
        let task = DownloadTask {
            session,
            progress,
            options: FetchOptions {
                workers: self.config.file_download_workers(),
                file_mode: self.config.file_download_filemode,
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
            remote_path: record.path.clone(),
            download_dir,
            dest_dir,
            staged: staging_root.is_some(),
            metainfo_path,
            finish_dir: self.config.finish_path_for(watch_dir).cloned(),
        };

        self.queue.mark_running(&hash);
        self.in_flight.insert(
            hash.clone(),
            InFlight {
                name: record.name.clone(),
                dest: status_dest,
                size: record.size,
                started_at: Instant::now(),
            },
        );
        info!(hash = %hash, name = %record.name, size = record.size, "download started");

        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let task_hash = hash.clone();
            let outcome = match spawn_blocking(move || task.execute()).await {
                Ok(Ok(())) => DownloadOutcome::Succeeded(hash),
                Ok(Err(err)) => {
                    warn!(hash = %task_hash, error = %format!("{err:#}"), "download task failed");
                    DownloadOutcome::Failed(task_hash)
                }
                Err(err) => {
                    warn!(hash = %task_hash, error = %err, "download task panicked");
                    DownloadOutcome::Failed(task_hash)
                }
            };
            let _ = outcome_tx.send(outcome).await;
        });
    }

    fn shutdown(&mut self) {
        if self.session.take().is_some() {
            debug!("sftp session closed on shutdown");
        }
        info!(
            in_flight = self.in_flight.len(),
            queued = self.queue.len(),
            "scheduler stopped"
        );
    }
}

struct DownloadTask {
    session: Arc<dyn RemoteSession>,
    progress: Arc<dyn ProgressStore>,
    options: FetchOptions,
    remote_path: PathBuf,
    download_dir: PathBuf,
    dest_dir: PathBuf,
    staged: bool,
    metainfo_path: PathBuf,
    finish_dir: Option<PathBuf>,
}

impl DownloadTask {
    /// Mirror the payload, relocate it out of staging, then apply the
    /// metainfo disposition: archive when a finish directory is bound,
    /// delete otherwise. Exactly one of the two happens on success.
    fn execute(self) -> Result<()> {
        let mirror = TreeMirror::new(
            Arc::clone(&self.session),
            Arc::clone(&self.progress),
            self.options,
        );
        mirror
            .mirror(&self.remote_path, &self.download_dir)
            .with_context(|| format!("mirroring {}", self.remote_path.display()))?;

        if self.staged {
            let name = self
                .remote_path
                .file_name()
                .context("remote payload path has no basename")?;
            make_dir_all(&self.dest_dir, self.options.file_mode)?;
            move_entry(&self.download_dir.join(name), &self.dest_dir.join(name))?;
        }

        match &self.finish_dir {
            Some(finish_dir) => {
                let name = self
                    .metainfo_path
                    .file_name()
                    .context("metainfo path has no basename")?;
                make_dir_all(finish_dir, self.options.file_mode)?;
                move_entry(&self.metainfo_path, &finish_dir.join(name))?;
            }
            None => {
                fs::remove_file(&self.metainfo_path).with_context(|| {
                    format!("deleting metainfo {}", self.metainfo_path.display())
                })?;
            }
        }
        Ok(())
    }
}

fn is_metainfo(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "torrent")
}

fn space_ok(free: u64, required: u64, min_disk_space: u64) -> bool {
    if min_disk_space > 0 {
        free.checked_sub(required)
            .is_some_and(|rest| rest >= min_disk_space)
    } else {
        free > required
    }
}

fn nearest_existing(path: &Path) -> PathBuf {
    let mut probe = path;
    while !probe.exists() {
        match probe.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => probe = parent,
            _ => break,
        }
    }
    probe.to_path_buf()
}

/// Re-root an absolute destination under a staging root, keeping its
/// directory structure: `/staging` + `/data/tv` → `/staging/data/tv`.
fn rebase_under(root: &Path, dest: &Path) -> PathBuf {
    let mut out = root.to_path_buf();
    for component in dest.components() {
        if let Component::Normal(part) = component {
            out.push(part);
        }
    }
    out
}

fn make_dir_all(path: &Path, mode: u32) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .with_context(|| format!("creating {}", path.display()))
}

/// Rename with a copy-and-remove fallback for cross-device moves.
fn move_entry(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        if to.is_dir() {
            fs::remove_dir_all(to)
        } else {
            fs::remove_file(to)
        }
        .with_context(|| format!("clearing stale target {}", to.display()))?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_tree(from, to)?;
    if from.is_dir() {
        fs::remove_dir_all(from)
    } else {
        fs::remove_file(from)
    }
    .with_context(|| format!("removing source {}", from.display()))
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    if from.is_file() {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::copy(from, to).with_context(|| format!("copying to {}", to.display()))?;
        return Ok(());
    }

    fs::create_dir_all(to).with_context(|| format!("creating {}", to.display()))?;
    for entry in WalkDir::new(from) {
        let entry = entry.with_context(|| format!("walking {}", from.display()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .with_context(|| format!("stripping prefix from {}", entry.path().display()))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("creating {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copying to {}", target.display()))?;
        }
    }
    Ok(())
}
