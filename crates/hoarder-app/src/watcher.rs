//! Bridge between the notify watcher and the engine's event feed.
//!
//! Watches every bound blackhole directory non-recursively; subdirectories
//! are deliberately out of scope because destinations are mapped per watch
//! directory. The engine does its own `.torrent` filtering, so the bridge
//! forwards raw paths.

use std::path::{Path, PathBuf};

use notify::event::{Event, EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use hoarder_core::WatchEvent;

use crate::error::{AppError, AppResult};

/// Install a non-recursive watcher on each directory, forwarding reduced
/// events into `events`. The returned watcher must stay alive for the
/// lifetime of the agent.
pub(crate) fn install(
    dirs: &[PathBuf],
    events: mpsc::UnboundedSender<WatchEvent>,
) -> AppResult<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |outcome: notify::Result<Event>| {
        match outcome {
            Ok(event) => {
                for reduced in reduce(&event) {
                    if events.send(reduced).is_err() {
                        debug!("engine event channel closed; dropping watch event");
                    }
                }
            }
            // Watcher errors are logged and the loop continues.
            Err(err) => warn!(error = %err, "filesystem watcher error"),
        }
    })
    .map_err(|source| AppError::Watcher {
        path: PathBuf::new(),
        source,
    })?;

    for dir in dirs {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| AppError::Watcher {
                path: dir.clone(),
                source,
            })?;
        debug!(dir = %dir.display(), "watching blackhole directory");
    }
    Ok(watcher)
}

/// Reduce a notify event to engine events: creations, writes and rename
/// targets admit; removals and rename sources forget. Everything else is
/// ignored.
fn reduce(event: &Event) -> Vec<WatchEvent> {
    let added = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => false,
        EventKind::Modify(_) => true,
        EventKind::Remove(_) => false,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|path| {
            if added {
                WatchEvent::Added(path.clone())
            } else {
                WatchEvent::Removed(path.clone())
            }
        })
        .collect()
}

/// Synthesise `Added` events for metainfo files already present at startup.
pub(crate) fn initial_scan(
    dirs: &[PathBuf],
    events: &mpsc::UnboundedSender<WatchEvent>,
) -> AppResult<()> {
    for dir in dirs {
        let listing = std::fs::read_dir(dir).map_err(|source| AppError::InitialScan {
            path: dir.clone(),
            source,
        })?;
        for entry in listing {
            let entry = entry.map_err(|source| AppError::InitialScan {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if is_metainfo(&path) && events.send(WatchEvent::Added(path)).is_err() {
                debug!("engine event channel closed during initial scan");
                return Ok(());
            }
        }
    }
    Ok(())
}

fn is_metainfo(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "torrent") && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};
    use std::time::Duration;

    fn event(kind: EventKind, path: &str) -> Event {
        Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: notify::event::EventAttributes::default(),
        }
    }

    #[test]
    fn creations_and_writes_reduce_to_added() {
        let created = reduce(&event(
            EventKind::Create(CreateKind::File),
            "/watch/a.torrent",
        ));
        assert_eq!(
            created,
            vec![WatchEvent::Added(PathBuf::from("/watch/a.torrent"))]
        );

        let renamed_from = reduce(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            "/watch/a.torrent",
        ));
        assert_eq!(
            renamed_from,
            vec![WatchEvent::Removed(PathBuf::from("/watch/a.torrent"))]
        );

        let removed = reduce(&event(
            EventKind::Remove(RemoveKind::File),
            "/watch/a.torrent",
        ));
        assert_eq!(
            removed,
            vec![WatchEvent::Removed(PathBuf::from("/watch/a.torrent"))]
        );

        let access = reduce(&event(EventKind::Access(notify::event::AccessKind::Any), "/watch/a.torrent"));
        assert!(access.is_empty(), "access events are ignored");
    }

    #[test]
    fn initial_scan_emits_only_metainfo_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.torrent"), b"x").expect("write");
        std::fs::write(dir.path().join("b.txt"), b"x").expect("write");
        std::fs::create_dir(dir.path().join("sub.torrent")).expect("mkdir");

        let (tx, mut rx) = mpsc::unbounded_channel();
        initial_scan(&[dir.path().to_path_buf()], &tx).expect("scan");

        let first = rx.try_recv().expect("one event");
        assert_eq!(
            first,
            WatchEvent::Added(dir.path().join("a.torrent")),
            "only the metainfo file is emitted"
        );
        assert!(rx.try_recv().is_err(), "nothing else emitted");
    }

    #[tokio::test]
    async fn installed_watcher_reports_new_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher = install(&[dir.path().to_path_buf()], tx).expect("install");

        std::fs::write(dir.path().join("fresh.torrent"), b"x").expect("write");

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within deadline")
            .expect("channel open");
        match event {
            WatchEvent::Added(path) => {
                assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("fresh.torrent"));
            }
            WatchEvent::Removed(path) => panic!("unexpected removal of {}", path.display()),
        }
    }
}
