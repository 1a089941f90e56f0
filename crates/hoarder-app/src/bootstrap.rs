//! Application boot sequence: configuration, adapters, watcher, status
//! socket, scheduler, and signal-driven shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use hoarder_engine::{Scheduler, SchedulerHandles};
use hoarder_remote::{LocalDiskUsage, SshConnector};
use hoarder_rtorrent::RtorrentClient;

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::logging::{self, LogFormat};
use crate::status_socket::{self, StatusServer};
use crate::watcher;

/// Entry point: either query a running agent's status or run the agent.
pub(crate) async fn run(cli: Cli) -> AppResult<()> {
    if cli.status {
        let config = hoarder_config::load(&cli.config)?;
        let status = status_socket::query(&config.rpc_socket_path).await?;
        if status.is_empty() {
            println!("No Downloads");
        } else {
            println!("{status}");
        }
        return Ok(());
    }
    run_agent(&cli.config).await
}

async fn run_agent(config_path: &Path) -> AppResult<()> {
    if let Err(err) = logging::init_logging(LogFormat::infer()) {
        // A pre-installed subscriber is not worth dying over.
        eprintln!("logging initialisation failed: {err}");
    }

    let config = Arc::new(hoarder_config::load(config_path)?);
    info!(version = env!("CARGO_PKG_VERSION"), "hoarder starting");

    let client = Arc::new(
        RtorrentClient::new(&config.rtorrent).map_err(|source| AppError::Rtorrent { source })?,
    );
    let connector = Arc::new(SshConnector::new(config.ssh.clone()));
    let disk = Arc::new(LocalDiskUsage);

    let (scheduler, handles) = Scheduler::new(Arc::clone(&config), client, connector, disk);
    let SchedulerHandles {
        watch_tx,
        status_tx,
        stop_tx,
    } = handles;

    let server = StatusServer::bind(&config.rpc_socket_path, status_tx)?;

    let watch_dirs: Vec<PathBuf> = config.watch_to_download_paths.keys().cloned().collect();
    let watcher = match watcher::install(&watch_dirs, watch_tx.clone()) {
        Ok(watcher) => watcher,
        Err(err) => {
            server.close();
            return Err(err);
        }
    };
    if let Err(err) = watcher::initial_scan(&watch_dirs, &watch_tx) {
        server.close();
        return Err(err);
    }

    let scheduler_task = tokio::spawn(scheduler.run());

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");

    if stop_tx.send(true).is_err() {
        warn!("scheduler already gone at shutdown");
    }
    let outcome = scheduler_task.await;

    // Close the watcher before the socket so no event lands after teardown.
    drop(watcher);
    server.close();

    match outcome {
        Ok(Ok(())) => {
            info!("hoarder stopped");
            Ok(())
        }
        Ok(Err(err)) => Err(AppError::Scheduler {
            detail: format!("{err:#}"),
        }),
        Err(err) => Err(AppError::Scheduler {
            detail: err.to_string(),
        }),
    }
}

async fn wait_for_shutdown_signal() {
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(err) => {
            warn!(error = %err, "sigterm handler unavailable; listening for ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_config_is_a_startup_error() {
        let cli = Cli {
            config: PathBuf::from("/definitely/missing/hoarder.toml"),
            status: false,
        };
        let err = run(cli).await.expect_err("must fail");
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[tokio::test]
    async fn status_query_without_agent_reports_socket_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("hoarder.toml");
        let socket_path = dir.path().join("hoarder.sock");
        let document = format!(
            r#"
rtorrent_update_interval = 1000000000
rpc_socket_path = "{socket}"

[rtorrent]
addr = "https://rt.example.test/RPC2"

[ssh]
username = "seed"
addr = "rt.example.test:22"

[watch_to_download_paths]
"{watch}" = "{dest}"
"#,
            socket = socket_path.display(),
            watch = dir.path().join("watch").display(),
            dest = dir.path().join("dest").display(),
        );
        std::fs::write(&config_path, document).expect("write config");

        let cli = Cli {
            config: config_path,
            status: true,
        };
        let err = run(cli).await.expect_err("no agent is running");
        assert!(matches!(
            err,
            AppError::StatusSocket {
                operation: "connect",
                ..
            }
        ));
    }
}
