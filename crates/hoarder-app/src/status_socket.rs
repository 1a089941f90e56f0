//! Local-only status RPC over a unix socket.
//!
//! Wire protocol: one JSON request line `{"method":"status"}`, one JSON
//! response line `{"status":"…"}`, then the connection closes. The server
//! forwards each request to the scheduler and relays the rendered view.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use hoarder_engine::StatusRequest;

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
struct RpcRequest {
    method: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcResponse {
    status: String,
}

/// Bound status endpoint; dropping the guard leaves the socket file behind,
/// so [`StatusServer::close`] should run during shutdown.
pub(crate) struct StatusServer {
    path: PathBuf,
    task: JoinHandle<()>,
}

impl StatusServer {
    /// Bind the socket and start serving scheduler snapshots.
    ///
    /// A stale socket file from an unclean previous shutdown is removed
    /// before binding.
    pub(crate) fn bind(
        path: &Path,
        status_tx: mpsc::Sender<StatusRequest>,
    ) -> AppResult<Self> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|source| AppError::StatusSocket {
                operation: "remove_stale",
                path: path.to_path_buf(),
                source,
            })?;
        }
        let listener = UnixListener::bind(path).map_err(|source| AppError::StatusSocket {
            operation: "bind",
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "status socket bound");

        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let status_tx = status_tx.clone();
                        tokio::spawn(async move {
                            if let Err(err) = serve_connection(stream, status_tx).await {
                                debug!(error = %err, "status connection ended abnormally");
                            }
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "status socket accept failed");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            path: path.to_path_buf(),
            task,
        })
    }

    /// Stop serving and unlink the socket file.
    pub(crate) fn close(self) {
        self.task.abort();
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %err, path = %self.path.display(), "failed to unlink status socket");
            }
        }
    }
}

async fn serve_connection(
    stream: UnixStream,
    status_tx: mpsc::Sender<StatusRequest>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };

    let request: RpcRequest = match serde_json::from_str(&line) {
        Ok(request) => request,
        Err(err) => {
            debug!(error = %err, "malformed status request");
            return Ok(());
        }
    };
    if request.method != "status" {
        debug!(method = %request.method, "unknown status method");
        return Ok(());
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    if status_tx
        .send(StatusRequest { reply: reply_tx })
        .await
        .is_err()
    {
        return Ok(());
    }
    let Ok(status) = reply_rx.await else {
        return Ok(());
    };

    let mut payload =
        serde_json::to_vec(&RpcResponse { status }).unwrap_or_else(|_| b"{}".to_vec());
    payload.push(b'\n');
    write_half.write_all(&payload).await?;
    write_half.flush().await
}

/// Query a running agent's status view; used by the `--status` flag.
pub(crate) async fn query(path: &Path) -> AppResult<String> {
    let stream = UnixStream::connect(path)
        .await
        .map_err(|source| AppError::StatusSocket {
            operation: "connect",
            path: path.to_path_buf(),
            source,
        })?;
    let (read_half, mut write_half) = stream.into_split();

    let mut payload = serde_json::to_vec(&RpcRequest {
        method: "status".to_string(),
    })
    .unwrap_or_else(|_| b"{}".to_vec());
    payload.push(b'\n');
    write_half
        .write_all(&payload)
        .await
        .map_err(|source| AppError::StatusSocket {
            operation: "write",
            path: path.to_path_buf(),
            source,
        })?;

    let mut lines = BufReader::new(read_half).lines();
    let line = lines
        .next_line()
        .await
        .map_err(|source| AppError::StatusSocket {
            operation: "read",
            path: path.to_path_buf(),
            source,
        })?
        .ok_or(AppError::StatusProtocol {
            detail: "connection closed before reply",
        })?;
    let response: RpcResponse =
        serde_json::from_str(&line).map_err(|_| AppError::StatusProtocol {
            detail: "reply is not a status object",
        })?;
    Ok(response.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_status_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("hoarder.sock");
        let (status_tx, mut status_rx) = mpsc::channel::<StatusRequest>(4);

        // Stand-in scheduler answering every request.
        tokio::spawn(async move {
            while let Some(request) = status_rx.recv().await {
                let _ = request.reply.send("alpha [=>] 10.00%".to_string());
            }
        });

        let server = StatusServer::bind(&socket, status_tx).expect("bind");
        let status = query(&socket).await.expect("query");
        assert_eq!(status, "alpha [=>] 10.00%");
        server.close();
        assert!(!socket.exists(), "socket unlinked on close");
    }

    #[tokio::test]
    async fn stale_socket_files_are_replaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("hoarder.sock");
        std::fs::write(&socket, b"stale").expect("plant stale file");

        let (status_tx, _status_rx) = mpsc::channel::<StatusRequest>(4);
        let server = StatusServer::bind(&socket, status_tx).expect("bind over stale file");
        server.close();
    }

    #[tokio::test]
    async fn query_fails_cleanly_without_a_server() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = query(&dir.path().join("absent.sock"))
            .await
            .expect_err("no server");
        assert!(matches!(
            err,
            AppError::StatusSocket {
                operation: "connect",
                ..
            }
        ));
    }
}
