//! The rtorrent client: endpoint selection, multicall decoding, and the
//! async seam over the blocking XMLRPC stack.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;
use xmlrpc::{Request, Value};

use hoarder_config::RtorrentConfig;
use hoarder_core::{InfoHash, RemoteTorrent, TorrentClient};

use crate::error::{RtorrentError, RtorrentResult};
use crate::transport::{HttpTransport, ScgiTransport};

const LIST_METHOD: &str = "d.multicall2";
const LOAD_METHOD: &str = "load.raw_start";

/// Fields requested per torrent, in decode order.
const LIST_FIELDS: [&str; 5] = [
    "d.hash=",
    "d.name=",
    "d.base_path=",
    "d.size_bytes=",
    "d.complete=",
];

enum Endpoint {
    Http(HttpTransport),
    Scgi(ScgiTransport),
}

/// XMLRPC-backed implementation of [`TorrentClient`].
pub struct RtorrentClient {
    inner: Arc<Endpoint>,
}

impl RtorrentClient {
    /// Build a client for the configured endpoint.
    ///
    /// Addresses starting with `http://` or `https://` use the HTTP
    /// transport; anything else is treated as an SCGI unix socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &RtorrentConfig) -> RtorrentResult<Self> {
        let endpoint = if config.addr.starts_with("http://") || config.addr.starts_with("https://")
        {
            let client = reqwest::blocking::Client::builder()
                .danger_accept_invalid_certs(config.insecure_cert)
                .build()
                .map_err(|source| RtorrentError::Client { source })?;
            let auth = if config.username.is_empty() {
                None
            } else {
                Some((config.username.clone(), config.password.clone()))
            };
            Endpoint::Http(HttpTransport {
                client,
                url: config.addr.clone(),
                auth,
            })
        } else {
            Endpoint::Scgi(ScgiTransport {
                socket: PathBuf::from(&config.addr),
            })
        };
        Ok(Self {
            inner: Arc::new(endpoint),
        })
    }
}

impl Endpoint {
    fn execute(&self, method: &'static str, request: Request<'_>) -> RtorrentResult<Value> {
        match self {
            Self::Http(transport) => request.call(transport.clone()),
            Self::Scgi(transport) => request.call(transport.clone()),
        }
        .map_err(|source| RtorrentError::Call { method, source })
    }

    fn list_blocking(&self) -> RtorrentResult<Vec<RemoteTorrent>> {
        let mut request = Request::new(LIST_METHOD).arg("").arg("main");
        for field in LIST_FIELDS {
            request = request.arg(field);
        }
        let value = self.execute(LIST_METHOD, request)?;
        let records = decode_torrent_list(&value)?;
        debug!(torrents = records.len(), "rtorrent listing refreshed");
        Ok(records)
    }

    fn add_blocking(&self, metainfo: Vec<u8>) -> RtorrentResult<()> {
        let request = Request::new(LOAD_METHOD)
            .arg("")
            .arg(Value::Base64(metainfo));
        self.execute(LOAD_METHOD, request)?;
        Ok(())
    }
}

fn decode_torrent_list(value: &Value) -> RtorrentResult<Vec<RemoteTorrent>> {
    let rows = value
        .as_array()
        .ok_or(RtorrentError::UnexpectedStructure {
            method: LIST_METHOD,
            detail: "result is not an array",
        })?;
    rows.iter().map(decode_torrent_row).collect()
}

fn decode_torrent_row(row: &Value) -> RtorrentResult<RemoteTorrent> {
    let fields = row
        .as_array()
        .filter(|fields| fields.len() == LIST_FIELDS.len())
        .ok_or(RtorrentError::UnexpectedStructure {
            method: LIST_METHOD,
            detail: "row arity mismatch",
        })?;

    let hash_str = field_str(&fields[0], "d.hash")?;
    let hash = InfoHash::parse(hash_str).map_err(|_| RtorrentError::UnexpectedStructure {
        method: LIST_METHOD,
        detail: "d.hash is not a hex digest",
    })?;
    let name = field_str(&fields[1], "d.name")?.to_string();
    let path = PathBuf::from(field_str(&fields[2], "d.base_path")?);
    let size = field_i64(&fields[3], "d.size_bytes")?;
    let completed = field_i64(&fields[4], "d.complete")? != 0;

    Ok(RemoteTorrent {
        hash,
        name,
        path,
        size: u64::try_from(size).unwrap_or(0),
        completed,
    })
}

fn field_str<'a>(value: &'a Value, detail: &'static str) -> RtorrentResult<&'a str> {
    value.as_str().ok_or(RtorrentError::UnexpectedStructure {
        method: LIST_METHOD,
        detail,
    })
}

fn field_i64(value: &Value, detail: &'static str) -> RtorrentResult<i64> {
    value.as_i64().ok_or(RtorrentError::UnexpectedStructure {
        method: LIST_METHOD,
        detail,
    })
}

#[async_trait]
impl TorrentClient for RtorrentClient {
    async fn list_torrents(&self) -> anyhow::Result<Vec<RemoteTorrent>> {
        let inner = Arc::clone(&self.inner);
        let records = tokio::task::spawn_blocking(move || inner.list_blocking())
            .await
            .context("torrent listing task aborted")??;
        Ok(records)
    }

    async fn add_torrent(&self, metainfo: &[u8]) -> anyhow::Result<()> {
        let inner = Arc::clone(&self.inner);
        let blob = metainfo.to_vec();
        tokio::task::spawn_blocking(move || inner.add_blocking(blob))
            .await
            .context("torrent upload task aborted")??;
        Ok(())
    }
}
