#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! rtorrent XMLRPC adapter: torrent listing via `d.multicall2` and metainfo
//! upload via `load.raw_start`, over HTTP(S) or an SCGI unix socket.

mod client;
mod error;
mod transport;

pub use client::RtorrentClient;
pub use error::{RtorrentError, RtorrentResult};
