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

//! Resumable payload transfer: per-worker progress checkpoints, the
//! multi-stream byte-range fetcher, and the remote tree mirror.

mod error;
mod fetcher;
mod mirror;
mod progress;

pub use error::{FetchError, FetchResult};
pub use fetcher::{DEFAULT_CHUNK_SIZE, FetchOptions, MultiStreamFetcher, partition};
pub use mirror::TreeMirror;
pub use progress::{FileProgressStore, NullProgressStore, ProgressStore, sidecar_path};
