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

//! The reconciliation engine: registry cache, download queue, the scheduling
//! loop that drives uploads and bounded-parallel downloads, and the status
//! view rendered for the inspection endpoint.

mod queue;
mod registry;
mod scheduler;
mod status;

pub use queue::{AdmitOutcome, DownloadQueue};
pub use registry::TorrentRegistry;
pub use scheduler::{Scheduler, SchedulerHandles, StatusRequest};
pub use status::{DownloadSnapshot, render_status};
