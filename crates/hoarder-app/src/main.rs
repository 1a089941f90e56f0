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

//! Binary entrypoint wiring the hoarder agent together: configuration, the
//! watcher bridge, the status socket and the scheduling engine.

mod bootstrap;
mod cli;
mod error;
mod logging;
mod status_socket;
mod watcher;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    bootstrap::run(cli).await?;
    Ok(())
}
