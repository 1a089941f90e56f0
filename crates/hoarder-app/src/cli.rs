//! Command-line surface.

use std::path::PathBuf;

use clap::Parser;

/// Blackhole-watching rtorrent companion agent.
#[derive(Debug, Parser)]
#[command(name = "hoarder", version, about)]
pub(crate) struct Cli {
    /// Path to the TOML configuration document.
    pub(crate) config: PathBuf,

    /// Query the running agent's download status and exit.
    #[arg(long)]
    pub(crate) status: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_path_and_status_flag() {
        let cli = Cli::try_parse_from(["hoarder", "/etc/hoarder.toml", "--status"])
            .expect("valid invocation");
        assert_eq!(cli.config, PathBuf::from("/etc/hoarder.toml"));
        assert!(cli.status);
    }

    #[test]
    fn config_path_is_required() {
        assert!(Cli::try_parse_from(["hoarder"]).is_err());
    }
}
