//! CLI argument definitions for ferrotap.
//!
//! The interface follows the Singer tap conventions: a config file, an
//! optional state file, and either discovery or sync mode.
//!
//! # Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | required | JSON config with `key`, `secret`, `books`, ... |
//! | `--state` | none | Bookmarks from a previous run |
//! | `--discover` | `false` | Print the catalog and exit |
//! | `--streams` | all | Comma-separated stream names to sync |
//! | `--log-level` | `info` | Log filter, overridden by `RUST_LOG` |
//! | `--log-format` | `compact` | Log line format on stderr |
//!
//! # Examples
//!
//! ```bash
//! # Print the catalog
//! ferrotap --config config.json --discover
//!
//! # Sync trades and ledger, resuming from a previous run
//! ferrotap --config config.json --state state.json --streams trades,ledger
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Bitso extraction tap emitting Singer messages on stdout.
#[derive(Debug, Parser)]
#[command(
    name = "ferrotap",
    author,
    version,
    about = "Bitso extraction tap",
    long_about = "Ferrotap pulls ledger entries, trades, user trades, tickers and available \
books from the Bitso REST API and writes them to stdout as Singer SCHEMA, RECORD and STATE \
messages. Logs go to stderr."
)]
pub struct Cli {
    /// Path to the JSON config file.
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Path to a state file with bookmarks from a previous run.
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Print the stream catalog instead of syncing.
    #[arg(long, default_value_t = false)]
    pub discover: bool,

    /// Only sync these streams (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub streams: Vec<String>,

    /// Log filter directive, e.g. `debug` or `ferrotap_core=trace`.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human readable.
    Pretty,
    /// One JSON object per line.
    Json,
    /// Single line per event.
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_invocation() {
        let cli = Cli::try_parse_from([
            "ferrotap",
            "--config",
            "config.json",
            "--state",
            "state.json",
            "--streams",
            "trades,ledger",
            "--log-format",
            "json",
        ])
        .expect("valid arguments");

        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.state, Some(PathBuf::from("state.json")));
        assert_eq!(cli.streams, vec!["trades", "ledger"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(!cli.discover);
    }

    #[test]
    fn config_is_required() {
        assert!(Cli::try_parse_from(["ferrotap", "--discover"]).is_err());
    }

    #[test]
    fn defaults_select_all_streams() {
        let cli = Cli::try_parse_from(["ferrotap", "--config", "c.json"]).expect("valid");
        assert!(cli.streams.is_empty());
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.log_format, LogFormat::Compact);
    }
}
