mod cli;
mod error;
mod logging;
mod output;

use std::io::BufWriter;
use std::process::ExitCode;

use clap::Parser;
use ferrotap_core::{Tap, TapConfig, TapState};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::SingerWriter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(code = error.exit_code(), "{error}");
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_format)?;

    if cli.discover {
        output::render_catalog(std::io::stdout().lock(), &Tap::discover())?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = TapConfig::from_path(&cli.config)?.with_env_overrides();
    tracing::debug!(?config, "configuration loaded");

    let mut tap = Tap::with_reqwest(config)?;
    if !cli.streams.is_empty() {
        tap = tap.select_streams(&cli.streams)?;
    }

    let mut state = match &cli.state {
        Some(path) => TapState::load(path)?,
        None => TapState::new(),
    };

    let mut writer = SingerWriter::new(BufWriter::new(std::io::stdout()));
    let summary = tokio::select! {
        result = tap.sync(&mut state, &mut writer) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupt received, stopping sync");
            writer.flush()?;
            return Err(CliError::Interrupted);
        }
    };
    writer.flush()?;

    tracing::info!(
        records = writer.records_written(),
        partitions = summary.partitions.len(),
        "sync complete"
    );

    if !summary.is_success() {
        return Err(CliError::PartialFailure {
            failed: summary.failures.len(),
        });
    }

    Ok(ExitCode::SUCCESS)
}
