//! `indexhub` administrative CLI.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::Cli;

/// Exit status for deferrals that may succeed on a later try (sysexits `EX_TEMPFAIL`).
const EXIT_TEMPORARY: u8 = 75;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            if e.is_temporary() {
                ExitCode::from(EXIT_TEMPORARY)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
