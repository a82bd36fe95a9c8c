//! runway CLI
//!
//! Migrates KServe InferenceServices from pinned namespace-local
//! ServingRuntimes to the runtimes their templates currently produce.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use runway_cli::{logging, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match logging::init(&cli.global, cli.command.name()) {
        Ok(Some(path)) => debug!(log_file = %path.display(), "writing logs to file"),
        Ok(None) => {}
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
