//! runway CLI library

pub mod commands;
pub mod error;
pub mod logging;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// runway - migrate KServe InferenceServices to template-derived ServingRuntimes
#[derive(Parser, Debug)]
#[command(name = "runway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Verbose output: debug logging and skipped workloads
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Kubeconfig file, or a list of files merged like $KUBECONFIG
    /// (default: $KUBECONFIG, then ~/.kube/config)
    #[arg(long, global = true)]
    pub kubeconfig: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true, conflicts_with = "log_dir")]
    pub log_file: Option<PathBuf>,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan, and optionally apply, runtime migrations in a namespace
    Migrate(commands::migrate::MigrateArgs),
    /// Restore runtime bindings from a backup ledger
    Rollback(commands::rollback::RollbackArgs),
    /// List InferenceServices and the state of their runtimes
    Inventory(commands::inventory::InventoryArgs),
}

impl Commands {
    /// Short name used in log file names
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Migrate(_) => "migrate",
            Commands::Rollback(_) => "rollback",
            Commands::Inventory(_) => "inventory",
        }
    }
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Migrate(args) => commands::migrate::run(args, &self.global).await,
            Commands::Rollback(args) => commands::rollback::run(args, &self.global).await,
            Commands::Inventory(args) => commands::inventory::run(args, &self.global).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["runway", "migrate", "-n", "demo", "--verbose"]).unwrap();
        assert!(cli.global.verbose);
        assert_eq!(cli.command.name(), "migrate");
    }

    #[test]
    fn log_file_and_log_dir_conflict() {
        let result = Cli::try_parse_from([
            "runway",
            "--log-file",
            "a.log",
            "--log-dir",
            "logs",
            "inventory",
            "-A",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        assert!(Cli::try_parse_from(["runway", "migrate", "-n", "demo", "--force"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
