//! `runway rollback` - restore runtime bindings from a backup ledger

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use runway_migrate::{run_rollback, KubeAccessor, RollbackConfig, RollbackReport};

use super::format::{or_dash, print_table};
use super::kube_client;
use crate::{GlobalArgs, Result};

/// Restore runtime bindings recorded in a backup ledger
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Backup ledger written by `runway migrate`
    #[arg(short, long)]
    pub file: PathBuf,

    /// Namespace to restore into (default: the namespace recorded in the ledger)
    #[arg(short, long)]
    pub namespace: Option<String>,
}

impl RollbackArgs {
    /// Engine configuration for these arguments
    pub fn to_config(&self) -> RollbackConfig {
        RollbackConfig {
            ledger: self.file.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

/// Run the rollback command
pub async fn run(args: RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let client = kube_client(global.kubeconfig.as_deref()).await?;
    let accessor = KubeAccessor::new(client);
    let config = args.to_config();

    let summary = run_rollback(&accessor, &config).await?;

    if summary.reports.is_empty() {
        println!(
            "Ledger {} has no records; nothing to restore.",
            config.ledger.display()
        );
        return Ok(());
    }

    print_table(
        &["LINE", "INFERENCESERVICE", "PATH", "RESTORED TO", "RESULT"],
        &report_rows(&summary.reports),
    );
    println!();
    println!(
        "Restored {} of {} binding(s) in namespace {}, {} failed.",
        summary.restored(),
        summary.reports.len(),
        summary.namespace,
        summary.failed()
    );
    println!("Runtimes created during migration were left in place.");

    info!(
        namespace = %summary.namespace,
        restored = summary.restored(),
        failed = summary.failed(),
        "rollback finished"
    );
    Ok(())
}

fn report_rows(reports: &[RollbackReport]) -> Vec<Vec<String>> {
    reports
        .iter()
        .map(|r| {
            vec![
                r.line.to_string(),
                or_dash(r.workload.as_deref()),
                or_dash(r.path),
                or_dash(r.restored_to.as_deref()),
                r.outcome.to_string(),
            ]
        })
        .collect()
}
