//! `runway migrate` - plan and apply runtime migrations in one namespace

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use tracing::{info, warn};

use runway_common::DEFAULT_TEMPLATE_NAMESPACE;
use runway_migrate::applier::pending_report;
use runway_migrate::config::DEFAULT_BACKUP_DIR;
use runway_migrate::{
    CleanupResult, EntryReport, KubeAccessor, MigrationConfig, MigrationSession, Plan, RunMode,
    RunOutcome, SkipReason, SweepReport, WorkloadRef,
};

use super::format::print_table;
use super::kube_client;
use crate::{GlobalArgs, Result};

/// Plan, and optionally apply, runtime migrations
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Namespace whose InferenceServices are migrated
    #[arg(short, long)]
    pub namespace: String,

    /// Namespace holding the runtime templates
    #[arg(long, env = "RUNWAY_TEMPLATE_NAMESPACE", default_value = DEFAULT_TEMPLATE_NAMESPACE)]
    pub template_namespace: String,

    /// Apply without asking (implies --backup)
    #[arg(long)]
    pub apply: bool,

    /// Record original bindings to a backup ledger
    #[arg(long)]
    pub backup: bool,

    /// Delete namespace-local runtimes left unreferenced after a fully successful apply
    #[arg(long)]
    pub cleanup: bool,

    /// Directory for backup ledgers and rollback scripts
    #[arg(long, env = "RUNWAY_BACKUP_DIR", default_value = DEFAULT_BACKUP_DIR)]
    pub backup_dir: PathBuf,
}

impl MigrateArgs {
    /// Engine configuration for these arguments
    pub fn to_config(&self, verbose: bool) -> MigrationConfig {
        MigrationConfig {
            namespace: self.namespace.clone(),
            template_namespace: self.template_namespace.clone(),
            mode: if self.apply {
                RunMode::Apply
            } else {
                RunMode::DryRun
            },
            backup: self.backup,
            cleanup: self.cleanup,
            verbose,
            backup_dir: self.backup_dir.clone(),
        }
    }
}

/// Run the migrate command
pub async fn run(args: MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let client = kube_client(global.kubeconfig.as_deref()).await?;
    let accessor = KubeAccessor::new(client);
    let config = args.to_config(global.verbose);
    let session = MigrationSession::new(&accessor, &config);

    let tty = io::stdin().is_terminal() && io::stdout().is_terminal();
    let mut plan_shown = false;
    let report = session
        .run(
            tty,
            |plan| {
                plan_shown = true;
                print_entries(&pending_report(plan));
                prompt_apply(plan)
            },
            Utc::now(),
        )
        .await?;

    if config.verbose && !report.plan.skipped.is_empty() {
        println!();
        print_skipped(&report.plan.skipped);
    }

    match report.outcome {
        RunOutcome::NothingToDo => {
            println!(
                "No InferenceServices in namespace {} need migration.",
                config.namespace
            );
        }
        RunOutcome::Abstained(entries) => {
            if !plan_shown {
                print_entries(&entries);
            }
            println!();
            println!(
                "No changes applied. Re-run with --apply to migrate {} InferenceService(s).",
                entries.len()
            );
            if config.cleanup {
                println!("Cleanup skipped: nothing was applied.");
            }
        }
        RunOutcome::Applied(exec) => {
            println!();
            print_entries(&exec.apply.entries);
            println!();
            println!(
                "Migrated {} of {} InferenceService(s), {} failed.",
                exec.apply.migrated(),
                exec.apply.entries.len(),
                exec.apply.failed()
            );
            if exec.apply.halted {
                println!(
                    "Stopped early: a backup record could not be written. Fix the ledger location before re-running."
                );
            }
            println!("Backup ledger: {}", exec.ledger.display());
            println!("Rollback:      {}", exec.rollback_script.display());
            print_cleanup(&exec.cleanup);
            info!(
                namespace = %config.namespace,
                migrated = exec.apply.migrated(),
                failed = exec.apply.failed(),
                "migrate finished"
            );
        }
    }

    Ok(())
}

fn prompt_apply(plan: &Plan) -> bool {
    println!();
    let answer = confirm(&mut io::stdin().lock(), &mut io::stdout(), plan.entries.len());
    match answer {
        Ok(yes) => yes,
        Err(e) => {
            warn!(error = %e, "could not read confirmation; nothing applied");
            false
        }
    }
}

/// Ask whether to apply `count` migrations and read one line of answer
fn confirm(input: &mut impl BufRead, output: &mut impl Write, count: usize) -> Result<bool> {
    write!(output, "Apply {} migration(s)? [y/N] ", count)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

/// Only an explicit yes counts; anything else, including empty input, is no
fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn entry_rows(entries: &[EntryReport]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|e| {
            vec![
                e.workload.name.clone(),
                e.from.clone(),
                e.to.clone(),
                e.outcome.to_string(),
            ]
        })
        .collect()
}

fn print_entries(entries: &[EntryReport]) {
    print_table(&["INFERENCESERVICE", "FROM", "TO", "RESULT"], &entry_rows(entries));
}

fn skipped_rows(skipped: &[(WorkloadRef, SkipReason)]) -> Vec<Vec<String>> {
    skipped
        .iter()
        .map(|(workload, reason)| vec![workload.name.clone(), reason.to_string()])
        .collect()
}

fn print_skipped(skipped: &[(WorkloadRef, SkipReason)]) {
    print_table(&["SKIPPED", "REASON"], &skipped_rows(skipped));
}

fn sweep_rows(reports: &[SweepReport]) -> Vec<Vec<String>> {
    reports
        .iter()
        .map(|r| vec![r.runtime.clone(), r.outcome.to_string()])
        .collect()
}

fn print_cleanup(cleanup: &CleanupResult) {
    match cleanup {
        CleanupResult::NotRequested => {}
        CleanupResult::Skipped(reason) => println!("Cleanup skipped: {}.", reason),
        CleanupResult::Failed(e) => println!("Cleanup failed, nothing deleted: {}", e),
        CleanupResult::Swept(reports) => {
            println!();
            print_table(&["SERVINGRUNTIME", "CLEANUP"], &sweep_rows(reports));
        }
    }
}
