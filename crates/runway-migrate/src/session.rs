//! One migration or rollback run, start to finish
//!
//! A session owns the ordering between the engine pieces: prerequisites,
//! planning, the consent decision, apply with its ledger, and the gated
//! cleanup sweep. Only prerequisite and backup-directory failures come back
//! as `Err`; everything per-workload is in the report.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use runway_common::Error;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::accessor::{NamespaceScope, ObjectAccessor};
use crate::applier::{pending_report, ApplyReport, EntryReport, MigrationApplier};
use crate::cleanup::{CleanupSweeper, SweepReport};
use crate::config::{MigrationConfig, RollbackConfig};
use crate::decision::{decide, Decision};
use crate::ledger::{read_ledger, BackupLedger};
use crate::planner::{MigrationPlanner, Plan};
use crate::prereq::check_prerequisites;
use crate::rollback::{RollbackExecutor, RollbackOutcome, RollbackReport};

/// What the cleanup phase did
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum CleanupResult {
    /// `--cleanup` was not given
    NotRequested,
    /// Requested but not run
    Skipped(String),
    /// Sweep ran
    Swept(Vec<SweepReport>),
    /// Live state could not be listed; nothing was deleted
    Failed(String),
}

/// Result of an apply phase
#[derive(Debug, Serialize)]
pub struct ExecutionReport {
    /// Ledger written by this run
    pub ledger: PathBuf,
    /// Companion rollback script
    pub rollback_script: PathBuf,
    /// Per-entry outcomes
    pub apply: ApplyReport,
    /// Cleanup phase
    pub cleanup: CleanupResult,
}

/// How a migration run ended
#[derive(Debug, Serialize)]
pub enum RunOutcome {
    /// Plan was empty
    NothingToDo,
    /// Plan was not applied; entries are all pending
    Abstained(Vec<EntryReport>),
    /// Plan was applied
    Applied(ExecutionReport),
}

/// Plan plus what became of it
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Plan computed for the run
    pub plan: Plan,
    /// Outcome
    pub outcome: RunOutcome,
}

/// A migration run against one namespace
pub struct MigrationSession<'a> {
    accessor: &'a dyn ObjectAccessor,
    config: &'a MigrationConfig,
}

impl<'a> MigrationSession<'a> {
    /// Create a session
    pub fn new(accessor: &'a dyn ObjectAccessor, config: &'a MigrationConfig) -> Self {
        Self { accessor, config }
    }

    /// Validate configuration, check prerequisites, create the backup directory
    pub async fn prepare(&self) -> Result<(), Error> {
        self.config.validate()?;
        check_prerequisites(
            self.accessor,
            &self.config.namespace,
            Some(&self.config.template_namespace),
        )
        .await?;

        if self.config.backup_enabled() {
            let dir = &self.config.backup_dir;
            fs::create_dir_all(dir).map_err(|e| {
                Error::ledger(dir, format!("cannot create backup directory: {}", e))
            })?;
            debug!(dir = %dir.display(), "backup directory ready");
        }
        Ok(())
    }

    /// Discover workloads in the target namespace and plan them
    pub async fn plan(&self) -> Result<Plan, Error> {
        let workloads = self
            .accessor
            .list_workloads(&NamespaceScope::Namespace(self.config.namespace.clone()))
            .await?;
        debug!(
            namespace = %self.config.namespace,
            workloads = workloads.len(),
            "discovered workloads"
        );

        let planner = MigrationPlanner::new(self.accessor, &self.config.template_namespace);
        let plan = planner.plan(&workloads).await;
        info!(
            namespace = %self.config.namespace,
            planned = plan.entries.len(),
            skipped = plan.skipped.len(),
            "migration plan ready"
        );
        Ok(plan)
    }

    /// Open a ledger, apply the plan, then sweep if requested and safe
    pub async fn execute(&self, plan: &Plan, now: DateTime<Utc>) -> Result<ExecutionReport, Error> {
        let mut ledger = BackupLedger::open(&self.config.backup_dir, &self.config.namespace, now)?;

        let apply = MigrationApplier::new(self.accessor)
            .apply_all(plan, &mut ledger)
            .await;
        info!(
            namespace = %self.config.namespace,
            migrated = apply.migrated(),
            failed = apply.failed(),
            ledger = %ledger.path().display(),
            "apply finished"
        );

        let cleanup = self.cleanup_after(&apply).await;

        Ok(ExecutionReport {
            ledger: ledger.path().to_path_buf(),
            rollback_script: ledger.rollback_script().to_path_buf(),
            apply,
            cleanup,
        })
    }

    /// Full run: prepare, plan, decide, and apply when allowed.
    ///
    /// `confirm` is only called when a terminal is available and the run is
    /// not preauthorized.
    pub async fn run<F>(
        &self,
        tty_available: bool,
        confirm: F,
        now: DateTime<Utc>,
    ) -> Result<RunReport, Error>
    where
        F: FnOnce(&Plan) -> bool,
    {
        self.prepare().await?;
        let plan = self.plan().await?;

        let outcome = match decide(&plan, tty_available, self.config.preauthorized(), confirm) {
            Decision::Proceed => RunOutcome::Applied(self.execute(&plan, now).await?),
            Decision::Abstain if plan.is_empty() => RunOutcome::NothingToDo,
            Decision::Abstain => {
                if self.config.cleanup {
                    debug!("cleanup requested but nothing was applied");
                }
                RunOutcome::Abstained(pending_report(&plan))
            }
        };

        Ok(RunReport { plan, outcome })
    }

    async fn cleanup_after(&self, apply: &ApplyReport) -> CleanupResult {
        if !self.config.cleanup {
            return CleanupResult::NotRequested;
        }
        if !apply.all_succeeded() {
            warn!(
                failed = apply.failed(),
                "skipping cleanup because not every migration succeeded"
            );
            return CleanupResult::Skipped("not every migration succeeded".to_string());
        }

        match CleanupSweeper::new(self.accessor)
            .sweep(&self.config.namespace)
            .await
        {
            Ok(reports) => CleanupResult::Swept(reports),
            Err(e) => {
                warn!(
                    namespace = %self.config.namespace,
                    error = %e,
                    "cleanup could not list live state"
                );
                CleanupResult::Failed(e.to_string())
            }
        }
    }
}

/// Result of a rollback run
#[derive(Debug, Serialize)]
pub struct RollbackSummary {
    /// Namespace the ledger was replayed into
    pub namespace: String,
    /// Per-record outcomes, in ledger order
    pub reports: Vec<RollbackReport>,
}

impl RollbackSummary {
    /// Number of records restored
    pub fn restored(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome == RollbackOutcome::Restored)
            .count()
    }

    /// Number of records that failed
    pub fn failed(&self) -> usize {
        self.reports.len() - self.restored()
    }
}

/// Replay a ledger file.
///
/// An unreadable ledger, a missing namespace or failed prerequisites abort
/// before any patch is sent.
pub async fn run_rollback(
    accessor: &dyn ObjectAccessor,
    config: &RollbackConfig,
) -> Result<RollbackSummary, Error> {
    let contents = read_ledger(&config.ledger)?;
    let namespace = config.resolve_namespace(&contents)?;
    check_prerequisites(accessor, &namespace, None).await?;

    info!(
        ledger = %config.ledger.display(),
        namespace = %namespace,
        records = contents.records.len(),
        "replaying backup ledger"
    );
    let reports = RollbackExecutor::new(accessor)
        .rollback(&namespace, &contents)
        .await;

    Ok(RollbackSummary { namespace, reports })
}
