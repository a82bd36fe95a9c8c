//! Migration applier
//!
//! Applies plan entries strictly in order, one at a time. Each entry is
//! materialize -> patch -> record; the ledger only ever sees a record after
//! the workload patch has been confirmed by the API server.

use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::accessor::ObjectAccessor;
use crate::ledger::{BackupLedger, LedgerEntry};
use crate::planner::{Plan, PlanEntry};
use crate::workload::WorkloadRef;

/// What happened to one plan entry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum EntryOutcome {
    /// Planned but not applied (dry run or declined)
    Pending,
    /// Runtime materialized, binding patched, backup recorded
    Migrated,
    /// Target runtime could not be materialized; workload untouched
    MaterializeFailed(String),
    /// Binding patch failed; no backup record written
    PatchFailed(String),
    /// Binding was patched but the backup record could not be written
    Unrecorded(String),
    /// Not attempted because an earlier entry halted the run
    NotAttempted,
}

impl EntryOutcome {
    /// True for anything other than a completed migration
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::MaterializeFailed(_) | Self::PatchFailed(_) | Self::Unrecorded(_)
        )
    }
}

impl fmt::Display for EntryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "planned (apply pending)"),
            Self::Migrated => write!(f, "migrated"),
            Self::MaterializeFailed(e) => write!(f, "failed: runtime materialization: {}", e),
            Self::PatchFailed(e) => write!(f, "failed: binding patch: {}", e),
            Self::Unrecorded(e) => {
                write!(f, "patched but NOT recorded in backup ledger: {}", e)
            }
            Self::NotAttempted => write!(f, "not attempted"),
        }
    }
}

/// Outcome of one plan entry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryReport {
    /// Workload the entry concerns
    pub workload: WorkloadRef,
    /// Runtime before
    pub from: String,
    /// Runtime after (or intended)
    pub to: String,
    /// What happened
    pub outcome: EntryOutcome,
}

impl EntryReport {
    fn new(entry: &PlanEntry, outcome: EntryOutcome) -> Self {
        Self {
            workload: entry.workload.clone(),
            from: entry.binding.runtime().to_string(),
            to: entry.target.name.clone(),
            outcome,
        }
    }
}

/// Outcome of an apply session
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    /// One report per plan entry, in plan order
    pub entries: Vec<EntryReport>,
    /// Set when a ledger write failure stopped the session
    pub halted: bool,
}

impl ApplyReport {
    /// Number of entries migrated
    pub fn migrated(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome == EntryOutcome::Migrated)
            .count()
    }

    /// Number of entries that failed
    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_failure())
            .count()
    }

    /// True when every entry migrated
    pub fn all_succeeded(&self) -> bool {
        !self.halted
            && self
                .entries
                .iter()
                .all(|e| e.outcome == EntryOutcome::Migrated)
    }
}

/// Reports for a plan that will not be applied
pub fn pending_report(plan: &Plan) -> Vec<EntryReport> {
    plan.entries
        .iter()
        .map(|entry| EntryReport::new(entry, EntryOutcome::Pending))
        .collect()
}

/// Applies plan entries through an accessor, recording to a ledger
pub struct MigrationApplier<'a> {
    accessor: &'a dyn ObjectAccessor,
}

impl<'a> MigrationApplier<'a> {
    /// Create an applier
    pub fn new(accessor: &'a dyn ObjectAccessor) -> Self {
        Self { accessor }
    }

    /// Apply a whole plan in order.
    ///
    /// Per-entry failures are reported and the next entry proceeds. A failed
    /// ledger write stops the session: further mutations would have no
    /// rollback record.
    pub async fn apply_all(&self, plan: &Plan, ledger: &mut BackupLedger) -> ApplyReport {
        let mut report = ApplyReport::default();

        for entry in &plan.entries {
            if report.halted {
                report
                    .entries
                    .push(EntryReport::new(entry, EntryOutcome::NotAttempted));
                continue;
            }

            let outcome = self.apply(entry, ledger).await;
            if matches!(outcome, EntryOutcome::Unrecorded(_)) {
                report.halted = true;
            }
            report.entries.push(EntryReport::new(entry, outcome));
        }

        report
    }

    /// Apply a single plan entry
    pub async fn apply(&self, entry: &PlanEntry, ledger: &mut BackupLedger) -> EntryOutcome {
        let workload = &entry.workload;
        // Captured from the plan, never re-read after mutation
        let original = entry.binding.runtime().to_string();
        let path = entry.binding.path();

        if let Err(e) = self
            .accessor
            .materialize_template(&entry.template, &workload.namespace)
            .await
        {
            warn!(
                workload = %workload,
                template = %entry.template,
                error = %e,
                "failed to materialize target runtime; binding left unchanged"
            );
            return EntryOutcome::MaterializeFailed(e.to_string());
        }

        if let Err(e) = self
            .accessor
            .patch_binding(workload, path, &entry.target.name)
            .await
        {
            warn!(
                workload = %workload,
                path = %path,
                error = %e,
                "failed to patch runtime binding"
            );
            return EntryOutcome::PatchFailed(e.to_string());
        }

        let record = LedgerEntry {
            workload: workload.name.clone(),
            path,
            original_runtime: original.clone(),
        };
        if let Err(e) = ledger.append(&record) {
            error!(
                workload = %workload,
                path = %path,
                original = %original,
                error = %e,
                "binding patched but backup record failed; restore this binding by hand"
            );
            return EntryOutcome::Unrecorded(e.to_string());
        }

        info!(
            workload = %workload,
            from = %original,
            to = %entry.target.name,
            "migrated workload"
        );
        EntryOutcome::Migrated
    }
}
