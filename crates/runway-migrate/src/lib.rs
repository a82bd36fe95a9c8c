//! Migration engine moving KServe InferenceServices off namespace-local
//! ServingRuntimes onto the runtimes their templates currently produce
//!
//! The engine plans, applies with a durable backup ledger, rolls back from a
//! ledger, and optionally sweeps runtimes left orphaned by a migration. All
//! cluster access goes through [`accessor::ObjectAccessor`].

#![deny(missing_docs)]

/// Cluster read/write seam and its kube-rs implementation
pub mod accessor;
/// Applies plan entries (materialize, patch, record)
pub mod applier;
/// Runtime binding paths on an InferenceService
pub mod binding;
/// Deletes unreferenced namespace-local runtimes
pub mod cleanup;
/// Run configuration
pub mod config;
/// Consent decision before applying
pub mod decision;
/// Read-only inventory of workloads and their runtimes
pub mod inventory;
/// Append-only backup ledger and its parser
pub mod ledger;
/// Migration planner
pub mod planner;
/// Prerequisite checks
pub mod prereq;
/// Ledger replay
pub mod rollback;
/// Migration and rollback runs
pub mod session;
/// Template lookup and processing
pub mod template;
/// Typed views of InferenceServices and ServingRuntimes
pub mod workload;

#[cfg(test)]
mod scenario_tests;
#[cfg(test)]
mod testing;

pub use accessor::{KubeAccessor, NamespaceScope, ObjectAccessor};
pub use applier::{ApplyReport, EntryOutcome, EntryReport, MigrationApplier};
pub use binding::{BindingPath, RuntimeBinding};
pub use cleanup::{CleanupSweeper, SweepOutcome, SweepReport};
pub use config::{MigrationConfig, RollbackConfig, RunMode};
pub use decision::{decide, Decision};
pub use inventory::{scan_inventory, InventoryRow, InventoryStatus, RuntimeScope};
pub use ledger::{BackupLedger, LedgerContents, LedgerEntry};
pub use planner::{MigrationPlanner, Plan, PlanEntry, SkipReason};
pub use rollback::{RollbackExecutor, RollbackOutcome, RollbackReport};
pub use session::{
    run_rollback, CleanupResult, ExecutionReport, MigrationSession, RollbackSummary, RunOutcome,
    RunReport,
};
pub use workload::{LocalRuntime, Workload, WorkloadRef};
