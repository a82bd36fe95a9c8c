//! Read-only inventory of InferenceServices and their runtimes
//!
//! Reuses the planner's per-workload evaluation so the inventory and the
//! migration plan can never disagree about what is outdated.

use std::fmt;

use runway_common::Error;
use serde::Serialize;
use tracing::debug;

use crate::accessor::{NamespaceScope, ObjectAccessor};
use crate::binding::{resolve_binding, BindingPath};
use crate::planner::{Evaluation, MigrationPlanner, SkipReason};
use crate::workload::Workload;

/// Migration status of one workload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InventoryStatus {
    /// Local runtime matches its template's version
    Current,
    /// Local runtime would be migrated
    Outdated,
    /// Template annotation names a template that no longer exists
    RetiredTemplate,
    /// Template exists but does not yield a single named runtime
    InvalidTemplate,
    /// Local runtime without a template annotation
    Unmanaged,
    /// Bound runtime is not namespace-local
    NonLocal,
    /// No runtime binding
    Unbound,
    /// Evaluation failed
    Unknown,
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Current => "current",
            Self::Outdated => "outdated",
            Self::RetiredTemplate => "retired-template",
            Self::InvalidTemplate => "invalid-template",
            Self::Unmanaged => "unmanaged",
            Self::NonLocal => "non-local",
            Self::Unbound => "unbound",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Where the bound runtime lives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeScope {
    /// Namespace-local ServingRuntime
    Local,
    /// Cluster-wide or otherwise not in the workload namespace
    NonLocal,
    /// Workload has no binding
    None,
}

impl fmt::Display for RuntimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::NonLocal => f.write_str("non-local"),
            Self::None => f.write_str("none"),
        }
    }
}

/// One line of inventory
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    /// Workload namespace
    pub namespace: String,
    /// Workload name
    pub name: String,
    /// Where the binding lives
    pub binding_path: Option<BindingPath>,
    /// Bound runtime
    pub runtime: Option<String>,
    /// Where the bound runtime lives; unknown when the lookup failed
    pub scope: Option<RuntimeScope>,
    /// Template the runtime comes from
    pub template: Option<String>,
    /// Version of the bound runtime
    pub current_version: Option<String>,
    /// Version the template produces
    pub target_version: Option<String>,
    /// Migration status
    pub status: InventoryStatus,
}

/// Build an inventory row from a workload and its planning verdict
pub fn inventory_row(workload: &Workload, evaluation: Evaluation) -> InventoryRow {
    let binding = resolve_binding(workload);
    let mut row = InventoryRow {
        namespace: workload.id.namespace.clone(),
        name: workload.id.name.clone(),
        binding_path: binding.as_ref().map(|b| b.path()),
        runtime: binding.as_ref().map(|b| b.runtime().to_string()),
        scope: Some(RuntimeScope::Local),
        template: None,
        current_version: None,
        target_version: None,
        status: InventoryStatus::Unknown,
    };

    match evaluation {
        Evaluation::Migrate(entry) => {
            row.template = Some(entry.template.name);
            row.current_version = entry.current_version;
            row.target_version = entry.target.version;
            row.status = InventoryStatus::Outdated;
        }
        Evaluation::Skip(reason) => match reason {
            SkipReason::Unbound => {
                row.scope = Some(RuntimeScope::None);
                row.status = InventoryStatus::Unbound;
            }
            SkipReason::NotLocal { .. } => {
                row.scope = Some(RuntimeScope::NonLocal);
                row.status = InventoryStatus::NonLocal;
            }
            SkipReason::Unmanaged { .. } => row.status = InventoryStatus::Unmanaged,
            SkipReason::TemplateNotFound {
                template, version, ..
            } => {
                row.template = Some(template);
                row.current_version = version;
                row.status = InventoryStatus::RetiredTemplate;
            }
            SkipReason::TargetUndeterminable {
                template, version, ..
            } => {
                row.template = Some(template);
                row.current_version = version;
                row.status = InventoryStatus::InvalidTemplate;
            }
            SkipReason::AlreadyCurrent {
                template, version, ..
            } => {
                row.template = Some(template);
                row.current_version = Some(version.clone());
                row.target_version = Some(version);
                row.status = InventoryStatus::Current;
            }
            SkipReason::LookupFailed { message } => {
                debug!(workload = %workload.id, error = %message, "inventory lookup failed");
                row.scope = None;
                row.status = InventoryStatus::Unknown;
            }
        },
    }

    row
}

/// Scan workloads in `scope` and classify each one
pub async fn scan_inventory(
    accessor: &dyn ObjectAccessor,
    scope: &NamespaceScope,
    template_namespace: &str,
) -> Result<Vec<InventoryRow>, Error> {
    let workloads = accessor.list_workloads(scope).await?;
    let planner = MigrationPlanner::new(accessor, template_namespace);

    let mut rows = Vec::with_capacity(workloads.len());
    for workload in &workloads {
        let evaluation = planner.evaluate(workload).await;
        rows.push(inventory_row(workload, evaluation));
    }
    Ok(rows)
}
