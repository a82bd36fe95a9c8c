//! Cleanup sweeper
//!
//! Deletes namespace-local ServingRuntimes that no InferenceService binds to
//! any more. State is re-listed at sweep time; nothing from planning is
//! reused, because the point is to catch runtimes orphaned by the apply that
//! just ran.
//!
//! Counting and deleting are not atomic. A workload that binds to a runtime
//! between the count and the delete will lose it; runway assumes a single
//! operator and does not guard against that.

use std::fmt;

use runway_common::Error;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::accessor::{NamespaceScope, ObjectAccessor};

/// What happened to one runtime
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SweepOutcome {
    /// Still referenced, left in place
    Kept {
        /// Number of workloads binding to it
        references: usize,
    },
    /// Unreferenced and deleted
    Deleted,
    /// Unreferenced but the delete failed
    Failed(String),
}

impl fmt::Display for SweepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kept { references } => write!(f, "kept ({} references)", references),
            Self::Deleted => write!(f, "deleted"),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Outcome for one runtime
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepReport {
    /// Runtime name
    pub runtime: String,
    /// What happened
    pub outcome: SweepOutcome,
}

/// Garbage-collects unreferenced namespace-local runtimes
pub struct CleanupSweeper<'a> {
    accessor: &'a dyn ObjectAccessor,
}

impl<'a> CleanupSweeper<'a> {
    /// Create a sweeper
    pub fn new(accessor: &'a dyn ObjectAccessor) -> Self {
        Self { accessor }
    }

    /// Sweep one namespace.
    ///
    /// Fails as a whole only if the live state cannot be listed, in which
    /// case nothing is deleted.
    pub async fn sweep(&self, namespace: &str) -> Result<Vec<SweepReport>, Error> {
        let runtimes = self.accessor.list_local_runtimes(namespace).await?;
        let workloads = self
            .accessor
            .list_workloads(&NamespaceScope::Namespace(namespace.to_string()))
            .await?;

        let mut reports = Vec::with_capacity(runtimes.len());
        for runtime in runtimes {
            let references = workloads
                .iter()
                .filter(|w| w.id.namespace == namespace && w.references(&runtime.name))
                .count();

            let outcome = if references > 0 {
                debug!(runtime = %runtime.name, references, "runtime still referenced");
                SweepOutcome::Kept { references }
            } else {
                match self
                    .accessor
                    .delete_local_runtime(namespace, &runtime.name)
                    .await
                {
                    Ok(()) => {
                        info!(
                            namespace = %namespace,
                            runtime = %runtime.name,
                            "deleted orphaned runtime"
                        );
                        SweepOutcome::Deleted
                    }
                    Err(e) => {
                        warn!(
                            runtime = %runtime.name,
                            error = %e,
                            "failed to delete orphaned runtime"
                        );
                        SweepOutcome::Failed(e.to_string())
                    }
                }
            };

            reports.push(SweepReport {
                runtime: runtime.name,
                outcome,
            });
        }

        Ok(reports)
    }
}
