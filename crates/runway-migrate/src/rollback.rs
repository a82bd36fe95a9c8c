//! Rollback executor
//!
//! Replays a backup ledger front to back, patching each recorded binding path
//! back to the recorded original runtime. Entries are independent: a failed
//! patch is reported and the replay carries on. Runtimes materialized during
//! apply are left in place; removing them is the cleanup sweeper's job.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::accessor::ObjectAccessor;
use crate::binding::BindingPath;
use crate::ledger::LedgerContents;
use crate::workload::WorkloadRef;

/// What happened to one ledger record
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RollbackOutcome {
    /// Binding restored to the original runtime
    Restored,
    /// Patch failed, or the record could not be parsed
    Failed(String),
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restored => write!(f, "restored"),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Outcome of replaying one ledger record
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RollbackReport {
    /// Line number in the ledger file
    pub line: usize,
    /// Workload name, when the record parsed
    pub workload: Option<String>,
    /// Binding path restored
    pub path: Option<BindingPath>,
    /// Runtime restored to
    pub restored_to: Option<String>,
    /// What happened
    pub outcome: RollbackOutcome,
}

/// Replays ledgers through an accessor
pub struct RollbackExecutor<'a> {
    accessor: &'a dyn ObjectAccessor,
}

impl<'a> RollbackExecutor<'a> {
    /// Create a rollback executor
    pub fn new(accessor: &'a dyn ObjectAccessor) -> Self {
        Self { accessor }
    }

    /// Replay every record in `contents` against workloads in `namespace`
    pub async fn rollback(
        &self,
        namespace: &str,
        contents: &LedgerContents,
    ) -> Vec<RollbackReport> {
        let mut reports = Vec::with_capacity(contents.records.len());

        for record in &contents.records {
            let entry = match &record.parsed {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(line = record.line, error = %e, "skipping malformed ledger record");
                    reports.push(RollbackReport {
                        line: record.line,
                        workload: None,
                        path: None,
                        restored_to: None,
                        outcome: RollbackOutcome::Failed(e.to_string()),
                    });
                    continue;
                }
            };

            let workload = WorkloadRef::new(namespace, &entry.workload);
            let outcome = match self
                .accessor
                .patch_binding(&workload, entry.path, &entry.original_runtime)
                .await
            {
                Ok(()) => {
                    info!(
                        workload = %workload,
                        path = %entry.path,
                        runtime = %entry.original_runtime,
                        "restored runtime binding"
                    );
                    RollbackOutcome::Restored
                }
                Err(e) => {
                    warn!(workload = %workload, error = %e, "failed to restore runtime binding");
                    RollbackOutcome::Failed(e.to_string())
                }
            };

            reports.push(RollbackReport {
                line: record.line,
                workload: Some(entry.workload.clone()),
                path: Some(entry.path),
                restored_to: Some(entry.original_runtime.clone()),
                outcome,
            });
        }

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::MockObjectAccessor;
    use crate::ledger::parse_ledger;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use runway_common::Error;

    #[tokio::test]
    async fn empty_ledger_is_a_no_op() {
        let mock = MockObjectAccessor::new();
        let executor = RollbackExecutor::new(&mock);

        let reports = executor
            .rollback("demo", &parse_ledger("# header only\n"))
            .await;
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn replays_in_file_order() {
        let mut seq = Sequence::new();
        let mut mock = MockObjectAccessor::new();
        mock.expect_patch_binding()
            .with(
                eq(WorkloadRef::new("demo", "first")),
                eq(BindingPath::ModelScoped),
                eq("rt-1"),
            )
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        mock.expect_patch_binding()
            .with(
                eq(WorkloadRef::new("demo", "second")),
                eq(BindingPath::PredictorScoped),
                eq("rt-2"),
            )
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let contents = parse_ledger(
            "first\t/spec/predictor/model/runtime\trt-1\n\
             second\t/spec/predictor/runtime\trt-2\n",
        );
        let reports = RollbackExecutor::new(&mock)
            .rollback("demo", &contents)
            .await;

        assert_eq!(reports.len(), 2);
        assert!(reports
            .iter()
            .all(|r| r.outcome == RollbackOutcome::Restored));
    }

    #[tokio::test]
    async fn failure_does_not_stop_replay() {
        let mut mock = MockObjectAccessor::new();
        mock.expect_patch_binding()
            .withf(|w, _, _| w.name == "gone")
            .returning(|_, _, _| Err(Error::validation("not found")));
        mock.expect_patch_binding()
            .withf(|w, _, _| w.name == "ok")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let contents = parse_ledger(
            "gone\t/spec/predictor/model/runtime\trt-1\n\
             broken line\n\
             ok\t/spec/predictor/model/runtime\trt-2\n",
        );
        let reports = RollbackExecutor::new(&mock)
            .rollback("demo", &contents)
            .await;

        assert_eq!(reports.len(), 3);
        assert!(matches!(reports[0].outcome, RollbackOutcome::Failed(_)));
        assert!(matches!(reports[1].outcome, RollbackOutcome::Failed(_)));
        assert_eq!(reports[1].line, 2);
        assert_eq!(reports[1].workload, None);
        assert_eq!(reports[2].outcome, RollbackOutcome::Restored);
        assert_eq!(reports[2].restored_to.as_deref(), Some("rt-2"));
    }
}
