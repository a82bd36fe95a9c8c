//! End-to-end runs of a single outdated vLLM workload through migrate and
//! rollback, with the cluster mocked at the accessor seam.

use std::fs;

use chrono::{TimeZone, Utc};
use mockall::predicate::eq;

use crate::accessor::{MockObjectAccessor, NamespaceScope};
use crate::applier::EntryOutcome;
use crate::binding::BindingPath;
use crate::config::{MigrationConfig, RollbackConfig, RunMode};
use crate::rollback::RollbackOutcome;
use crate::session::{run_rollback, CleanupResult, MigrationSession, RunOutcome};
use crate::template::TemplateRef;
use crate::testing::{local_runtime, runtime_template, workload, TEMPLATE_NS};
use crate::workload::WorkloadRef;

const NS: &str = "models";
const LEDGER_ROW: &str = "vllm-cuda-raw\t/spec/predictor/model/runtime\tvllm-cuda-raw";

fn cluster_with_outdated_vllm() -> MockObjectAccessor {
    let mut mock = MockObjectAccessor::new();
    mock.expect_check_access().returning(|| Ok(()));
    mock.expect_namespace_exists().returning(|_| Ok(true));
    mock.expect_list_workloads()
        .with(eq(NamespaceScope::Namespace(NS.to_string())))
        .returning(|_| Ok(vec![workload(NS, "vllm-cuda-raw", Some("vllm-cuda-raw"), None)]));
    mock.expect_get_local_runtime()
        .with(eq(NS), eq("vllm-cuda-raw"))
        .returning(|ns, name| {
            Ok(Some(local_runtime(
                ns,
                name,
                Some("vllm-cuda-runtime-template"),
                Some("v0.10.1.1"),
            )))
        });
    mock.expect_get_template()
        .with(eq(TEMPLATE_NS), eq("vllm-cuda-runtime-template"))
        .returning(|_, name| {
            Ok(Some(runtime_template(name, "vllm-cuda-runtime", "v0.13.0")))
        });
    mock
}

fn config(dir: &std::path::Path) -> MigrationConfig {
    let mut config = MigrationConfig::new(NS);
    config.backup_dir = dir.join("backups");
    config
}

#[tokio::test]
async fn story_dry_run_reports_pending_and_writes_nothing() {
    let mut mock = cluster_with_outdated_vllm();
    mock.expect_materialize_template().never();
    mock.expect_patch_binding().never();
    mock.expect_delete_local_runtime().never();

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let report = MigrationSession::new(&mock, &config)
        .run(true, |_| false, Utc::now())
        .await
        .unwrap();

    assert_eq!(report.plan.entries.len(), 1);
    let entry = &report.plan.entries[0];
    assert_eq!(entry.current_version.as_deref(), Some("v0.10.1.1"));
    assert_eq!(entry.target.version.as_deref(), Some("v0.13.0"));

    let RunOutcome::Abstained(entries) = report.outcome else {
        panic!("dry run must not apply");
    };
    assert_eq!(entries[0].outcome, EntryOutcome::Pending);
    assert_eq!(entries[0].outcome.to_string(), "planned (apply pending)");
    assert_eq!(entries[0].from, "vllm-cuda-raw");
    assert_eq!(entries[0].to, "vllm-cuda-runtime");
    assert!(!config.backup_dir.exists());
}

#[tokio::test]
async fn story_apply_then_rollback_restores_original_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.mode = RunMode::Apply;

    // Apply
    let mut mock = cluster_with_outdated_vllm();
    mock.expect_materialize_template()
        .with(
            eq(TemplateRef {
                namespace: TEMPLATE_NS.to_string(),
                name: "vllm-cuda-runtime-template".to_string(),
            }),
            eq(NS),
        )
        .times(1)
        .returning(|_, _| Ok(()));
    mock.expect_patch_binding()
        .with(
            eq(WorkloadRef::new(NS, "vllm-cuda-raw")),
            eq(BindingPath::ModelScoped),
            eq("vllm-cuda-runtime"),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));

    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    let report = MigrationSession::new(&mock, &config)
        .run(false, |_| false, now)
        .await
        .unwrap();

    let RunOutcome::Applied(exec) = report.outcome else {
        panic!("--apply must apply without a terminal");
    };
    assert!(exec.apply.all_succeeded());
    assert_eq!(exec.cleanup, CleanupResult::NotRequested);
    assert!(exec
        .ledger
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("runway-backup-models-20260301-093000"));

    let text = fs::read_to_string(&exec.ledger).unwrap();
    let rows: Vec<&str> = text
        .lines()
        .filter(|l| !l.starts_with('#') && !l.is_empty())
        .collect();
    assert_eq!(rows, vec![LEDGER_ROW]);

    let script = fs::read_to_string(&exec.rollback_script).unwrap();
    assert!(script.contains("rollback"));
    assert!(script.contains(&*exec.ledger.to_string_lossy()));

    // Rollback from the ledger just written
    let mut mock = MockObjectAccessor::new();
    mock.expect_check_access().returning(|| Ok(()));
    mock.expect_namespace_exists()
        .with(eq(NS))
        .returning(|_| Ok(true));
    mock.expect_patch_binding()
        .with(
            eq(WorkloadRef::new(NS, "vllm-cuda-raw")),
            eq(BindingPath::ModelScoped),
            eq("vllm-cuda-raw"),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    mock.expect_delete_local_runtime().never();

    let summary = run_rollback(
        &mock,
        &RollbackConfig {
            ledger: exec.ledger.clone(),
            namespace: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(summary.namespace, NS);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].outcome, RollbackOutcome::Restored);
    assert_eq!(summary.reports[0].restored_to.as_deref(), Some("vllm-cuda-raw"));
}

#[tokio::test]
async fn story_second_run_after_migration_plans_nothing() {
    let mut mock = MockObjectAccessor::new();
    mock.expect_check_access().returning(|| Ok(()));
    mock.expect_namespace_exists().returning(|_| Ok(true));
    mock.expect_list_workloads().returning(|_| {
        Ok(vec![workload(
            NS,
            "vllm-cuda-raw",
            Some("vllm-cuda-runtime"),
            None,
        )])
    });
    mock.expect_get_local_runtime()
        .with(eq(NS), eq("vllm-cuda-runtime"))
        .returning(|ns, name| {
            Ok(Some(local_runtime(
                ns,
                name,
                Some("vllm-cuda-runtime-template"),
                Some("v0.13.0"),
            )))
        });
    mock.expect_get_template()
        .returning(|_, name| Ok(Some(runtime_template(name, "vllm-cuda-runtime", "v0.13.0"))));
    mock.expect_materialize_template().never();
    mock.expect_patch_binding().never();

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.mode = RunMode::Apply;
    let report = MigrationSession::new(&mock, &config)
        .run(false, |_| false, Utc::now())
        .await
        .unwrap();

    assert!(matches!(report.outcome, RunOutcome::NothingToDo));
    assert_eq!(report.plan.skipped.len(), 1);
}
