//! Migration planning
//!
//! Walks workloads in discovery order and decides, per workload, whether it
//! must move from its namespace-local runtime to the runtime its template
//! currently produces. Planning only reads; it never mutates cluster state.

use std::fmt;

use runway_common::Error;
use serde::Serialize;
use tracing::debug;

use crate::accessor::ObjectAccessor;
use crate::binding::{resolve_binding, RuntimeBinding};
use crate::template::{describe_target, TargetRuntime, TemplateRef, TemplateResolver};
use crate::workload::{Workload, WorkloadRef};

/// One workload that needs migrating
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanEntry {
    /// Workload to migrate
    pub workload: WorkloadRef,
    /// Current binding (path and runtime name)
    pub binding: RuntimeBinding,
    /// Version tag of the current runtime
    pub current_version: Option<String>,
    /// Template the target runtime comes from
    pub template: TemplateRef,
    /// Runtime the template produces
    pub target: TargetRuntime,
}

/// Why a workload was left out of the plan
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SkipReason {
    /// Neither binding path is set
    Unbound,
    /// The bound runtime has no namespace-local ServingRuntime
    NotLocal {
        /// Bound runtime name
        runtime: String,
    },
    /// The local runtime has no template annotation
    Unmanaged {
        /// Bound runtime name
        runtime: String,
    },
    /// The annotated template does not resolve
    TemplateNotFound {
        /// Bound runtime name
        runtime: String,
        /// Template name from the annotation
        template: String,
        /// Version tag of the current runtime
        version: Option<String>,
    },
    /// The template resolves but its target runtime cannot be determined
    TargetUndeterminable {
        /// Bound runtime name
        runtime: String,
        /// Resolved template
        template: String,
        /// Version tag of the current runtime
        version: Option<String>,
    },
    /// Current and target versions are equal
    AlreadyCurrent {
        /// Bound runtime name
        runtime: String,
        /// Resolved template
        template: String,
        /// Shared version tag
        version: String,
    },
    /// A read failed while evaluating this workload
    LookupFailed {
        /// Error message
        message: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => write!(f, "no runtime binding"),
            Self::NotLocal { runtime } => {
                write!(f, "runtime {} is not a namespace-local ServingRuntime", runtime)
            }
            Self::Unmanaged { runtime } => {
                write!(f, "runtime {} has no template annotation", runtime)
            }
            Self::TemplateNotFound { template, .. } => write!(f, "template {} not found", template),
            Self::TargetUndeterminable { template, .. } => {
                write!(f, "template {} does not yield a single named runtime", template)
            }
            Self::AlreadyCurrent { version, .. } => write!(f, "already at version {}", version),
            Self::LookupFailed { message } => write!(f, "lookup failed: {}", message),
        }
    }
}

/// Per-workload planning verdict
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluation {
    /// The workload needs migrating
    Migrate(PlanEntry),
    /// The workload is left alone
    Skip(SkipReason),
}

/// Ordered migration plan plus the workloads that were skipped
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Plan {
    /// Entries in workload discovery order; also apply and ledger order
    pub entries: Vec<PlanEntry>,
    /// Skipped workloads with the reason, for verbose diagnostics
    pub skipped: Vec<(WorkloadRef, SkipReason)>,
}

impl Plan {
    /// True when nothing needs migrating
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decide whether a runtime at `current` must move to `target`.
///
/// Only two present, equal versions mean "current"; a missing version on
/// either side is unknown and forces migration.
pub fn needs_migration(current: Option<&str>, target: Option<&str>) -> bool {
    match (current, target) {
        (Some(c), Some(t)) => c != t,
        _ => true,
    }
}

/// Builds migration plans
pub struct MigrationPlanner<'a> {
    accessor: &'a dyn ObjectAccessor,
    template_namespace: &'a str,
}

impl<'a> MigrationPlanner<'a> {
    /// Create a planner resolving templates in `template_namespace`
    pub fn new(accessor: &'a dyn ObjectAccessor, template_namespace: &'a str) -> Self {
        Self {
            accessor,
            template_namespace,
        }
    }

    /// Plan every workload, preserving discovery order
    pub async fn plan(&self, workloads: &[Workload]) -> Plan {
        let mut plan = Plan::default();
        for workload in workloads {
            match self.evaluate(workload).await {
                Evaluation::Migrate(entry) => {
                    debug!(
                        workload = %entry.workload,
                        from = %entry.binding.runtime(),
                        to = %entry.target.name,
                        "workload planned for migration"
                    );
                    plan.entries.push(entry);
                }
                Evaluation::Skip(reason) => {
                    debug!(workload = %workload.id, reason = %reason, "workload skipped");
                    plan.skipped.push((workload.id.clone(), reason));
                }
            }
        }
        plan
    }

    /// Evaluate a single workload
    pub async fn evaluate(&self, workload: &Workload) -> Evaluation {
        match self.try_evaluate(workload).await {
            Ok(evaluation) => evaluation,
            Err(e) => Evaluation::Skip(SkipReason::LookupFailed {
                message: e.to_string(),
            }),
        }
    }

    async fn try_evaluate(&self, workload: &Workload) -> Result<Evaluation, Error> {
        let Some(binding) = resolve_binding(workload) else {
            return Ok(Evaluation::Skip(SkipReason::Unbound));
        };
        let runtime_name = binding.runtime().to_string();

        let Some(runtime) = self
            .accessor
            .get_local_runtime(&workload.id.namespace, &runtime_name)
            .await?
        else {
            return Ok(Evaluation::Skip(SkipReason::NotLocal {
                runtime: runtime_name,
            }));
        };

        let Some(template_name) = runtime.template_name else {
            return Ok(Evaluation::Skip(SkipReason::Unmanaged {
                runtime: runtime_name,
            }));
        };
        let current_version = runtime.runtime_version;

        let resolver = TemplateResolver::new(self.accessor, self.template_namespace);
        let Some(template) = resolver.resolve_template(&template_name).await? else {
            return Ok(Evaluation::Skip(SkipReason::TemplateNotFound {
                runtime: runtime_name,
                template: template_name,
                version: current_version,
            }));
        };

        let Some(target) = describe_target(&template) else {
            return Ok(Evaluation::Skip(SkipReason::TargetUndeterminable {
                runtime: runtime_name,
                template: template.reference.name,
                version: current_version,
            }));
        };

        if !needs_migration(current_version.as_deref(), target.version.as_deref()) {
            return Ok(Evaluation::Skip(SkipReason::AlreadyCurrent {
                runtime: runtime_name,
                template: template.reference.name,
                version: current_version.unwrap_or_default(),
            }));
        }

        Ok(Evaluation::Migrate(PlanEntry {
            workload: workload.id.clone(),
            binding,
            current_version,
            template: template.reference,
            target,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::MockObjectAccessor;
    use crate::testing::{local_runtime, runtime_template, workload, TEMPLATE_NS};
    use mockall::predicate::eq;

    #[test]
    fn equal_versions_do_not_need_migration() {
        assert!(!needs_migration(Some("v1"), Some("v1")));
        assert!(needs_migration(Some("v1"), Some("v2")));
    }

    #[test]
    fn missing_version_forces_migration() {
        assert!(needs_migration(None, Some("v2")));
        assert!(needs_migration(Some("v1"), None));
        assert!(needs_migration(None, None));
    }

    #[tokio::test]
    async fn unbound_workload_is_skipped_without_reads() {
        // No expectations: any accessor call would panic
        let mock = MockObjectAccessor::new();
        let planner = MigrationPlanner::new(&mock, TEMPLATE_NS);

        let plan = planner.plan(&[workload("demo", "idle", None, None)]).await;
        assert!(plan.is_empty());
        assert_eq!(plan.skipped[0].1, SkipReason::Unbound);
    }

    #[tokio::test]
    async fn non_local_runtime_is_skipped() {
        let mut mock = MockObjectAccessor::new();
        mock.expect_get_local_runtime()
            .with(eq("demo"), eq("vllm-cuda-runtime"))
            .returning(|_, _| Ok(None));

        let planner = MigrationPlanner::new(&mock, TEMPLATE_NS);
        let plan = planner
            .plan(&[workload("demo", "m", Some("vllm-cuda-runtime"), None)])
            .await;

        assert!(plan.is_empty());
        assert_eq!(
            plan.skipped[0].1,
            SkipReason::NotLocal {
                runtime: "vllm-cuda-runtime".to_string()
            }
        );
    }

    #[tokio::test]
    async fn runtime_without_template_annotation_is_skipped() {
        let mut mock = MockObjectAccessor::new();
        mock.expect_get_local_runtime()
            .returning(|ns, name| Ok(Some(local_runtime(ns, name, None, Some("v1")))));

        let planner = MigrationPlanner::new(&mock, TEMPLATE_NS);
        let plan = planner
            .plan(&[workload("demo", "m", None, Some("custom"))])
            .await;

        assert!(plan.is_empty());
        assert!(matches!(plan.skipped[0].1, SkipReason::Unmanaged { .. }));
    }

    #[tokio::test]
    async fn missing_template_is_skipped() {
        let mut mock = MockObjectAccessor::new();
        mock.expect_get_local_runtime().returning(|ns, name| {
            Ok(Some(local_runtime(ns, name, Some("retired"), Some("v1"))))
        });
        mock.expect_get_template().returning(|_, _| Ok(None));

        let planner = MigrationPlanner::new(&mock, TEMPLATE_NS);
        let plan = planner.plan(&[workload("demo", "m", Some("old"), None)]).await;

        assert!(plan.is_empty());
        assert!(matches!(
            &plan.skipped[0].1,
            SkipReason::TemplateNotFound { template, .. } if template == "retired"
        ));
    }

    #[tokio::test]
    async fn equal_versions_produce_no_entry() {
        let mut mock = MockObjectAccessor::new();
        mock.expect_get_local_runtime().returning(|ns, name| {
            Ok(Some(local_runtime(
                ns,
                name,
                Some("vllm-cuda-runtime-template"),
                Some("v0.13.0"),
            )))
        });
        mock.expect_get_template()
            .returning(|_, name| Ok(Some(runtime_template(name, "vllm-cuda-runtime", "v0.13.0"))));

        let planner = MigrationPlanner::new(&mock, TEMPLATE_NS);
        let plan = planner
            .plan(&[workload("demo", "m", Some("vllm-cuda-raw"), None)])
            .await;

        assert!(plan.is_empty());
        assert!(matches!(
            &plan.skipped[0].1,
            SkipReason::AlreadyCurrent { version, .. } if version == "v0.13.0"
        ));
    }

    #[tokio::test]
    async fn missing_current_version_is_planned() {
        let mut mock = MockObjectAccessor::new();
        mock.expect_get_local_runtime().returning(|ns, name| {
            Ok(Some(local_runtime(ns, name, Some("vllm-cuda-runtime-template"), None)))
        });
        mock.expect_get_template()
            .returning(|_, name| Ok(Some(runtime_template(name, "vllm-cuda-runtime", "v0.13.0"))));

        let planner = MigrationPlanner::new(&mock, TEMPLATE_NS);
        let plan = planner
            .plan(&[workload("demo", "m", Some("vllm-cuda-raw"), None)])
            .await;

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].current_version, None);
    }

    #[tokio::test]
    async fn lookup_failure_skips_only_that_workload() {
        let mut mock = MockObjectAccessor::new();
        mock.expect_get_local_runtime()
            .with(eq("demo"), eq("broken"))
            .returning(|_, _| Err(Error::validation("boom")));
        mock.expect_get_local_runtime()
            .with(eq("demo"), eq("vllm-cuda-raw"))
            .returning(|ns, name| {
                Ok(Some(local_runtime(
                    ns,
                    name,
                    Some("vllm-cuda-runtime-template"),
                    Some("v0.10.1.1"),
                )))
            });
        mock.expect_get_template()
            .returning(|_, name| Ok(Some(runtime_template(name, "vllm-cuda-runtime", "v0.13.0"))));

        let planner = MigrationPlanner::new(&mock, TEMPLATE_NS);
        let plan = planner
            .plan(&[
                workload("demo", "a", Some("broken"), None),
                workload("demo", "b", Some("vllm-cuda-raw"), None),
            ])
            .await;

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].workload.name, "b");
        assert!(matches!(plan.skipped[0].1, SkipReason::LookupFailed { .. }));
    }

    #[tokio::test]
    async fn plan_preserves_discovery_order() {
        let mut mock = MockObjectAccessor::new();
        mock.expect_get_local_runtime().returning(|ns, name| {
            Ok(Some(local_runtime(ns, name, Some("vllm-cuda-runtime-template"), Some("v1"))))
        });
        mock.expect_get_template()
            .returning(|_, name| Ok(Some(runtime_template(name, "vllm-cuda-runtime", "v2"))));

        let planner = MigrationPlanner::new(&mock, TEMPLATE_NS);
        let workloads = vec![
            workload("demo", "zeta", Some("rt-z"), None),
            workload("demo", "alpha", None, Some("rt-a")),
            workload("demo", "mid", Some("rt-m"), None),
        ];
        let plan = planner.plan(&workloads).await;

        let names: Vec<_> = plan
            .entries
            .iter()
            .map(|e| e.workload.name.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(plan.entries[1].binding, RuntimeBinding::PredictorScoped("rt-a".to_string()));
    }
}
