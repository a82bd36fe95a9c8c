//! Prerequisite checks run before any scan or mutation

use runway_common::Error;
use tracing::debug;

use crate::accessor::ObjectAccessor;

/// Verify cluster access and that the namespaces a run needs are readable.
///
/// Every failure is an [`Error::Prerequisite`] so callers can abort before
/// touching anything.
pub async fn check_prerequisites(
    accessor: &dyn ObjectAccessor,
    namespace: &str,
    template_namespace: Option<&str>,
) -> Result<(), Error> {
    accessor
        .check_access()
        .await
        .map_err(|e| Error::prerequisite(format!("cannot access the cluster: {}", e)))?;

    require_namespace(accessor, namespace, "target").await?;
    if let Some(template_ns) = template_namespace {
        require_namespace(accessor, template_ns, "template").await?;
    }

    debug!(namespace = %namespace, "prerequisites satisfied");
    Ok(())
}

async fn require_namespace(
    accessor: &dyn ObjectAccessor,
    namespace: &str,
    role: &str,
) -> Result<(), Error> {
    match accessor.namespace_exists(namespace).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::prerequisite(format!(
            "{} namespace {} not found",
            role, namespace
        ))),
        Err(e) => Err(Error::prerequisite(format!(
            "{} namespace {} is not accessible: {}",
            role, namespace, e
        ))),
    }
}
