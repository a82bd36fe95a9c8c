//! Object accessor: the single seam between the engine and the cluster
//!
//! Every read and write the engine performs goes through [`ObjectAccessor`],
//! which lets tests drive planning, apply, rollback, and cleanup against
//! mocks while production code talks to the API server through kube-rs.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use runway_common::kinds::{HasApiResource, InferenceService, ServingRuntime, Template};
use runway_common::kube_utils::{build_api_resource, string_at};
use runway_common::{Error, FIELD_MANAGER};

use crate::binding::BindingPath;
use crate::template::{process, TemplateObject, TemplateRef};
use crate::workload::{LocalRuntime, Workload, WorkloadRef};

/// Which namespaces a list call covers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceScope {
    /// A single namespace
    Namespace(String),
    /// Every namespace the caller can see
    All,
}

/// Trait abstracting the cluster reads and writes migration needs
///
/// Lookups of a single object return `Ok(None)` for a missing object; an
/// `Err` always means the call itself failed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectAccessor: Send + Sync {
    /// Verify the API server is reachable with the current credentials
    async fn check_access(&self) -> Result<(), Error>;

    /// Check whether a namespace exists and is readable
    async fn namespace_exists(&self, namespace: &str) -> Result<bool, Error>;

    /// List InferenceServices, in API server order
    async fn list_workloads(&self, scope: &NamespaceScope) -> Result<Vec<Workload>, Error>;

    /// Get a namespace-local ServingRuntime
    async fn get_local_runtime(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<LocalRuntime>, Error>;

    /// List all namespace-local ServingRuntimes in a namespace
    async fn list_local_runtimes(&self, namespace: &str) -> Result<Vec<LocalRuntime>, Error>;

    /// Get a runtime template by exact name
    async fn get_template(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<TemplateObject>, Error>;

    /// Process a template and apply its objects into `target_namespace`
    ///
    /// Uses create-or-update semantics, so re-materializing an existing
    /// runtime succeeds.
    async fn materialize_template(
        &self,
        template: &TemplateRef,
        target_namespace: &str,
    ) -> Result<(), Error>;

    /// Replace a single runtime binding field on an InferenceService
    async fn patch_binding(
        &self,
        workload: &WorkloadRef,
        path: BindingPath,
        runtime: &str,
    ) -> Result<(), Error>;

    /// Delete a namespace-local ServingRuntime
    async fn delete_local_runtime(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

/// Real accessor using DynamicObject for the KServe and OpenShift kinds
pub struct KubeAccessor {
    client: Client,
}

impl KubeAccessor {
    /// Create a new KubeAccessor wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced<K: HasApiResource>(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &K::api_resource())
    }

    /// Server-side apply one processed template object
    async fn apply_object(&self, obj: Value, namespace: &str) -> Result<(), Error> {
        let (ar, name, dynamic) = prepare_object(obj, namespace)?;
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&dynamic),
        )
        .await?;

        info!(kind = %ar.kind, name = %name, namespace = %namespace, "applied template object");
        Ok(())
    }
}

/// Pin a processed template object to `namespace` and resolve its API resource
///
/// Whatever namespace the template carried is overwritten.
fn prepare_object(
    mut obj: Value,
    namespace: &str,
) -> Result<(ApiResource, String, DynamicObject), Error> {
    let api_version = string_at(&obj, "/apiVersion")
        .ok_or_else(|| Error::serialization("template object has no apiVersion"))?;
    let kind = string_at(&obj, "/kind")
        .ok_or_else(|| Error::serialization("template object has no kind"))?;
    let name = string_at(&obj, "/metadata/name").ok_or_else(|| {
        Error::serialization_for(kind.clone(), "template object has no metadata.name")
    })?;

    if let Some(metadata) = obj.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.insert("namespace".to_string(), Value::String(namespace.to_string()));
    }

    let dynamic: DynamicObject = serde_json::from_value(obj)
        .map_err(|e| Error::serialization_for(kind.clone(), e.to_string()))?;
    Ok((build_api_resource(&api_version, &kind), name, dynamic))
}

/// JSON patch replacing exactly one runtime binding field
fn binding_patch(path: BindingPath, runtime: &str) -> json_patch::Patch {
    use json_patch::{PatchOperation, ReplaceOperation};
    use jsonptr::PointerBuf;

    json_patch::Patch(vec![PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens(path.tokens().iter().copied()),
        value: Value::String(runtime.to_string()),
    })])
}

/// Parse listed objects, skipping any that cannot be read
fn readable<T>(
    items: &[DynamicObject],
    kind: &str,
    parse: impl Fn(&DynamicObject) -> Result<T, Error>,
) -> Vec<T> {
    items
        .iter()
        .filter_map(|obj| match parse(obj) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(kind = %kind, error = %e, "skipping unreadable object");
                None
            }
        })
        .collect()
}

#[async_trait]
impl ObjectAccessor for KubeAccessor {
    async fn check_access(&self) -> Result<(), Error> {
        let version = self.client.apiserver_version().await?;
        debug!(
            major = %version.major,
            minor = %version.minor,
            "connected to API server"
        );
        Ok(())
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get_opt(namespace).await?.is_some())
    }

    async fn list_workloads(&self, scope: &NamespaceScope) -> Result<Vec<Workload>, Error> {
        let api: Api<DynamicObject> = match scope {
            NamespaceScope::Namespace(ns) => self.namespaced::<InferenceService>(ns),
            NamespaceScope::All => {
                Api::all_with(self.client.clone(), &InferenceService::api_resource())
            }
        };
        let list = api.list(&ListParams::default()).await?;
        Ok(readable(&list.items, "InferenceService", Workload::from_dynamic))
    }

    async fn get_local_runtime(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<LocalRuntime>, Error> {
        let api = self.namespaced::<ServingRuntime>(namespace);
        match api.get_opt(name).await? {
            Some(obj) => Ok(Some(LocalRuntime::from_dynamic(&obj)?)),
            None => Ok(None),
        }
    }

    async fn list_local_runtimes(&self, namespace: &str) -> Result<Vec<LocalRuntime>, Error> {
        let api = self.namespaced::<ServingRuntime>(namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(readable(&list.items, "ServingRuntime", LocalRuntime::from_dynamic))
    }

    async fn get_template(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<TemplateObject>, Error> {
        let api = self.namespaced::<Template>(namespace);
        match api.get_opt(name).await? {
            Some(obj) => Ok(Some(TemplateObject::from_dynamic(&obj)?)),
            None => Ok(None),
        }
    }

    async fn materialize_template(
        &self,
        template: &TemplateRef,
        target_namespace: &str,
    ) -> Result<(), Error> {
        let found = self
            .get_template(&template.namespace, &template.name)
            .await?
            .ok_or_else(|| Error::template(&template.name, "template no longer exists"))?;

        for obj in process(&found)? {
            self.apply_object(obj, target_namespace).await?;
        }
        Ok(())
    }

    async fn patch_binding(
        &self,
        workload: &WorkloadRef,
        path: BindingPath,
        runtime: &str,
    ) -> Result<(), Error> {
        let api = self.namespaced::<InferenceService>(&workload.namespace);
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        api.patch(
            &workload.name,
            &params,
            &Patch::Json::<()>(binding_patch(path, runtime)),
        )
        .await?;

        debug!(workload = %workload, path = %path, runtime = %runtime, "patched runtime binding");
        Ok(())
    }

    async fn delete_local_runtime(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let api = self.namespaced::<ServingRuntime>(namespace);
        match api.delete(name, &Default::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!(namespace = %namespace, runtime = %name, "runtime already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
