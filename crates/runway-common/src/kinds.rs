//! Compile-time API markers for the foreign kinds runway reads and writes
//!
//! None of these CRDs are owned by runway, so they are accessed as
//! `DynamicObject` through the `ApiResource` each marker produces.

use kube::discovery::ApiResource;

use crate::kube_utils::build_api_resource;

/// Trait for types that have a known API group, version, and kind.
///
/// # Example
/// ```ignore
/// let ar = ServingRuntime::api_resource();
/// let api: Api<DynamicObject> = Api::namespaced_with(client, "demo", &ar);
/// ```
pub trait HasApiResource {
    /// Full API version (e.g., "serving.kserve.io/v1beta1")
    const API_VERSION: &'static str;
    /// Resource kind (e.g., "InferenceService")
    const KIND: &'static str;

    /// Build an ApiResource from the type's constants.
    fn api_resource() -> ApiResource {
        build_api_resource(Self::API_VERSION, Self::KIND)
    }
}

/// KServe InferenceService (the workload being migrated)
pub struct InferenceService;

impl HasApiResource for InferenceService {
    const API_VERSION: &'static str = "serving.kserve.io/v1beta1";
    const KIND: &'static str = "InferenceService";
}

/// KServe namespace-local ServingRuntime
pub struct ServingRuntime;

impl HasApiResource for ServingRuntime {
    const API_VERSION: &'static str = "serving.kserve.io/v1alpha1";
    const KIND: &'static str = "ServingRuntime";
}

/// OpenShift Template holding a ServingRuntime definition
pub struct Template;

impl HasApiResource for Template {
    const API_VERSION: &'static str = "template.openshift.io/v1";
    const KIND: &'static str = "Template";
}
