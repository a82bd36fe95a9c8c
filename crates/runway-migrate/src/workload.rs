//! Typed views of the cluster objects the engine reasons about
//!
//! Views are extracted from `DynamicObject`s at the accessor boundary. Empty
//! strings and `null` are already folded into `None` by the time a view
//! exists, so nothing downstream re-checks for them.

use std::fmt;

use kube::api::DynamicObject;
use runway_common::kube_utils::{annotation, present, string_at};
use runway_common::{Error, ANNOTATION_RUNTIME_VERSION, ANNOTATION_TEMPLATE_NAME};
use serde::Serialize;

use crate::binding::BindingPath;

/// Identity of an InferenceService
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct WorkloadRef {
    /// Namespace of the InferenceService
    pub namespace: String,
    /// Name of the InferenceService
    pub name: String,
}

impl WorkloadRef {
    /// Create a workload reference
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// An InferenceService with both possible runtime binding fields read off it.
///
/// At most one of the two fields is expected to be set; which one is
/// authoritative is decided by [`crate::binding::resolve_binding`].
#[derive(Clone, Debug, PartialEq)]
pub struct Workload {
    /// Workload identity
    pub id: WorkloadRef,
    /// Value at `/spec/predictor/model/runtime`
    pub model_runtime: Option<String>,
    /// Value at `/spec/predictor/runtime`
    pub predictor_runtime: Option<String>,
}

impl Workload {
    /// Build a workload view from a raw InferenceService object
    pub fn from_dynamic(obj: &DynamicObject) -> Result<Self, Error> {
        let name = present(obj.metadata.name.as_deref())
            .ok_or_else(|| Error::serialization_for("InferenceService", "object has no name"))?;
        let namespace = present(obj.metadata.namespace.as_deref()).ok_or_else(|| {
            Error::serialization_for(
                "InferenceService",
                format!("object {} has no namespace", name),
            )
        })?;

        Ok(Self {
            id: WorkloadRef { namespace, name },
            model_runtime: string_at(&obj.data, BindingPath::ModelScoped.json_pointer()),
            predictor_runtime: string_at(&obj.data, BindingPath::PredictorScoped.json_pointer()),
        })
    }

    /// True if either binding field names `runtime`
    pub fn references(&self, runtime: &str) -> bool {
        self.model_runtime.as_deref() == Some(runtime)
            || self.predictor_runtime.as_deref() == Some(runtime)
    }
}

/// A namespace-local ServingRuntime and the annotations migration cares about
#[derive(Clone, Debug, PartialEq)]
pub struct LocalRuntime {
    /// Namespace the runtime lives in
    pub namespace: String,
    /// Runtime name
    pub name: String,
    /// Template this runtime was generated from (`opendatahub.io/template-name`)
    pub template_name: Option<String>,
    /// Version tag (`opendatahub.io/runtime-version`)
    pub runtime_version: Option<String>,
}

impl LocalRuntime {
    /// Build a runtime view from a raw ServingRuntime object
    pub fn from_dynamic(obj: &DynamicObject) -> Result<Self, Error> {
        let name = present(obj.metadata.name.as_deref())
            .ok_or_else(|| Error::serialization_for("ServingRuntime", "object has no name"))?;
        let namespace = present(obj.metadata.namespace.as_deref()).unwrap_or_default();
        let annotations = obj.metadata.annotations.as_ref();

        Ok(Self {
            namespace,
            name,
            template_name: annotation(annotations, ANNOTATION_TEMPLATE_NAME),
            runtime_version: annotation(annotations, ANNOTATION_RUNTIME_VERSION),
        })
    }
}
