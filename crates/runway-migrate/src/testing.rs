//! Shared fixtures for engine tests

use serde_json::json;

use crate::template::{TemplateObject, TemplateRef};
use crate::workload::{LocalRuntime, Workload, WorkloadRef};

pub const TEMPLATE_NS: &str = "redhat-ods-applications";

pub fn workload(ns: &str, name: &str, model: Option<&str>, predictor: Option<&str>) -> Workload {
    Workload {
        id: WorkloadRef::new(ns, name),
        model_runtime: model.map(str::to_string),
        predictor_runtime: predictor.map(str::to_string),
    }
}

pub fn local_runtime(
    ns: &str,
    name: &str,
    template: Option<&str>,
    version: Option<&str>,
) -> LocalRuntime {
    LocalRuntime {
        namespace: ns.to_string(),
        name: name.to_string(),
        template_name: template.map(str::to_string),
        runtime_version: version.map(str::to_string),
    }
}

pub fn runtime_template(template: &str, runtime: &str, version: &str) -> TemplateObject {
    TemplateObject {
        reference: TemplateRef {
            namespace: TEMPLATE_NS.to_string(),
            name: template.to_string(),
        },
        objects: vec![json!({
            "apiVersion": "serving.kserve.io/v1alpha1",
            "kind": "ServingRuntime",
            "metadata": {
                "name": runtime,
                "annotations": {
                    "opendatahub.io/runtime-version": version,
                    "opendatahub.io/template-name": template
                }
            },
            "spec": { "containers": [{ "name": "kserve-container" }] }
        })],
        parameters: vec![],
    }
}
