//! Common types for runway: errors, Kubernetes kind markers, and object helpers

#![deny(missing_docs)]

pub mod error;
pub mod kinds;
pub mod kube_utils;

pub use error::Error;

/// Field manager used for every server-side apply and patch issued by runway
pub const FIELD_MANAGER: &str = "runway";

/// Namespace holding the OpenShift AI runtime templates
pub const DEFAULT_TEMPLATE_NAMESPACE: &str = "redhat-ods-applications";

/// Suffix tried once when a template name does not resolve exactly
pub const TEMPLATE_SUFFIX: &str = "-template";

/// Annotation on a ServingRuntime naming the template it was generated from
pub const ANNOTATION_TEMPLATE_NAME: &str = "opendatahub.io/template-name";

/// Annotation carrying the runtime version tag (opaque, compared for equality only)
pub const ANNOTATION_RUNTIME_VERSION: &str = "opendatahub.io/runtime-version";
