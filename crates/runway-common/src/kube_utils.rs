//! Shared Kubernetes helpers for untyped (DynamicObject) access
//!
//! runway never owns the CRDs it touches, so every foreign kind is read and
//! written as a `DynamicObject`. The helpers here build `ApiResource`s for
//! those kinds and pull string fields out of raw object JSON, normalizing
//! "absent" at the boundary so callers only ever see `Option`.

use std::collections::BTreeMap;

use kube::discovery::ApiResource;
use serde_json::Value;

/// Known irregular plurals, lowercased kind -> resource plural
const KIND_PLURALS: &[(&str, &str)] = &[
    ("inferenceservice", "inferenceservices"),
    ("servingruntime", "servingruntimes"),
    ("template", "templates"),
];

/// Build an ApiResource from an apiVersion string and kind
///
/// # Example
/// ```ignore
/// let ar = build_api_resource("serving.kserve.io/v1alpha1", "ServingRuntime");
/// let api: Api<DynamicObject> = Api::namespaced_with(client, "demo", &ar);
/// ```
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Split an apiVersion into (group, version)
///
/// ```ignore
/// let (group, version) = parse_api_version("v1");
/// assert_eq!(group, "");
/// assert_eq!(version, "v1");
/// ```
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Resource plural for a kind
///
/// Template processing only ever yields the kinds in `KIND_PLURALS`; any
/// other kind gets the regular lowercase `s` plural.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    KIND_PLURALS
        .iter()
        .find(|(singular, _)| *singular == lower)
        .map(|(_, plural)| (*plural).to_string())
        .unwrap_or_else(|| format!("{lower}s"))
}

/// Normalize a raw field value: empty and the literal `null` mean absent.
///
/// Anything else is kept verbatim, surrounding whitespace included.
pub fn present(raw: Option<&str>) -> Option<String> {
    match raw {
        None | Some("") | Some("null") => None,
        Some(v) => Some(v.to_string()),
    }
}

/// Read a string field at a JSON pointer, normalized with [`present`].
///
/// Non-string values (numbers, objects) are treated as absent.
pub fn string_at(value: &Value, pointer: &str) -> Option<String> {
    present(value.pointer(pointer).and_then(Value::as_str))
}

/// Read an annotation, normalized with [`present`].
pub fn annotation(annotations: Option<&BTreeMap<String, String>>, key: &str) -> Option<String> {
    present(annotations.and_then(|a| a.get(key)).map(String::as_str))
}
