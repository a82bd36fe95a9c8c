//! Template resolution and processing
//!
//! Runtime templates are OpenShift `Template` objects in a fixed namespace.
//! Each template embeds a single ServingRuntime. Processing substitutes the
//! template parameters the way `oc process` does so that the runtime name and
//! version we plan against are exactly what materialization will produce.

use std::collections::BTreeMap;
use std::fmt;

use kube::api::DynamicObject;
use runway_common::kinds::{HasApiResource, ServingRuntime};
use runway_common::kube_utils::{present, string_at};
use runway_common::{Error, ANNOTATION_RUNTIME_VERSION, TEMPLATE_SUFFIX};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::accessor::ObjectAccessor;

/// Identity of a template in the template namespace
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TemplateRef {
    /// Template namespace
    pub namespace: String,
    /// Template name
    pub name: String,
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A template parameter declaration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParameter {
    /// Parameter name, referenced as `${NAME}`
    pub name: String,
    /// Default value
    #[serde(default)]
    pub value: Option<String>,
    /// Whether a value must be supplied
    #[serde(default)]
    pub required: bool,
    /// Generator expression (not supported by runway)
    #[serde(default)]
    pub generate: Option<String>,
}

/// A template as read from the cluster
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateObject {
    /// Where the template lives
    pub reference: TemplateRef,
    /// Raw `objects[]`, before parameter substitution
    pub objects: Vec<Value>,
    /// Declared `parameters[]`
    pub parameters: Vec<TemplateParameter>,
}

impl TemplateObject {
    /// Build a template view from a raw Template object
    pub fn from_dynamic(obj: &DynamicObject) -> Result<Self, Error> {
        let name = present(obj.metadata.name.as_deref())
            .ok_or_else(|| Error::serialization_for("Template", "object has no name"))?;
        let namespace = present(obj.metadata.namespace.as_deref()).unwrap_or_default();

        let objects = match obj.data.get("objects") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let parameters = match obj.data.get("parameters") {
            Some(v) if !v.is_null() => serde_json::from_value(v.clone())
                .map_err(|e| Error::template(&name, format!("invalid parameters: {}", e)))?,
            _ => Vec::new(),
        };

        Ok(Self {
            reference: TemplateRef { namespace, name },
            objects,
            parameters,
        })
    }
}

/// The runtime a template produces
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TargetRuntime {
    /// Name of the produced ServingRuntime
    pub name: String,
    /// Its `opendatahub.io/runtime-version`, if any
    pub version: Option<String>,
}

/// Process a template: substitute parameters into every object.
pub fn process(template: &TemplateObject) -> Result<Vec<Value>, Error> {
    let values = parameter_values(template)?;
    Ok(template
        .objects
        .iter()
        .map(|obj| substitute(obj, &values))
        .collect())
}

/// Describe the runtime a template would produce.
///
/// Exactly one ServingRuntime must come out of processing and it must carry
/// a name; anything else yields `None`.
pub fn describe_target(template: &TemplateObject) -> Option<TargetRuntime> {
    let objects = match process(template) {
        Ok(objects) => objects,
        Err(e) => {
            debug!(template = %template.reference, error = %e, "template cannot be processed");
            return None;
        }
    };

    let mut runtimes = objects
        .iter()
        .filter(|obj| obj.get("kind").and_then(Value::as_str) == Some(ServingRuntime::KIND));
    let runtime = runtimes.next()?;
    if runtimes.next().is_some() {
        debug!(template = %template.reference, "template produces more than one ServingRuntime");
        return None;
    }

    let name = string_at(runtime, "/metadata/name")?;
    let version = present(
        runtime
            .pointer("/metadata/annotations")
            .and_then(|a| a.get(ANNOTATION_RUNTIME_VERSION))
            .and_then(Value::as_str),
    );
    Some(TargetRuntime { name, version })
}

/// Name to try when `name` does not resolve exactly, if any
pub fn fallback_name(name: &str) -> Option<String> {
    if name.ends_with(TEMPLATE_SUFFIX) {
        None
    } else {
        Some(format!("{}{}", name, TEMPLATE_SUFFIX))
    }
}

fn parameter_values(template: &TemplateObject) -> Result<BTreeMap<String, String>, Error> {
    let mut values = BTreeMap::new();
    for param in &template.parameters {
        let value = match (&param.value, &param.generate) {
            (Some(v), _) => v.clone(),
            (None, Some(_)) => {
                return Err(Error::template(
                    &template.reference.name,
                    format!("parameter {} uses a generator, which is not supported", param.name),
                ))
            }
            (None, None) if param.required => {
                return Err(Error::template(
                    &template.reference.name,
                    format!("required parameter {} has no value", param.name),
                ))
            }
            (None, None) => String::new(),
        };
        values.insert(param.name.clone(), value);
    }
    Ok(values)
}

fn substitute(value: &Value, params: &BTreeMap<String, String>) -> Value {
    match value {
        Value::String(s) => substitute_str(s, params),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, params)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, params)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute_str(s: &str, params: &BTreeMap<String, String>) -> Value {
    // ${{NAME}} as the whole string substitutes a non-string JSON value
    if let Some(key) = s
        .strip_prefix("${{")
        .and_then(|rest| rest.strip_suffix("}}"))
    {
        if let Some(raw) = params.get(key) {
            return serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
        }
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if params.contains_key(&after[..end]) => {
                out.push_str(&params[&after[..end]]);
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Value::String(out)
}

/// Looks up templates by name with the `-template` suffix fallback
pub struct TemplateResolver<'a> {
    accessor: &'a dyn ObjectAccessor,
    namespace: &'a str,
}

impl<'a> TemplateResolver<'a> {
    /// Create a resolver against the given template namespace
    pub fn new(accessor: &'a dyn ObjectAccessor, namespace: &'a str) -> Self {
        Self {
            accessor,
            namespace,
        }
    }

    /// Resolve a template by exact name, then by `<name>-template`.
    ///
    /// The suffixed lookup is skipped when the name already carries it.
    pub async fn resolve_template(&self, name: &str) -> Result<Option<TemplateObject>, Error> {
        if let Some(template) = self.accessor.get_template(self.namespace, name).await? {
            return Ok(Some(template));
        }

        let Some(fallback) = fallback_name(name) else {
            debug!(template = %name, namespace = %self.namespace, "template not found");
            return Ok(None);
        };

        let found = self.accessor.get_template(self.namespace, &fallback).await?;
        if found.is_none() {
            debug!(
                template = %name,
                fallback = %fallback,
                namespace = %self.namespace,
                "template not found under either name"
            );
        }
        Ok(found)
    }
}
