//! Runtime binding resolution
//!
//! An InferenceService names its ServingRuntime in one of two mutually
//! exclusive places. The model-scoped location wins when both happen to be
//! populated, matching how KServe itself reads an InferenceService.

use std::fmt;
use std::str::FromStr;

use runway_common::Error;
use serde::Serialize;

use crate::workload::Workload;

/// Structural location of a runtime binding inside an InferenceService
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BindingPath {
    /// `spec.predictor.model.runtime`
    ModelScoped,
    /// `spec.predictor.runtime`
    PredictorScoped,
}

impl BindingPath {
    /// JSON pointer of the binding field, also the on-disk ledger form
    pub fn json_pointer(&self) -> &'static str {
        match self {
            Self::ModelScoped => "/spec/predictor/model/runtime",
            Self::PredictorScoped => "/spec/predictor/runtime",
        }
    }

    /// JSON pointer split into tokens, for building patch paths
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            Self::ModelScoped => &["spec", "predictor", "model", "runtime"],
            Self::PredictorScoped => &["spec", "predictor", "runtime"],
        }
    }
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_pointer())
    }
}

impl FromStr for BindingPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "/spec/predictor/model/runtime" => Ok(Self::ModelScoped),
            "/spec/predictor/runtime" => Ok(Self::PredictorScoped),
            other => Err(Error::validation(format!(
                "unknown runtime binding path '{}'",
                other
            ))),
        }
    }
}

/// The runtime an InferenceService is currently bound to, tagged by location
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RuntimeBinding {
    /// Bound through `spec.predictor.model.runtime`
    ModelScoped(String),
    /// Bound through `spec.predictor.runtime`
    PredictorScoped(String),
}

impl RuntimeBinding {
    /// Build a binding for the given path
    pub fn new(path: BindingPath, runtime: impl Into<String>) -> Self {
        match path {
            BindingPath::ModelScoped => Self::ModelScoped(runtime.into()),
            BindingPath::PredictorScoped => Self::PredictorScoped(runtime.into()),
        }
    }

    /// Where the binding lives
    pub fn path(&self) -> BindingPath {
        match self {
            Self::ModelScoped(_) => BindingPath::ModelScoped,
            Self::PredictorScoped(_) => BindingPath::PredictorScoped,
        }
    }

    /// Name of the bound runtime
    pub fn runtime(&self) -> &str {
        match self {
            Self::ModelScoped(name) | Self::PredictorScoped(name) => name,
        }
    }
}

/// Determine the currently bound runtime of a workload.
///
/// Checks the model-scoped path first, then the predictor-scoped one.
/// Returns `None` when neither is set.
pub fn resolve_binding(workload: &Workload) -> Option<RuntimeBinding> {
    if let Some(name) = &workload.model_runtime {
        return Some(RuntimeBinding::ModelScoped(name.clone()));
    }
    workload
        .predictor_runtime
        .as_ref()
        .map(|name| RuntimeBinding::PredictorScoped(name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::WorkloadRef;

    fn workload(model: Option<&str>, predictor: Option<&str>) -> Workload {
        Workload {
            id: WorkloadRef::new("demo", "w"),
            model_runtime: model.map(str::to_string),
            predictor_runtime: predictor.map(str::to_string),
        }
    }

    #[test]
    fn model_scoped_is_checked_first() {
        let binding = resolve_binding(&workload(Some("a"), Some("b"))).unwrap();
        assert_eq!(binding, RuntimeBinding::ModelScoped("a".to_string()));
    }

    #[test]
    fn falls_back_to_predictor_scoped() {
        let binding = resolve_binding(&workload(None, Some("ovms"))).unwrap();
        assert_eq!(binding.path(), BindingPath::PredictorScoped);
        assert_eq!(binding.runtime(), "ovms");
    }

    #[test]
    fn unbound_workload_resolves_to_none() {
        assert_eq!(resolve_binding(&workload(None, None)), None);
    }

    #[test]
    fn binding_path_round_trips_through_ledger_form() {
        for path in [BindingPath::ModelScoped, BindingPath::PredictorScoped] {
            assert_eq!(path.to_string().parse::<BindingPath>().unwrap(), path);
        }
        assert!("/spec/predictor/model".parse::<BindingPath>().is_err());
    }

    #[test]
    fn tokens_match_pointer() {
        for path in [BindingPath::ModelScoped, BindingPath::PredictorScoped] {
            assert_eq!(format!("/{}", path.tokens().join("/")), path.json_pointer());
        }
    }
}
