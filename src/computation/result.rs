use crate::compute::{ComputationError, FormulaCompileError};
use crate::validation::{RawValue, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// One evaluation request: which formula, which values, which document scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeRequest {
    #[serde(default)]
    pub block_id: String,
    #[serde(default)]
    pub values: HashMap<String, RawValue>,
    #[serde(default, alias = "spCode", skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl ComputeRequest {
    pub fn new(block_id: &str, scope: Option<&str>) -> Self {
        Self { block_id: block_id.to_string(), values: HashMap::new(), scope: scope.map(str::to_string) }
    }

    pub fn with_value(mut self, name: &str, value: impl Into<RawValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }
}

/// A labelled value: a bound parameter, an intermediate, or the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeResult {
    pub result: Step,
    pub steps: Vec<Step>,
    /// Display precision the formula asks for on its result.
    #[serde(skip)]
    pub result_digits: Option<u32>,
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ")
}

/// Failure of one stage of the compute pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("Unknown formula '{id}'")]
    UnknownFormula { id: String },
    #[error("Invalid parameters: {}", join_messages(.0))]
    InvalidParameters(Vec<ValidationError>),
    #[error("Formula does not compile: {0}")]
    CompilationError(FormulaCompileError),
    #[error("Evaluation failed: {0}")]
    EvaluationError(ComputationError),
}

impl ComputeError {
    /// Stable code for the wire contract.
    pub fn code(&self) -> &'static str {
        match self {
            ComputeError::UnknownFormula { .. } => "unknown_formula",
            _ => "compute_failed",
        }
    }

    /// User-presentable details; one message per invalid parameter.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ComputeError::InvalidParameters(errors) => errors.iter().map(|e| e.message.clone()).collect(),
            other => vec![other.to_string()],
        }
    }
}
