//! The compute pipeline: Resolve, Validate, Evaluate, Respond.
use super::result::{ComputeError, ComputeRequest, ComputeResult, Step};
use crate::compute::{CompiledFormula, ComputationError};
use crate::store::FormulaRegistry;
use crate::validation::{RawValue, Validator};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task;

pub struct ComputeService {
    registry: Arc<FormulaRegistry>,
}

impl ComputeService {
    pub fn new(registry: Arc<FormulaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FormulaRegistry {
        &self.registry
    }

    /// Runs one request through the pipeline. Each stage short-circuits with
    /// its own [`ComputeError`] variant.
    pub async fn compute(&self, request: &ComputeRequest) -> Result<ComputeResult, ComputeError> {
        let formula = self.resolve(request).await?;
        Self::evaluate(&formula, &request.values)
    }

    /// Resolves every request in order, then evaluates the resolved ones in
    /// parallel. Results line up with `requests`.
    pub async fn compute_batch(&self, requests: &[ComputeRequest]) -> Vec<Result<ComputeResult, ComputeError>> {
        // 1. Resolve (async, sequential; the custom cache absorbs repeats)
        let mut resolved = Vec::with_capacity(requests.len());
        for request in requests {
            resolved.push(self.resolve(request).await);
        }

        // 2. Validate + Evaluate (pure, parallel, off the async workers)
        let jobs: Vec<_> = resolved.into_iter().zip(requests.iter().map(|r| r.values.clone())).collect();
        let count = jobs.len();
        let outcome = task::spawn_blocking(move || {
            jobs.into_par_iter()
                .map(|(formula, values)| formula.and_then(|f| Self::evaluate(&f, &values)))
                .collect::<Vec<_>>()
        })
        .await;

        match outcome {
            Ok(results) => results,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::error!(error = %e, "batch evaluation task was cancelled");
                let cancelled = ComputationError::Mismatch { msg: "Batch evaluation was cancelled".into() };
                vec![Err(ComputeError::EvaluationError(cancelled)); count]
            }
        }
    }

    async fn resolve(&self, request: &ComputeRequest) -> Result<Arc<CompiledFormula>, ComputeError> {
        let id = request.block_id.trim();
        let scope = request.scope.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match self.registry.resolve(id, scope).await {
            Some(Ok(formula)) => Ok(formula),
            Some(Err(e)) => {
                tracing::warn!(id = %id, error = %e, "formula resolved but does not compile");
                Err(ComputeError::CompilationError(e))
            }
            None => {
                tracing::debug!(id = %id, scope = ?scope, "unknown formula");
                Err(ComputeError::UnknownFormula { id: id.to_string() })
            }
        }
    }

    /// Validates raw values against the formula's parameters and evaluates it.
    pub fn evaluate(formula: &CompiledFormula, values: &HashMap<String, RawValue>) -> Result<ComputeResult, ComputeError> {
        let def = formula.definition();

        // 1. Validate
        let bound = Validator::new(&def.params).validate(values).map_err(ComputeError::InvalidParameters)?;

        // 2. Evaluate
        let evaluation = formula.evaluate(bound).map_err(|e| {
            tracing::debug!(id = %def.id, error = %e, "evaluation failed");
            ComputeError::EvaluationError(e)
        })?;

        // 3. Respond: parameters, then intermediates, then the result
        let params = def.params.iter().zip(evaluation.ledger.params()).map(|(p, &value)| Step {
            label: p.label.clone(),
            value,
            unit: p.unit.clone(),
        });
        let intermediates = def.intermediates.iter().zip(evaluation.ledger.intermediates()).map(|(i, &value)| Step {
            label: i.label.clone(),
            value,
            unit: i.unit.clone(),
        });

        Ok(ComputeResult {
            result: Step { label: def.result_label.clone(), value: evaluation.value, unit: def.result_unit.clone() },
            steps: params.chain(intermediates).collect(),
            result_digits: def.result_digits,
        })
    }
}
