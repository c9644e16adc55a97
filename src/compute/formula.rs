//! A formula definition compiled as a unit: its intermediates in order, then
//! the main expression.
use super::error::CompileError;
use super::ledger::{ComputationError, Ledger};
use super::parser::Scope;
use super::{CompiledExpression, Limits};
use crate::store::types::FormulaDefinition;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaCompileError {
    #[error("Invalid declaration: {0}")]
    Declaration(CompileError),
    #[error("Intermediate '{name}': {source}")]
    Intermediate { name: String, source: CompileError },
    #[error("Expression: {0}")]
    Expression(CompileError),
}

/// Output of one evaluation: the result and the filled ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub ledger: Ledger,
}

#[derive(Debug, Clone)]
pub struct CompiledFormula {
    definition: FormulaDefinition,
    intermediates: Vec<CompiledExpression>,
    expression: CompiledExpression,
    max_steps: usize,
}

impl CompiledFormula {
    /// Compiles every expression of the definition.
    ///
    /// Intermediate `i` sees the parameters and intermediates `0..i`; the main
    /// expression sees all of them.
    pub fn compile(definition: FormulaDefinition, limits: &Limits) -> Result<Self, FormulaCompileError> {
        let mut scope = Scope::new(definition.params.iter().map(|p| p.name.clone()))
            .map_err(FormulaCompileError::Declaration)?;

        let mut intermediates = Vec::with_capacity(definition.intermediates.len());
        for step in &definition.intermediates {
            let compiled = CompiledExpression::compile(&step.expression, &scope, limits).map_err(|source| {
                FormulaCompileError::Intermediate { name: step.name.clone(), source }
            })?;
            intermediates.push(compiled);
            scope.push(step.name.clone()).map_err(FormulaCompileError::Declaration)?;
        }

        let expression = CompiledExpression::compile(&definition.expression, &scope, limits)
            .map_err(FormulaCompileError::Expression)?;

        let mut used = vec![false; scope.len()];
        for slot in intermediates.iter().chain(std::iter::once(&expression)).flat_map(|e| e.referenced_slots()) {
            if let Some(u) = used.get_mut(*slot as usize) {
                *u = true;
            }
        }
        for (name, used) in scope.names().iter().zip(used) {
            if !used {
                tracing::debug!(formula = %definition.id, name = %name, "declared name is never referenced");
            }
        }

        Ok(Self { definition, intermediates, expression, max_steps: limits.max_steps })
    }

    pub fn definition(&self) -> &FormulaDefinition {
        &self.definition
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Evaluates against validated parameter values in declaration order.
    pub fn evaluate(&self, params: Vec<f64>) -> Result<Evaluation, ComputationError> {
        if params.len() != self.definition.params.len() {
            return Err(ComputationError::Mismatch {
                msg: format!("Expected {} parameters, got {}", self.definition.params.len(), params.len()),
            });
        }

        let mut ledger = Ledger::new(params);
        for (step, compiled) in self.definition.intermediates.iter().zip(&self.intermediates) {
            let value = compiled
                .evaluate(ledger.values(), self.max_steps)
                .map_err(|e| ComputationError::Intermediate { name: step.name.clone(), source: Box::new(e) })?;
            ledger.push(value);
        }

        let value = self.expression.evaluate(ledger.values(), self.max_steps)?;
        Ok(Evaluation { value, ledger })
    }
}
