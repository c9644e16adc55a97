use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Math error: {func}({value}) is undefined")]
    Domain { func: &'static str, value: f64 },
    #[error("Math error: {op} produced a non-finite result")]
    NonFinite { op: &'static str },
    #[error("Evaluation exceeded the limit of {limit} steps")]
    BudgetExceeded { limit: usize },
    #[error("Structural mismatch: {msg}")]
    Mismatch { msg: String },
    #[error("Intermediate '{name}' failed: {source}")]
    Intermediate { name: String, source: Box<ComputationError> },
}

/// Slot storage for one evaluation.
///
/// Slots `0..P` hold the validated parameters in declaration order. Each
/// intermediate appends its result, so later expressions can read it by slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    values: Vec<f64>,
    param_count: usize,
}

impl Ledger {
    pub fn new(params: Vec<f64>) -> Self {
        let param_count = params.len();
        Self { values: params, param_count }
    }

    pub fn push(&mut self, value: f64) -> u32 {
        self.values.push(value);
        (self.values.len() - 1) as u32
    }

    pub fn get(&self, slot: u32) -> Option<f64> {
        self.values.get(slot as usize).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn params(&self) -> &[f64] {
        &self.values[..self.param_count]
    }

    pub fn intermediates(&self) -> &[f64] {
        &self.values[self.param_count..]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
