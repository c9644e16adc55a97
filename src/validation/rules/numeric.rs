//! Rule for turning raw user input into a bounded, finite number.
use crate::validation::error::{ValidationError, ValidationErrorType};
use serde::{Deserialize, Serialize};

/// Inclusive bounds declared on a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// A value as supplied by a client: JSON numbers pass through, text is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Parses user text into a finite number.
///
/// Surrounding whitespace is ignored and the first comma is read as a decimal
/// separator (`"2,5"` -> `2.5`). Empty input, garbage, `inf` and `NaN` all
/// yield `None`.
pub fn parse_finite_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replacen(',', ".", 1);
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validates a single required number. Pure and total.
pub fn validate_required_number(
    label: &str,
    raw: &str,
    bounds: Bounds,
) -> Result<f64, ValidationError> {
    match parse_finite_number(raw) {
        Some(value) => check_bounds(label, value, bounds),
        None => Err(not_a_number(label)),
    }
}

/// Validates a value that may already be numeric.
pub fn validate_raw_value(
    label: &str,
    raw: Option<&RawValue>,
    bounds: Bounds,
) -> Result<f64, ValidationError> {
    match raw {
        Some(RawValue::Number(v)) if v.is_finite() => check_bounds(label, *v, bounds),
        Some(RawValue::Text(text)) => validate_required_number(label, text, bounds),
        _ => Err(not_a_number(label)),
    }
}

pub fn check_bounds(label: &str, value: f64, bounds: Bounds) -> Result<f64, ValidationError> {
    if let Some(min) = bounds.min {
        if value < min {
            return Err(ValidationError::new(
                ValidationErrorType::BelowMinimum,
                format!("Field '{}' must be >= {}.", label, min),
            ));
        }
    }
    if let Some(max) = bounds.max {
        if value > max {
            return Err(ValidationError::new(
                ValidationErrorType::AboveMaximum,
                format!("Field '{}' must be <= {}.", label, max),
            ));
        }
    }
    Ok(value)
}

fn not_a_number(label: &str) -> ValidationError {
    ValidationError::new(
        ValidationErrorType::NotANumber,
        format!("Field '{}' is required and must be a number.", label),
    )
}
