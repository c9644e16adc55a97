//! Defines the error types for the validation module.

/// The specific category of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorType {
    /// No value was supplied, or the text did not parse as a finite number.
    NotANumber,
    /// The value is below the parameter's declared minimum.
    BelowMinimum,
    /// The value is above the parameter's declared maximum.
    AboveMaximum,
    /// A parameter name is not a plain ASCII identifier.
    InvalidName,
    /// A parameter name collides with the evaluator's math namespace.
    ReservedName,
    /// Two parameters (or a parameter and an intermediate) share a name.
    DuplicateName,
    /// `min` is greater than `max`.
    InvertedBounds,
    /// A required text field of a definition is empty.
    MissingField,
}

/// A structured, user-presentable validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The parameter (or definition field) the error is about.
    pub field: String,
    /// The category of the error.
    pub error_type: ValidationErrorType,
    /// A human-readable message naming the field and the violated rule.
    pub message: String,
}

impl ValidationError {
    pub fn new(error_type: ValidationErrorType, message: String) -> Self {
        Self { field: String::new(), error_type, message }
    }

    pub fn for_field(mut self, field: &str) -> Self {
        self.field = field.to_string();
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}
