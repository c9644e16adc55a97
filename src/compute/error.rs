//! Errors raised while turning expression text into a program.
use thiserror::Error;

/// Compile-time rejection of an expression. Positions are character offsets.
///
/// Nothing that produces one of these has been executed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Expression is empty")]
    Empty,
    #[error("Expression is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("Unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("String literals are not allowed (at {pos})")]
    StringLiteral { pos: usize },
    #[error("Assignment is not allowed (at {pos})")]
    Assignment { pos: usize },
    #[error("Invalid number '{text}' at {pos}")]
    InvalidNumber { text: String, pos: usize },
    #[error("Expected {expected}, found '{found}' at {pos}")]
    UnexpectedToken { found: String, expected: &'static str, pos: usize },
    #[error("Expected {expected}, found end of expression")]
    UnexpectedEnd { expected: &'static str },
    #[error("Unknown identifier '{name}' at {pos}")]
    UnknownIdentifier { name: String, pos: usize },
    #[error("Unknown function '{name}' at {pos}")]
    UnknownFunction { name: String, pos: usize },
    #[error("Access to '{path}' is not allowed (at {pos})")]
    ForbiddenAccess { path: String, pos: usize },
    #[error("'{name}' is not a function (at {pos})")]
    NotCallable { name: String, pos: usize },
    #[error("Function '{name}' must be called (at {pos})")]
    NotAValue { name: String, pos: usize },
    #[error("Function '{name}' takes {expected} argument(s), got {found} (at {pos})")]
    Arity { name: &'static str, expected: String, found: usize, pos: usize },
    #[error("Expression nesting exceeds the limit of {max}")]
    TooDeep { max: usize },
    #[error("Expression exceeds the limit of {max} nodes")]
    TooManyNodes { max: usize },
    #[error("Name '{name}' is reserved by the math namespace")]
    ReservedName { name: String },
    #[error("Name '{name}' is bound more than once")]
    DuplicateName { name: String },
}
