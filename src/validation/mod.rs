//! Parameter schema checks and input validation.
//!
//! Raw client input is normalized into finite numbers here, before any
//! expression is evaluated. All errors are collected rather than returned on
//! the first failure, like a linter.

pub use self::error::{ValidationError, ValidationErrorType};
pub use self::rules::numeric::{parse_finite_number, validate_required_number, Bounds, RawValue};
pub use self::rules::schema::is_identifier;
pub use self::validator::Validator;

pub(crate) use self::rules::schema::check_declarations;

// --- MODULE DECLARATIONS ---
mod error;
mod validator;
mod rules {
    pub mod numeric;
    pub mod schema;
}
