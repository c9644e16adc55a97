//! Outer surfaces of the library.
pub mod json;
