//! Runs compute requests end to end against a formula registry.
pub mod result;
pub mod service;

pub use result::{ComputeError, ComputeRequest, ComputeResult, Step};
pub use service::ComputeService;
