//! Core of a building-code document tool.
//!
//! Two independent halves live here:
//!
//! - [`clause`]: dotted clause numbers, their total order, and assembly of flat
//!   clause records into a tree.
//! - the calculator: a registry of built-in and per-scope custom formulas
//!   ([`store`]), input validation ([`validation`]), a sandboxed expression
//!   evaluator ([`compute`]) and the request pipeline tying them together
//!   ([`computation`]), with a JSON facade in [`bindings`].

pub use clause::{ClauseId, ClauseNode, ClauseRecord, TreeError};
pub use computation::{ComputeError, ComputeRequest, ComputeResult, ComputeService, Step};
pub use compute::Limits;
pub use config::{ConfigError, EngineConfig};
pub use store::{FormulaDefinition, FormulaRegistry};

// --- MODULE DECLARATIONS ---
pub mod bindings;
pub mod clause;
pub mod computation;
pub mod compute;
pub mod config;
pub mod display;
pub mod store;
pub mod validation;
