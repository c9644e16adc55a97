//! Formula definitions and where they come from: the built-in table, custom
//! formulas behind an async source, and the authoring pipeline that admits
//! new ones.
pub mod types;

mod authoring;
mod builtin;
mod cache;
mod custom;
mod registry;

pub use authoring::{
    dry_run, generate_formula, parse_generated_formula, prepare_formula, AuthoringError, FormulaDraft,
    FormulaGenerator, DEFAULT_RESULT_LABEL,
};
pub use builtin::builtin_definitions;
pub use cache::{CompiledEntry, ScopedFormulaCache};
pub use custom::{CustomFormulaSource, InMemoryFormulaStore, StoreError};
pub use registry::FormulaRegistry;
pub use types::{CustomFormulaRecord, FormulaDefinition, Intermediate, Parameter};
