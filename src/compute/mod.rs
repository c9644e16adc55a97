//! The sandboxed expression evaluator.
//!
//! Expressions are compiled once (lex, parse and resolve, lower to bytecode)
//! and then executed by a small stack machine against bound values. Every
//! identifier is checked against the parameter scope and the math whitelist
//! before anything runs.

pub use self::ast::is_reserved_name;
pub use self::error::CompileError;
pub use self::formula::{CompiledFormula, Evaluation, FormulaCompileError};
pub use self::ledger::{ComputationError, Ledger};
pub use self::parser::Scope;

use self::bytecode::{Compiler, Program};
use self::engine::Engine;
use serde::{Deserialize, Serialize};

/// Hard limits applied at compile time (length, depth, nodes) and at run time (steps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    pub max_length: usize,
    pub max_depth: usize,
    pub max_nodes: usize,
    pub max_steps: usize,
}

impl Limits {
    /// Highest limits a configuration may ask for. Compiling and dropping an
    /// expression tree recurses once per level, and a tree can be as tall as
    /// it has nodes.
    pub const CEILING: Limits = Limits { max_length: 20_000, max_depth: 256, max_nodes: 5_000, max_steps: 1_000_000 };

    /// Names the first limit that is zero or above [`Limits::CEILING`].
    pub fn out_of_range(&self) -> Option<(&'static str, usize, usize)> {
        let c = &Self::CEILING;
        [
            ("maxLength", self.max_length, c.max_length),
            ("maxDepth", self.max_depth, c.max_depth),
            ("maxNodes", self.max_nodes, c.max_nodes),
            ("maxSteps", self.max_steps, c.max_steps),
        ]
        .into_iter()
        .find(|&(_, value, max)| value == 0 || value > max)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_length: 2_000, max_depth: 64, max_nodes: 1_000, max_steps: 10_000 }
    }
}

/// A single expression, compiled against a fixed scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    program: Program,
    referenced: Vec<u32>,
}

impl CompiledExpression {
    pub fn compile(source: &str, scope: &Scope, limits: &Limits) -> Result<Self, CompileError> {
        let expr = parser::parse(source, scope, limits)?;
        let program = Compiler::compile(&expr);
        let referenced = program.referenced_slots();
        Ok(Self { source: source.to_string(), program, referenced })
    }

    /// Runs the program. `slots` must cover every slot of the scope it was compiled against.
    pub fn evaluate(&self, slots: &[f64], max_steps: usize) -> Result<f64, ComputationError> {
        Engine::run(&self.program, slots, max_steps)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn referenced_slots(&self) -> &[u32] {
        &self.referenced
    }
}

/// Compiles an expression over the given parameter names.
pub fn compile<S: AsRef<str>>(source: &str, names: &[S], limits: &Limits) -> Result<CompiledExpression, CompileError> {
    let scope = Scope::new(names.iter().map(|n| n.as_ref().to_string()))?;
    CompiledExpression::compile(source, &scope, limits)
}

// --- MODULE DECLARATIONS ---
mod ast;
mod bytecode;
mod engine;
mod error;
mod formula;
mod kernel;
mod ledger;
mod lexer;
mod parser;
