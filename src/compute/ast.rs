//! The restricted expression tree and the whitelisted math namespace.
//!
//! Identifiers are resolved while parsing, so a tree only ever contains
//! literals, ledger slots, whitelisted functions and operators.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// A bound value: a parameter or an earlier intermediate.
    Slot(u32),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(MathFn, Vec<Expr>),
    /// `cond ? then : otherwise`; any non-zero condition is true.
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            Arity::Exactly(k) => k.to_string(),
            Arity::AtLeast(k) => format!("at least {}", k),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MathFn {
    Abs,
    Sqrt,
    Cbrt,
    Pow,
    Exp,
    Ln,
    Log10,
    Log2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sign,
    Min,
    Max,
    Hypot,
}

/// Name table. `log` is the natural logarithm, as in `Math.log`.
const FUNCTIONS: &[(&str, MathFn)] = &[
    ("abs", MathFn::Abs),
    ("sqrt", MathFn::Sqrt),
    ("cbrt", MathFn::Cbrt),
    ("pow", MathFn::Pow),
    ("exp", MathFn::Exp),
    ("log", MathFn::Ln),
    ("ln", MathFn::Ln),
    ("log10", MathFn::Log10),
    ("log2", MathFn::Log2),
    ("sin", MathFn::Sin),
    ("cos", MathFn::Cos),
    ("tan", MathFn::Tan),
    ("asin", MathFn::Asin),
    ("acos", MathFn::Acos),
    ("atan", MathFn::Atan),
    ("atan2", MathFn::Atan2),
    ("sinh", MathFn::Sinh),
    ("cosh", MathFn::Cosh),
    ("tanh", MathFn::Tanh),
    ("floor", MathFn::Floor),
    ("ceil", MathFn::Ceil),
    ("round", MathFn::Round),
    ("trunc", MathFn::Trunc),
    ("sign", MathFn::Sign),
    ("min", MathFn::Min),
    ("max", MathFn::Max),
    ("hypot", MathFn::Hypot),
];

/// Constants reachable through `Math.` (`Math.PI`) and bare (`PI`).
const CONSTANTS: &[(&str, f64)] = &[
    ("PI", std::f64::consts::PI),
    ("E", std::f64::consts::E),
    ("LN2", std::f64::consts::LN_2),
    ("LN10", std::f64::consts::LN_10),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("SQRT2", std::f64::consts::SQRT_2),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
];

/// Constants only reachable bare.
const BARE_CONSTANTS: &[(&str, f64)] = &[
    ("pi", std::f64::consts::PI),
    ("π", std::f64::consts::PI),
    ("e", std::f64::consts::E),
];

/// Namespace roots: `values.<param>` and `Math.<member>`.
pub const VALUES_NAMESPACE: &str = "values";
pub const MATH_NAMESPACE: &str = "Math";

impl MathFn {
    pub fn lookup(name: &str) -> Option<MathFn> {
        FUNCTIONS.iter().find(|(n, _)| *n == name).map(|&(_, f)| f)
    }

    pub fn name(&self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|(_, f)| f == self)
            .map(|&(n, _)| n)
            .unwrap_or("?")
    }

    pub fn arity(&self) -> Arity {
        match self {
            MathFn::Pow | MathFn::Atan2 => Arity::Exactly(2),
            MathFn::Min | MathFn::Max | MathFn::Hypot => Arity::AtLeast(1),
            _ => Arity::Exactly(1),
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<MathFn> {
        FUNCTIONS.iter().map(|&(_, f)| f).find(|f| *f as u32 == code)
    }
}

pub fn lookup_constant(name: &str, namespaced: bool) -> Option<f64> {
    let found = CONSTANTS.iter().find(|(n, _)| *n == name).map(|&(_, v)| v);
    if namespaced {
        return found;
    }
    found.or_else(|| BARE_CONSTANTS.iter().find(|(n, _)| *n == name).map(|&(_, v)| v))
}

/// True for every name the evaluator claims for itself. Parameter and
/// intermediate names may not use these.
pub fn is_reserved_name(name: &str) -> bool {
    name == VALUES_NAMESPACE
        || name == MATH_NAMESPACE
        || MathFn::lookup(name).is_some()
        || lookup_constant(name, false).is_some()
}
