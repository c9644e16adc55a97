//! Scalar arithmetic with domain checks.
//!
//! Every operation either returns a finite value or a [`ComputationError`];
//! NaN and infinities never escape into the stack.
use super::ast::MathFn;
use super::bytecode::OpCode;
use super::ledger::ComputationError;

#[inline(always)]
fn finite(value: f64, op: &'static str) -> Result<f64, ComputationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ComputationError::NonFinite { op })
    }
}

/// NaN from a finite input means the input was outside the domain.
#[inline(always)]
fn checked(value: f64, func: &'static str, input: f64) -> Result<f64, ComputationError> {
    if value.is_nan() {
        Err(ComputationError::Domain { func, value: input })
    } else {
        finite(value, func)
    }
}

#[inline(always)]
fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub fn apply_binary(op: OpCode, a: f64, b: f64) -> Result<f64, ComputationError> {
    match op {
        OpCode::Add => finite(a + b, "+"),
        OpCode::Sub => finite(a - b, "-"),
        OpCode::Mul => finite(a * b, "*"),
        OpCode::Div => {
            if b == 0.0 {
                return Err(ComputationError::DivisionByZero);
            }
            finite(a / b, "/")
        }
        OpCode::Rem => {
            if b == 0.0 {
                return Err(ComputationError::DivisionByZero);
            }
            finite(a % b, "%")
        }
        OpCode::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(ComputationError::DivisionByZero);
            }
            checked(a.powf(b), "pow", a)
        }
        OpCode::Lt => Ok(truth(a < b)),
        OpCode::Le => Ok(truth(a <= b)),
        OpCode::Gt => Ok(truth(a > b)),
        OpCode::Ge => Ok(truth(a >= b)),
        OpCode::Eq => Ok(truth(a == b)),
        OpCode::Ne => Ok(truth(a != b)),
        other => Err(ComputationError::Mismatch { msg: format!("{:?} is not a binary operator", other) }),
    }
}

/// Rounds half toward positive infinity, matching the usual calculator `round`.
fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

pub fn apply_function(func: MathFn, args: &[f64]) -> Result<f64, ComputationError> {
    let name = func.name();
    let x = match args.first() {
        Some(&x) => x,
        None => {
            return Err(ComputationError::Mismatch { msg: format!("{} called without arguments", name) });
        }
    };

    match func {
        MathFn::Abs => Ok(x.abs()),
        MathFn::Sqrt => {
            if x < 0.0 {
                return Err(ComputationError::Domain { func: name, value: x });
            }
            Ok(x.sqrt())
        }
        MathFn::Cbrt => Ok(x.cbrt()),
        MathFn::Pow => apply_binary(OpCode::Pow, x, second(args, name)?),
        MathFn::Exp => finite(x.exp(), name),
        MathFn::Ln | MathFn::Log10 | MathFn::Log2 => {
            if x <= 0.0 {
                return Err(ComputationError::Domain { func: name, value: x });
            }
            Ok(match func {
                MathFn::Ln => x.ln(),
                MathFn::Log10 => x.log10(),
                _ => x.log2(),
            })
        }
        MathFn::Sin => checked(x.sin(), name, x),
        MathFn::Cos => checked(x.cos(), name, x),
        MathFn::Tan => checked(x.tan(), name, x),
        MathFn::Asin | MathFn::Acos => {
            if !(-1.0..=1.0).contains(&x) {
                return Err(ComputationError::Domain { func: name, value: x });
            }
            Ok(if func == MathFn::Asin { x.asin() } else { x.acos() })
        }
        MathFn::Atan => Ok(x.atan()),
        MathFn::Atan2 => Ok(x.atan2(second(args, name)?)),
        MathFn::Sinh => finite(x.sinh(), name),
        MathFn::Cosh => finite(x.cosh(), name),
        MathFn::Tanh => Ok(x.tanh()),
        MathFn::Floor => Ok(x.floor()),
        MathFn::Ceil => Ok(x.ceil()),
        MathFn::Round => Ok(round_half_up(x)),
        MathFn::Trunc => Ok(x.trunc()),
        MathFn::Sign => Ok(if x == 0.0 { 0.0 } else { x.signum() }),
        MathFn::Min => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        MathFn::Max => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        MathFn::Hypot => finite(args.iter().fold(0.0f64, |acc, v| acc.hypot(*v)), name),
    }
}

fn second(args: &[f64], name: &'static str) -> Result<f64, ComputationError> {
    args.get(1)
        .copied()
        .ok_or_else(|| ComputationError::Mismatch { msg: format!("{} needs two arguments", name) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_division_by_zero() {
        assert_eq!(apply_binary(OpCode::Div, 1.0, 0.0), Err(ComputationError::DivisionByZero));
        assert_eq!(apply_binary(OpCode::Rem, 1.0, -0.0), Err(ComputationError::DivisionByZero));
        assert_eq!(apply_binary(OpCode::Pow, 0.0, -1.0), Err(ComputationError::DivisionByZero));
    }

    #[test]
    fn test_overflow_is_non_finite() {
        assert!(matches!(apply_binary(OpCode::Mul, 1e200, 1e200), Err(ComputationError::NonFinite { .. })));
        assert!(matches!(apply_function(MathFn::Exp, &[1000.0]), Err(ComputationError::NonFinite { .. })));
    }

    #[rstest]
    #[case(MathFn::Sqrt, -1.0)]
    #[case(MathFn::Ln, 0.0)]
    #[case(MathFn::Log10, -5.0)]
    #[case(MathFn::Asin, 1.5)]
    #[case(MathFn::Acos, -2.0)]
    fn test_domain_errors(#[case] func: MathFn, #[case] x: f64) {
        assert!(matches!(apply_function(func, &[x]), Err(ComputationError::Domain { .. })));
    }

    #[test]
    fn test_fractional_power_of_negative_is_domain_error() {
        assert!(matches!(apply_binary(OpCode::Pow, -8.0, 1.0 / 3.0), Err(ComputationError::Domain { .. })));
        assert_eq!(apply_binary(OpCode::Pow, -2.0, 3.0), Ok(-8.0));
    }

    #[rstest]
    #[case(2.5, 3.0)]
    #[case(-2.5, -2.0)]
    #[case(0.49999999999999994, 0.0)]
    #[case(-0.4, 0.0)]
    fn test_round_half_up(#[case] x: f64, #[case] expected: f64) {
        assert_eq!(apply_function(MathFn::Round, &[x]), Ok(expected));
    }

    #[test]
    fn test_comparisons_yield_one_or_zero() {
        assert_eq!(apply_binary(OpCode::Gt, 2.0, 1.0), Ok(1.0));
        assert_eq!(apply_binary(OpCode::Eq, 2.0, 1.0), Ok(0.0));
    }

    #[test]
    fn test_variadic_functions() {
        assert_eq!(apply_function(MathFn::Max, &[1.0, 7.0, 3.0]), Ok(7.0));
        assert_eq!(apply_function(MathFn::Min, &[4.0]), Ok(4.0));
        assert_eq!(apply_function(MathFn::Hypot, &[3.0, 4.0]), Ok(5.0));
    }
}
