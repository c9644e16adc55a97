use crate::compute::ast::MathFn;
use crate::compute::bytecode::{OpCode, Program};
use crate::compute::kernel;
use crate::compute::ledger::ComputationError;
use smallvec::SmallVec;

/// Value stack. Typical engineering formulas stay well under 16 entries.
type Stack = SmallVec<[f64; 16]>;

pub struct Engine;

impl Engine {
    /// Executes the program against the slot values and returns the single
    /// value it leaves on the stack.
    ///
    /// `max_steps` bounds the number of instructions executed.
    pub fn run(program: &Program, slots: &[f64], max_steps: usize) -> Result<f64, ComputationError> {
        // 1. Security Barrier: Validate Memory Layout
        // Every index is checked once here, so the hot loop only fails on
        // arithmetic.
        Self::validate_memory_layout(program, slots)?;

        // 2. Hot Loop
        let mut stack = Stack::with_capacity(program.max_stack);
        let mut args: SmallVec<[f64; 4]> = SmallVec::new();
        let mut pc = 0;
        let mut steps = 0;

        while pc < program.ops.len() {
            steps += 1;
            if steps > max_steps {
                return Err(ComputationError::BudgetExceeded { limit: max_steps });
            }

            let op = program.ops[pc];
            let operand = program.operand[pc];
            pc += 1;

            match op {
                OpCode::Const => stack.push(program.constants[operand as usize]),
                OpCode::Load => stack.push(slots[operand as usize]),
                OpCode::Neg => {
                    let v = pop(&mut stack)?;
                    stack.push(-v);
                }
                OpCode::Call => {
                    let func = MathFn::from_code(operand).ok_or_else(|| ComputationError::Mismatch {
                        msg: format!("Unknown function code {}", operand),
                    })?;
                    let argc = program.aux[pc - 1] as usize;
                    if stack.len() < argc {
                        return Err(underflow());
                    }
                    let start = stack.len() - argc;
                    args.clear();
                    args.extend(stack.drain(start..));
                    stack.push(kernel::apply_function(func, &args)?);
                }
                OpCode::JumpIfFalse => {
                    if pop(&mut stack)? == 0.0 {
                        pc = operand as usize;
                    }
                }
                OpCode::Jump => pc = operand as usize,
                binary => {
                    let b = pop(&mut stack)?;
                    let a = pop(&mut stack)?;
                    stack.push(kernel::apply_binary(binary, a, b)?);
                }
            }
        }

        // 3. Exactly one value must remain
        match stack.as_slice() {
            [value] if value.is_finite() => Ok(*value),
            [_] => Err(ComputationError::NonFinite { op: "result" }),
            other => Err(ComputationError::Mismatch {
                msg: format!("Program left {} values on the stack", other.len()),
            }),
        }
    }

    /// Performs comprehensive bounds checking before execution starts.
    fn validate_memory_layout(program: &Program, slots: &[f64]) -> Result<(), ComputationError> {
        let op_count = program.ops.len();

        // 1. Parallel arrays must line up
        if program.operand.len() != op_count || program.aux.len() != op_count {
            return Err(ComputationError::Mismatch {
                msg: "Program arrays have different lengths".into(),
            });
        }

        // 2. Slot buffer must cover every load
        if slots.len() < program.slot_count {
            return Err(ComputationError::Mismatch {
                msg: format!("Ledger too small. Needed {} slots, got {}", program.slot_count, slots.len()),
            });
        }

        // 3. Operand ranges
        for (&op, &operand) in program.ops.iter().zip(&program.operand) {
            let in_range = match op {
                OpCode::Const => (operand as usize) < program.constants.len(),
                OpCode::Load => (operand as usize) < slots.len(),
                OpCode::Jump | OpCode::JumpIfFalse => (operand as usize) <= op_count,
                _ => true,
            };
            if !in_range {
                return Err(ComputationError::Mismatch {
                    msg: format!("Operand {} out of range for {:?}", operand, op),
                });
            }
        }

        Ok(())
    }
}

#[inline(always)]
fn pop(stack: &mut Stack) -> Result<f64, ComputationError> {
    stack.pop().ok_or_else(underflow)
}

fn underflow() -> ComputationError {
    ComputationError::Mismatch { msg: "Stack underflow".into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(ops: Vec<OpCode>, operand: Vec<u32>, constants: Vec<f64>, slot_count: usize) -> Program {
        let aux = vec![0; ops.len()];
        Program { ops, operand, aux, constants, max_stack: 4, slot_count }
    }

    #[test]
    fn test_engine_evaluates_postfix() {
        // slot0 * slot1
        let p = program(vec![OpCode::Load, OpCode::Load, OpCode::Mul], vec![0, 1, 0], vec![], 2);
        assert_eq!(Engine::run(&p, &[20.0, 100.0], 100), Ok(2000.0));
    }

    #[test]
    fn test_engine_detects_short_ledger() {
        let p = program(vec![OpCode::Load, OpCode::Load, OpCode::Mul], vec![0, 1, 0], vec![], 2);
        match Engine::run(&p, &[20.0], 100) {
            Err(ComputationError::Mismatch { msg }) => assert!(msg.contains("Ledger too small")),
            other => panic!("Wrong result: {:?}", other),
        }
    }

    #[test]
    fn test_engine_detects_bad_constant_index() {
        let p = program(vec![OpCode::Const], vec![3], vec![1.0], 0);
        let err = Engine::run(&p, &[], 100).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_engine_detects_stack_underflow() {
        let p = program(vec![OpCode::Const, OpCode::Add], vec![0, 0], vec![1.0], 0);
        assert_eq!(Engine::run(&p, &[], 100), Err(underflow()));
    }

    #[test]
    fn test_engine_enforces_step_budget() {
        // A backward jump loops forever without the budget.
        let p = program(vec![OpCode::Const, OpCode::Jump], vec![0, 0], vec![1.0], 0);
        assert_eq!(Engine::run(&p, &[], 50), Err(ComputationError::BudgetExceeded { limit: 50 }));
    }

    #[test]
    fn test_engine_rejects_leftover_values() {
        let p = program(vec![OpCode::Const, OpCode::Const], vec![0, 0], vec![1.0], 0);
        assert!(matches!(Engine::run(&p, &[], 100), Err(ComputationError::Mismatch { .. })));
    }
}
