use super::ast::{BinaryOp, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Const = 0,
    Load = 1,
    Neg = 2,
    Add = 3,
    Sub = 4,
    Mul = 5,
    Div = 6,
    Rem = 7,
    Pow = 8,
    Lt = 9,
    Le = 10,
    Gt = 11,
    Ge = 12,
    Eq = 13,
    Ne = 14,
    Call = 15,
    JumpIfFalse = 16,
    Jump = 17,
}

impl From<BinaryOp> for OpCode {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => OpCode::Add,
            BinaryOp::Sub => OpCode::Sub,
            BinaryOp::Mul => OpCode::Mul,
            BinaryOp::Div => OpCode::Div,
            BinaryOp::Rem => OpCode::Rem,
            BinaryOp::Pow => OpCode::Pow,
            BinaryOp::Lt => OpCode::Lt,
            BinaryOp::Le => OpCode::Le,
            BinaryOp::Gt => OpCode::Gt,
            BinaryOp::Ge => OpCode::Ge,
            BinaryOp::Eq => OpCode::Eq,
            BinaryOp::Ne => OpCode::Ne,
        }
    }
}

/// Structure-of-Arrays (SoA) layout for the execution tape.
/// **Optimization:**
/// 1. An expression is compiled once and evaluated many times, so all name
///    resolution happens here and the engine only sees indices.
/// 2. `max_stack` is known up front, so the engine sizes its stack once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    // Parallel Arrays
    pub ops: Vec<OpCode>,
    pub operand: Vec<u32>, // Const: constant index, Load: slot, Call: function code, Jump*: target.
    pub aux: Vec<u32>,     // Call: argument count, 0 if unused.

    pub constants: Vec<f64>,
    pub max_stack: usize,
    /// Highest slot read plus one.
    pub slot_count: usize,
}

impl Program {
    /// Slots the program reads, sorted and deduplicated.
    pub fn referenced_slots(&self) -> Vec<u32> {
        let mut slots: Vec<u32> = self
            .ops
            .iter()
            .zip(&self.operand)
            .filter(|(op, _)| **op == OpCode::Load)
            .map(|(_, &slot)| slot)
            .collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }
}

#[derive(Default)]
pub struct Compiler {
    program: Program,
    depth: usize,
}

impl Compiler {
    /// Lowers a resolved expression tree into a linear program.
    ///
    /// The tree has already passed the parser's node limit, which also bounds
    /// its height (left-nested operator chains included), so the recursion
    /// here is bounded.
    pub fn compile(expr: &Expr) -> Program {
        let mut compiler = Compiler::default();
        compiler.lower(expr);
        compiler.program
    }

    fn emit(&mut self, op: OpCode, operand: u32, aux: u32) -> usize {
        self.program.ops.push(op);
        self.program.operand.push(operand);
        self.program.aux.push(aux);
        self.program.ops.len() - 1
    }

    fn push_stack(&mut self, n: usize) {
        self.depth += n;
        self.program.max_stack = self.program.max_stack.max(self.depth);
    }

    fn pop_stack(&mut self, n: usize) {
        self.depth -= n;
    }

    fn lower(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(v) => {
                let idx = match self.program.constants.iter().position(|c| c.to_bits() == v.to_bits()) {
                    Some(i) => i,
                    None => {
                        self.program.constants.push(*v);
                        self.program.constants.len() - 1
                    }
                };
                self.emit(OpCode::Const, idx as u32, 0);
                self.push_stack(1);
            }
            Expr::Slot(slot) => {
                self.emit(OpCode::Load, *slot, 0);
                self.program.slot_count = self.program.slot_count.max(*slot as usize + 1);
                self.push_stack(1);
            }
            Expr::Neg(inner) => {
                self.lower(inner);
                self.emit(OpCode::Neg, 0, 0);
            }
            Expr::Binary(op, lhs, rhs) => {
                self.lower(lhs);
                self.lower(rhs);
                self.emit((*op).into(), 0, 0);
                self.pop_stack(1);
            }
            Expr::Call(func, args) => {
                for arg in args {
                    self.lower(arg);
                }
                self.emit(OpCode::Call, *func as u32, args.len() as u32);
                // n arguments in, one result out
                self.pop_stack(args.len());
                self.push_stack(1);
            }
            Expr::Conditional(cond, then, otherwise) => {
                // 1. Condition, consumed by the branch
                self.lower(cond);
                let branch = self.emit(OpCode::JumpIfFalse, 0, 0);
                self.pop_stack(1);

                // 2. Then arm, then skip the else arm
                self.lower(then);
                let skip = self.emit(OpCode::Jump, 0, 0);
                self.pop_stack(1);

                // 3. Else arm; both arms leave exactly one value
                self.program.operand[branch] = self.program.ops.len() as u32;
                self.lower(otherwise);
                self.program.operand[skip] = self.program.ops.len() as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ast::MathFn;

    fn bin(op: BinaryOp, a: Expr, b: Expr) -> Expr {
        Expr::Binary(op, Box::new(a), Box::new(b))
    }

    #[test]
    fn test_postfix_layout() {
        // (slot0 * 1000) / slot1
        let expr = bin(BinaryOp::Div, bin(BinaryOp::Mul, Expr::Slot(0), Expr::Number(1000.0)), Expr::Slot(1));
        let program = Compiler::compile(&expr);

        assert_eq!(program.ops, vec![OpCode::Load, OpCode::Const, OpCode::Mul, OpCode::Load, OpCode::Div]);
        assert_eq!(program.operand, vec![0, 0, 0, 1, 0]);
        assert_eq!(program.constants, vec![1000.0]);
        assert_eq!(program.max_stack, 2);
        assert_eq!(program.slot_count, 2);
        assert_eq!(program.referenced_slots(), vec![0, 1]);
    }

    #[test]
    fn test_constants_are_pooled() {
        let expr = bin(BinaryOp::Add, Expr::Number(2.0), Expr::Number(2.0));
        let program = Compiler::compile(&expr);
        assert_eq!(program.constants, vec![2.0]);
        assert_eq!(program.slot_count, 0);
    }

    #[test]
    fn test_conditional_jump_targets() {
        // slot0 ? 1 : 2
        let expr = Expr::Conditional(Box::new(Expr::Slot(0)), Box::new(Expr::Number(1.0)), Box::new(Expr::Number(2.0)));
        let program = Compiler::compile(&expr);

        assert_eq!(
            program.ops,
            vec![OpCode::Load, OpCode::JumpIfFalse, OpCode::Const, OpCode::Jump, OpCode::Const]
        );
        assert_eq!(program.operand[1], 4);
        assert_eq!(program.operand[3], 5);
        assert_eq!(program.max_stack, 1);
    }

    #[test]
    fn test_variadic_call_stack_depth() {
        let expr = Expr::Call(MathFn::Max, vec![Expr::Number(1.0), Expr::Number(2.0), Expr::Number(3.0)]);
        let program = Compiler::compile(&expr);
        assert_eq!(program.max_stack, 3);
        assert_eq!(program.aux.last(), Some(&3));
        assert_eq!(program.operand.last(), Some(&(MathFn::Max as u32)));
    }
}
