/// Math and comparison opcodes for the script VM
///
/// This module handles the arithmetic, bitwise, logic and comparison
/// opcodes. Binary opcodes pop their left operand from the value stack and
/// take the accumulator as their right operand; the result replaces the
/// accumulator. Comparisons first copy the accumulator into `prev`.
///
/// When an operand pairing has no meaning (a pointer multiplied by a
/// number, pointer arithmetic on a list segment, an object compared with an
/// integer), the machine's workaround policy is asked for a substitute
/// result before the step fails.
use crate::error::{RegError, RegResult, VmError, VmResult};
use crate::reg::Reg;
use crate::vm::Machine;
use crate::workaround::Operation;
use log::{debug, error, warn};

/// The math opcode family, numbered as in the bytecode (`opcode byte >> 1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    Bnot = 0x00,
    Add = 0x01,
    Sub = 0x02,
    Mul = 0x03,
    Div = 0x04,
    Mod = 0x05,
    Shr = 0x06,
    Shl = 0x07,
    Xor = 0x08,
    And = 0x09,
    Or = 0x0a,
    Neg = 0x0b,
    Not = 0x0c,
    Eq = 0x0d,
    Ne = 0x0e,
    Gt = 0x0f,
    Ge = 0x10,
    Lt = 0x11,
    Le = 0x12,
    Ugt = 0x13,
    Uge = 0x14,
    Ult = 0x15,
    Ule = 0x16,
}

const MATH_OPS: [MathOp; 23] = [
    MathOp::Bnot,
    MathOp::Add,
    MathOp::Sub,
    MathOp::Mul,
    MathOp::Div,
    MathOp::Mod,
    MathOp::Shr,
    MathOp::Shl,
    MathOp::Xor,
    MathOp::And,
    MathOp::Or,
    MathOp::Neg,
    MathOp::Not,
    MathOp::Eq,
    MathOp::Ne,
    MathOp::Gt,
    MathOp::Ge,
    MathOp::Lt,
    MathOp::Le,
    MathOp::Ugt,
    MathOp::Uge,
    MathOp::Ult,
    MathOp::Ule,
];

impl MathOp {
    /// Decode a raw opcode byte. The low bit is the operand-size flag and is ignored.
    pub fn from_opcode(byte: u8) -> Option<MathOp> {
        MATH_OPS.get((byte >> 1) as usize).copied()
    }

    /// Look an opcode up by its mnemonic (`add`, `ugt?`, ...); the trailing `?` is optional
    pub fn from_name(name: &str) -> Option<MathOp> {
        let name = name.trim_end_matches('?');
        MATH_OPS
            .iter()
            .copied()
            .find(|op| op.name().trim_end_matches('?') == name)
    }

    /// Check if a raw opcode byte is a math operation
    pub fn is_math_opcode(byte: u8) -> bool {
        Self::from_opcode(byte).is_some()
    }

    pub fn name(self) -> &'static str {
        match self {
            MathOp::Bnot => "bnot",
            MathOp::Add => "add",
            MathOp::Sub => "sub",
            MathOp::Mul => "mul",
            MathOp::Div => "div",
            MathOp::Mod => "mod",
            MathOp::Shr => "shr",
            MathOp::Shl => "shl",
            MathOp::Xor => "xor",
            MathOp::And => "and",
            MathOp::Or => "or",
            MathOp::Neg => "neg",
            MathOp::Not => "not",
            MathOp::Eq => "eq?",
            MathOp::Ne => "ne?",
            MathOp::Gt => "gt?",
            MathOp::Ge => "ge?",
            MathOp::Lt => "lt?",
            MathOp::Le => "le?",
            MathOp::Ugt => "ugt?",
            MathOp::Uge => "uge?",
            MathOp::Ult => "ult?",
            MathOp::Ule => "ule?",
        }
    }

    /// Whether the opcode takes no operand from the stack
    pub fn is_unary(self) -> bool {
        matches!(self, MathOp::Bnot | MathOp::Neg | MathOp::Not)
    }

    pub fn is_comparison(self) -> bool {
        (self as u8) >= MathOp::Eq as u8
    }

    fn operation(self) -> Option<Operation> {
        match self {
            MathOp::Add => Some(Operation::Addition),
            MathOp::Sub => Some(Operation::Subtraction),
            MathOp::Mul => Some(Operation::Multiplication),
            MathOp::Div => Some(Operation::Division),
            MathOp::Mod => Some(Operation::Modulo),
            MathOp::Shr => Some(Operation::ShiftRight),
            MathOp::Shl => Some(Operation::ShiftLeft),
            MathOp::Xor => Some(Operation::BitwiseXor),
            MathOp::And => Some(Operation::BitwiseAnd),
            MathOp::Or => Some(Operation::BitwiseOr),
            _ => None,
        }
    }
}

impl Machine {
    /// Decode and execute a raw math opcode byte
    pub fn execute_math_opcode(&mut self, byte: u8) -> VmResult<()> {
        let op = MathOp::from_opcode(byte).ok_or(VmError::InvalidOpcode(byte))?;
        self.execute_math_op(op)
    }

    /// Handle one math or comparison opcode
    pub fn execute_math_op(&mut self, op: MathOp) -> VmResult<()> {
        match op {
            // ---- UNARY ----
            MathOp::Bnot => {
                debug!("bnot {}", self.acc);
                self.acc = self.acc.bnot()?;
            }
            MathOp::Neg => {
                debug!("neg {}", self.acc);
                self.acc = self.acc.neg()?;
            }
            MathOp::Not => {
                debug!("not {}", self.acc);
                self.acc = self.acc.not();
            }

            // ---- EQUALITY ----
            // Pointers may be compared for identity; no workaround involved
            MathOp::Eq | MathOp::Ne => {
                self.prev = self.acc;
                let left = self.pop()?;
                debug!("{} {} {}", op.name(), left, self.acc);
                let equal = left == self.acc;
                self.acc = Reg::from_bool(if op == MathOp::Eq { equal } else { !equal });
            }

            // ---- ORDERING ----
            MathOp::Gt
            | MathOp::Ge
            | MathOp::Lt
            | MathOp::Le
            | MathOp::Ugt
            | MathOp::Uge
            | MathOp::Ult
            | MathOp::Ule => {
                self.prev = self.acc;
                let left = self.pop()?;
                let right = self.acc;
                debug!("{} {} {}", op.name(), left, right);
                let outcome = self.compare_op(op, left, right);
                let result = match outcome {
                    Ok(result) => result,
                    Err(err) => {
                        error!("{} failed: {}", op.name(), err);
                        return Err(err.into());
                    }
                };
                self.acc = Reg::from_bool(result);
            }

            // ---- BINARY ARITHMETIC ----
            _ => {
                let left = self.pop()?;
                let right = self.acc;
                debug!("{} {} {}", op.name(), left, right);
                self.acc = self.binary_op(op, left, right)?;
            }
        }
        Ok(())
    }

    fn compare_op(&self, op: MathOp, left: Reg, right: Reg) -> RegResult<bool> {
        let ctx = self.compare_context();
        match op {
            MathOp::Gt => left.gt(right, &ctx),
            MathOp::Ge => left.ge(right, &ctx),
            MathOp::Lt => left.lt(right, &ctx),
            MathOp::Le => left.le(right, &ctx),
            MathOp::Ugt => left.gt_u(right, &ctx),
            MathOp::Uge => left.ge_u(right, &ctx),
            MathOp::Ult => left.lt_u(right, &ctx),
            MathOp::Ule => left.le_u(right, &ctx),
            _ => unreachable!("{} is not an ordering opcode", op.name()),
        }
    }

    fn binary_op(&self, op: MathOp, left: Reg, right: Reg) -> VmResult<Reg> {
        let result = match op {
            MathOp::Add => left.add(right),
            MathOp::Sub => left.sub(right),
            MathOp::Mul => left.mul(right),
            MathOp::Div => left.div(right),
            MathOp::Mod => left.rem(right),
            MathOp::Shr => left.shr(right),
            MathOp::Shl => left.shl(right),
            MathOp::Xor => left.bitxor(right),
            MathOp::And => left.bitand(right),
            MathOp::Or => left.bitor(right),
            _ => unreachable!("{} is not a binary arithmetic opcode", op.name()),
        };
        let result = match (op, result) {
            (MathOp::Add, Ok(value)) => self.check_pointer_arithmetic(Operation::Addition, value)?,
            (MathOp::Sub, Ok(value)) => self.check_pointer_arithmetic(Operation::Subtraction, value)?,
            (_, result) => result,
        };

        match result {
            Ok(value) => Ok(value),
            Err(err @ (RegError::ArithmeticType { .. } | RegError::PointerType { .. })) => {
                self.arithmetic_workaround(op, left, right, err)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Pointer results are only valid in segments that hold addressable data.
    ///
    /// A segment that is not allocated at all is a heap error and never goes
    /// to the workaround policy.
    fn check_pointer_arithmetic(&self, operation: Operation, result: Reg) -> VmResult<RegResult<Reg>> {
        if !result.is_pointer() {
            return Ok(Ok(result));
        }
        let descriptor = self.heap.resolve(result.segment).map_err(|err| {
            error!("{} produced dangling pointer {}: {}", operation, result, err);
            err
        })?;
        if descriptor.kind.allows_pointer_arithmetic() {
            Ok(Ok(result))
        } else {
            Ok(Err(RegError::PointerType {
                operation,
                pointer: result,
            }))
        }
    }

    fn arithmetic_workaround(&self, op: MathOp, left: Reg, right: Reg, err: RegError) -> VmResult<Reg> {
        let Some(operation) = op.operation() else {
            return Err(err.into());
        };
        let site = self.site.for_operation(operation);
        match self.policy().resolve(left, right, &site) {
            Some(fake) => {
                warn!("{} of {} and {} at {}: substituting {}", operation, left, right, site, fake);
                Ok(fake)
            }
            None => {
                error!("{} at {}", err, site);
                Err(err.into())
            }
        }
    }
}
