/// Arithmetic on register values
///
/// Numbers follow 16-bit two's-complement arithmetic and wrap silently, as
/// the legacy VMs did. Number arithmetic never fails; division and modulo by
/// zero produce 0.
///
/// Pointers support exactly three forms:
/// - pointer + number (either order) advances the offset
/// - pointer - number moves the offset back
/// - pointer - pointer in the same segment gives the offset distance as a number
///
/// Everything else involving a pointer or an uninitialized value is an
/// [`RegError::ArithmeticType`].
use crate::error::{RegError, RegResult};
use crate::reg::{Reg, NULL_REG};
use crate::workaround::Operation;

fn mismatch(operation: Operation, left: Reg, right: Reg) -> RegError {
    RegError::ArithmeticType {
        operation,
        left,
        right,
    }
}

/// Both operands as numbers, or the mismatch error for `operation`
fn numbers(operation: Operation, left: Reg, right: Reg) -> RegResult<(u16, u16)> {
    if left.is_number() && right.is_number() {
        Ok((left.offset, right.offset))
    } else {
        Err(mismatch(operation, left, right))
    }
}

fn shift_amount_in_range(amount: u16) -> Option<u32> {
    if amount < 16 {
        Some(u32::from(amount))
    } else {
        None
    }
}

// Fallible, so the std::ops traits do not fit
#[allow(clippy::should_implement_trait)]
impl Reg {
    pub fn add(self, right: Reg) -> RegResult<Reg> {
        if self.is_number() && right.is_number() {
            Ok(Reg::number(self.offset.wrapping_add(right.offset)))
        } else if self.is_pointer() && right.is_number() {
            Ok(Reg::make(self.segment, self.offset.wrapping_add(right.offset)))
        } else if self.is_number() && right.is_pointer() {
            right.add(self)
        } else {
            Err(mismatch(Operation::Addition, self, right))
        }
    }

    pub fn sub(self, right: Reg) -> RegResult<Reg> {
        let same_segment = self.segment == right.segment;
        if same_segment && (self.is_number() || self.is_pointer()) {
            // number - number, or the distance between two pointers
            Ok(Reg::number(self.offset.wrapping_sub(right.offset)))
        } else if self.is_pointer() && right.is_number() {
            Ok(Reg::make(self.segment, self.offset.wrapping_sub(right.offset)))
        } else {
            Err(mismatch(Operation::Subtraction, self, right))
        }
    }

    pub fn mul(self, right: Reg) -> RegResult<Reg> {
        let (l, r) = numbers(Operation::Multiplication, self, right)?;
        Ok(Reg::number(l.wrapping_mul(r)))
    }

    /// Signed division. Dividing by zero yields 0.
    pub fn div(self, right: Reg) -> RegResult<Reg> {
        let (l, r) = numbers(Operation::Division, self, right)?;
        if r == 0 {
            return Ok(NULL_REG);
        }
        Ok(Reg::signed((l as i16).wrapping_div(r as i16)))
    }

    /// Signed modulo by the divisor's magnitude; the result is never negative.
    /// Modulo zero yields 0.
    pub fn rem(self, right: Reg) -> RegResult<Reg> {
        let (l, r) = numbers(Operation::Modulo, self, right)?;
        if r == 0 {
            return Ok(NULL_REG);
        }
        let modulo = i32::from(r as i16).abs();
        let result = i32::from(l as i16).rem_euclid(modulo);
        Ok(Reg::number(result as u16))
    }

    /// Logical shift right of the unsigned pattern
    pub fn shr(self, right: Reg) -> RegResult<Reg> {
        let (l, r) = numbers(Operation::ShiftRight, self, right)?;
        let result = shift_amount_in_range(r).map_or(0, |amount| l >> amount);
        Ok(Reg::number(result))
    }

    pub fn shl(self, right: Reg) -> RegResult<Reg> {
        let (l, r) = numbers(Operation::ShiftLeft, self, right)?;
        let result = shift_amount_in_range(r).map_or(0, |amount| (u32::from(l) << amount) as u16);
        Ok(Reg::number(result))
    }

    pub fn bitand(self, right: Reg) -> RegResult<Reg> {
        let (l, r) = numbers(Operation::BitwiseAnd, self, right)?;
        Ok(Reg::number(l & r))
    }

    pub fn bitor(self, right: Reg) -> RegResult<Reg> {
        let (l, r) = numbers(Operation::BitwiseOr, self, right)?;
        Ok(Reg::number(l | r))
    }

    pub fn bitxor(self, right: Reg) -> RegResult<Reg> {
        let (l, r) = numbers(Operation::BitwiseXor, self, right)?;
        Ok(Reg::number(l ^ r))
    }

    /// Bitwise complement; demands a number
    pub fn bnot(self) -> RegResult<Reg> {
        Ok(Reg::number(0xFFFF ^ self.require_uint16()?))
    }

    /// Two's-complement negation; demands a number
    pub fn neg(self) -> RegResult<Reg> {
        Ok(Reg::signed(self.require_sint16()?.wrapping_neg()))
    }

    /// Logical not. Pointers are allowed: scripts use it to test whether an object exists.
    pub fn not(self) -> Reg {
        Reg::from_bool(!self.is_truthy())
    }

    pub fn add_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.add(right)?;
        Ok(())
    }

    pub fn sub_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.sub(right)?;
        Ok(())
    }

    pub fn mul_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.mul(right)?;
        Ok(())
    }

    pub fn div_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.div(right)?;
        Ok(())
    }

    pub fn rem_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.rem(right)?;
        Ok(())
    }

    pub fn shr_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.shr(right)?;
        Ok(())
    }

    pub fn shl_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.shl(right)?;
        Ok(())
    }

    pub fn bitand_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.bitand(right)?;
        Ok(())
    }

    pub fn bitor_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.bitor(right)?;
        Ok(())
    }

    pub fn bitxor_assign(&mut self, right: Reg) -> RegResult<()> {
        *self = self.bitxor(right)?;
        Ok(())
    }

    /// Add a signed amount to either a number or a pointer
    pub fn add_sint16(self, amount: i16) -> RegResult<Reg> {
        self.add(Reg::signed(amount))
    }
}
