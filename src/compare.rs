/// Ordering of register values
///
/// Two numbers compare by value, signed unless the unsigned variant is used.
/// Two pointers into the same segment compare by offset, always unsigned.
/// Any other pairing has no defined order; the [`WorkaroundPolicy`] is asked
/// for a substitute outcome and the comparison fails with
/// [`RegError::UnresolvedWorkaround`] when it has none.
///
/// Equality is the derived structural `==` and never consults a workaround.
use crate::error::{RegError, RegResult};
use crate::reg::Reg;
use crate::workaround::{CallSite, Operation, WorkaroundPolicy};
use log::warn;
use std::cmp::Ordering;

/// Workaround policy plus the call site it is consulted for
#[derive(Clone, Copy)]
pub struct CompareContext<'a> {
    pub policy: &'a dyn WorkaroundPolicy,
    pub site: &'a CallSite,
}

impl<'a> CompareContext<'a> {
    pub fn new(policy: &'a dyn WorkaroundPolicy, site: &'a CallSite) -> Self {
        CompareContext { policy, site }
    }
}

impl Reg {
    /// Three-way comparison; `treat_as_unsigned` only affects number pairs
    pub fn compare(self, right: Reg, treat_as_unsigned: bool, ctx: &CompareContext<'_>) -> RegResult<Ordering> {
        if self.is_number() && right.is_number() {
            if treat_as_unsigned {
                Ok(self.to_uint16().cmp(&right.to_uint16()))
            } else {
                Ok(self.to_sint16().cmp(&right.to_sint16()))
            }
        } else if self.is_pointer() && right.is_pointer() && self.segment == right.segment {
            Ok(self.offset.cmp(&right.offset))
        } else {
            let fake = self.look_for_workaround(right, ctx)?;
            Ok(fake.require_sint16()?.cmp(&0))
        }
    }

    fn look_for_workaround(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<Reg> {
        let site = ctx.site.for_operation(Operation::Comparison);
        match ctx.policy.resolve(self, right, &site) {
            Some(fake) => {
                warn!("comparison of {} and {} at {}: substituting {}", self, right, site, fake);
                Ok(fake)
            }
            None => Err(RegError::UnresolvedWorkaround {
                operation: Operation::Comparison,
                left: self,
                right,
                site,
            }),
        }
    }

    pub fn lt(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<bool> {
        Ok(self.compare(right, false, ctx)?.is_lt())
    }

    pub fn le(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<bool> {
        Ok(self.compare(right, false, ctx)?.is_le())
    }

    pub fn gt(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<bool> {
        Ok(self.compare(right, false, ctx)?.is_gt())
    }

    pub fn ge(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<bool> {
        Ok(self.compare(right, false, ctx)?.is_ge())
    }

    pub fn lt_u(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<bool> {
        Ok(self.compare(right, true, ctx)?.is_lt())
    }

    pub fn le_u(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<bool> {
        Ok(self.compare(right, true, ctx)?.is_le())
    }

    pub fn gt_u(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<bool> {
        Ok(self.compare(right, true, ctx)?.is_gt())
    }

    pub fn ge_u(self, right: Reg, ctx: &CompareContext<'_>) -> RegResult<bool> {
        Ok(self.compare(right, true, ctx)?.is_ge())
    }
}
