use crate::compare::CompareContext;
use crate::config::EngineConfig;
use crate::error::{VmError, VmResult};
use crate::reg::{Reg, NULL_REG};
use crate::segment::SegmentTable;
use crate::workaround::{CallSite, NoWorkarounds, WorkaroundPolicy};
use log::debug;
use std::fmt;

/// Default maximum depth of the value stack
pub const STACK_SIZE: usize = 1024;

/// Register machine state the math opcodes run against
pub struct Machine {
    /// Accumulator: right operand and result of every math opcode
    pub acc: Reg,
    /// Accumulator value before the last comparison
    pub prev: Reg,
    /// Value stack; binary opcodes pop their left operand from here
    pub stack: Vec<Reg>,
    stack_limit: usize,
    pub heap: SegmentTable,
    /// Origin of the instruction currently executing, for workaround lookups
    pub site: CallSite,
    policy: Box<dyn WorkaroundPolicy>,
}

impl Machine {
    /// A machine with no workarounds and the default stack size
    pub fn new() -> Self {
        Self::with_policy(Box::new(NoWorkarounds), STACK_SIZE)
    }

    pub fn with_policy(policy: Box<dyn WorkaroundPolicy>, stack_limit: usize) -> Self {
        Machine {
            acc: NULL_REG,
            prev: NULL_REG,
            stack: Vec::with_capacity(stack_limit.min(STACK_SIZE)),
            stack_limit,
            heap: SegmentTable::new(),
            site: CallSite::default(),
            policy,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let mut machine = Self::with_policy(Box::new(config.build_policy()), config.stack_size);
        machine.site.game_id = config.game_id.clone();
        machine
    }

    pub fn policy(&self) -> &dyn WorkaroundPolicy {
        self.policy.as_ref()
    }

    pub fn compare_context(&self) -> CompareContext<'_> {
        CompareContext::new(self.policy.as_ref(), &self.site)
    }

    /// Push a value onto the value stack
    pub fn push(&mut self, value: Reg) -> VmResult<()> {
        if self.stack.len() >= self.stack_limit {
            return Err(VmError::StackOverflow(self.stack_limit));
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value from the value stack
    pub fn pop(&mut self) -> VmResult<Reg> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => {
                debug!("stack underflow at {}", self.site);
                Err(VmError::StackUnderflow)
            }
        }
    }

    pub fn peek(&self) -> VmResult<Reg> {
        self.stack.last().copied().ok_or(VmError::StackUnderflow)
    }

    /// Clear registers and the stack. The heap is kept.
    pub fn reset(&mut self) {
        self.acc = NULL_REG;
        self.prev = NULL_REG;
        self.stack.clear();
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("acc", &self.acc)
            .field("prev", &self.prev)
            .field("stack", &self.stack)
            .field("stack_limit", &self.stack_limit)
            .field("heap", &self.heap)
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::make_reg;
    use test_log::test;

    #[test]
    fn test_stack_limits() {
        let mut machine = Machine::with_policy(Box::new(NoWorkarounds), 2);
        machine.push(make_reg(0, 1)).unwrap();
        machine.push(make_reg(0, 2)).unwrap();
        assert_eq!(machine.push(make_reg(0, 3)), Err(VmError::StackOverflow(2)));

        assert_eq!(machine.peek(), Ok(make_reg(0, 2)));
        assert_eq!(machine.pop(), Ok(make_reg(0, 2)));
        assert_eq!(machine.pop(), Ok(make_reg(0, 1)));
        assert_eq!(machine.pop(), Err(VmError::StackUnderflow));
        assert_eq!(machine.peek(), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_from_config() {
        let config = EngineConfig::from_toml_str("game_id = \"qfg1vga\"\nstack_size = 8\n").unwrap();
        let machine = Machine::from_config(&config);
        assert_eq!(machine.site.game_id, "qfg1vga");
        assert_eq!(machine.stack_limit, 8);
    }

    #[test]
    fn test_reset_keeps_heap() {
        let mut machine = Machine::new();
        let id = machine.heap.allocate(crate::segment::SegmentKind::Locals).unwrap();
        machine.acc = make_reg(0, 5);
        machine.push(make_reg(0, 1)).unwrap();
        machine.reset();
        assert_eq!(machine.acc, NULL_REG);
        assert!(machine.stack.is_empty());
        assert!(machine.heap.is_valid(id));
    }
}
