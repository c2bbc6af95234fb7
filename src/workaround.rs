/// Workarounds for shape-mismatched operations
///
/// Legacy game scripts sometimes compare an object with a number or add two
/// pointers from different segments. The original interpreters tolerated
/// some of these, so a faithful VM needs a way to substitute a result for
/// known call sites. That lookup is a [`WorkaroundPolicy`] handed to the
/// operation, not a global table.
use crate::reg::{Reg, TRUE_REG};
use log::debug;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;

/// Pointers in old heaps never sat below this offset, so scripts used it to
/// tell heap pointers apart from resource numbers
pub const LEGACY_POINTER_THRESHOLD: u16 = 2000;

/// The operation a workaround is looked up for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    ShiftRight,
    ShiftLeft,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    Comparison,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Subtraction => "subtraction",
            Operation::Multiplication => "multiplication",
            Operation::Division => "division",
            Operation::Modulo => "modulo",
            Operation::ShiftRight => "shift right",
            Operation::ShiftLeft => "shift left",
            Operation::BitwiseAnd => "bitwise AND",
            Operation::BitwiseOr => "bitwise OR",
            Operation::BitwiseXor => "bitwise XOR",
            Operation::Comparison => "comparison",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a script operation came from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallSite {
    pub game_id: String,
    pub room: u16,
    pub script: u16,
    pub object: String,
    pub method: String,
    /// Bytecode offset of the instruction inside the script
    pub pc: u16,
    pub operation: Option<Operation>,
}

impl CallSite {
    pub fn new(game_id: &str, room: u16, script: u16, object: &str, method: &str) -> Self {
        CallSite {
            game_id: game_id.to_string(),
            room,
            script,
            object: object.to_string(),
            method: method.to_string(),
            pc: 0,
            operation: None,
        }
    }

    pub fn at(mut self, pc: u16) -> Self {
        self.pc = pc;
        self
    }

    /// Copy of this site tagged with the operation being performed
    pub fn for_operation(&self, operation: Operation) -> Self {
        CallSite {
            operation: Some(operation),
            ..self.clone()
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} room {} script {} {}::{} @{:04x}",
            if self.game_id.is_empty() { "<unknown game>" } else { &self.game_id },
            self.room,
            self.script,
            if self.object.is_empty() { "<none>" } else { &self.object },
            if self.method.is_empty() { "<none>" } else { &self.method },
            self.pc
        )
    }
}

/// Supplies substitute results for shape-mismatched operations.
///
/// The returned value stands in for the result of the operation. For a
/// comparison its signed value is the three-way outcome: negative when
/// `left` orders first, zero when equal, positive when `left` orders last.
pub trait WorkaroundPolicy {
    fn resolve(&self, left: Reg, right: Reg, site: &CallSite) -> Option<Reg>;
}

impl<F> WorkaroundPolicy for F
where
    F: Fn(Reg, Reg, &CallSite) -> Option<Reg>,
{
    fn resolve(&self, left: Reg, right: Reg, site: &CallSite) -> Option<Reg> {
        self(left, right, site)
    }
}

/// Resolves nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWorkarounds;

impl WorkaroundPolicy for NoWorkarounds {
    fn resolve(&self, _left: Reg, _right: Reg, _site: &CallSite) -> Option<Reg> {
        None
    }
}

/// Orders a pointer above any number up to [`LEGACY_POINTER_THRESHOLD`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerIntegerComparison;

fn pointer_vs_small_integer(pointer: Reg, number: Reg) -> bool {
    pointer.is_pointer() && number.is_number() && number.offset <= LEGACY_POINTER_THRESHOLD
}

impl WorkaroundPolicy for PointerIntegerComparison {
    fn resolve(&self, left: Reg, right: Reg, site: &CallSite) -> Option<Reg> {
        if site.operation != Some(Operation::Comparison) {
            return None;
        }
        if pointer_vs_small_integer(left, right) {
            Some(TRUE_REG)
        } else if pointer_vs_small_integer(right, left) {
            Some(Reg::signed(-1))
        } else {
            None
        }
    }
}

/// One row of a [`WorkaroundTable`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkaroundEntry {
    pub game_id: String,
    /// Any room when absent
    #[serde(default)]
    pub room: Option<u16>,
    /// Any script when absent
    #[serde(default)]
    pub script: Option<u16>,
    /// Any object when empty
    #[serde(default)]
    pub object: String,
    /// Any method when empty
    #[serde(default)]
    pub method: String,
    /// Any operation when absent
    #[serde(default)]
    pub operation: Option<Operation>,
    /// Substitute result, as a plain number. Negative values in TOML are
    /// stored as their 16-bit pattern, so `-1` and `65535` are the same row.
    #[serde(deserialize_with = "deserialize_fake")]
    pub fake: u16,
}

fn deserialize_fake<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    if (i64::from(i16::MIN)..=i64::from(u16::MAX)).contains(&value) {
        Ok(value as u16)
    } else {
        Err(de::Error::custom(format!("fake value {} does not fit 16 bits", value)))
    }
}

impl WorkaroundEntry {
    pub fn matches(&self, site: &CallSite) -> bool {
        self.game_id == site.game_id
            && self.room.map_or(true, |room| room == site.room)
            && self.script.map_or(true, |script| script == site.script)
            && (self.object.is_empty() || self.object == site.object)
            && (self.method.is_empty() || self.method == site.method)
            && (self.operation.is_none() || self.operation == site.operation)
    }

    pub fn solution(&self) -> Reg {
        Reg::number(self.fake)
    }
}

/// Ordered list of known call sites; the first matching row wins
#[derive(Debug, Clone, Default)]
pub struct WorkaroundTable {
    entries: Vec<WorkaroundEntry>,
}

impl WorkaroundTable {
    pub fn new(entries: Vec<WorkaroundEntry>) -> Self {
        WorkaroundTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, site: &CallSite) -> Option<&WorkaroundEntry> {
        self.entries.iter().find(|entry| entry.matches(site))
    }
}

impl WorkaroundPolicy for WorkaroundTable {
    fn resolve(&self, left: Reg, right: Reg, site: &CallSite) -> Option<Reg> {
        let entry = self.find(site)?;
        debug!(
            "workaround table: {} of {} and {} at {} -> fake {}",
            site.operation.map(Operation::name).unwrap_or("operation"),
            left,
            right,
            site,
            entry.fake
        );
        Some(entry.solution())
    }
}

/// Tries each policy in turn
#[derive(Default)]
pub struct WorkaroundChain {
    policies: Vec<Box<dyn WorkaroundPolicy>>,
}

impl WorkaroundChain {
    pub fn new() -> Self {
        WorkaroundChain { policies: Vec::new() }
    }

    pub fn with(mut self, policy: impl WorkaroundPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl WorkaroundPolicy for WorkaroundChain {
    fn resolve(&self, left: Reg, right: Reg, site: &CallSite) -> Option<Reg> {
        self.policies
            .iter()
            .find_map(|policy| policy.resolve(left, right, site))
    }
}
