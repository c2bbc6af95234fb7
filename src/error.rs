/// Error types for register values, the segment table and the math opcodes
///
/// Every failure here is local to one opcode step. None of them is fatal to
/// the host: the interpreter decides whether to abort the script, substitute
/// a value or warn and carry on.
use crate::reg::Reg;
use crate::workaround::{CallSite, Operation};
use thiserror::Error;

/// Failures of value-level operations on a [`Reg`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegError {
    /// A number was demanded from a pointer or an uninitialized value
    #[error("type mismatch: expected a number, got {0}")]
    TypeMismatch(Reg),

    /// An arithmetic operator was applied to operand shapes it has no meaning for
    #[error("invalid {operation} of {left} and {right}")]
    ArithmeticType {
        operation: Operation,
        left: Reg,
        right: Reg,
    },

    /// Pointer arithmetic into a segment that does not support it
    #[error("invalid {operation} on pointer {pointer} (segment kind does not allow pointer arithmetic)")]
    PointerType { operation: Operation, pointer: Reg },

    /// Shape-mismatched operation with no registered workaround
    #[error("no workaround for {operation} of {left} and {right} at {site}")]
    UnresolvedWorkaround {
        operation: Operation,
        left: Reg,
        right: Reg,
        site: CallSite,
    },
}

pub type RegResult<T> = Result<T, RegError>;

/// Text that is not a register value in `ssss:oooo`, hex or decimal notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid register value '{0}'")]
pub struct ParseRegError(pub(crate) String);

/// Failures of the segment table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    #[error("invalid segment {0:04x}")]
    InvalidSegment(u16),

    #[error("{0} is not a pointer")]
    NotAPointer(Reg),

    #[error("offset {offset:04x} out of bounds for segment {segment:04x} (length {len})")]
    OutOfBounds { segment: u16, offset: u16, len: usize },

    #[error("all segment ids are in use")]
    Exhausted,

    #[error("{0} cells do not fit a 16-bit offset (at most {max})", max = crate::segment::MAX_CELLS)]
    TooManyCells(usize),
}

pub type HeapResult<T> = Result<T, HeapError>;

/// Failures of one math opcode step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error(transparent)]
    Reg(#[from] RegError),

    #[error(transparent)]
    Heap(#[from] HeapError),

    #[error("stack overflow (limit {0})")]
    StackOverflow(usize),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("opcode {0:#04x} is not a math opcode")]
    InvalidOpcode(u8),
}

pub type VmResult<T> = Result<T, VmError>;

/// Failures while loading an engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
