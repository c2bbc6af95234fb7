#![crate_name = "segvm"]

pub mod compare;
pub mod config;
pub mod error;
pub mod opcodes_math;
pub mod reg;
pub mod reg_arith;
pub mod segment;
pub mod vm;
pub mod workaround;

pub use compare::CompareContext;
pub use error::{ConfigError, HeapError, ParseRegError, RegError, VmError};
pub use reg::{make_reg, Reg, Shape, TaggedValue, NULL_REG, SIGNAL_REG, TRUE_REG, UNINIT_REG};
pub use segment::{SegmentDescriptor, SegmentKind, SegmentTable};
pub use vm::Machine;
pub use workaround::{CallSite, NoWorkarounds, Operation, WorkaroundPolicy};



/*
Register layout

    31            16 15             0
    +---------------+---------------+
    |    segment    |    offset     |
    +---------------+---------------+

    segment 0x0000          number; offset is the 16-bit value
    segment 0x0001..0xFFFE  pointer; offset indexes the segment's cells
    segment 0xFFFF          uninitialized
*/
