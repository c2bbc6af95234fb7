/// Segmented register values
///
/// A [`Reg`] is the uniform currency of the script VM: a 32-bit pair of a
/// segment id and a 16-bit offset. Segment 0 marks a plain number, 0xFFFF
/// marks an uninitialized value, and every other segment names a region of
/// the segment table with the offset as a coordinate inside it.
///
/// The shape of a value is always derived from `segment`; no separate tag
/// is stored, so the value stays exactly 32 bits wide.
use crate::error::{ParseRegError, RegError, RegResult};
use std::fmt;
use std::str::FromStr;

/// Segment id reserved for plain numbers
pub const NUMBER_SEGMENT: u16 = 0x0000;

/// Segment id reserved for uninitialized values
pub const UNINIT_SEGMENT: u16 = 0xFFFF;

/// A register value: (segment, offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Reg {
    pub segment: u16,
    pub offset: u16,
}

/// Name used by the rest of the interpreter for a register value
pub type TaggedValue = Reg;

/// "No object"
pub const NULL_REG: Reg = Reg::make(NUMBER_SEGMENT, 0);

/// "Operation complete" / error sentinel. Differs from [`NULL_REG`] only in offset.
pub const SIGNAL_REG: Reg = Reg::make(NUMBER_SEGMENT, 0xFFFF);

/// Canonical boolean true produced by comparison and logic opcodes
pub const TRUE_REG: Reg = Reg::make(NUMBER_SEGMENT, 1);

/// Canonical uninitialized value
pub const UNINIT_REG: Reg = Reg::make(UNINIT_SEGMENT, 0xFFFF);

/// Classification of a [`Reg`], computed from its segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Number,
    Pointer,
    Uninitialized,
}

/// Shorthand for [`Reg::make`]
#[inline]
pub const fn make_reg(segment: u16, offset: u16) -> Reg {
    Reg::make(segment, offset)
}

impl Reg {
    /// Raw constructor. No validation is done.
    #[inline]
    pub const fn make(segment: u16, offset: u16) -> Self {
        Reg { segment, offset }
    }

    /// A plain number from an unsigned 16-bit value
    #[inline]
    pub const fn number(value: u16) -> Self {
        Reg::make(NUMBER_SEGMENT, value)
    }

    /// A plain number from a signed 16-bit value (stored as its two's-complement pattern)
    #[inline]
    pub const fn signed(value: i16) -> Self {
        Reg::make(NUMBER_SEGMENT, value as u16)
    }

    /// [`TRUE_REG`] or [`NULL_REG`]
    #[inline]
    pub const fn from_bool(value: bool) -> Self {
        if value {
            TRUE_REG
        } else {
            NULL_REG
        }
    }

    #[inline]
    pub const fn shape(self) -> Shape {
        match self.segment {
            NUMBER_SEGMENT => Shape::Number,
            UNINIT_SEGMENT => Shape::Uninitialized,
            _ => Shape::Pointer,
        }
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.segment == NUMBER_SEGMENT && self.offset == 0
    }

    #[inline]
    pub const fn is_number(self) -> bool {
        self.segment == NUMBER_SEGMENT
    }

    #[inline]
    pub const fn is_pointer(self) -> bool {
        self.segment != NUMBER_SEGMENT && self.segment != UNINIT_SEGMENT
    }

    #[inline]
    pub const fn is_initialized(self) -> bool {
        self.segment != UNINIT_SEGMENT
    }

    /// The offset as an unsigned 16-bit number.
    ///
    /// Only meaningful for numbers; on a pointer this returns the raw
    /// offset and does not fail.
    #[inline]
    pub const fn to_uint16(self) -> u16 {
        self.offset
    }

    /// The offset reinterpreted as a signed 16-bit number
    #[inline]
    pub const fn to_sint16(self) -> i16 {
        self.offset as i16
    }

    /// Like [`Reg::to_uint16`] but fails on anything that is not a number
    pub fn require_uint16(self) -> RegResult<u16> {
        if self.is_number() {
            Ok(self.to_uint16())
        } else {
            Err(RegError::TypeMismatch(self))
        }
    }

    /// Like [`Reg::to_sint16`] but fails on anything that is not a number
    pub fn require_sint16(self) -> RegResult<i16> {
        if self.is_number() {
            Ok(self.to_sint16())
        } else {
            Err(RegError::TypeMismatch(self))
        }
    }

    /// Logical truth as the VM branches see it: anything but 0000:0000
    #[inline]
    pub const fn is_truthy(self) -> bool {
        !self.is_null()
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.segment, self.offset)
    }
}

fn parse_word(text: &str, radix: u32) -> Option<u16> {
    u16::from_str_radix(text, radix).ok()
}

impl FromStr for Reg {
    type Err = ParseRegError;

    /// Accepts `ssss:oooo` (hex), `0x1234`, `1234` and `-12`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let err = || ParseRegError(s.to_string());

        if let Some((segment, offset)) = text.split_once(':') {
            let segment = parse_word(segment, 16).ok_or_else(err)?;
            let offset = parse_word(offset, 16).ok_or_else(err)?;
            return Ok(Reg::make(segment, offset));
        }
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            return parse_word(hex, 16).map(Reg::number).ok_or_else(err);
        }
        if text.starts_with('-') {
            return text.parse::<i16>().map(Reg::signed).map_err(|_| err());
        }
        parse_word(text, 10).map(Reg::number).ok_or_else(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_constants() {
        assert_eq!(NULL_REG, make_reg(0, 0));
        assert_eq!(SIGNAL_REG, make_reg(0, 0xFFFF));
        assert_eq!(TRUE_REG, make_reg(0, 1));
        assert_ne!(NULL_REG, SIGNAL_REG);
        assert!(SIGNAL_REG.is_number());
        assert!(!UNINIT_REG.is_initialized());
    }

    #[test]
    fn test_shape_boundaries() {
        assert_eq!(make_reg(0, 42).shape(), Shape::Number);
        assert_eq!(make_reg(1, 0).shape(), Shape::Pointer);
        assert_eq!(make_reg(0xFFFE, 0).shape(), Shape::Pointer);
        assert_eq!(make_reg(0xFFFF, 0).shape(), Shape::Uninitialized);
    }

    #[test]
    fn test_display() {
        assert_eq!(make_reg(7, 0x64).to_string(), "0007:0064");
        assert_eq!(UNINIT_REG.to_string(), "ffff:ffff");
    }

    #[test]
    fn test_parse() {
        assert_eq!("0007:0064".parse::<Reg>(), Ok(make_reg(7, 100)));
        assert_eq!("0x10".parse::<Reg>(), Ok(make_reg(0, 16)));
        assert_eq!("300".parse::<Reg>(), Ok(make_reg(0, 300)));
        assert_eq!("-1".parse::<Reg>(), Ok(make_reg(0, 0xFFFF)));
        assert!("7:xyz".parse::<Reg>().is_err());
        assert!("70000".parse::<Reg>().is_err());
        assert_eq!(
            "7:xyz".parse::<Reg>().unwrap_err().to_string(),
            "invalid register value '7:xyz'"
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!NULL_REG.is_truthy());
        assert!(TRUE_REG.is_truthy());
        assert!(SIGNAL_REG.is_truthy());
        assert!(make_reg(3, 0).is_truthy());
        assert!(UNINIT_REG.is_truthy());
    }

    #[test]
    fn test_require_on_uninitialized() {
        assert_eq!(
            UNINIT_REG.require_sint16(),
            Err(RegError::TypeMismatch(UNINIT_REG))
        );
        assert_eq!(make_reg(0, 0x8000).require_sint16(), Ok(-32768));
    }
}
