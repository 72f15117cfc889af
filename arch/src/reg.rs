use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// RV32 integer register file. Parses both the architectural names
/// (`x0`..`x31`) and the ABI aliases; displays as the architectural name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    FromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
)]
#[repr(u8)]
#[strum(ascii_case_insensitive)]
pub enum Reg {
    #[default]
    #[strum(to_string = "x0", serialize = "zero")]
    X0,
    #[strum(to_string = "x1", serialize = "ra")]
    X1,
    #[strum(to_string = "x2", serialize = "sp")]
    X2,
    #[strum(to_string = "x3", serialize = "gp")]
    X3,
    #[strum(to_string = "x4", serialize = "tp")]
    X4,
    #[strum(to_string = "x5", serialize = "t0")]
    X5,
    #[strum(to_string = "x6", serialize = "t1")]
    X6,
    #[strum(to_string = "x7", serialize = "t2")]
    X7,
    #[strum(to_string = "x8", serialize = "s0", serialize = "fp")]
    X8,
    #[strum(to_string = "x9", serialize = "s1")]
    X9,
    #[strum(to_string = "x10", serialize = "a0")]
    X10,
    #[strum(to_string = "x11", serialize = "a1")]
    X11,
    #[strum(to_string = "x12", serialize = "a2")]
    X12,
    #[strum(to_string = "x13", serialize = "a3")]
    X13,
    #[strum(to_string = "x14", serialize = "a4")]
    X14,
    #[strum(to_string = "x15", serialize = "a5")]
    X15,
    #[strum(to_string = "x16", serialize = "a6")]
    X16,
    #[strum(to_string = "x17", serialize = "a7")]
    X17,
    #[strum(to_string = "x18", serialize = "s2")]
    X18,
    #[strum(to_string = "x19", serialize = "s3")]
    X19,
    #[strum(to_string = "x20", serialize = "s4")]
    X20,
    #[strum(to_string = "x21", serialize = "s5")]
    X21,
    #[strum(to_string = "x22", serialize = "s6")]
    X22,
    #[strum(to_string = "x23", serialize = "s7")]
    X23,
    #[strum(to_string = "x24", serialize = "s8")]
    X24,
    #[strum(to_string = "x25", serialize = "s9")]
    X25,
    #[strum(to_string = "x26", serialize = "s10")]
    X26,
    #[strum(to_string = "x27", serialize = "s11")]
    X27,
    #[strum(to_string = "x28", serialize = "t3")]
    X28,
    #[strum(to_string = "x29", serialize = "t4")]
    X29,
    #[strum(to_string = "x30", serialize = "t5")]
    X30,
    #[strum(to_string = "x31", serialize = "t6")]
    X31,
}

impl Reg {
    pub fn parse(s: &str) -> Result<Self, String> {
        if let Ok(r) = s.parse::<Self>() {
            return Ok(r);
        }
        // Bare register numbers are accepted as well
        if let Ok(n) = s.parse::<u8>() {
            if n < 32 {
                return Ok(Self::from(n));
            }
        }
        Err(format!("Unknown reg name: {s}"))
    }

    /// 5-bit register field value.
    pub fn num(self) -> u8 {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!(Reg::parse("x0"), Ok(Reg::X0));
        assert_eq!(Reg::parse("zero"), Ok(Reg::X0));
        assert_eq!(Reg::parse("a0"), Ok(Reg::X10));
        assert_eq!(Reg::parse("a7"), Ok(Reg::X17));
        assert_eq!(Reg::parse("fp"), Ok(Reg::X8));
        assert_eq!(Reg::parse("s0"), Ok(Reg::X8));
        assert_eq!(Reg::parse("t6"), Ok(Reg::X31));
        assert_eq!(Reg::parse("10"), Ok(Reg::X10));
        assert!(Reg::parse("x32").is_err());
        assert!(Reg::parse("hoge").is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Reg::X10.to_string(), "x10");
        assert_eq!(Reg::X8.to_string(), "x8");
    }

    #[test]
    fn field_value() {
        assert_eq!(Reg::X0.num(), 0);
        assert_eq!(Reg::X31.num(), 31);
        assert_eq!(Reg::from(17u8), Reg::X17);
    }
}
