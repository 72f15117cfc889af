use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Canonical mnemonics of the RV32I base set plus the M extension.
///
/// The assembler pipeline never matches on mnemonics directly; everything it
/// needs comes from the [`Spec`] row looked up through an [`Isa`]. Swapping in
/// a different instruction set (e.g. the MIPS-style variant of this SoC's
/// project history) means providing another table, not touching the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Kind {
    ADD,
    SUB,
    SLL,
    SLT,
    SLTU,
    XOR,
    SRL,
    SRA,
    OR,
    AND,
    MUL,
    MULH,
    MULHSU,
    MULHU,
    DIV,
    DIVU,
    REM,
    REMU,
    ADDI,
    SLTI,
    SLTIU,
    XORI,
    ORI,
    ANDI,
    SLLI,
    SRLI,
    SRAI,
    LB,
    LH,
    LW,
    LBU,
    LHU,
    JALR,
    SB,
    SH,
    SW,
    BEQ,
    BNE,
    BLT,
    BGE,
    BLTU,
    BGEU,
    LUI,
    AUIPC,
    JAL,
    ECALL,
    EBREAK,
    FENCE,
}

impl Kind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Undefined op: {s}")),
        }
    }
}

/// Instruction word formats. `Shift` is the immediate-shift I-variant whose
/// upper immediate bits are a funct7 discriminator; `Sys` covers the
/// zero-operand instructions with a fixed 12-bit immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    R,
    I,
    Shift,
    S,
    B,
    U,
    J,
    Sys,
}

/// One row of the encoding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spec {
    pub kind: Kind,
    pub fmt: Format,
    pub opcode: u8,
    pub funct3: u8,
    pub funct7: u8,
    /// Fixed imm[11:0] value, used by `Sys` rows only.
    pub imm12: u16,
}

const fn r(kind: Kind, funct3: u8, funct7: u8) -> Spec {
    Spec { kind, fmt: Format::R, opcode: 0b0110011, funct3, funct7, imm12: 0 }
}

const fn i(kind: Kind, opcode: u8, funct3: u8) -> Spec {
    Spec { kind, fmt: Format::I, opcode, funct3, funct7: 0, imm12: 0 }
}

const fn shift(kind: Kind, funct3: u8, funct7: u8) -> Spec {
    Spec { kind, fmt: Format::Shift, opcode: 0b0010011, funct3, funct7, imm12: 0 }
}

const fn s(kind: Kind, funct3: u8) -> Spec {
    Spec { kind, fmt: Format::S, opcode: 0b0100011, funct3, funct7: 0, imm12: 0 }
}

const fn b(kind: Kind, funct3: u8) -> Spec {
    Spec { kind, fmt: Format::B, opcode: 0b1100011, funct3, funct7: 0, imm12: 0 }
}

const fn u(kind: Kind, opcode: u8) -> Spec {
    Spec { kind, fmt: Format::U, opcode, funct3: 0, funct7: 0, imm12: 0 }
}

const fn sys(kind: Kind, opcode: u8, imm12: u16) -> Spec {
    Spec { kind, fmt: Format::Sys, opcode, funct3: 0, funct7: 0, imm12 }
}

const RV32I_SPECS: &[Spec] = &[
    r(Kind::ADD, 0b000, 0b0000000),
    r(Kind::SUB, 0b000, 0b0100000),
    r(Kind::SLL, 0b001, 0b0000000),
    r(Kind::SLT, 0b010, 0b0000000),
    r(Kind::SLTU, 0b011, 0b0000000),
    r(Kind::XOR, 0b100, 0b0000000),
    r(Kind::SRL, 0b101, 0b0000000),
    r(Kind::SRA, 0b101, 0b0100000),
    r(Kind::OR, 0b110, 0b0000000),
    r(Kind::AND, 0b111, 0b0000000),
    r(Kind::MUL, 0b000, 0b0000001),
    r(Kind::MULH, 0b001, 0b0000001),
    r(Kind::MULHSU, 0b010, 0b0000001),
    r(Kind::MULHU, 0b011, 0b0000001),
    r(Kind::DIV, 0b100, 0b0000001),
    r(Kind::DIVU, 0b101, 0b0000001),
    r(Kind::REM, 0b110, 0b0000001),
    r(Kind::REMU, 0b111, 0b0000001),
    i(Kind::ADDI, 0b0010011, 0b000),
    i(Kind::SLTI, 0b0010011, 0b010),
    i(Kind::SLTIU, 0b0010011, 0b011),
    i(Kind::XORI, 0b0010011, 0b100),
    i(Kind::ORI, 0b0010011, 0b110),
    i(Kind::ANDI, 0b0010011, 0b111),
    shift(Kind::SLLI, 0b001, 0b0000000),
    shift(Kind::SRLI, 0b101, 0b0000000),
    shift(Kind::SRAI, 0b101, 0b0100000),
    i(Kind::LB, 0b0000011, 0b000),
    i(Kind::LH, 0b0000011, 0b001),
    i(Kind::LW, 0b0000011, 0b010),
    i(Kind::LBU, 0b0000011, 0b100),
    i(Kind::LHU, 0b0000011, 0b101),
    i(Kind::JALR, 0b1100111, 0b000),
    s(Kind::SB, 0b000),
    s(Kind::SH, 0b001),
    s(Kind::SW, 0b010),
    b(Kind::BEQ, 0b000),
    b(Kind::BNE, 0b001),
    b(Kind::BLT, 0b100),
    b(Kind::BGE, 0b101),
    b(Kind::BLTU, 0b110),
    b(Kind::BGEU, 0b111),
    u(Kind::LUI, 0b0110111),
    u(Kind::AUIPC, 0b0010111),
    Spec { kind: Kind::JAL, fmt: Format::J, opcode: 0b1101111, funct3: 0, funct7: 0, imm12: 0 },
    sys(Kind::ECALL, 0b1110011, 0),
    sys(Kind::EBREAK, 0b1110011, 1),
    sys(Kind::FENCE, 0b0001111, 0),
];

/// An instruction set: the spec rows plus a by-kind index.
pub struct Isa {
    specs: &'static [Spec],
    by_kind: HashMap<Kind, usize>,
}

impl Isa {
    fn new(specs: &'static [Spec]) -> Self {
        let by_kind = specs.iter().enumerate().map(|(i, s)| (s.kind, i)).collect();
        Isa { specs, by_kind }
    }

    pub fn spec(&self, kind: Kind) -> Option<&Spec> {
        self.by_kind.get(&kind).map(|&i| &self.specs[i])
    }

    /// Look a mnemonic up in this table.
    pub fn lookup(&self, mnemonic: &str) -> Option<&Spec> {
        let kind = mnemonic.parse::<Kind>().ok()?;
        self.spec(kind)
    }

    pub fn specs(&self) -> impl Iterator<Item = &Spec> {
        self.specs.iter()
    }
}

static RV32I: Lazy<Isa> = Lazy::new(|| Isa::new(RV32I_SPECS));

/// The canonical table of this toolchain.
pub fn rv32i() -> &'static Isa {
    &RV32I
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind() {
        assert_eq!(Kind::parse("add"), Ok(Kind::ADD));
        assert_eq!(Kind::parse("ADD"), Ok(Kind::ADD));
        assert_eq!(Kind::parse("mulhsu"), Ok(Kind::MULHSU));
        assert!(Kind::parse("hoge").is_err());
    }

    #[test]
    fn every_kind_has_a_spec() {
        let isa = rv32i();
        for spec in RV32I_SPECS {
            assert_eq!(isa.spec(spec.kind).unwrap().kind, spec.kind);
        }
    }

    #[test]
    fn lookup_by_mnemonic() {
        let isa = rv32i();
        assert_eq!(isa.lookup("addi").unwrap().kind, Kind::ADDI);
        assert_eq!(isa.lookup("ecall").unwrap().fmt, Format::Sys);
        assert!(isa.lookup("syscall").is_none());
    }

    #[test]
    fn rows_are_unambiguous() {
        // No two rows may claim the same discriminating fields.
        for (i, a) in RV32I_SPECS.iter().enumerate() {
            for b in &RV32I_SPECS[i + 1..] {
                let clash = match (a.fmt, b.fmt) {
                    (Format::R, Format::R) | (Format::Shift, Format::Shift) => {
                        a.opcode == b.opcode && a.funct3 == b.funct3 && a.funct7 == b.funct7
                    }
                    (Format::Sys, Format::Sys) => {
                        a.opcode == b.opcode && a.funct3 == b.funct3 && a.imm12 == b.imm12
                    }
                    (Format::U, Format::U) | (Format::J, Format::J) => a.opcode == b.opcode,
                    (Format::I, Format::I) | (Format::S, Format::S) | (Format::B, Format::B) => {
                        a.opcode == b.opcode && a.funct3 == b.funct3
                    }
                    _ => false,
                };
                assert!(!clash, "{:?} clashes with {:?}", a.kind, b.kind);
            }
        }
    }
}
