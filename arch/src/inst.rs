use crate::isa::{Format, Isa, Kind};
use crate::reg::Reg;

use color_print::cformat;

/// A canonical instruction with resolved operands, one variant per format.
///
/// Branch and jump immediates are byte offsets relative to the instruction's
/// own address (bit 0 implicit in the encoding); `U` immediates are the raw
/// 20-bit upper pattern. Operands are expected to fit their fields; `to_bin`
/// masks, range policy lives with the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    R { kind: Kind, rd: Reg, rs1: Reg, rs2: Reg },
    I { kind: Kind, rd: Reg, rs1: Reg, imm: i32 },
    Shift { kind: Kind, rd: Reg, rs1: Reg, shamt: u8 },
    S { kind: Kind, rs2: Reg, rs1: Reg, imm: i32 },
    B { kind: Kind, rs1: Reg, rs2: Reg, imm: i32 },
    U { kind: Kind, rd: Reg, imm: u32 },
    J { kind: Kind, rd: Reg, imm: i32 },
    Sys { kind: Kind },
}

/// Canonical no-op word: `addi x0, x0, 0`.
pub const NOP_WORD: u32 = 0x0000_0013;

fn sext(value: u32, bits: u32) -> i32 {
    ((value << (32 - bits)) as i32) >> (32 - bits)
}

impl Inst {
    pub fn kind(&self) -> Kind {
        match *self {
            Inst::R { kind, .. }
            | Inst::I { kind, .. }
            | Inst::Shift { kind, .. }
            | Inst::S { kind, .. }
            | Inst::B { kind, .. }
            | Inst::U { kind, .. }
            | Inst::J { kind, .. }
            | Inst::Sys { kind } => kind,
        }
    }

    /// Encode against the given table.
    pub fn to_bin(&self, isa: &Isa) -> Result<u32, String> {
        let kind = self.kind();
        let spec = isa.spec(kind).ok_or_else(|| format!("No spec for {kind}"))?;
        let opcode = spec.opcode as u32;
        let funct3 = (spec.funct3 as u32) << 12;
        let funct7 = (spec.funct7 as u32) << 25;

        let word = match *self {
            Inst::R { rd, rs1, rs2, .. } => {
                funct7
                    | ((rs2.num() as u32) << 20)
                    | ((rs1.num() as u32) << 15)
                    | funct3
                    | ((rd.num() as u32) << 7)
                    | opcode
            }
            Inst::I { rd, rs1, imm, .. } => {
                ((imm as u32 & 0xFFF) << 20)
                    | ((rs1.num() as u32) << 15)
                    | funct3
                    | ((rd.num() as u32) << 7)
                    | opcode
            }
            Inst::Shift { rd, rs1, shamt, .. } => {
                funct7
                    | ((shamt as u32 & 0x1F) << 20)
                    | ((rs1.num() as u32) << 15)
                    | funct3
                    | ((rd.num() as u32) << 7)
                    | opcode
            }
            Inst::S { rs2, rs1, imm, .. } => {
                let imm = imm as u32;
                (((imm >> 5) & 0x7F) << 25)
                    | ((rs2.num() as u32) << 20)
                    | ((rs1.num() as u32) << 15)
                    | funct3
                    | ((imm & 0x1F) << 7)
                    | opcode
            }
            Inst::B { rs1, rs2, imm, .. } => {
                let imm = imm as u32;
                (((imm >> 12) & 1) << 31)
                    | (((imm >> 5) & 0x3F) << 25)
                    | ((rs2.num() as u32) << 20)
                    | ((rs1.num() as u32) << 15)
                    | funct3
                    | (((imm >> 1) & 0xF) << 8)
                    | (((imm >> 11) & 1) << 7)
                    | opcode
            }
            Inst::U { rd, imm, .. } => ((imm & 0xFFFFF) << 12) | ((rd.num() as u32) << 7) | opcode,
            Inst::J { rd, imm, .. } => {
                let imm = imm as u32;
                (((imm >> 20) & 1) << 31)
                    | (((imm >> 1) & 0x3FF) << 21)
                    | (((imm >> 11) & 1) << 20)
                    | (((imm >> 12) & 0xFF) << 12)
                    | ((rd.num() as u32) << 7)
                    | opcode
            }
            Inst::Sys { .. } => ((spec.imm12 as u32) << 20) | funct3 | opcode,
        };

        // The variant must agree with the table row
        let fmt_ok = matches!(
            (self, spec.fmt),
            (Inst::R { .. }, Format::R)
                | (Inst::I { .. }, Format::I)
                | (Inst::Shift { .. }, Format::Shift)
                | (Inst::S { .. }, Format::S)
                | (Inst::B { .. }, Format::B)
                | (Inst::U { .. }, Format::U)
                | (Inst::J { .. }, Format::J)
                | (Inst::Sys { .. }, Format::Sys)
        );
        if !fmt_ok {
            return Err(format!("{kind} does not take this operand format"));
        }
        Ok(word)
    }

    /// Exact inverse of `to_bin` for words produced from in-range operands.
    pub fn from_bin(bin: u32, isa: &Isa) -> Option<Inst> {
        let opcode = (bin & 0x7F) as u8;
        let funct3 = ((bin >> 12) & 0x7) as u8;
        let funct7 = ((bin >> 25) & 0x7F) as u8;
        let imm12 = ((bin >> 20) & 0xFFF) as u16;

        let spec = isa.specs().find(|s| match s.fmt {
            Format::R | Format::Shift => {
                s.opcode == opcode && s.funct3 == funct3 && s.funct7 == funct7
            }
            Format::Sys => s.opcode == opcode && s.funct3 == funct3 && s.imm12 == imm12,
            Format::I | Format::S | Format::B => s.opcode == opcode && s.funct3 == funct3,
            Format::U | Format::J => s.opcode == opcode,
        })?;

        let rd = Reg::from(((bin >> 7) & 0x1F) as u8);
        let rs1 = Reg::from(((bin >> 15) & 0x1F) as u8);
        let rs2 = Reg::from(((bin >> 20) & 0x1F) as u8);
        let kind = spec.kind;

        Some(match spec.fmt {
            Format::R => Inst::R { kind, rd, rs1, rs2 },
            Format::I => Inst::I { kind, rd, rs1, imm: sext(bin >> 20, 12) },
            Format::Shift => Inst::Shift { kind, rd, rs1, shamt: ((bin >> 20) & 0x1F) as u8 },
            Format::S => {
                let imm = ((bin >> 25) << 5) | ((bin >> 7) & 0x1F);
                Inst::S { kind, rs2, rs1, imm: sext(imm, 12) }
            }
            Format::B => {
                let imm = (((bin >> 31) & 1) << 12)
                    | (((bin >> 7) & 1) << 11)
                    | (((bin >> 25) & 0x3F) << 5)
                    | (((bin >> 8) & 0xF) << 1);
                Inst::B { kind, rs1, rs2, imm: sext(imm, 13) }
            }
            Format::U => Inst::U { kind, rd, imm: (bin >> 12) & 0xFFFFF },
            Format::J => {
                let imm = (((bin >> 31) & 1) << 20)
                    | (((bin >> 12) & 0xFF) << 12)
                    | (((bin >> 20) & 1) << 11)
                    | (((bin >> 21) & 0x3FF) << 1);
                Inst::J { kind, rd, imm: sext(imm, 21) }
            }
            Format::Sys => Inst::Sys { kind },
        })
    }
}

impl Inst {
    pub fn cformat(&self) -> String {
        macro_rules! rrr {
            ($name:expr, $a:expr, $b:expr, $c:expr) => {
                cformat!("<r>{:<6}</><b>{:<4} {:<4} {:<4}</>", $name, $a, $b, $c)
            };
        }
        macro_rules! rri {
            ($name:expr, $a:expr, $b:expr, $imm:expr) => {
                cformat!("<r>{:<6}</><b>{:<4} {:<4} <y>{:#x}</></>", $name, $a, $b, $imm)
            };
        }

        match *self {
            Inst::R { kind, rd, rs1, rs2 } => rrr!(kind, rd, rs1, rs2),
            Inst::I { kind, rd, rs1, imm } => rri!(kind, rd, rs1, imm),
            Inst::Shift { kind, rd, rs1, shamt } => rri!(kind, rd, rs1, shamt),
            Inst::S { kind, rs2, rs1, imm } => rri!(kind, rs2, rs1, imm),
            Inst::B { kind, rs1, rs2, imm } => rri!(kind, rs1, rs2, imm),
            Inst::U { kind, rd, imm } => rri!(kind, rd, "", imm),
            Inst::J { kind, rd, imm } => rri!(kind, rd, "", imm),
            Inst::Sys { kind } => rrr!(kind, "", "", ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::rv32i;

    macro_rules! test_roundtrip {
        ($($name:ident: $inst:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    let isa = rv32i();
                    let inst = $inst;
                    let bin = inst.to_bin(isa).unwrap();
                    let back = Inst::from_bin(bin, isa).unwrap();
                    assert_eq!(inst, back, "bin: {:#010x}", bin);
                }
            )*
        }
    }

    test_roundtrip! {
        rt_add: Inst::R { kind: Kind::ADD, rd: Reg::X5, rs1: Reg::X6, rs2: Reg::X7 },
        rt_sub: Inst::R { kind: Kind::SUB, rd: Reg::X5, rs1: Reg::X6, rs2: Reg::X7 },
        rt_sra: Inst::R { kind: Kind::SRA, rd: Reg::X1, rs1: Reg::X2, rs2: Reg::X3 },
        rt_mul: Inst::R { kind: Kind::MUL, rd: Reg::X1, rs1: Reg::X2, rs2: Reg::X3 },
        rt_remu: Inst::R { kind: Kind::REMU, rd: Reg::X8, rs1: Reg::X9, rs2: Reg::X10 },
        rt_addi: Inst::I { kind: Kind::ADDI, rd: Reg::X10, rs1: Reg::X0, imm: 5 },
        rt_addi_neg: Inst::I { kind: Kind::ADDI, rd: Reg::X10, rs1: Reg::X10, imm: -2048 },
        rt_andi: Inst::I { kind: Kind::ANDI, rd: Reg::X1, rs1: Reg::X2, imm: 0x7FF },
        rt_lw: Inst::I { kind: Kind::LW, rd: Reg::X10, rs1: Reg::X0, imm: 4 },
        rt_jalr: Inst::I { kind: Kind::JALR, rd: Reg::X1, rs1: Reg::X5, imm: -4 },
        rt_slli: Inst::Shift { kind: Kind::SLLI, rd: Reg::X1, rs1: Reg::X2, shamt: 31 },
        rt_srai: Inst::Shift { kind: Kind::SRAI, rd: Reg::X1, rs1: Reg::X2, shamt: 1 },
        rt_sw: Inst::S { kind: Kind::SW, rs2: Reg::X9, rs1: Reg::X7, imm: 4 },
        rt_sb_neg: Inst::S { kind: Kind::SB, rs2: Reg::X9, rs1: Reg::X7, imm: -1 },
        rt_beq: Inst::B { kind: Kind::BEQ, rs1: Reg::X1, rs2: Reg::X2, imm: 8 },
        rt_bne_back: Inst::B { kind: Kind::BNE, rs1: Reg::X4, rs2: Reg::X0, imm: -4 },
        rt_bgeu_far: Inst::B { kind: Kind::BGEU, rs1: Reg::X4, rs2: Reg::X5, imm: 4094 },
        rt_lui: Inst::U { kind: Kind::LUI, rd: Reg::X7, imm: 1 },
        rt_lui_max: Inst::U { kind: Kind::LUI, rd: Reg::X7, imm: 0xFFFFF },
        rt_auipc: Inst::U { kind: Kind::AUIPC, rd: Reg::X7, imm: 0x12345 },
        rt_jal: Inst::J { kind: Kind::JAL, rd: Reg::X1, imm: 0x808 },
        rt_jal_back: Inst::J { kind: Kind::JAL, rd: Reg::X0, imm: -8 },
        rt_ecall: Inst::Sys { kind: Kind::ECALL },
        rt_ebreak: Inst::Sys { kind: Kind::EBREAK },
        rt_fence: Inst::Sys { kind: Kind::FENCE },
    }

    #[test]
    fn known_words() {
        let isa = rv32i();
        // li a0, 5
        let addi = Inst::I { kind: Kind::ADDI, rd: Reg::X10, rs1: Reg::X0, imm: 5 };
        assert_eq!(addi.to_bin(isa).unwrap(), 0x0050_0513);
        // ecall
        assert_eq!(Inst::Sys { kind: Kind::ECALL }.to_bin(isa).unwrap(), 0x0000_0073);
        // nop
        let nop = Inst::I { kind: Kind::ADDI, rd: Reg::X0, rs1: Reg::X0, imm: 0 };
        assert_eq!(nop.to_bin(isa).unwrap(), NOP_WORD);
        // mul x1, x2, x3
        let mul = Inst::R { kind: Kind::MUL, rd: Reg::X1, rs1: Reg::X2, rs2: Reg::X3 };
        assert_eq!(mul.to_bin(isa).unwrap(), 0x0231_00B3);
        // div x5, x6, x7
        let div = Inst::R { kind: Kind::DIV, rd: Reg::X5, rs1: Reg::X6, rs2: Reg::X7 };
        assert_eq!(div.to_bin(isa).unwrap(), 0x0273_42B3);
        // jal ra, 0x808 (the BIOS patch for main at user offset 8)
        let jal = Inst::J { kind: Kind::JAL, rd: Reg::X1, imm: 0x808 };
        assert_eq!(jal.to_bin(isa).unwrap(), 0x0090_00EF);
    }

    #[test]
    fn format_mismatch_is_rejected() {
        let isa = rv32i();
        let bad = Inst::R { kind: Kind::ADDI, rd: Reg::X1, rs1: Reg::X2, rs2: Reg::X3 };
        assert!(bad.to_bin(isa).is_err());
    }

    #[test]
    fn unknown_word_decodes_to_none() {
        let isa = rv32i();
        assert_eq!(Inst::from_bin(0x0000_0000, isa), None);
        assert_eq!(Inst::from_bin(0xFFFF_FFFF, isa), None);
    }
}
