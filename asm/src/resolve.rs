use arch::inst::Inst;
use arch::isa::{rv32i, Format, Kind};
use arch::layout;
use arch::reg::Reg;

use crate::error::Error;
use crate::parser::Operand;
use crate::pseudo::{fits_signed, fits_unsigned, hi_lo};
use crate::symbol::SymbolTable;

/// Resolve one canonical statement into an encodable instruction.
///
/// `pc` is the instruction's own user-region-relative address; branch and
/// jump deltas are computed against it.
pub fn resolve_inst(
    line: usize,
    mnemonic: &str,
    args: &[Operand],
    pc: u32,
    symbols: &SymbolTable,
) -> Result<Inst, Error> {
    let isa = rv32i();
    let spec = isa
        .lookup(mnemonic)
        .ok_or_else(|| Error::UnknownInstruction(mnemonic.to_string()))?;
    let kind = spec.kind;

    match spec.fmt {
        Format::R => {
            expect_args(line, mnemonic, args, 3)?;
            Ok(Inst::R {
                kind,
                rd: reg(line, mnemonic, &args[0])?,
                rs1: reg(line, mnemonic, &args[1])?,
                rs2: reg(line, mnemonic, &args[2])?,
            })
        }
        Format::I if is_load(kind) => {
            expect_args(line, mnemonic, args, 2)?;
            let rd = reg(line, mnemonic, &args[0])?;
            let (rs1, imm) = mem_ref(line, &args[1], symbols)?;
            Ok(Inst::I { kind, rd, rs1, imm: field(line, imm, 12, "load offset")? })
        }
        Format::I if kind == Kind::JALR => resolve_jalr(line, args, symbols),
        Format::I => {
            expect_args(line, mnemonic, args, 3)?;
            let rd = reg(line, mnemonic, &args[0])?;
            let rs1 = reg(line, mnemonic, &args[1])?;
            let imm = imm_value(line, &args[2], symbols)?;
            Ok(Inst::I { kind, rd, rs1, imm: field(line, imm, 12, "immediate")? })
        }
        Format::Shift => {
            expect_args(line, mnemonic, args, 3)?;
            let rd = reg(line, mnemonic, &args[0])?;
            let rs1 = reg(line, mnemonic, &args[1])?;
            let &Operand::Imm(shamt) = &args[2] else {
                return Err(Error::Syntax(line, format!("{mnemonic} expects a shift amount")));
            };
            if !(0..32).contains(&shamt) {
                return Err(Error::OperandOutOfRange(
                    line,
                    format!("shift amount {shamt} out of range"),
                ));
            }
            Ok(Inst::Shift { kind, rd, rs1, shamt: shamt as u8 })
        }
        Format::S => {
            expect_args(line, mnemonic, args, 2)?;
            let rs2 = reg(line, mnemonic, &args[0])?;
            // A literal absolute store into the BIOS region is a programming
            // error; symbols placed by the assembler are exempt.
            if let Operand::Mem { offset, base: Reg::X0 } = &args[1] {
                if (0..layout::BIOS_SIZE as i64).contains(offset) {
                    return Err(Error::OperandOutOfRange(
                        line,
                        format!("store to {offset:#x} targets the protected BIOS region"),
                    ));
                }
            }
            let (rs1, imm) = mem_ref(line, &args[1], symbols)?;
            Ok(Inst::S { kind, rs2, rs1, imm: field(line, imm, 12, "store offset")? })
        }
        Format::B => {
            expect_args(line, mnemonic, args, 3)?;
            let rs1 = reg(line, mnemonic, &args[0])?;
            let rs2 = reg(line, mnemonic, &args[1])?;
            let imm = target_delta(line, &args[2], pc, symbols, 13)?;
            Ok(Inst::B { kind, rs1, rs2, imm })
        }
        Format::U => {
            expect_args(line, mnemonic, args, 2)?;
            let rd = reg(line, mnemonic, &args[0])?;
            let imm = match &args[1] {
                Operand::Imm(v) => {
                    if !fits_signed(*v, 20) && !fits_unsigned(*v, 20) {
                        return Err(Error::OperandOutOfRange(
                            line,
                            format!("upper immediate {v} out of range"),
                        ));
                    }
                    (*v as u32) & 0xFFFFF
                }
                Operand::Hi(sym) => {
                    let addr = lookup_absolute(sym, symbols)?;
                    hi_lo(addr as i64).0
                }
                _ => {
                    return Err(Error::Syntax(line, format!("{mnemonic} expects an immediate")))
                }
            };
            Ok(Inst::U { kind, rd, imm })
        }
        Format::J => {
            expect_args(line, mnemonic, args, 2)?;
            let rd = reg(line, mnemonic, &args[0])?;
            let imm = target_delta(line, &args[1], pc, symbols, 21)?;
            Ok(Inst::J { kind, rd, imm })
        }
        Format::Sys => {
            expect_args(line, mnemonic, args, 0)?;
            Ok(Inst::Sys { kind })
        }
    }
}

fn is_load(kind: Kind) -> bool {
    matches!(kind, Kind::LB | Kind::LH | Kind::LW | Kind::LBU | Kind::LHU)
}

/// `jalr rd, rs1, imm` / `jalr rd, offset(rs1)` / `jalr rd, rs1`.
fn resolve_jalr(line: usize, args: &[Operand], symbols: &SymbolTable) -> Result<Inst, Error> {
    let kind = Kind::JALR;
    match args {
        [rd, rs1 @ Operand::Reg(_), imm_op] => {
            let imm = imm_value(line, imm_op, symbols)?;
            Ok(Inst::I {
                kind,
                rd: reg(line, "jalr", rd)?,
                rs1: reg(line, "jalr", rs1)?,
                imm: field(line, imm, 12, "jalr offset")?,
            })
        }
        [rd, Operand::Mem { offset, base }] => Ok(Inst::I {
            kind,
            rd: reg(line, "jalr", rd)?,
            rs1: *base,
            imm: field(line, *offset, 12, "jalr offset")?,
        }),
        [rd, rs1 @ Operand::Reg(_)] => Ok(Inst::I {
            kind,
            rd: reg(line, "jalr", rd)?,
            rs1: reg(line, "jalr", rs1)?,
            imm: 0,
        }),
        _ => Err(Error::Syntax(line, "jalr expects `jalr rd, rs1[, imm]`".to_string())),
    }
}

fn expect_args(line: usize, mnemonic: &str, args: &[Operand], n: usize) -> Result<(), Error> {
    if args.len() != n {
        return Err(Error::Syntax(
            line,
            format!("{mnemonic} expects {n} operand(s), got {}", args.len()),
        ));
    }
    Ok(())
}

fn reg(line: usize, mnemonic: &str, op: &Operand) -> Result<Reg, Error> {
    match op {
        Operand::Reg(r) => Ok(*r),
        Operand::Sym(s) => Err(Error::UnknownRegister(s.clone())),
        other => Err(Error::Syntax(
            line,
            format!("{mnemonic} expects a register, got `{other:?}`"),
        )),
    }
}

fn lookup_absolute(sym: &str, symbols: &SymbolTable) -> Result<u32, Error> {
    symbols.absolute(sym).ok_or_else(|| Error::UndefinedSymbol(sym.to_string()))
}

/// Immediate slot: a literal, or a `%lo` half of a symbol's address.
fn imm_value(line: usize, op: &Operand, symbols: &SymbolTable) -> Result<i64, Error> {
    match op {
        Operand::Imm(v) => Ok(*v),
        Operand::Lo(sym) => Ok(hi_lo(lookup_absolute(sym, symbols)? as i64).1 as i64),
        Operand::Sym(s) => Err(Error::Syntax(
            line,
            format!("symbol `{s}` is not valid as an immediate"),
        )),
        other => Err(Error::Syntax(line, format!("expected an immediate, got `{other:?}`"))),
    }
}

/// Memory operand: `offset(base)`, or a bare data symbol addressed off `x0`.
fn mem_ref(line: usize, op: &Operand, symbols: &SymbolTable) -> Result<(Reg, i64), Error> {
    match op {
        Operand::Mem { offset, base } => Ok((*base, *offset)),
        Operand::Sym(sym) => {
            let addr = symbols
                .data_addr(sym)
                .ok_or_else(|| Error::UndefinedSymbol(sym.to_string()))?;
            Ok((Reg::X0, (layout::DATA_BASE + addr) as i64))
        }
        other => Err(Error::Syntax(line, format!("expected a memory operand, got `{other:?}`"))),
    }
}

/// PC-relative branch/jump target: a text label or a literal byte delta.
fn target_delta(
    line: usize,
    op: &Operand,
    pc: u32,
    symbols: &SymbolTable,
    bits: u32,
) -> Result<i32, Error> {
    let delta = match op {
        Operand::Sym(sym) => {
            let addr = symbols
                .text_addr(sym)
                .ok_or_else(|| Error::UndefinedSymbol(sym.to_string()))?;
            addr as i64 - pc as i64
        }
        Operand::Imm(v) => *v,
        other => Err(Error::Syntax(line, format!("expected a jump target, got `{other:?}`")))?,
    };
    if delta % 2 != 0 {
        return Err(Error::OperandOutOfRange(line, format!("misaligned target offset {delta}")));
    }
    if !fits_signed(delta, bits) {
        return Err(Error::OperandOutOfRange(
            line,
            format!("target offset {delta} does not fit in {bits} bits"),
        ));
    }
    Ok(delta as i32)
}

/// Range-check an immediate against its field width. Values fitting the width
/// as either signed or unsigned are accepted and stored in signed canonical
/// form, so encode/decode round-trips.
fn field(line: usize, value: i64, bits: u32, what: &str) -> Result<i32, Error> {
    if !fits_signed(value, bits) && !fits_unsigned(value, bits) {
        return Err(Error::OperandOutOfRange(
            line,
            format!("{what} {value} does not fit in {bits} bits"),
        ));
    }
    let mask = (1i64 << bits) - 1;
    Ok((((value & mask) << (64 - bits)) >> (64 - bits)) as i32)
}
