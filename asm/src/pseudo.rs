use arch::reg::Reg;

use crate::error::Error;
use crate::parser::{Operand, Stmt, StmtKind};

/// Carry-corrected `%hi`/`%lo` split: `(hi << 12) + sext(lo)` reconstructs
/// the address.
pub fn hi_lo(addr: i64) -> (u32, i32) {
    let hi = ((addr + 0x800) >> 12) & 0xFFFFF;
    let lo = ((addr & 0xFFF) << 52 >> 52) as i32;
    (hi as u32, lo)
}

pub fn fits_signed(v: i64, bits: u32) -> bool {
    v >= -(1 << (bits - 1)) && v < (1 << (bits - 1))
}

pub fn fits_unsigned(v: i64, bits: u32) -> bool {
    v >= 0 && v < (1 << bits)
}

fn inst(line: usize, mnemonic: &str, args: Vec<Operand>) -> Stmt {
    Stmt { line, kind: StmtKind::Inst { mnemonic: mnemonic.to_string(), args } }
}

/// Rewrite convenience mnemonics into canonical statements. Each template is
/// fixed; only `li` picks between its one- and two-word forms, on the literal
/// value alone. Unknown mnemonics pass through untouched.
pub fn expand(stmt: Stmt) -> Result<Vec<Stmt>, Error> {
    let line = stmt.line;
    let StmtKind::Inst { mnemonic, args } = &stmt.kind else {
        return Ok(vec![stmt]);
    };

    match (mnemonic.as_str(), args.as_slice()) {
        ("nop", []) => Ok(vec![inst(
            line,
            "addi",
            vec![Operand::Reg(Reg::X0), Operand::Reg(Reg::X0), Operand::Imm(0)],
        )]),
        ("nop", _) => Err(Error::Syntax(line, "nop takes no operands".to_string())),

        ("mv", [Operand::Reg(rd), Operand::Reg(rs)]) => Ok(vec![inst(
            line,
            "addi",
            vec![Operand::Reg(*rd), Operand::Reg(*rs), Operand::Imm(0)],
        )]),
        ("mv", _) => Err(Error::Syntax(line, "mv expects `mv rd, rs`".to_string())),

        ("li", [Operand::Reg(rd), Operand::Imm(v)]) => {
            if !fits_signed(*v, 32) && !fits_unsigned(*v, 32) {
                return Err(Error::OperandOutOfRange(
                    line,
                    format!("li value {v} does not fit in 32 bits"),
                ));
            }
            if fits_signed(*v, 12) {
                return Ok(vec![inst(
                    line,
                    "addi",
                    vec![Operand::Reg(*rd), Operand::Reg(Reg::X0), Operand::Imm(*v)],
                )]);
            }
            let (hi, lo) = hi_lo(*v);
            Ok(vec![
                inst(line, "lui", vec![Operand::Reg(*rd), Operand::Imm(hi as i64)]),
                inst(
                    line,
                    "addi",
                    vec![Operand::Reg(*rd), Operand::Reg(*rd), Operand::Imm(lo as i64)],
                ),
            ])
        }
        ("li", _) => Err(Error::Syntax(line, "li expects `li rd, imm`".to_string())),

        ("la", [Operand::Reg(rd), Operand::Sym(sym)]) => Ok(vec![
            inst(line, "lui", vec![Operand::Reg(*rd), Operand::Hi(sym.clone())]),
            inst(
                line,
                "addi",
                vec![Operand::Reg(*rd), Operand::Reg(*rd), Operand::Lo(sym.clone())],
            ),
        ]),
        ("la", _) => Err(Error::Syntax(line, "la expects `la rd, symbol`".to_string())),

        ("j", [target @ (Operand::Sym(_) | Operand::Imm(_))]) => Ok(vec![inst(
            line,
            "jal",
            vec![Operand::Reg(Reg::X0), target.clone()],
        )]),
        ("j", _) => Err(Error::Syntax(line, "j expects `j target`".to_string())),

        // `jal target` links through ra
        ("jal", [target @ (Operand::Sym(_) | Operand::Imm(_))]) => Ok(vec![inst(
            line,
            "jal",
            vec![Operand::Reg(Reg::X1), target.clone()],
        )]),

        _ => Ok(vec![stmt.clone()]),
    }
}
