use arch::reg::Reg;

use crate::error::Error;

// ----------------------------------------------------------------------------
// Statement

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Text,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Byte,
    Half,
    Word,
    Asciiz,
    Space,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Reg(Reg),
    Imm(i64),
    /// `offset(base)` memory reference.
    Mem { offset: i64, base: Reg },
    /// Unresolved symbol reference.
    Sym(String),
    /// Upper 20 bits of a symbol's address, carry-corrected (`%hi`).
    Hi(String),
    /// Sign-extended low 12 bits of a symbol's address (`%lo`).
    Lo(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Label(String),
    Inst { mnemonic: String, args: Vec<Operand> },
    Seg(Space),
    Data { kind: DataKind, values: Vec<DataValue> },
    Globl(String),
}

/// One parsed statement with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

impl Stmt {
    /// Parse one comment-stripped source line. A line may carry labels
    /// followed by at most one instruction or directive.
    pub fn parse(line: usize, code: &str) -> Result<Vec<Stmt>, Error> {
        let mut out = Vec::new();
        let mut rest = code.trim();

        // main: / .L1: / a: b: nop
        while let Some((label, tail)) = split_label(rest) {
            out.push(Stmt { line, kind: StmtKind::Label(label.to_string()) });
            rest = tail.trim_start();
        }
        if rest.is_empty() {
            return Ok(out);
        }

        let kind = if rest.starts_with('.') {
            parse_directive(line, rest)?
        } else {
            parse_inst(line, rest)?
        };
        out.push(Stmt { line, kind });
        Ok(out)
    }
}

/// `name:` prefix of a line, if present. Dotted local labels (`.L1:`) count.
fn split_label(code: &str) -> Option<(&str, &str)> {
    let colon = code.find(':')?;
    let (head, tail) = code.split_at(colon);
    let head = head.trim_end();
    if !head.is_empty() && is_ident(head) {
        Some((head, &tail[1..]))
    } else {
        None
    }
}

pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn parse_directive(line: usize, code: &str) -> Result<StmtKind, Error> {
    let (word, rest) = match code.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (code, ""),
    };
    match word {
        ".text" => Ok(StmtKind::Seg(Space::Text)),
        ".data" => Ok(StmtKind::Seg(Space::Data)),
        ".globl" => {
            if !is_ident(rest) {
                return Err(Error::Syntax(line, format!("bad .globl operand: `{rest}`")));
            }
            Ok(StmtKind::Globl(rest.to_string()))
        }
        ".byte" | ".half" | ".word" => {
            let kind = match word {
                ".byte" => DataKind::Byte,
                ".half" => DataKind::Half,
                _ => DataKind::Word,
            };
            let mut values = Vec::new();
            for part in rest.split(',') {
                let part = part.trim();
                let v = parse_int(part)
                    .ok_or_else(|| Error::Syntax(line, format!("bad {word} value: `{part}`")))?;
                values.push(DataValue::Int(v));
            }
            if values.is_empty() {
                return Err(Error::Syntax(line, format!("{word} needs at least one value")));
            }
            Ok(StmtKind::Data { kind, values })
        }
        ".asciiz" => {
            let s = parse_string(rest).map_err(|e| Error::Syntax(line, e))?;
            Ok(StmtKind::Data { kind: DataKind::Asciiz, values: vec![DataValue::Str(s)] })
        }
        ".space" => {
            let v = parse_int(rest)
                .filter(|v| *v >= 0)
                .ok_or_else(|| Error::Syntax(line, format!("bad .space size: `{rest}`")))?;
            Ok(StmtKind::Data { kind: DataKind::Space, values: vec![DataValue::Int(v)] })
        }
        ".macro" | ".end_macro" => {
            Err(Error::Syntax(line, format!("{word} is not allowed here")))
        }
        _ => Err(Error::Syntax(line, format!("unknown directive: `{word}`"))),
    }
}

fn parse_inst(line: usize, code: &str) -> Result<StmtKind, Error> {
    let (head, rest) = match code.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (code, ""),
    };
    let mnemonic = head.to_ascii_lowercase();
    let mut args = Vec::new();
    if !rest.is_empty() {
        for part in rest.split(',') {
            args.push(Operand::parse(line, part.trim())?);
        }
    }
    Ok(StmtKind::Inst { mnemonic, args })
}

impl Operand {
    pub fn parse(line: usize, s: &str) -> Result<Operand, Error> {
        if s.is_empty() {
            return Err(Error::Syntax(line, "empty operand".to_string()));
        }
        if let Ok(r) = Reg::parse(s) {
            return Ok(Operand::Reg(r));
        }
        if let Some(v) = parse_int(s) {
            return Ok(Operand::Imm(v));
        }
        for (prefix, hi) in [("%hi(", true), ("%lo(", false)] {
            if let Some(inner) = s.strip_prefix(prefix).and_then(|t| t.strip_suffix(')')) {
                let inner = inner.trim();
                if !is_ident(inner) {
                    return Err(Error::Syntax(line, format!("bad symbol in `{s}`")));
                }
                let name = inner.to_string();
                return Ok(if hi { Operand::Hi(name) } else { Operand::Lo(name) });
            }
        }
        // offset(base)
        if let Some(open) = s.find('(') {
            let Some(inner) = s[open + 1..].strip_suffix(')') else {
                return Err(Error::Syntax(line, format!("bad memory operand: `{s}`")));
            };
            let offset_text = s[..open].trim();
            let offset = if offset_text.is_empty() {
                0
            } else {
                parse_int(offset_text).ok_or_else(|| {
                    Error::Syntax(line, format!("bad memory offset: `{offset_text}`"))
                })?
            };
            let base =
                Reg::parse(inner.trim()).map_err(|_| Error::UnknownRegister(inner.to_string()))?;
            return Ok(Operand::Mem { offset, base });
        }
        if is_ident(s) {
            return Ok(Operand::Sym(s.to_string()));
        }
        Err(Error::Syntax(line, format!("cannot parse operand: `{s}`")))
    }
}

// ----------------------------------------------------------------------------
// Literals

/// Integer literal: decimal, `0x`/`0o`/`0b` prefixed, or a char (`'A'`).
pub fn parse_int(s: &str) -> Option<i64> {
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if body.is_empty() {
        return None;
    }
    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if let Some(oct) = body.strip_prefix("0o").or_else(|| body.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()?
    } else if body.len() == 3 && body.starts_with('\'') && body.ends_with('\'') {
        body.chars().nth(1)? as i64
    } else {
        body.parse::<i64>().ok()?
    };
    Some(if neg { -magnitude } else { magnitude })
}

/// Quoted string with `\n \t \" \\` escapes.
fn parse_string(s: &str) -> Result<String, String> {
    let s = s.trim();
    let Some(body) = s.strip_prefix('"') else {
        return Err(format!("expected quoted string, got `{s}`"));
    };
    let mut out = String::new();
    let mut chars = body.chars();
    loop {
        match chars.next() {
            None => return Err("unterminated string".to_string()),
            Some('"') => break,
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(c) => return Err(format!("unknown escape: `\\{c}`")),
                None => return Err("unterminated string".to_string()),
            },
            Some(c) => out.push(c),
        }
    }
    if chars.next().is_some() {
        return Err("trailing characters after string".to_string());
    }
    Ok(out)
}

/// Strip an end-of-line `#` comment, leaving `#` inside string literals alone.
pub fn strip_comment(raw: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &raw[..i],
            _ => {}
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_inst() {
        let stmts = Stmt::parse(1, "main: addi x1, x0, 1").unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].kind, StmtKind::Label("main".to_string()));
        assert_eq!(
            stmts[1].kind,
            StmtKind::Inst {
                mnemonic: "addi".to_string(),
                args: vec![Operand::Reg(Reg::X1), Operand::Reg(Reg::X0), Operand::Imm(1)],
            }
        );
    }

    #[test]
    fn dotted_label() {
        let stmts = Stmt::parse(1, ".L1:").unwrap();
        assert_eq!(stmts[0].kind, StmtKind::Label(".L1".to_string()));
    }

    #[test]
    fn mem_operand() {
        let stmts = Stmt::parse(1, "lw a0, 4(sp)").unwrap();
        assert_eq!(
            stmts[0].kind,
            StmtKind::Inst {
                mnemonic: "lw".to_string(),
                args: vec![
                    Operand::Reg(Reg::X10),
                    Operand::Mem { offset: 4, base: Reg::X2 }
                ],
            }
        );
        // No offset means zero
        let stmts = Stmt::parse(1, "lw a0, (sp)").unwrap();
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Inst { args, .. } if args[1] == Operand::Mem { offset: 0, base: Reg::X2 }
        ));
    }

    #[test]
    fn mem_operand_bad_base() {
        assert!(matches!(
            Stmt::parse(1, "lw a0, 4(hoge)"),
            Err(Error::UnknownRegister(name)) if name == "hoge"
        ));
    }

    #[test]
    fn hi_lo_operands() {
        let stmts = Stmt::parse(1, "lui a0, %hi(msg)").unwrap();
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Inst { args, .. } if args[1] == Operand::Hi("msg".to_string())
        ));
    }

    #[test]
    fn data_directives() {
        let stmts = Stmt::parse(1, "x: .word 42, 0x10, -1").unwrap();
        assert_eq!(
            stmts[1].kind,
            StmtKind::Data {
                kind: DataKind::Word,
                values: vec![DataValue::Int(42), DataValue::Int(16), DataValue::Int(-1)],
            }
        );
        let stmts = Stmt::parse(1, r#"msg: .asciiz "hi\n""#).unwrap();
        assert_eq!(
            stmts[1].kind,
            StmtKind::Data {
                kind: DataKind::Asciiz,
                values: vec![DataValue::Str("hi\n".to_string())],
            }
        );
    }

    #[test]
    fn unknown_directive() {
        assert!(matches!(Stmt::parse(3, ".frob 1"), Err(Error::Syntax(3, _))));
    }

    #[test]
    fn literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("-42"), Some(-42));
        assert_eq!(parse_int("0x2A"), Some(42));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("'A'"), Some(65));
        assert_eq!(parse_int("x1"), None);
    }

    #[test]
    fn comments() {
        assert_eq!(strip_comment("addi x1, x0, 1 # inc"), "addi x1, x0, 1 ");
        assert_eq!(strip_comment(r#".asciiz "a#b" # real"#), r#".asciiz "a#b" "#);
        assert_eq!(strip_comment("# whole line"), "");
    }
}
