use arch::inst::Inst;
use arch::isa::rv32i;
use arch::layout;

use crate::data::DataSeg;
use crate::error::Error;
use crate::macros::Macros;
use crate::parser::{self, Space, Stmt, StmtKind};
use crate::pseudo;
use crate::resolve;
use crate::symbol::SymbolTable;

/// One user-program instruction after pass 2.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub line: usize,
    /// User-region-relative byte address.
    pub addr: u32,
    pub inst: Inst,
    pub word: u32,
}

/// A fully assembled (but not yet linked) program.
#[derive(Debug, Default)]
pub struct Program {
    pub text: Vec<Encoded>,
    pub symbols: SymbolTable,
    pub data: DataSeg,
    pub globals: Vec<String>,
}

impl Program {
    pub fn words(&self) -> Vec<u32> {
        self.text.iter().map(|e| e.word).collect()
    }
}

/// Run the whole front half of the pipeline: comment stripping, macro
/// expansion, parsing, pseudo expansion, then the two resolution passes.
pub fn assemble(source: &str) -> Result<Program, Error> {
    // Strip comments, drop blank lines, keep 1-based line numbers
    let lines: Vec<(usize, String)> = source
        .lines()
        .enumerate()
        .map(|(idx, raw)| (idx + 1, parser::strip_comment(raw).trim().to_string()))
        .filter(|(_, text)| !text.is_empty())
        .collect();

    // Macro registry is written here and read-only afterwards
    let (macros, stream) = Macros::scan(&lines)?;
    let stream = macros.expand(stream)?;

    let mut stmts = Vec::new();
    for (num, text) in &stream {
        stmts.extend(Stmt::parse(*num, text)?);
    }

    let mut expanded = Vec::new();
    for stmt in stmts {
        expanded.extend(pseudo::expand(stmt)?);
    }

    // Pass 1: assign label addresses in both spaces, build the data image
    let mut symbols = SymbolTable::default();
    let mut data = DataSeg::default();
    let mut globals = Vec::new();
    let mut space = Space::Text;
    let mut pc: u32 = 0;
    for stmt in &expanded {
        match &stmt.kind {
            StmtKind::Seg(s) => space = *s,
            StmtKind::Label(name) => {
                let addr = match space {
                    Space::Text => pc,
                    Space::Data => data.cursor(),
                };
                symbols.define(space, name, addr)?;
            }
            StmtKind::Inst { .. } => {
                if space != Space::Text {
                    return Err(Error::Syntax(
                        stmt.line,
                        "instruction outside the .text segment".to_string(),
                    ));
                }
                pc += layout::WORD_BYTES;
            }
            StmtKind::Data { kind, values } => {
                if space != Space::Data {
                    return Err(Error::Syntax(
                        stmt.line,
                        "data directive outside the .data segment".to_string(),
                    ));
                }
                data.push(stmt.line, *kind, values)?;
            }
            StmtKind::Globl(name) => globals.push(name.clone()),
        }
    }

    // Pass 2: resolve references and encode
    let isa = rv32i();
    let mut text = Vec::new();
    let mut pc: u32 = 0;
    for stmt in &expanded {
        if let StmtKind::Inst { mnemonic, args } = &stmt.kind {
            let inst = resolve::resolve_inst(stmt.line, mnemonic, args, pc, &symbols)?;
            let word = inst.to_bin(isa).map_err(|msg| Error::Syntax(stmt.line, msg))?;
            text.push(Encoded { line: stmt.line, addr: pc, inst, word });
            pc += layout::WORD_BYTES;
        }
    }

    Ok(Program { text, symbols, data, globals })
}
