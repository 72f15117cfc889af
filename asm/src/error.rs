use color_print::ceprintln;
use thiserror::Error;

/// Fatal assembly/link errors. Every variant aborts the run; no output files
/// are written once one of these is raised.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Syntax error at line {0}: {1}")]
    Syntax(usize, String),

    #[error("Undefined macro: `{0}`")]
    UndefinedMacro(String),

    #[error("Macro recursion limit exceeded while expanding `{0}`")]
    MacroRecursionLimit(String),

    #[error("Undefined symbol: `{0}`")]
    UndefinedSymbol(String),

    #[error("Duplicate symbol: `{0}`")]
    DuplicateSymbol(String),

    #[error("Operand out of range at line {0}: {1}")]
    OperandOutOfRange(usize, String),

    #[error("Unknown instruction: `{0}`")]
    UnknownInstruction(String),

    #[error("Unknown register: `{0}`")]
    UnknownRegister(String),

    #[error("User program too large: {0} bytes, region capacity is {1} bytes")]
    RegionOverflow(usize, usize),

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to create output: {0}")]
    FileCreate(String, #[source] std::io::Error),

    #[error("Failed to write output: {0}")]
    FileWrite(String, #[source] std::io::Error),
}

impl Error {
    /// Source line this error points at, if it carries one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Syntax(line, _) | Error::OperandOutOfRange(line, _) => Some(*line),
            _ => None,
        }
    }

    /// Print the error with the offending source line quoted, rustc-style.
    pub fn print_diag(&self, file: &str, source: &str) {
        ceprintln!("<red,bold>error</>: {}", self);
        if let Some(line_num) = self.line() {
            let content = source.lines().nth(line_num - 1).unwrap_or("");
            ceprintln!("     <blue>--></> <underline>{}:{}</>", file, line_num);
            ceprintln!("      <blue>|</>");
            ceprintln!(" <blue>{:>4} |</> {}", line_num, content.trim_end());
            ceprintln!("      <blue>|</>");
        }
    }
}
