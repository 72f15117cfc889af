use indexmap::IndexMap;

use crate::error::Error;
use crate::parser::is_ident;

/// Expansion nesting bound; a self-recursive macro trips this.
pub const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    /// Raw body lines with their original source line numbers.
    pub body: Vec<(usize, String)>,
}

/// Macro registry. Written by `scan`, read-only during expansion.
#[derive(Debug, Default)]
pub struct Macros {
    defs: IndexMap<String, MacroDef>,
}

impl Macros {
    /// Pre-scan: collect `.macro name(params)` .. `.end_macro` definitions and
    /// return the registry plus the stream with the definitions removed.
    pub fn scan(lines: &[(usize, String)]) -> Result<(Macros, Vec<(usize, String)>), Error> {
        let mut defs: IndexMap<String, MacroDef> = IndexMap::new();
        let mut rest = Vec::new();
        let mut current: Option<(usize, MacroDef)> = None;

        for (num, text) in lines {
            let trimmed = text.trim();
            let head = trimmed.split_whitespace().next().unwrap_or("");
            if head == ".macro" {
                if current.is_some() {
                    return Err(Error::Syntax(*num, "nested .macro definition".to_string()));
                }
                let header = trimmed[".macro".len()..].trim();
                let (name, params) = parse_header(*num, header)?;
                current = Some((*num, MacroDef { name, params, body: Vec::new() }));
                continue;
            }
            if trimmed == ".end_macro" {
                let Some((_, def)) = current.take() else {
                    return Err(Error::Syntax(*num, ".end_macro without .macro".to_string()));
                };
                defs.insert(def.name.clone(), def);
                continue;
            }
            match &mut current {
                Some((_, def)) => def.body.push((*num, trimmed.to_string())),
                None => rest.push((*num, trimmed.to_string())),
            }
        }

        if let Some((num, def)) = current {
            return Err(Error::Syntax(
                num,
                format!("macro `{}` not closed with .end_macro", def.name),
            ));
        }
        Ok((Macros { defs }, rest))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Expand every invocation in the stream; the result contains no macro
    /// constructs. Expanded lines carry the invocation site's line number.
    pub fn expand(&self, lines: Vec<(usize, String)>) -> Result<Vec<(usize, String)>, Error> {
        let mut out = Vec::new();
        for (num, text) in lines {
            self.expand_line(num, &text, 0, &mut out)?;
        }
        Ok(out)
    }

    fn expand_line(
        &self,
        num: usize,
        text: &str,
        depth: usize,
        out: &mut Vec<(usize, String)>,
    ) -> Result<(), Error> {
        let trimmed = text.trim();
        let Some((name, args)) = self.invocation(num, trimmed)? else {
            out.push((num, trimmed.to_string()));
            return Ok(());
        };
        if depth >= MAX_DEPTH {
            return Err(Error::MacroRecursionLimit(name));
        }
        let def = &self.defs[&name];
        if args.len() != def.params.len() {
            return Err(Error::Syntax(
                num,
                format!(
                    "macro `{}` expects {} argument(s), got {}",
                    name,
                    def.params.len(),
                    args.len()
                ),
            ));
        }
        for (_, body_line) in &def.body {
            let substituted = substitute(body_line, &def.params, &args);
            self.expand_line(num, &substituted, depth + 1, out)?;
        }
        Ok(())
    }

    /// Recognize a macro invocation: a head token that is a registered name,
    /// with parenthesized or comma-separated arguments. `name(...)` syntax on
    /// an unregistered name is an error; a bare unknown head falls through to
    /// the instruction path.
    fn invocation(&self, num: usize, line: &str) -> Result<Option<(String, Vec<String>)>, Error> {
        let head = line.split_whitespace().next().unwrap_or("");
        let (name, attached) = match head.split_once('(') {
            Some((name, _)) => (name, true),
            None => (head, false),
        };
        if !is_ident(name) {
            return Ok(None);
        }
        if !self.defs.contains_key(name) {
            if attached {
                return Err(Error::UndefinedMacro(name.to_string()));
            }
            return Ok(None);
        }
        let rest = line[line.find(name).unwrap() + name.len()..].trim();
        let args_text = if let Some(inner) = rest.strip_prefix('(') {
            let Some(inner) = inner.strip_suffix(')') else {
                return Err(Error::Syntax(num, format!("unclosed macro call: `{line}`")));
            };
            inner
        } else {
            rest
        };
        let args: Vec<String> = args_text
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        Ok(Some((name.to_string(), args)))
    }
}

fn parse_header(num: usize, header: &str) -> Result<(String, Vec<String>), Error> {
    let (name, params_text) = match header.split_once('(') {
        Some((name, rest)) => {
            let Some(inner) = rest.trim_end().strip_suffix(')') else {
                return Err(Error::Syntax(num, "unclosed .macro parameter list".to_string()));
            };
            (name.trim(), inner)
        }
        None => (header.trim(), ""),
    };
    if !is_ident(name) {
        return Err(Error::Syntax(num, format!("bad macro name: `{name}`")));
    }
    let mut params = Vec::new();
    for p in params_text.split(',') {
        let p = p.trim();
        if p.is_empty() {
            continue;
        }
        if !is_ident(p) {
            return Err(Error::Syntax(num, format!("bad macro parameter: `{p}`")));
        }
        params.push(p.to_string());
    }
    Ok((name.to_string(), params))
}

/// Whole-token textual substitution of formals (and `\formal` escapes) with
/// the actual argument text.
fn substitute(line: &str, params: &[String], actuals: &[String]) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let escaped = chars[i] == '\\';
        let start = if escaped { i + 1 } else { i };
        if start < chars.len() && (chars[start].is_ascii_alphabetic() || chars[start] == '_') {
            let mut j = start;
            while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
            let word: String = chars[start..j].iter().collect();
            if let Some(idx) = params.iter().position(|p| *p == word) {
                out.push_str(&actuals[idx]);
            } else {
                if escaped {
                    out.push('\\');
                }
                out.push_str(&word);
            }
            i = j;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<(usize, String)> {
        src.lines().enumerate().map(|(i, l)| (i + 1, l.to_string())).collect()
    }

    #[test]
    fn scan_and_expand() {
        let src = "\
.macro DOUBLE(r)
add r, r, r
.end_macro
DOUBLE(a0)
DOUBLE(t1)";
        let (macros, rest) = Macros::scan(&lines(src)).unwrap();
        assert_eq!(macros.len(), 1);
        let out = macros.expand(rest).unwrap();
        let texts: Vec<&str> = out.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["add a0, a0, a0", "add t1, t1, t1"]);
        // Provenance points at the invocation site
        assert_eq!(out[0].0, 4);
        assert_eq!(out[1].0, 5);
    }

    #[test]
    fn backslash_escaped_formals() {
        let (macros, rest) =
            Macros::scan(&lines(".macro M(x)\naddi \\x, \\x, 1\n.end_macro\nM(t0)")).unwrap();
        let out = macros.expand(rest).unwrap();
        assert_eq!(out[0].1, "addi t0, t0, 1");
    }

    #[test]
    fn whole_token_substitution_only() {
        let (macros, rest) =
            Macros::scan(&lines(".macro M(a)\naddi a0, a0, a\n.end_macro\nM(7)")).unwrap();
        let out = macros.expand(rest).unwrap();
        // `a0` stays; the bare formal `a` is replaced
        assert_eq!(out[0].1, "addi a0, a0, 7");
    }

    #[test]
    fn nested_invocation() {
        let src = "\
.macro INNER(r)
addi r, r, 1
.end_macro
.macro OUTER(r)
INNER(r)
INNER(r)
.end_macro
OUTER(s1)";
        let (macros, rest) = Macros::scan(&lines(src)).unwrap();
        let out = macros.expand(rest).unwrap();
        let texts: Vec<&str> = out.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["addi s1, s1, 1", "addi s1, s1, 1"]);
    }

    #[test]
    fn recursion_limit() {
        let src = ".macro LOOP\nLOOP\n.end_macro\nLOOP";
        let (macros, rest) = Macros::scan(&lines(src)).unwrap();
        assert!(matches!(macros.expand(rest), Err(Error::MacroRecursionLimit(_))));
    }

    #[test]
    fn undefined_macro_call() {
        let (macros, rest) = Macros::scan(&lines("FOO(1)")).unwrap();
        assert!(matches!(macros.expand(rest), Err(Error::UndefinedMacro(name)) if name == "FOO"));
    }

    #[test]
    fn unterminated_definition() {
        assert!(matches!(
            Macros::scan(&lines(".macro M\nnop")),
            Err(Error::Syntax(1, _))
        ));
    }

    #[test]
    fn end_without_begin() {
        assert!(matches!(Macros::scan(&lines(".end_macro")), Err(Error::Syntax(1, _))));
    }
}
