//! Function-like macro expansion for the declaration macros isl keeps in its
//! macro headers (`ISL_DECLARE_LIST_FN(id)` and friends).
//!
//! Only what those headers use is supported: function-like `#define`s with
//! `\` continuations, parameter substitution, `##` pasting, `#` stringizing
//! and nested expansion. A macro is never re-expanded inside its own
//! expansion.

use std::collections::HashMap;

use tracing::{debug, warn};

/// Nesting limit for macro-in-macro expansion.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
struct MacroDef {
    params: Vec<String>,
    body: String,
}

/// Function-like macros collected from the macro headers.
#[derive(Debug, Default, Clone)]
pub struct MacroTable {
    defs: HashMap<String, MacroDef>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Record every function-like `#define` in `text`. Later definitions
    /// replace earlier ones.
    pub fn collect(&mut self, text: &str) {
        for line in joined_lines(text) {
            let Some(def) = line.trim_start().strip_prefix('#') else {
                continue;
            };
            let Some(def) = def.trim_start().strip_prefix("define") else {
                continue;
            };
            if !def.starts_with([' ', '\t']) {
                continue;
            }
            let def = def.trim_start();
            let name_end = ident_end(def.as_bytes(), 0);
            let (name, rest) = def.split_at(name_end);
            // Ownership markers must survive as plain words.
            if name.is_empty() || name.starts_with("__isl_") {
                continue;
            }
            // Function-like only when `(` follows the name directly.
            let Some(rest) = rest.strip_prefix('(') else {
                continue;
            };
            let Some(close) = rest.find(')') else {
                warn!(name, "unterminated macro parameter list");
                continue;
            };
            let params = rest[..close]
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            let body = strip_comments(&rest[close + 1..]).trim().to_string();
            debug!(name, "collected macro");
            self.defs.insert(name.to_string(), MacroDef { params, body });
        }
    }

    /// Expand every invocation of a known macro in `text`.
    pub fn expand(&self, text: &str) -> String {
        if self.defs.is_empty() {
            return text.to_string();
        }
        self.expand_with(text, &mut Vec::new())
    }

    fn expand_with(&self, text: &str, active: &mut Vec<String>) -> String {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut i = 0;
        while i < bytes.len() {
            let starts_ident = is_ident_start(bytes[i]) && (i == 0 || !is_ident_char(bytes[i - 1]));
            if !starts_ident {
                i += 1;
                continue;
            }
            let end = ident_end(bytes, i);
            let name = &text[i..end];
            let def = self
                .defs
                .get(name)
                .filter(|_| !active.iter().any(|a| a == name));
            let (Some(def), Some((args, after))) = (def, invocation_args(text, end)) else {
                i = end;
                continue;
            };

            out.push_str(&text[copied..i]);
            let arity_ok =
                args.len() == def.params.len() || (def.params.is_empty() && args == [""]);
            if !arity_ok {
                warn!(
                    name,
                    expected = def.params.len(),
                    got = args.len(),
                    "macro argument count mismatch, left unexpanded"
                );
                out.push_str(&text[i..after]);
            } else if active.len() >= MAX_DEPTH {
                warn!(name, "macro nesting too deep, left unexpanded");
                out.push_str(&text[i..after]);
            } else {
                let body = substitute(def, &args);
                active.push(name.to_string());
                out.push_str(&self.expand_with(&body, active));
                active.pop();
            }
            copied = after;
            i = after;
        }
        out.push_str(&text[copied..]);
        out
    }
}

/// Substitute `args` into the body, applying `#` and `##`.
fn substitute(def: &MacroDef, args: &[String]) -> String {
    let arg_of = |word: &str| {
        def.params
            .iter()
            .position(|p| p == word)
            .map(|idx| args[idx].as_str())
    };

    let body = def.body.as_str();
    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' {
            if bytes.get(i + 1) == Some(&b'#') {
                let kept = out.trim_end().len();
                out.truncate(kept);
                i = skip_whitespace(bytes, i + 2);
                continue;
            }
            let start = skip_whitespace(bytes, i + 1);
            if start < bytes.len() && is_ident_start(bytes[start]) {
                let end = ident_end(bytes, start);
                if let Some(arg) = arg_of(&body[start..end]) {
                    out.push('"');
                    out.push_str(&arg.replace('\\', "\\\\").replace('"', "\\\""));
                    out.push('"');
                    i = end;
                    continue;
                }
            }
            out.push('#');
            i += 1;
        } else if is_ident_start(bytes[i]) {
            let end = ident_end(bytes, i);
            let word = &body[i..end];
            out.push_str(arg_of(word).unwrap_or(word));
            i = end;
        } else {
            let Some(ch) = body[i..].chars().next() else {
                break;
            };
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    out
}

/// Arguments of an invocation whose name ends at `pos`, and the offset just
/// past its closing parenthesis. `None` when no `(` follows or it is
/// unterminated.
fn invocation_args(text: &str, pos: usize) -> Option<(Vec<String>, usize)> {
    let bytes = text.as_bytes();
    let open = skip_whitespace(bytes, pos);
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut arg_start = open + 1;
    for (offset, &b) in bytes[open..].iter().enumerate() {
        let at = open + offset;
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    args.push(text[arg_start..at].trim().to_string());
                    return Some((args, at + 1));
                }
            }
            b',' if depth == 1 => {
                args.push(text[arg_start..at].trim().to_string());
                arg_start = at + 1;
            }
            _ => {}
        }
    }
    None
}

/// Lines with `\` continuations folded in.
fn joined_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        match line.trim_end().strip_suffix('\\') {
            Some(head) => {
                current.push_str(head);
                current.push(' ');
            }
            None => {
                current.push_str(line);
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => {
                out.push(' ');
                rest = &rest[start + 2 + end + 2..];
            }
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    end
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_H: &str = "\
#ifndef ISL_LIST_H
#define ISL_LIST_H
#define ISL_DECLARE_LIST_TYPE2(EL,EXPORT)\t\t\t\t\\
struct isl_##EL;\t\t\t\t\t\t\t\\
struct EXPORT isl_##EL##_list;\t\t\t\t\t\t\\
typedef struct isl_##EL##_list isl_##EL##_list;
#define ISL_DECLARE_LIST_TYPE(EL)\t\t\t\t\t\\
\tISL_DECLARE_LIST_TYPE2(EL,)
#define ISL_DECLARE_LIST_FN(EL)\t\t\t\t\t\t\\
isl_ctx *isl_##EL##_list_get_ctx(__isl_keep isl_##EL##_list *list);\t\\
__isl_give isl_##EL##_list *isl_##EL##_list_reverse(\t\t\t\\
\t__isl_take isl_##EL##_list *list);
#define ISL_DECLARE_LIST(EL)\t\t\t\t\t\t\\
\tISL_DECLARE_LIST_TYPE(EL)\t\t\t\t\t\\
\tISL_DECLARE_LIST_FN(EL)
#endif
";

    fn list_macros() -> MacroTable {
        let mut table = MacroTable::new();
        table.collect(LIST_H);
        table
    }

    #[test]
    fn collects_function_like_defines_only() {
        let table = list_macros();
        assert_eq!(table.len(), 4);
        assert!(table.contains("ISL_DECLARE_LIST_FN"));
        assert!(!table.contains("ISL_LIST_H"));
    }

    #[test]
    fn ownership_markers_are_not_collected() {
        let mut table = MacroTable::new();
        table.collect("#define __isl_subclass(super)\n#define __isl_give\n");
        assert!(table.is_empty());
    }

    #[test]
    fn pastes_tokens() {
        let text = list_macros().expand("ISL_DECLARE_LIST_FN(id)\n");
        assert!(text.contains("isl_ctx *isl_id_list_get_ctx(__isl_keep isl_id_list *list);"));
        assert!(text.contains("__isl_give isl_id_list *isl_id_list_reverse("));
        assert!(!text.contains("##"));
        assert!(!text.contains("EL"));
    }

    #[test]
    fn nested_macros_with_empty_argument() {
        let text = list_macros().expand("ISL_DECLARE_LIST(basic_set)");
        assert!(text.contains("struct isl_basic_set;"));
        assert!(text.contains("struct  isl_basic_set_list;"));
        assert!(text.contains("typedef struct isl_basic_set_list isl_basic_set_list;"));
        assert!(text.contains("isl_basic_set_list_reverse("));
        assert!(!text.contains("ISL_DECLARE"));
    }

    #[test]
    fn surrounding_text_is_kept() {
        let text = list_macros().expand("int isl_a;\nISL_DECLARE_LIST_FN(id)\nint isl_b;\n");
        assert!(text.starts_with("int isl_a;\n"));
        assert!(text.ends_with("\nint isl_b;\n"));
    }

    #[test]
    fn names_without_invocation_are_untouched() {
        let table = list_macros();
        assert_eq!(
            table.expand("/* see ISL_DECLARE_LIST_FN */ int x;"),
            "/* see ISL_DECLARE_LIST_FN */ int x;"
        );
        assert_eq!(table.expand("MY_ISL_DECLARE_LIST_FN(id)"), "MY_ISL_DECLARE_LIST_FN(id)");
    }

    #[test]
    fn arity_mismatch_is_left_alone() {
        let table = list_macros();
        assert_eq!(table.expand("ISL_DECLARE_LIST_FN(a, b)"), "ISL_DECLARE_LIST_FN(a, b)");
    }

    #[test]
    fn stringizing_and_self_reference() {
        let mut table = MacroTable::new();
        table.collect("#define NAME_OF(x) #x\n#define LOOP(x) LOOP(x) x\n");
        assert_eq!(table.expand("NAME_OF(isl_set)"), "\"isl_set\"");
        assert_eq!(table.expand("LOOP(1)"), "LOOP(1) 1");
    }

    #[test]
    fn comments_in_bodies_are_dropped() {
        let mut table = MacroTable::new();
        table.collect("#define F(x) /* declare x */ int isl_##x##_f(void);\n");
        assert_eq!(table.expand("F(set)"), "int isl_set_f(void);");
    }
}
