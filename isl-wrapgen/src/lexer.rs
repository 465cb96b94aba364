//! Header text → single-statement declaration strings, and declaration
//! strings → tokens.

use tracing::trace;

/// Split preprocessed header text into individual declarations.
///
/// Continuation lines are joined, preprocessor directives dropped, and
/// typedefs, `extern` lines, forward struct declarations, comments and
/// brace blocks skipped. What remains is accumulated until the parentheses
/// balance; each such buffer is one declaration.
pub fn split_declarations(text: &str) -> Vec<String> {
    let lines = logical_lines(text);

    let mut decls = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() || line.starts_with("extern") {
            i += 1;
        } else if line.contains("/*") {
            i = skip_until(&lines, i, "*/");
        } else if line.ends_with('{') {
            // Also covers multi-line `typedef enum {`.
            i = skip_until(&lines, i, "}");
        } else if line.starts_with("typedef") || line == "}" || is_struct_forward_decl(line) {
            i += 1;
        } else {
            let mut decl = String::new();
            loop {
                decl.push_str(line_at(&lines, i));
                if !decl.is_empty() {
                    decl.push(' ');
                }
                i += 1;
                if is_struct_forward_decl(&decl) {
                    break;
                }
                let open = decl.matches('(').count();
                let close = decl.matches(')').count();
                if open > 0 && open == close {
                    break;
                }
                if i >= lines.len() {
                    trace!(decl = %decl.trim(), "unterminated declaration at end of header");
                    break;
                }
            }
            if !is_struct_forward_decl(&decl) {
                decls.push(decl.trim().to_string());
            }
        }
    }
    decls
}

fn line_at<'a>(lines: &'a [String], i: usize) -> &'a str {
    lines.get(i).map(|l| l.trim()).unwrap_or("")
}

/// Advance past the line containing `terminator`, starting at `start`.
fn skip_until(lines: &[String], start: usize, terminator: &str) -> usize {
    let mut i = start;
    while i < lines.len() {
        if lines[i].contains(terminator) {
            return i + 1;
        }
        i += 1;
    }
    i
}

/// Join `\` continuations, drop directives and `__isl_subclass(...)`
/// markers, and break inline multi-declarations after their `;`.
fn logical_lines(text: &str) -> Vec<String> {
    let raw: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let mut line = strip_subclass_markers(raw[i].trim());
        i += 1;
        while line.ends_with('\\') {
            line.pop();
            if let Some(next) = raw.get(i) {
                line.push_str(next.trim());
            }
            i += 1;
        }
        if line.trim_start().starts_with('#') {
            continue;
        }
        out.extend(split_inline_semicolons(&line));
    }
    out
}

/// `a; b` → [`a;`, `b`], only where the `;` is followed by a word character.
fn split_inline_semicolons(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let bytes = line.as_bytes();
    for (pos, &b) in bytes.iter().enumerate() {
        if b != b';' {
            continue;
        }
        let rest = &line[pos + 1..];
        let next = rest.trim_start_matches([' ', '\t']);
        if next.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            parts.push(line[start..=pos].to_string());
            start = line.len() - next.len();
        }
    }
    parts.push(line[start..].to_string());
    parts
}

fn strip_subclass_markers(line: &str) -> String {
    const MARKER: &str = "__isl_subclass";
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find(MARKER) {
        out.push_str(&rest[..pos]);
        let after = rest[pos + MARKER.len()..].trim_start();
        match after.strip_prefix('(').and_then(|a| a.find(')').map(|end| &a[end + 1..])) {
            Some(tail) => rest = tail,
            None => {
                out.push_str(MARKER);
                rest = &rest[pos + MARKER.len()..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// `struct isl_foo;`, optionally with `__isl_export` on either side of
/// `struct`.
pub fn is_struct_forward_decl(text: &str) -> bool {
    let mut lexer = Lexer::new(text);
    let mut saw_struct = false;
    let mut saw_name = false;
    loop {
        match lexer.next_token() {
            Token::Ident(w) if w == "__isl_export" && !saw_name => {}
            Token::Ident(w) if w == "struct" && !saw_struct => saw_struct = true,
            Token::Ident(_) if saw_struct && !saw_name => saw_name = true,
            Token::Semicolon if saw_name => return true,
            Token::Eof => return false,
            _ => {
                saw_struct = false;
                saw_name = false;
            }
        }
    }
}

/// Tokens of the declaration grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Star,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Ellipsis,
    /// Any other punctuation character (e.g. `[`, `=`).
    Other(char),
    Eof,
}

/// Character-level lexer over one declaration string.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Lex the whole input, excluding the trailing [`Token::Eof`].
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            match lexer.next_token() {
                Token::Eof => return tokens,
                tok => tokens.push(tok),
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}

        let Some(c) = self.chars.next() else {
            return Token::Eof;
        };
        match c {
            '*' => Token::Star,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '.' if self.chars.peek() == Some(&'.') => {
                self.chars.next();
                self.chars.next_if_eq(&'.');
                Token::Ellipsis
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(c) = self.chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    ident.push(c);
                }
                Token::Ident(ident)
            }
            other => Token::Other(other),
        }
    }
}
