//! Code generation — [`Method`](crate::model::Method) → wrapper function
//! and exposer registration text.

pub mod callback;
pub mod exposer;
pub mod shape;
pub mod wrapper;

use crate::error::SkipReason;

/// Result of generating one method.
#[derive(Debug)]
pub enum GenerationOutcome {
    Generated(GeneratedWrapper),
    Skipped(SkipReason),
    /// The method is mutator-shaped but needs auxiliary return values; it
    /// must be regenerated with the mutator classification vetoed.
    RetryWithMutatorVetoed,
}

/// A generated wrapper function plus what the exposer needs to register it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedWrapper {
    pub code: String,
    /// User-visible argument names, receiver included.
    pub arg_names: Vec<String>,
    pub doc: String,
}

/// Line-oriented text emitter with two-space indentation.
#[derive(Debug, Default)]
pub struct CodeWriter {
    output: String,
    indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writeln(&mut self, s: &str) {
        if !s.is_empty() {
            for _ in 0..self.indent {
                self.output.push_str("  ");
            }
            self.output.push_str(s);
        }
        self.output.push('\n');
    }

    /// Write each line of `block`, keeping its relative indentation.
    pub fn block(&mut self, block: &[String]) {
        for line in block {
            self.writeln(line);
        }
    }

    /// Write `s` (usually `{`) and indent what follows.
    pub fn open(&mut self, s: &str) {
        self.writeln(s);
        self.indent += 1;
    }

    /// Dedent and write `s` (usually `}`).
    pub fn close(&mut self, s: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.writeln(s);
    }

    pub fn finish(self) -> String {
        self.output
    }
}

/// Escape text for use inside a C string literal.
pub fn c_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_indents_blocks() {
        let mut w = CodeWriter::new();
        w.open("int f()");
        w.writeln("");
        w.block(&["if (x)".to_string(), "  return 1;".to_string()]);
        w.close("}");
        assert_eq!(w.finish(), "int f()\n\n  if (x)\n    return 1;\n}\n");
    }

    #[test]
    fn string_literals_are_escaped() {
        assert_eq!(c_string_literal("a \"b\"\nc"), "\"a \\\"b\\\"\\nc\"");
    }
}
