//! Class registry — maps each isl class to the methods declared for it, in
//! declaration order.
//!
//! Bad input is per-declaration: a declaration or argument that does not
//! match the grammar is logged with `warn!` and dropped, and reading
//! continues with the next one. Only a name that matches no catalogue class
//! aborts the run.

use std::collections::HashSet;

use anyhow::{Result, bail};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::catalogue::{self, SpecialPrefix};
use crate::error::SkipReason;
use crate::lexer;
use crate::model::Method;
use crate::parser::{self, Declaration};

/// Where a C name's function ends up.
#[derive(Debug, PartialEq, Eq)]
enum Placement {
    Method { class: String, name: String },
    Ignored,
}

/// All methods discovered across the parsed headers.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: IndexMap<String, Vec<Method>>,
    seen_c_names: HashSet<String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Methods of `cls`, in declaration order.
    pub fn methods(&self, cls: &str) -> &[Method] {
        self.classes.get(cls).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn method_count(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    /// Feed one header's preprocessed text through the tokenizer and parser.
    /// Returns how many methods were added.
    pub fn read_header_text(&mut self, header: &str, text: &str) -> Result<usize> {
        let before = self.method_count();
        for decl in lexer::split_declarations(text) {
            self.add_declaration(&decl)?;
        }
        let added = self.method_count() - before;
        debug!(header, methods = added, "read header");
        Ok(added)
    }

    /// Parse and register one declaration.
    ///
    /// Bad input is logged and skipped. An error is returned only when the
    /// declaration cannot be attributed to any known class, which means the
    /// class catalogue is out of sync with the headers.
    pub fn add_declaration(&mut self, decl: &str) -> Result<()> {
        let parsed = match parser::parse_declaration(decl) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(err = %e, "func decl not matched, skipping");
                return Ok(());
            }
        };

        if catalogue::SKIPPED_NAMES.contains(&parsed.c_name.as_str()) {
            trace!(name = %parsed.c_name, "skipping declaration macro");
            return Ok(());
        }
        // Left over when its macro header is missing or does not define it.
        if parsed.c_name.starts_with("ISL_") {
            warn!(name = %parsed.c_name, "skipping unexpanded declaration macro");
            return Ok(());
        }

        let (class, name) = match place(&parsed.c_name)? {
            Placement::Method { class, name } => (class, name),
            Placement::Ignored => return Ok(()),
        };

        if is_excluded(&class, &name) {
            trace!(class = %class, name = %name, "excluded refcount/error plumbing");
            return Ok(());
        }

        match self.build_method(&parsed, class, name) {
            Ok(Some(method)) => self.insert(method),
            Ok(None) => {}
            Err(reason) => warn!(c_name = %parsed.c_name, "SKIP: {reason}"),
        }
        Ok(())
    }

    fn build_method(
        &self,
        parsed: &Declaration,
        class: String,
        name: String,
    ) -> Result<Option<Method>, SkipReason> {
        let args = parsed
            .args
            .iter()
            .map(|tokens| parser::parse_argument(tokens))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| match SkipReason::from(e) {
                SkipReason::BadArg(_) => SkipReason::BadArg(format!("{class} {name}")),
                other => other,
            })?;

        let Some(name) = public_name(&class, &name, &parsed.c_name) else {
            warn!(class = %class, name = %name, "SKIP: unhandled invalid python identifier");
            return Ok(None);
        };

        let mut words = parsed.return_words.clone();
        let is_exported = take_word(&mut words, "__isl_export");
        let is_constructor = take_word(&mut words, "__isl_constructor");
        let (return_semantics, words) = parser::split_semantics(words, &parsed.c_name)
            .map_err(|e| SkipReason::MalformedDeclaration(e.to_string()))?;
        let words: Vec<String> = words
            .into_iter()
            .filter(|w| w != "struct" && w != "enum")
            .collect();
        if words.is_empty() {
            return Err(SkipReason::MalformedDeclaration(format!(
                "{} has no return type",
                parsed.c_name
            )));
        }

        Ok(Some(Method::new(
            class,
            name,
            parsed.c_name.clone(),
            return_semantics,
            words.join(" "),
            parsed.return_ptr,
            args,
            is_exported,
            is_constructor,
        )))
    }

    fn insert(&mut self, method: Method) {
        let methods = self.classes.entry(method.cls.clone()).or_default();
        if !self.seen_c_names.insert(method.c_name.clone()) {
            trace!(c_name = %method.c_name, "already registered via another header");
            return;
        }
        trace!(class = %method.cls, name = %method.name, "registered method");
        methods.push(method);
    }
}

fn take_word(words: &mut Vec<String>, word: &str) -> bool {
    let before = words.len();
    words.retain(|w| w != word);
    words.len() != before
}

/// Attribute a C name to a class and method name.
fn place(c_name: &str) -> Result<Placement> {
    let Some(name) = c_name.strip_prefix("isl_") else {
        bail!("declaration `{c_name}` does not carry the isl_ prefix");
    };

    for special in catalogue::SPECIAL_PREFIXES {
        match *special {
            SpecialPrefix::StripInto { prefix, class } => {
                if let Some(rest) = name.strip_prefix(prefix) {
                    return Ok(Placement::Method {
                        class: class.to_string(),
                        name: options_rename(rest),
                    });
                }
            }
            SpecialPrefix::KeepInto { prefix, class } => {
                if name.starts_with(prefix) {
                    return Ok(Placement::Method {
                        class: class.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            SpecialPrefix::Exact { name: exact, class } => {
                if name == exact {
                    return Ok(Placement::Method {
                        class: class.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            SpecialPrefix::Ignore { prefix } => {
                if name.starts_with(prefix) {
                    return Ok(Placement::Ignored);
                }
            }
        }
    }

    let Some(class) = catalogue::longest_class_prefix(name) else {
        bail!("no class in the catalogue matches `{c_name}`");
    };
    match name[class.len()..].strip_prefix('_') {
        Some(method) if !method.is_empty() => Ok(Placement::Method {
            class: class.to_string(),
            name: method.to_string(),
        }),
        _ => bail!("`{c_name}` matches class `{class}` but names no method"),
    }
}

/// `get_X` → `get_option_X`, `set_X` → `set_option_X`.
fn options_rename(name: &str) -> String {
    match name.split_at_checked(4) {
        Some((prefix @ ("get_" | "set_"), rest)) => format!("{prefix}option_{rest}"),
        _ => name.to_string(),
    }
}

fn is_excluded(class: &str, name: &str) -> bool {
    if catalogue::EXCLUDED_METHODS.contains(&name) {
        return true;
    }
    class == "ctx"
        && (matches!(name, "alloc" | "ref" | "deref" | "set_error" | "reset_error")
            || name.contains("last_error"))
}

/// Host-side method name, or `None` if it cannot be made a valid identifier.
fn public_name(class: &str, name: &str, c_name: &str) -> Option<String> {
    let mut name = name.to_string();
    if catalogue::RESERVED_WORDS.contains(&name.as_str()) {
        name.push('_');
    }
    if let Some(renamed) = catalogue::renamed_identifier(&name) {
        name = renamed.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        debug!(class, c_name, "name starts with a digit");
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PtrDepth, Semantics};

    fn registry_with(decls: &[&str]) -> ClassRegistry {
        let mut reg = ClassRegistry::new();
        for d in decls {
            reg.add_declaration(d).unwrap();
        }
        reg
    }

    #[test]
    fn infers_longest_class() {
        let reg = registry_with(&[
            "__isl_give isl_basic_set *isl_basic_set_empty(__isl_take isl_space *space);",
            "__isl_give isl_set_list *isl_set_list_add(__isl_take isl_set_list *list, \
             __isl_take isl_set *el);",
        ]);
        assert_eq!(reg.methods("basic_set")[0].name, "empty");
        assert!(reg.methods("basic_set")[0].is_static());
        assert_eq!(reg.methods("set_list")[0].name, "add");
        assert!(reg.methods("set").is_empty());
    }

    #[test]
    fn special_prefixes() {
        let reg = registry_with(&[
            "isl_stat isl_options_set_on_error(isl_ctx *ctx, int val);",
            "int isl_options_get_on_error(isl_ctx *ctx);",
            "__isl_give isl_constraint *isl_equality_alloc(__isl_take isl_local_space *ls);",
            "isl_bool isl_bool_not(isl_bool b);",
        ]);
        let ctx: Vec<&str> = reg.methods("ctx").iter().map(|m| m.name.as_str()).collect();
        assert_eq!(ctx, vec!["set_option_on_error", "get_option_on_error"]);
        assert!(!reg.methods("ctx")[0].is_static());
        assert_eq!(reg.methods("constraint")[0].name, "equality_alloc");
        assert!(reg.class_names().all(|c| c != "bool"));
    }

    #[test]
    fn refcount_plumbing_is_excluded() {
        let reg = registry_with(&[
            "__isl_null isl_set *isl_set_free(__isl_take isl_set *set);",
            "__isl_give isl_set *isl_set_copy(__isl_keep isl_set *set);",
            "isl_ctx *isl_ctx_alloc(void);",
            "enum isl_error isl_ctx_last_error(isl_ctx *ctx);",
            "void isl_ctx_reset_error(isl_ctx *ctx);",
        ]);
        let names: Vec<&str> = reg.methods("set").iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["copy"]);
        assert!(reg.methods("ctx").is_empty());
    }

    #[test]
    fn renames_reserved_words_and_digits() {
        let reg = registry_with(&[
            "__isl_give isl_val *isl_val_2exp(__isl_take isl_val *v);",
            "isl_bool isl_set_is_empty(__isl_keep isl_set *set);",
            "__isl_give isl_map *isl_map_from(__isl_take isl_set *set);",
        ]);
        assert_eq!(reg.methods("val")[0].name, "two_exp");
        assert_eq!(reg.methods("map")[0].name, "from_");
    }

    #[test]
    fn duplicate_c_names_are_dropped() {
        let decl = "__isl_give isl_set *isl_set_empty(__isl_take isl_space *space);";
        let reg = registry_with(&[decl, decl]);
        assert_eq!(reg.methods("set").len(), 1);
    }

    #[test]
    fn export_and_constructor_markers() {
        let reg = registry_with(&[
            "__isl_constructor __isl_give isl_set *isl_set_read_from_str(isl_ctx *ctx, \
             const char *str);",
            "__isl_export __isl_give isl_set *isl_set_coalesce(__isl_take isl_set *set);",
        ]);
        let read = &reg.methods("set")[0];
        assert!(read.is_constructor);
        assert!(!read.is_exported);
        assert_eq!(read.return_semantics, Some(Semantics::Give));
        assert_eq!(read.return_base_type, "isl_set");
        assert_eq!(read.return_ptr, PtrDepth::Ptr);
        assert!(reg.methods("set")[1].is_exported);
    }

    #[test]
    fn macros_and_bad_input_are_skipped() {
        let reg = registry_with(&[
            "ISL_DECLARE_LIST(id)",
            "ISL_DECLARE_EXPORTED_LIST_TYPE(id)",
            "int isl_set_printf(__isl_keep isl_set *set, const char *fmt, ...);",
            "this is not a declaration",
        ]);
        assert_eq!(reg.method_count(), 0);
    }

    #[test]
    fn overload_marker_after_export_keeps_return_type() {
        let mut reg = ClassRegistry::new();
        reg.add_declaration(
            "__isl_export __isl_overload __isl_give isl_set *isl_set_fix_v(\
             __isl_take isl_set *set, __isl_take isl_val *v);",
        )
        .unwrap();
        let m = &reg.methods("set")[0];
        assert_eq!(m.return_base_type, "isl_set");
        assert!(m.is_exported);
    }

    #[test]
    fn bad_argument_grammar_drops_only_that_declaration() {
        let mut reg = ClassRegistry::new();
        reg.add_declaration("int isl_set_f(__isl_keep isl_set *set, int [3]);")
            .unwrap();
        reg.add_declaration("int isl_set_g(int x, __isl_take __isl_keep isl_set *set);")
            .unwrap();
        reg.add_declaration("isl_bool isl_set_is_empty(__isl_keep isl_set *set);")
            .unwrap();
        let names: Vec<&str> = reg.methods("set").iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["is_empty"]);
    }

    #[test]
    fn unknown_class_is_fatal() {
        let mut reg = ClassRegistry::new();
        let err = reg
            .add_declaration("int isl_frobnicator_spin(int x);")
            .unwrap_err();
        assert!(err.to_string().contains("isl_frobnicator_spin"));
    }
}
