//! Exposer statements: register generated wrappers as methods of the host
//! classes, plus upcast forwarding from specific to general classes.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::catalogue;
use crate::codegen::{CodeWriter, GeneratedWrapper, c_string_literal};
use crate::model::{Arg, Method, PtrDepth};
use crate::registry::ClassRegistry;

const NOT_PUBLIC_WARNING: &str = "\n\n.. warning::\n\n    \
    This function is not part of the officially public isl API. \
    Use at your own risk.";

/// Registration statement(s) for one generated wrapper.
pub fn write_exposer(method: &Method, wrapper: &GeneratedWrapper) -> String {
    let wrap_class = method.cls.as_str();
    let is_static = method.is_static();

    let skip = if is_static { 0 } else { 1 };
    let args: String = wrapper
        .arg_names
        .iter()
        .skip(skip)
        .map(|name| format!(", py::arg(\"{name}\")"))
        .collect();

    let py_name = match method.name.as_str() {
        "size" if method.args.len() == 1 => "__len__",
        "get_hash" if method.args.len() == 1 => "__hash__",
        other => other,
    };

    let mut doc = wrapper.doc.clone();
    if !method.is_exported {
        doc.push_str(NOT_PUBLIC_WARNING);
    }

    let mut out = format!(
        "wrap_{wrap_class}.def{}(\"{py_name}\", isl::{}{args}, {});\n",
        if is_static { "_static" } else { "" },
        method.wrapper_name(),
        c_string_literal(&doc),
    );

    if method.name == "read_from_str" && is_static {
        out.push_str(&string_constructor(method, wrap_class));
    }
    out
}

/// `__init__` that parses a string in the given (or default) context.
fn string_constructor(method: &Method, wrap_class: &str) -> String {
    let cls = &method.cls;
    let mut w = CodeWriter::new();
    w.writeln(&format!("wrap_{wrap_class}.def(\"__init__\","));
    w.open(&format!(
        "  [](isl::{wrap_class} *t, const char *s, isl::ctx *ctx_wrapper)"
    ));
    w.open("{");
    w.writeln("isl_ctx *ctx = nullptr;");
    w.writeln("if (ctx_wrapper && ctx_wrapper->is_valid())");
    w.writeln("  ctx = ctx_wrapper->m_data;");
    w.writeln("if (!ctx)");
    w.writeln("  ctx = isl::get_default_context();");
    w.writeln("if (!ctx)");
    w.writeln(&format!(
        "  throw isl::error(\"from-string conversion of {cls}: no context available\");"
    ));
    w.writeln(&format!(
        "isl_{wrap_class} *result = {}(ctx, s);",
        method.c_name
    ));
    w.writeln("if (result)");
    w.writeln(&format!("  new (t) isl::{wrap_class}(result);"));
    w.writeln("else");
    w.writeln(&format!(
        "  isl::handle_isl_error(ctx, \"{}\");",
        method.c_name
    ));
    w.close("},");
    w.close("  py::arg(\"s\"), py::arg(\"context\").none(true) = py::none());");
    w.finish()
}

// ---------------------------------------------------------------------------
// Upcast forwarding
// ---------------------------------------------------------------------------

/// Bookkeeping shared across all upcast pairs of a run.
#[derive(Debug, Default)]
pub struct UpcastLedger {
    /// `(class, name)` of every method that produced a wrapper.
    wrapped: HashSet<(String, String)>,
    /// Method names forwarded onto each general class that lacked them.
    forwarded: HashMap<String, HashSet<String>>,
}

impl UpcastLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_wrapped(&mut self, method: &Method) {
        self.wrapped
            .insert((method.cls.clone(), method.name.clone()));
    }

    pub fn is_wrapped(&self, cls: &str, name: &str) -> bool {
        self.wrapped
            .contains(&(cls.to_string(), name.to_string()))
    }

    pub fn wrapped_count(&self) -> usize {
        self.wrapped.len()
    }

    fn forwardable(&self, method: &Method) -> bool {
        !method.is_integer_overload()
            && !method.is_static()
            && self.is_wrapped(&method.cls, &method.name)
    }
}

/// Non-receiver argument types, for overload compatibility.
fn signature(method: &Method) -> Vec<(&str, PtrDepth)> {
    method
        .args
        .iter()
        .skip(1)
        .map(|arg| match arg {
            Arg::Plain(a) => (a.base_type.as_str(), a.ptr),
            Arg::Callback(_) => ("callback", PtrDepth::Ptr),
        })
        .collect()
}

/// Expose methods of `specific` on `general`.
pub fn write_upcasts(
    general: &str,
    specific: &str,
    registry: &ClassRegistry,
    ledger: &mut UpcastLedger,
) -> String {
    let mut out = format!("\n// {{{{{{ Upcasts from {general} to {specific}\n\n");
    let doc = c_string_literal(&format!(
        "\n\nUpcast from :class:`{}` to :class:`{}`\n",
        catalogue::to_py_class(general),
        catalogue::to_py_class(specific)
    ));

    for method in registry.methods(specific) {
        if !ledger.forwardable(method) {
            continue;
        }

        let existing = registry
            .methods(general)
            .iter()
            .find(|m| m.name == method.name);
        match existing {
            Some(own) if !ledger.forwardable(own) => continue,
            Some(own) if signature(own) == signature(method) => {
                trace!(general, name = %method.name, "general class has a compatible method");
                continue;
            }
            Some(_) => {}
            None => {
                let names = ledger.forwarded.entry(general.to_string()).or_default();
                if !names.insert(method.name.clone()) {
                    continue;
                }
            }
        }

        out.push_str(&format!(
            "wrap_{}.def(\"{}\", isl::{}, {doc});\n",
            general,
            method.name,
            method.wrapper_name()
        ));
    }

    out.push_str("\n// }}}\n\n");
    out
}
