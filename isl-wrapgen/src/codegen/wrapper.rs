//! Wrapper functions: marshal host arguments into one isl call, transfer
//! ownership, and translate the result (and any error) back.
//!
//! Each wrapper has the shape
//!
//! ```text
//! <ret> <cls>_<name>(<inputs>)
//! {
//!   isl_ctx *islpy_ctx = nullptr;
//!   <argument checks and temporaries>
//!   if (islpy_ctx) isl_ctx_reset_error(islpy_ctx);
//!   <capture> isl_<cls>_<name>(<passed>);
//!   <post-call ownership fixups>
//!   <return conversion>
//! }
//! ```
//!
//! preceded by the trampolines of its callback arguments.

use crate::catalogue;
use crate::codegen::callback;
use crate::codegen::shape::{self, ArgShape, ReturnShape};
use crate::codegen::{CodeWriter, GeneratedWrapper, GenerationOutcome};
use crate::error::SkipReason;
use crate::model::{Argument, CallbackArgument, Method, Semantics};

/// Why generation stopped early.
enum Abort {
    Skip(SkipReason),
    Retry,
}

impl From<SkipReason> for Abort {
    fn from(reason: SkipReason) -> Self {
        Abort::Skip(reason)
    }
}

/// Generate the wrapper for one method.
pub fn generate_method(method: &Method) -> GenerationOutcome {
    match build(method) {
        Ok(wrapper) => GenerationOutcome::Generated(wrapper),
        Err(Abort::Skip(reason)) => GenerationOutcome::Skipped(reason),
        Err(Abort::Retry) => GenerationOutcome::RetryWithMutatorVetoed,
    }
}

// ---------------------------------------------------------------------------
// Argument marshaling
// ---------------------------------------------------------------------------

/// Text fragments collected while walking the arguments.
#[derive(Default)]
struct Pieces {
    preamble: Vec<String>,
    inputs: Vec<String>,
    checks: Vec<String>,
    locals: Vec<String>,
    passed: Vec<String>,
    post_call: Vec<String>,
    extra_values: Vec<String>,
    extra_docs: Vec<String>,
    docs: Vec<String>,
    arg_names: Vec<String>,
}

impl Pieces {
    fn callback(&mut self, method: &Method, cb: &CallbackArgument) -> Result<(), Abort> {
        let cb_name = callback::trampoline_name(&method.cls, &method.name, &cb.name);
        self.preamble
            .push(callback::generate_trampoline(&cb_name, cb)?);

        if catalogue::CALLBACK_LIFETIME_CLASSES.contains(&method.cls.as_str())
            && method.name.starts_with("set_")
        {
            self.extra_values.push(format!("py_{}", cb.name));
            self.extra_docs
                .push("(opaque handle to manage callback lifetime)".to_string());
        }

        self.arg_names.push(cb.name.clone());
        self.inputs.push(format!("py::object py_{}", cb.name));
        self.passed.push(cb_name);
        self.passed.push(format!("py_{}.ptr()", cb.name));

        let visible = cb
            .visible_args()
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ");
        self.docs
            .push(format!(":param {}: callback({visible})", cb.name));
        Ok(())
    }

    fn scalar(&mut self, arg: &Argument) {
        self.arg_names.push(arg.name.clone());
        self.inputs
            .push(format!("{} arg_{}", arg.base_type, arg.name));
        self.passed.push(format!("arg_{}", arg.name));

        let doc_cls = match arg.base_type.strip_prefix("isl_").unwrap_or(&arg.base_type) {
            "unsigned long" => "int",
            other => other,
        };
        self.docs
            .push(format!(":param {}: :class:`{doc_cls}`", arg.name));
    }

    fn string(&mut self, arg: &Argument) {
        let konst = if arg.is_const { "const " } else { "" };
        self.arg_names.push(arg.name.clone());
        self.inputs.push(format!("{konst}char *arg_{}", arg.name));
        match arg.semantics {
            Some(Semantics::Give | Semantics::Take) => {
                self.passed.push(format!("strdup(arg_{})", arg.name));
            }
            _ => self.passed.push(format!("arg_{}", arg.name)),
        }
        self.docs.push(format!(":param {}: string", arg.name));
    }

    fn out_flag(&mut self, arg: &Argument) {
        self.locals
            .push(format!("{} arg_{};", arg.base_type, arg.name));
        self.passed.push(format!("&arg_{}", arg.name));
        if arg.base_type == "isl_bool" {
            self.extra_values.push(format!("(bool) arg_{}", arg.name));
            self.extra_docs.push(format!("{} (bool)", arg.name));
        } else {
            self.extra_values.push(format!("arg_{}", arg.name));
            self.extra_docs.push(format!("{} (int)", arg.name));
        }
    }

    fn value_or_int(&mut self, method: &Method, arg: &Argument) -> Result<(), Abort> {
        if arg.semantics.is_none() {
            return Err(SkipReason::Undocumented(method.to_string()).into());
        }
        let name = &arg.name;

        self.arg_names.push(name.clone());
        self.inputs.push(format!("py::object py_{name}"));
        self.checks.extend(
            [
                format!("std::unique_ptr<isl::val> unique_arg_{name};"),
                "try".to_string(),
                "{".to_string(),
                format!("  isl::val *arg_{name} = py::cast<isl::val *>(py_{name});"),
                format!("  isl_val *tmp_ptr = isl_val_copy(arg_{name}->m_data);"),
                "  if (!tmp_ptr)".to_string(),
                format!("    throw isl::error(\"failed to copy arg {name}\");"),
                format!("  unique_arg_{name} = std::unique_ptr<isl::val>(new isl::val(tmp_ptr));"),
                "}".to_string(),
                "catch (py::cast_error &)".to_string(),
                "{".to_string(),
                "}".to_string(),
                format!("if (!unique_arg_{name})"),
                "{".to_string(),
                "  if (!islpy_ctx)".to_string(),
                "    islpy_ctx = isl::get_default_context();".to_string(),
                "  long int_value;".to_string(),
                "  try".to_string(),
                "  {".to_string(),
                format!("    int_value = py::cast<long>(py_{name});"),
                "  }".to_string(),
                "  catch (py::cast_error &)".to_string(),
                "  {".to_string(),
                format!("    throw isl::error(\"unrecognized argument for {name}\");"),
                "  }".to_string(),
                "  isl_val *tmp_ptr = isl_val_int_from_si(islpy_ctx, int_value);".to_string(),
                "  if (!tmp_ptr)".to_string(),
                format!("    throw isl::error(\"failed to create arg {name} from integer\");"),
                format!("  unique_arg_{name} = std::unique_ptr<isl::val>(new isl::val(tmp_ptr));"),
                "}".to_string(),
            ],
        );

        if arg.semantics == Some(Semantics::Take) {
            self.post_call
                .push(format!("unique_arg_{name}->invalidate();"));
        }
        self.passed.push(format!("unique_arg_{name}->m_data"));
        self.docs.push(format!(":param {name}: :class:`Val`"));
        Ok(())
    }

    fn handle(
        &mut self,
        method: &Method,
        idx: usize,
        arg: &Argument,
        cls: &str,
    ) -> Result<(), Abort> {
        let name = &arg.name;
        let label = method.wrapper_name();
        let validity = [
            format!("if (!arg_{name}.is_valid())"),
            format!("  throw isl::error(\"passed invalid arg to isl_{label} for {name}\");"),
        ];
        let mut doc = format!(":param {name}: :class:`{}`", catalogue::to_py_class(cls));

        self.arg_names.push(name.clone());
        if idx == 0 && method.is_mutator() {
            self.inputs.push(format!("py::object py_{name}"));
            self.checks.push(format!(
                "isl::{cls} &arg_{name}(py::cast<isl::{cls} &>(py_{name}));"
            ));
            self.checks.extend(validity);
            self.passed.push(format!("arg_{name}.m_data"));
            self.post_call.push(format!("arg_{name}.invalidate();"));
            doc.push_str(" (mutated in-place)");
        } else {
            if arg.semantics.is_none() && cls != "ctx" {
                return Err(SkipReason::Undocumented(method.to_string()).into());
            }
            self.checks.extend(validity);

            match arg.semantics {
                Some(Semantics::Take) if !catalogue::NON_COPYABLE.contains(&cls) => {
                    self.inputs.push(format!("isl::{cls} const &arg_{name}"));
                    self.checks.extend([
                        format!("std::unique_ptr<isl::{cls}> auto_arg_{name};"),
                        "{".to_string(),
                        format!("  isl_{cls} *tmp_ptr = isl_{cls}_copy(arg_{name}.m_data);"),
                        "  if (!tmp_ptr)".to_string(),
                        format!(
                            "    throw isl::error(\"failed to copy arg {name} on entry to {label}\");"
                        ),
                        format!(
                            "  auto_arg_{name} = std::unique_ptr<isl::{cls}>(new isl::{cls}(tmp_ptr));"
                        ),
                        "}".to_string(),
                    ]);
                    self.passed.push(format!("auto_arg_{name}->m_data"));
                    self.post_call.push(format!("auto_arg_{name}->invalidate();"));
                }
                Some(Semantics::Take) => {
                    self.inputs.push(format!("isl::{cls} &arg_{name}"));
                    self.passed.push(format!("arg_{name}.m_data"));
                    self.post_call.push(format!("arg_{name}.invalidate();"));
                    doc.push_str(" (:ref:`becomes invalid <auto-invalidation>`)");
                }
                _ => {
                    self.inputs.push(format!("isl::{cls} const &arg_{name}"));
                    self.passed.push(format!("arg_{name}.m_data"));
                }
            }
        }

        if idx == 0 {
            if cls == "ctx" {
                self.checks.push(format!("islpy_ctx = arg_{name}.m_data;"));
            } else {
                self.checks
                    .push(format!("islpy_ctx = isl_{cls}_get_ctx(arg_{name}.m_data);"));
            }
        }
        self.docs.push(doc);
        Ok(())
    }

    fn handle_out(&mut self, arg: &Argument, cls: &str) -> Result<(), Abort> {
        if arg.semantics != Some(Semantics::Give) {
            return Err(SkipReason::unsupported("non-give secondary ptr return value").into());
        }
        let name = &arg.name;
        self.locals.push(format!("isl_{cls} *ret_{name} = nullptr;"));
        self.passed.push(format!("&ret_{name}"));
        self.post_call.extend([
            format!("py::object py_ret_{name} = py::none();"),
            format!("if (ret_{name})"),
            format!("  py_ret_{name} = handle_from_new_ptr(new isl::{cls}(ret_{name}));"),
        ]);
        self.extra_values.push(format!("py_ret_{name}"));
        self.extra_docs.push(format!(
            "{name} (:class:`{}`)",
            catalogue::to_py_class(cls)
        ));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Return conversion
// ---------------------------------------------------------------------------

/// The returned expression with the auxiliary values folded in.
fn pack(first: Option<&str>, extras: &[String]) -> String {
    match (first, extras) {
        (None, [only]) => format!("py::cast({only})"),
        _ => {
            let items: Vec<&str> = first
                .into_iter()
                .chain(extras.iter().map(String::as_str))
                .collect();
            format!("py::make_tuple({})", items.join(", "))
        }
    }
}

fn pack_doc(first: Option<&str>, extras: &[String]) -> String {
    match (first, extras) {
        (None, [only]) => only.clone(),
        _ => {
            let items: Vec<&str> = first
                .into_iter()
                .chain(extras.iter().map(String::as_str))
                .collect();
            format!("tuple: ({})", items.join(", "))
        }
    }
}

struct Conversion {
    return_type: String,
    doc: String,
    lines: Vec<String>,
}

impl Conversion {
    fn new(return_type: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            return_type: return_type.into(),
            doc: doc.into(),
            lines: Vec::new(),
        }
    }

    fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }
}

/// Return a scalar, tupled with any auxiliary values.
fn scalar_result(ty: &str, value: &str, p: &Pieces, lines: Vec<String>) -> Conversion {
    let mut conv = if p.extra_values.is_empty() {
        Conversion::new(ty, ty).line(format!("return {value};"))
    } else {
        Conversion::new("py::object", pack_doc(Some(ty), &p.extra_docs))
            .line(format!("return {};", pack(Some(value), &p.extra_values)))
    };
    let mut all = lines;
    all.append(&mut conv.lines);
    conv.lines = all;
    conv
}

fn error_check(condition: &str, err: &str) -> Vec<String> {
    vec![format!("if ({condition})"), format!("  {err}")]
}

fn convert_return(method: &Method, ret: ReturnShape<'_>, p: &Pieces) -> Result<Conversion, Abort> {
    let err = format!(
        "handle_isl_error(islpy_ctx, \"isl_{}\");",
        method.wrapper_name()
    );
    let has_extras = !p.extra_values.is_empty();

    let conv = match ret {
        ReturnShape::Void if has_extras => {
            Conversion::new("py::object", pack_doc(None, &p.extra_docs))
                .line(format!("return {};", pack(None, &p.extra_values)))
        }
        ReturnShape::Void => Conversion::new("void", "None"),
        ReturnShape::Int { predicate: true } => scalar_result(
            "bool",
            "(bool) result",
            p,
            error_check("result == -1", &err),
        ),
        ReturnShape::Int { predicate: false } => scalar_result("int", "result", p, Vec::new()),
        ReturnShape::Size => scalar_result(
            "int",
            "result",
            p,
            error_check("result == isl_size_error", &err),
        ),
        ReturnShape::Stat => {
            let mut conv = if has_extras {
                Conversion::new("py::object", pack_doc(None, &p.extra_docs))
                    .line(format!("return {};", pack(None, &p.extra_values)))
            } else {
                Conversion::new("isl_stat", "None").line("return result;")
            };
            let mut lines = error_check("result == isl_stat_error", &err);
            lines.append(&mut conv.lines);
            conv.lines = lines;
            conv
        }
        ReturnShape::Bool => scalar_result(
            "bool",
            "(bool) result",
            p,
            error_check("result == isl_bool_error", &err),
        ),
        ReturnShape::Scalar => {
            if has_extras {
                return Err(SkipReason::unsupported("extra ret val with safe type").into());
            }
            let ty = method.return_base_type.as_str();
            Conversion::new(ty, ty).line("return result;")
        }
        ReturnShape::Handle { cls } => {
            let py_cls = catalogue::to_py_class(cls);
            if method.is_mutator() {
                if has_extras {
                    return Err(Abort::Retry);
                }
                let receiver = method.args.first().map_or("self", |a| a.name());
                Conversion::new("py::object", format!(":class:`{py_cls}` (self)"))
                    .line("if (result)")
                    .line("{")
                    .line(format!("  arg_{receiver}.take_possession_of(result);"))
                    .line(format!("  return py_{receiver};"))
                    .line("}")
                    .line("else")
                    .line(format!("  {err}"))
            } else {
                match method.return_semantics {
                    Some(Semantics::Give) => {}
                    _ if cls == "ctx" => {}
                    None => return Err(SkipReason::Undocumented(method.to_string()).into()),
                    Some(_) => return Err(SkipReason::unsupported("non-give return").into()),
                }
                let fresh = "handle_from_new_ptr(uptr_result.release())";
                let (value, doc) = if has_extras {
                    let first = format!(":class:`{py_cls}`");
                    (
                        pack(Some(fresh), &p.extra_values),
                        pack_doc(Some(&first), &p.extra_docs),
                    )
                } else {
                    (fresh.to_string(), format!(":class:`{py_cls}`"))
                };
                Conversion::new("py::object", doc)
                    .line("if (result)")
                    .line("{")
                    .line(format!(
                        "  std::unique_ptr<isl::{cls}> uptr_result(new isl::{cls}(result));"
                    ))
                    .line(format!("  return {value};"))
                    .line("}")
                    .line("else")
                    .line(format!("  {err}"))
            }
        }
        ReturnShape::String => {
            if has_extras {
                return Err(SkipReason::unsupported("extra ret val with string").into());
            }
            let mut conv = Conversion::new("py::object", "string")
                .line("if (!result)")
                .line("  return py::none();")
                .line("py::object py_result = py::cast(result);");
            if method.return_semantics == Some(Semantics::Give) {
                conv = conv.line("free(result);");
            }
            conv.line("return py_result;")
        }
        ReturnShape::UserObject => {
            if has_extras {
                return Err(SkipReason::unsupported("extra ret val with user object").into());
            }
            Conversion::new("py::object", "a user-specified python object")
                .line("if (!result)")
                .line("  return py::none();")
                .line("return py::borrow<py::object>((PyObject *) result);")
        }
    };
    Ok(conv)
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

fn build(method: &Method) -> Result<GeneratedWrapper, Abort> {
    let mut p = Pieces::default();
    for (idx, arg) in shape::classify_args(method)? {
        match arg {
            ArgShape::Callback(cb) => p.callback(method, cb)?,
            ArgShape::Scalar(arg) => p.scalar(arg),
            ArgShape::String(arg) => p.string(arg),
            ArgShape::OutFlag(arg) => p.out_flag(arg),
            ArgShape::ValueOrInt(arg) => p.value_or_int(method, arg)?,
            ArgShape::Handle { arg, cls } => p.handle(method, idx, arg, cls)?,
            ArgShape::HandleOut { arg, cls } => p.handle_out(arg, cls)?,
        }
    }
    let ret = shape::classify_return(method)?;
    let conv = convert_return(method, ret, &p)?;

    let capture = match ret {
        ReturnShape::Void => String::new(),
        _ => format!(
            "{} {}result = ",
            method.return_base_type,
            method.return_ptr.stars()
        ),
    };

    let mut w = CodeWriter::new();
    for trampoline in &p.preamble {
        for line in trampoline.lines() {
            w.writeln(line);
        }
        w.writeln("");
    }
    w.writeln(&format!(
        "{} {}({})",
        conv.return_type,
        method.wrapper_name(),
        p.inputs.join(", ")
    ));
    w.open("{");
    w.writeln("isl_ctx *islpy_ctx = nullptr;");
    w.block(&p.checks);
    w.block(&p.locals);
    w.writeln("if (islpy_ctx) isl_ctx_reset_error(islpy_ctx);");
    w.writeln(&format!(
        "{capture}{}({});",
        method.c_name,
        p.passed.join(", ")
    ));
    w.block(&p.post_call);
    w.block(&conv.lines);
    w.close("}");

    let mut doc = vec![
        format!("{}({})", method.name, p.arg_names.join(", ")),
        String::new(),
    ];
    doc.extend(p.docs);
    doc.push(format!(":return: {}", conv.doc));

    Ok(GeneratedWrapper {
        code: w.finish(),
        arg_names: p.arg_names,
        doc: doc.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClassRegistry;

    fn method(decl: &str) -> Method {
        let mut reg = ClassRegistry::new();
        reg.add_declaration(decl).unwrap();
        let cls = reg.class_names().next().unwrap().to_string();
        reg.methods(&cls)[0].clone()
    }

    fn generated(decl: &str) -> GeneratedWrapper {
        match generate_method(&method(decl)) {
            GenerationOutcome::Generated(w) => w,
            other => panic!("expected a wrapper, got {other:?}"),
        }
    }

    #[test]
    fn union_returns_fresh_handle() {
        let w = generated(
            "__isl_export __isl_give isl_set *isl_set_union(__isl_take isl_set *set1, \
             __isl_take isl_set *set2);",
        );
        assert_eq!(w.arg_names, vec!["self", "set2"]);
        assert!(w.code.starts_with(
            "py::object set_union(isl::set const &arg_self, isl::set const &arg_set2)\n"
        ));
        assert!(w.code.contains("isl_set *tmp_ptr = isl_set_copy(arg_self.m_data);"));
        assert!(w.code.contains("islpy_ctx = isl_set_get_ctx(arg_self.m_data);"));
        assert!(w.code.contains(
            "isl_set *result = isl_set_union(auto_arg_self->m_data, auto_arg_set2->m_data);"
        ));
        assert!(w.code.contains("auto_arg_set2->invalidate();"));
        assert!(w.code.contains("return handle_from_new_ptr(uptr_result.release());"));
        assert!(w.code.contains("handle_isl_error(islpy_ctx, \"isl_set_union\");"));
        assert!(!w.code.contains("take_possession_of"));
        assert!(w.doc.starts_with("union(self, set2)\n\n:param self: :class:`Set`"));
        assert!(w.doc.ends_with(":return: :class:`Set`"));
    }

    #[test]
    fn reset_error_precedes_the_call() {
        let w = generated("isl_bool isl_set_is_empty(__isl_keep isl_set *set);");
        let reset = w.code.find("isl_ctx_reset_error").unwrap();
        let call = w.code.find("isl_set_is_empty(arg_self.m_data)").unwrap();
        assert!(reset < call);
        assert!(w.code.starts_with("bool set_is_empty(isl::set const &arg_self)"));
        assert!(w.code.contains("if (result == isl_bool_error)"));
    }

    #[test]
    fn mutator_repoints_receiver() {
        let w = generated(
            "__isl_give isl_printer *isl_printer_print_set(__isl_take isl_printer *p, \
             __isl_keep isl_set *set);",
        );
        assert!(w.code.contains("py::object py_self"));
        assert!(w.code.contains(
            "isl::printer &arg_self(py::cast<isl::printer &>(py_self));"
        ));
        let invalidate = w.code.find("arg_self.invalidate();").unwrap();
        let repoint = w.code.find("arg_self.take_possession_of(result);").unwrap();
        assert!(invalidate < repoint);
        assert!(w.code.contains("return py_self;"));
        assert!(!w.code.contains("uptr_result"));
        assert!(w.doc.contains("(mutated in-place)"));
    }

    #[test]
    fn mutator_with_out_param_asks_for_retry() {
        let mut m = method(
            "__isl_give isl_printer *isl_printer_split(__isl_take isl_printer *p, \
             __isl_give isl_set **rest);",
        );
        assert!(matches!(
            generate_method(&m),
            GenerationOutcome::RetryWithMutatorVetoed
        ));

        m.mutator_veto = true;
        let GenerationOutcome::Generated(w) = generate_method(&m) else {
            panic!("vetoed mutator should generate");
        };
        assert_eq!(w.arg_names, vec!["self"]);
        assert!(w.code.contains("isl::printer &arg_self"));
        assert!(w.code.contains("isl_set *ret_rest = nullptr;"));
        assert!(w.code.contains(
            "return py::make_tuple(handle_from_new_ptr(uptr_result.release()), py_ret_rest);"
        ));
        assert!(!w.code.contains("take_possession_of"));
    }

    #[test]
    fn stat_returning_take_is_not_a_mutator() {
        let w = generated("isl_stat isl_printer_flush_all(__isl_take isl_printer *p);");
        assert!(w.code.contains("isl::printer &arg_self"));
        assert!(w.code.contains("arg_self.invalidate();"));
        assert!(w.code.contains("if (result == isl_stat_error)"));
        assert!(w.doc.contains("becomes invalid"));
    }

    #[test]
    fn missing_semantics_is_undocumented() {
        let m = method("__isl_give isl_set *isl_set_frob(isl_set *set);");
        assert!(matches!(
            generate_method(&m),
            GenerationOutcome::Skipped(SkipReason::Undocumented(_))
        ));

        let m = method("isl_set *isl_set_frob2(__isl_keep isl_set *set);");
        assert!(matches!(
            generate_method(&m),
            GenerationOutcome::Skipped(SkipReason::Undocumented(_))
        ));
    }

    #[test]
    fn ctx_argument_supplies_context() {
        let w = generated(
            "__isl_give isl_set *isl_set_read_from_str(isl_ctx *ctx, const char *str);",
        );
        assert!(w.code.contains("islpy_ctx = arg_ctx.m_data;"));
        assert!(w.code.contains("const char *arg_str"));
        assert!(w.code.contains("isl_set_read_from_str(arg_ctx.m_data, arg_str)"));
    }

    #[test]
    fn value_arguments_accept_integers() {
        let w = generated(
            "__isl_give isl_aff *isl_aff_scale_val(__isl_take isl_aff *aff, \
             __isl_take isl_val *v);",
        );
        assert!(w.code.contains("py::object py_v"));
        assert!(w.code.contains("isl_val_int_from_si(islpy_ctx, int_value)"));
        assert!(w.code.contains("unique_arg_v->invalidate();"));
        assert!(w.doc.contains(":param v: :class:`Val`"));
    }

    #[test]
    fn out_flags_become_extra_values() {
        let w = generated(
            "__isl_give isl_map *isl_map_power(__isl_take isl_map *map, isl_bool *exact);",
        );
        assert_eq!(w.arg_names, vec!["self"]);
        assert!(w.code.contains("isl_bool arg_exact;"));
        assert!(w.code.contains("(bool) arg_exact"));
        assert!(w.doc.contains("tuple: (:class:`Map`, exact (bool))"));
    }

    #[test]
    fn callback_argument() {
        let w = generated(
            "isl_stat isl_set_foreach_point(__isl_keep isl_set *set, \
             isl_stat (*fn)(__isl_take isl_point *pnt, void *user), void *user);",
        );
        assert!(w.code.starts_with("static isl_stat cb_set_foreach_point_fn("));
        assert!(w.code.contains(
            "isl_set_foreach_point(arg_self.m_data, cb_set_foreach_point_fn, py_fn.ptr());"
        ));
        assert_eq!(w.arg_names, vec!["self", "fn"]);
        assert!(w.doc.contains(":param fn: callback(pnt)"));
    }

    #[test]
    fn callback_setter_returns_lifetime_handle() {
        let w = generated(
            "__isl_give isl_ast_build *isl_ast_build_set_at_each_domain(\
             __isl_take isl_ast_build *build, \
             __isl_give isl_ast_node *(*fn)(__isl_take isl_ast_node *node, \
             __isl_keep isl_ast_build *build, void *user), void *user);",
        );
        assert!(w.code.contains(
            "return py::make_tuple(handle_from_new_ptr(uptr_result.release()), py_fn);"
        ));
    }

    #[test]
    fn string_results() {
        let w = generated("__isl_give char *isl_set_to_str(__isl_keep isl_set *set);");
        let copy = w.code.find("py::cast(result)").unwrap();
        let free = w.code.find("free(result);").unwrap();
        assert!(copy < free);

        let w = generated("const char *isl_id_get_name(__isl_keep isl_id *id);");
        assert!(!w.code.contains("free(result)"));
        assert!(w.code.contains("return py::none();"));
    }

    #[test]
    fn predicates_check_minus_one() {
        let w = generated("int isl_set_is_params(__isl_keep isl_set *set);");
        assert!(w.code.starts_with("bool "));
        assert!(w.code.contains("if (result == -1)"));

        let w = generated("int isl_val_sgn(__isl_keep isl_val *v);");
        assert!(w.code.starts_with("int "));
        assert!(!w.code.contains("result == -1"));
    }

    #[test]
    fn unsupported_signatures_are_skipped() {
        let m = method(
            "__isl_give isl_printer *isl_printer_to_file(isl_ctx *ctx, FILE *file);",
        );
        assert!(matches!(
            generate_method(&m),
            GenerationOutcome::Skipped(SkipReason::UnsupportedSignature(_))
        ));

        let m = method(
            "isl_stat isl_set_foo(__isl_keep isl_set *set, __isl_keep isl_set **out);",
        );
        assert!(matches!(
            generate_method(&m),
            GenerationOutcome::Skipped(SkipReason::UnsupportedSignature(r))
                if r.contains("non-give")
        ));
    }
}
