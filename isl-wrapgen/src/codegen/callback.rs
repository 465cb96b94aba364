//! Trampolines adapting host callables to isl C callbacks.
//!
//! A trampoline has exactly the C function-pointer signature. It recovers the
//! host callable from the `user` slot, wraps handle parameters, calls into
//! the host, and converts the result back. Host exceptions never cross the C
//! boundary: they are reported on stdout/stderr and turned into the
//! callback's error value.

use crate::catalogue;
use crate::codegen::CodeWriter;
use crate::error::SkipReason;
use crate::model::{Arg, Argument, CallbackArgument, PtrDepth, Semantics};

/// How a callback parameter is handed to the host callable.
enum ParamWrap<'a> {
    /// The callback owns the object; the host wrapper frees it.
    Owned { arg: &'a Argument, cls: &'a str },
    /// isl keeps ownership; the host wrapper is invalidated afterwards.
    Borrowed { arg: &'a Argument, cls: &'a str },
}

impl ParamWrap<'_> {
    fn parts(&self) -> (&Argument, &str) {
        match *self {
            ParamWrap::Owned { arg, cls } | ParamWrap::Borrowed { arg, cls } => (arg, cls),
        }
    }
}

/// How the host return value is converted for C.
enum CallbackReturn<'a> {
    Stat,
    Bool,
    Scalar(&'a str),
    Handle(&'a str),
}

/// Name of the trampoline for callback argument `arg` of a method.
pub fn trampoline_name(cls: &str, method: &str, arg: &str) -> String {
    format!("cb_{cls}_{method}_{arg}")
}

/// Emit the trampoline for `cb` under `cb_name`.
pub fn generate_trampoline(cb_name: &str, cb: &CallbackArgument) -> Result<String, SkipReason> {
    match cb.args.last() {
        Some(Arg::Plain(user)) if user.name == "user" => {}
        _ => {
            return Err(SkipReason::unsupported(format!(
                "callback {} does not end in a user pointer",
                cb.name
            )));
        }
    }

    let params = cb
        .visible_args()
        .iter()
        .map(classify_param)
        .collect::<Result<Vec<_>, _>>()?;
    let ret = classify_return(cb)?;

    let ret_type = format!("{} {}", cb.return_base_type, cb.return_ptr.stars());
    let error_return = match ret {
        CallbackReturn::Stat => "isl_stat_error".to_string(),
        CallbackReturn::Bool => "isl_bool_error".to_string(),
        CallbackReturn::Scalar(ty) => format!("static_cast<{ty}>(-1)"),
        CallbackReturn::Handle(_) => "nullptr".to_string(),
    };
    let input_args = cb
        .args
        .iter()
        .filter_map(Arg::as_plain)
        .map(|a| format!("{}c_arg_{}", a.c_type(), a.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut w = CodeWriter::new();
    w.writeln(&format!("static {}{cb_name}({input_args})", ret_type));
    w.open("{");
    w.writeln("py::object py_cb = py::borrow<py::object>((PyObject *) c_arg_user);");
    for param in &params {
        let (arg, cls) = param.parts();
        w.writeln(&format!("isl::{cls} *wrapped_arg_{} = nullptr;", arg.name));
    }
    w.writeln("try");
    w.open("{");

    for param in &params {
        let (arg, cls) = param.parts();
        w.writeln(&format!(
            "wrapped_arg_{0} = new isl::{cls}(c_arg_{0});",
            arg.name
        ));
        w.writeln(&format!(
            "py::object arg_{0}(handle_from_new_ptr(wrapped_arg_{0}));",
            arg.name
        ));
    }

    let passed = params
        .iter()
        .map(|p| format!("arg_{}", p.parts().0.name))
        .collect::<Vec<_>>()
        .join(", ");
    w.writeln(&format!("py::object retval = py_cb({passed});"));

    for param in &params {
        if let ParamWrap::Borrowed { arg, .. } = param {
            w.writeln(&format!("wrapped_arg_{}->invalidate();", arg.name));
            w.writeln(&format!("wrapped_arg_{} = nullptr;", arg.name));
        }
    }

    match ret {
        CallbackReturn::Stat => {
            w.writeln("if (retval.ptr() == Py_None)");
            w.writeln("  return isl_stat_ok;");
            w.writeln("return py::cast<isl_stat>(retval);");
        }
        CallbackReturn::Bool => {
            none_is_error(&mut w);
            w.writeln("return static_cast<isl_bool>(py::cast<bool>(retval));");
        }
        CallbackReturn::Scalar(ty) => {
            none_is_error(&mut w);
            w.writeln(&format!("return py::cast<{ty}>(retval);"));
        }
        CallbackReturn::Handle(cls) => {
            w.writeln("if (retval.ptr() == Py_None)");
            w.writeln("  return nullptr;");
            w.writeln(&format!(
                "isl::{cls} *wrapper_retval = py::cast<isl::{cls} *>(retval);"
            ));
            w.writeln(&format!(
                "isl_{cls} *unwrapped_retval = wrapper_retval->m_data;"
            ));
            w.writeln("wrapper_retval->invalidate();");
            w.writeln("return unwrapped_retval;");
        }
    }
    w.close("}");

    w.writeln("catch (py::python_error &err)");
    w.open("{");
    w.writeln(
        "std::cout << \"[islpy warning] A Python exception occurred in \"",
    );
    w.writeln("  \"a call back function, ignoring:\" << std::endl;");
    release_borrowed(&mut w, &params);
    w.writeln("err.restore();");
    w.writeln("PyErr_Print();");
    w.writeln("PyErr_Clear();");
    w.writeln(&format!("return {error_return};"));
    w.close("}");

    w.writeln("catch (std::exception &e)");
    w.open("{");
    w.writeln("std::cerr << \"[islpy] An exception occurred in \"");
    w.writeln("  \"a Python callback query:\" << std::endl");
    w.writeln("  << e.what() << std::endl;");
    release_borrowed(&mut w, &params);
    w.writeln(&format!("return {error_return};"));
    w.close("}");
    w.close("}");

    Ok(w.finish())
}

fn none_is_error(w: &mut CodeWriter) {
    w.writeln("if (retval.ptr() == Py_None)");
    w.writeln("  throw isl::error(\"callback returned None\");");
}

fn release_borrowed(w: &mut CodeWriter, params: &[ParamWrap<'_>]) {
    for param in params {
        if let ParamWrap::Borrowed { arg, .. } = param {
            w.writeln(&format!("if (wrapped_arg_{0}) wrapped_arg_{0}->invalidate();", arg.name));
        }
    }
}

fn classify_param(arg: &Arg) -> Result<ParamWrap<'_>, SkipReason> {
    let arg = match arg {
        Arg::Plain(a) => a,
        Arg::Callback(cb) => {
            return Err(SkipReason::unsupported(format!(
                "nested callback argument {}",
                cb.name
            )));
        }
    };
    let Some(cls) = arg.isl_class() else {
        return Err(SkipReason::unsupported(format!(
            "unsupported callback arg: {} {}",
            arg.base_type,
            arg.ptr.stars()
        )));
    };
    if arg.ptr != PtrDepth::Ptr {
        return Err(SkipReason::unsupported(format!(
            "unsupported callback arg: {} {}",
            arg.base_type,
            arg.ptr.stars()
        )));
    }
    match arg.semantics {
        Some(Semantics::Take) => Ok(ParamWrap::Owned { arg, cls }),
        Some(Semantics::Keep) => Ok(ParamWrap::Borrowed { arg, cls }),
        _ => Err(SkipReason::unsupported("unsupported callback arg semantics")),
    }
}

fn classify_return(cb: &CallbackArgument) -> Result<CallbackReturn<'_>, SkipReason> {
    let base = cb.return_base_type.as_str();
    match cb.return_ptr {
        PtrDepth::Value if base == "isl_stat" => Ok(CallbackReturn::Stat),
        PtrDepth::Value if base == "isl_bool" => Ok(CallbackReturn::Bool),
        PtrDepth::Value if catalogue::is_safe_type(base) => Ok(CallbackReturn::Scalar(base)),
        PtrDepth::Ptr if base.starts_with("isl_") => match cb.return_semantics {
            Some(Semantics::Give) => Ok(CallbackReturn::Handle(&base[4..])),
            None => Err(SkipReason::unsupported(
                "callback return with unspecified semantics",
            )),
            Some(_) => Err(SkipReason::unsupported(
                "callback return with non-GIVE semantics",
            )),
        },
        _ => Err(SkipReason::unsupported("non-int callback")),
    }
}
