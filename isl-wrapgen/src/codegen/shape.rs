//! Closed catalogue of argument and return shapes the generators handle.
//!
//! Every argument and return type of a method is classified exactly once
//! here; the generators then match on the shape exhaustively.

use crate::catalogue;
use crate::error::SkipReason;
use crate::model::{Arg, Argument, CallbackArgument, Method, PtrDepth};

/// How one user-facing argument is marshaled.
#[derive(Debug, Clone, Copy)]
pub enum ArgShape<'a> {
    /// Function pointer followed by its `user` closure slot.
    Callback(&'a CallbackArgument),
    /// Enum or plain scalar passed by value.
    Scalar(&'a Argument),
    /// `char *` / `const char *`.
    String(&'a Argument),
    /// `int *`/`isl_bool *` out-parameter returned as an auxiliary value.
    OutFlag(&'a Argument),
    /// `isl_val *` in a non-receiver position: accepts a `Val` or an integer.
    ValueOrInt(&'a Argument),
    /// `isl_<cls> *` opaque handle.
    Handle { arg: &'a Argument, cls: &'a str },
    /// `isl_<cls> **` out-parameter returned as an auxiliary value.
    HandleOut { arg: &'a Argument, cls: &'a str },
}

/// Classify every argument of `method`. Callback `user` slots are folded
/// into their callback and do not appear in the result. The index returned
/// with each shape is the argument's position in the C signature.
pub fn classify_args(method: &Method) -> Result<Vec<(usize, ArgShape<'_>)>, SkipReason> {
    let mut shapes = Vec::with_capacity(method.args.len());
    let mut idx = 0;
    while idx < method.args.len() {
        match &method.args[idx] {
            Arg::Callback(cb) => {
                match method.args.get(idx + 1) {
                    Some(next) if next.name().ends_with("user") => {
                        if next.name() != "user" {
                            return Err(SkipReason::unsupported("unexpected callback signature"));
                        }
                    }
                    _ => {
                        return Err(SkipReason::unsupported(
                            "callback signature without user pointer",
                        ));
                    }
                }
                shapes.push((idx, ArgShape::Callback(cb)));
                idx += 2;
                continue;
            }
            Arg::Plain(arg) => shapes.push((idx, classify_plain(arg, idx)?)),
        }
        idx += 1;
    }
    Ok(shapes)
}

fn classify_plain(arg: &Argument, idx: usize) -> Result<ArgShape<'_>, SkipReason> {
    let base = arg.base_type.as_str();
    let shape = match arg.ptr {
        PtrDepth::Value if catalogue::is_safe_type(base) => ArgShape::Scalar(arg),
        PtrDepth::Ptr if base == "char" => ArgShape::String(arg),
        PtrDepth::Ptr if base == "int" || base == "isl_bool" => {
            if !catalogue::OUT_FLAG_NAMES.contains(&arg.name.as_str()) {
                return Err(SkipReason::unsupported(format!("{base} *")));
            }
            ArgShape::OutFlag(arg)
        }
        PtrDepth::Ptr if base == "isl_val" && idx > 0 => ArgShape::ValueOrInt(arg),
        PtrDepth::Ptr if base.starts_with("isl_") => ArgShape::Handle {
            arg,
            cls: &base[4..],
        },
        PtrDepth::PtrPtr if base.starts_with("isl_") => ArgShape::HandleOut {
            arg,
            cls: &base[4..],
        },
        PtrDepth::Ptr if base == "void" && arg.name == "user" => {
            return Err(SkipReason::unsupported("void pointer"));
        }
        _ => {
            return Err(SkipReason::unsupported(format!(
                "arg type {base} {}",
                arg.ptr.stars()
            )));
        }
    };
    Ok(shape)
}

/// How the C return value is turned into the wrapper's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape<'a> {
    Void,
    /// Plain `int`; `predicate` for `is_*`/`has_*`, which return `bool` and
    /// signal errors with `-1`.
    Int { predicate: bool },
    /// `isl_size`, with `isl_size_error` as its sentinel.
    Size,
    /// `isl_stat` error code.
    Stat,
    /// `isl_bool`, returned as `bool`.
    Bool,
    /// Any other enum or scalar, passed through.
    Scalar,
    /// Opaque handle.
    Handle { cls: &'a str },
    /// `char *` / `const char *`.
    String,
    /// `void *` from `get_user`: the host object stored with the handle.
    UserObject,
}

pub fn classify_return(method: &Method) -> Result<ReturnShape<'_>, SkipReason> {
    let base = method.return_base_type.as_str();
    let shape = match (base, method.return_ptr) {
        ("void", PtrDepth::Value) => ReturnShape::Void,
        ("int", PtrDepth::Value) => ReturnShape::Int {
            predicate: method.name.starts_with("is_") || method.name.starts_with("has_"),
        },
        ("isl_size", PtrDepth::Value) => ReturnShape::Size,
        ("isl_stat", PtrDepth::Value) => ReturnShape::Stat,
        ("isl_bool", PtrDepth::Value) => ReturnShape::Bool,
        (b, PtrDepth::Value) if catalogue::is_safe_type(b) => ReturnShape::Scalar,
        ("char" | "const char", PtrDepth::Ptr) => ReturnShape::String,
        ("void", PtrDepth::Ptr) if method.name == "get_user" => ReturnShape::UserObject,
        (b, PtrDepth::Ptr) if b.starts_with("isl_") => ReturnShape::Handle { cls: &b[4..] },
        (b, ptr) => {
            return Err(SkipReason::unsupported(format!(
                "ret type: {b} {} in {method}",
                ptr.stars()
            )));
        }
    };
    Ok(shape)
}
