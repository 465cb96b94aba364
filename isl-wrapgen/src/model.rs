//! Semantic model — parsed isl declarations, independent of both the header
//! parser and the code generators.

use std::fmt;

use crate::catalogue;

/// Ownership-transfer annotation on an argument or return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantics {
    /// `__isl_take`: the callee consumes the value.
    Take,
    /// `__isl_give`: the callee hands ownership to the caller.
    Give,
    /// `__isl_keep`: the callee borrows, the caller keeps ownership.
    Keep,
    /// `__isl_null`: the value is inert.
    Null,
}

impl Semantics {
    /// Map an annotation macro spelling to its semantics.
    pub fn from_annotation(word: &str) -> Option<Self> {
        match word {
            "__isl_take" => Some(Self::Take),
            "__isl_give" => Some(Self::Give),
            "__isl_keep" => Some(Self::Keep),
            "__isl_null" => Some(Self::Null),
            _ => None,
        }
    }
}

/// Pointer depth of an argument or return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PtrDepth {
    #[default]
    Value,
    Ptr,
    PtrPtr,
}

impl PtrDepth {
    pub fn from_stars(stars: usize) -> Option<Self> {
        match stars {
            0 => Some(Self::Value),
            1 => Some(Self::Ptr),
            2 => Some(Self::PtrPtr),
            _ => None,
        }
    }

    pub fn stars(self) -> &'static str {
        match self {
            Self::Value => "",
            Self::Ptr => "*",
            Self::PtrPtr => "**",
        }
    }
}

/// A plain (non function-pointer) argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub is_const: bool,
    pub semantics: Option<Semantics>,
    /// Base type words joined by a single space, e.g. `isl_set` or
    /// `unsigned long`.
    pub base_type: String,
    pub ptr: PtrDepth,
}

impl Argument {
    /// The class name (`isl_` stripped) when this is an isl-typed argument.
    pub fn isl_class(&self) -> Option<&str> {
        self.base_type.strip_prefix("isl_")
    }

    /// C spelling of the argument type, without the name.
    pub fn c_type(&self) -> String {
        let konst = if self.is_const { "const " } else { "" };
        format!("{konst}{} {}", self.base_type, self.ptr.stars())
    }
}

/// A function-pointer argument, e.g.
/// `isl_stat (*fn)(__isl_take isl_set *set, void *user)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackArgument {
    pub name: String,
    pub return_semantics: Option<Semantics>,
    pub return_base_type: String,
    pub return_ptr: PtrDepth,
    pub args: Vec<Arg>,
}

impl CallbackArgument {
    /// Arguments visible to the host callable (the trailing `user` slot is
    /// the closure capture and is not passed through).
    pub fn visible_args(&self) -> &[Arg] {
        match self.args.split_last() {
            Some((last, rest)) if last.name() == "user" => rest,
            _ => &self.args,
        }
    }
}

/// One argument of a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Plain(Argument),
    Callback(CallbackArgument),
}

impl Arg {
    pub fn name(&self) -> &str {
        match self {
            Arg::Plain(a) => &a.name,
            Arg::Callback(cb) => &cb.name,
        }
    }

    pub fn as_plain(&self) -> Option<&Argument> {
        match self {
            Arg::Plain(a) => Some(a),
            Arg::Callback(_) => None,
        }
    }
}

/// A bindable isl function, attached to the class it operates on.
#[derive(Debug, Clone)]
pub struct Method {
    /// Owning class without the `isl_` prefix (e.g. `basic_set`).
    pub cls: String,
    /// Public (host-side) method name.
    pub name: String,
    /// The C symbol, e.g. `isl_basic_set_union`.
    pub c_name: String,
    pub return_semantics: Option<Semantics>,
    pub return_base_type: String,
    pub return_ptr: PtrDepth,
    pub args: Vec<Arg>,
    pub is_exported: bool,
    pub is_constructor: bool,
    /// Set when a mutator-shaped method also needs auxiliary return values;
    /// forces generation through the fresh-handle path.
    pub mutator_veto: bool,
}

impl Method {
    /// Build a method, renaming the receiver argument to `self`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cls: impl Into<String>,
        name: impl Into<String>,
        c_name: impl Into<String>,
        return_semantics: Option<Semantics>,
        return_base_type: impl Into<String>,
        return_ptr: PtrDepth,
        args: Vec<Arg>,
        is_exported: bool,
        is_constructor: bool,
    ) -> Self {
        let mut method = Method {
            cls: cls.into(),
            name: name.into(),
            c_name: c_name.into(),
            return_semantics,
            return_base_type: return_base_type.into(),
            return_ptr,
            args,
            is_exported,
            is_constructor,
            mutator_veto: false,
        };
        if !method.is_static() {
            if let Some(Arg::Plain(first)) = method.args.first_mut() {
                first.name = "self".to_string();
            }
        }
        method
    }

    /// A method is static unless its first argument is the owning class.
    pub fn is_static(&self) -> bool {
        let own = format!("isl_{}", self.cls);
        !matches!(self.args.first(), Some(Arg::Plain(a)) if a.base_type == own)
    }

    /// In-place mutation of the receiver: the receiver is taken, a value of
    /// the same type is given back, and the class cannot be copied cheaply.
    pub fn is_mutator(&self) -> bool {
        if self.is_static() || self.mutator_veto {
            return false;
        }
        let Some(Arg::Plain(first)) = self.args.first() else {
            return false;
        };
        first.semantics == Some(Semantics::Take)
            && first.ptr == PtrDepth::Ptr
            && self.return_ptr == PtrDepth::Ptr
            && self.return_base_type == first.base_type
            && self.return_semantics == Some(Semantics::Give)
            && first
                .isl_class()
                .is_some_and(|cls| catalogue::NON_COPYABLE.contains(&cls))
    }

    /// `_si`/`_ui` integer overloads, superseded by `isl_val` variants.
    pub fn is_integer_overload(&self) -> bool {
        self.name.ends_with("_si") || self.name.ends_with("_ui")
    }

    /// Name of the generated wrapper function (inside namespace `isl`).
    pub fn wrapper_name(&self) -> String {
        format!("{}_{}", self.cls, self.name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<method {}>", self.c_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str, ty: &str, sem: Option<Semantics>) -> Arg {
        Arg::Plain(Argument {
            name: name.into(),
            is_const: false,
            semantics: sem,
            base_type: ty.into(),
            ptr: PtrDepth::Ptr,
        })
    }

    fn method(cls: &str, ret: &str, args: Vec<Arg>) -> Method {
        Method::new(
            cls,
            "op",
            format!("isl_{cls}_op"),
            Some(Semantics::Give),
            ret,
            PtrDepth::Ptr,
            args,
            true,
            false,
        )
    }

    #[test]
    fn receiver_is_renamed_to_self() {
        let m = method(
            "set",
            "isl_set",
            vec![
                handle("set1", "isl_set", Some(Semantics::Take)),
                handle("set2", "isl_set", Some(Semantics::Keep)),
            ],
        );
        assert!(!m.is_static());
        assert_eq!(m.args[0].name(), "self");
        assert_eq!(m.args[1].name(), "set2");
    }

    #[test]
    fn static_when_first_arg_is_another_class() {
        let m = method(
            "set",
            "isl_set",
            vec![handle("space", "isl_space", Some(Semantics::Take))],
        );
        assert!(m.is_static());
        assert_eq!(m.args[0].name(), "space");
    }

    #[test]
    fn mutator_requires_non_copyable_class() {
        let copyable = method(
            "set",
            "isl_set",
            vec![handle("set", "isl_set", Some(Semantics::Take))],
        );
        assert!(!copyable.is_mutator());

        let mut printer = method(
            "printer",
            "isl_printer",
            vec![handle("p", "isl_printer", Some(Semantics::Take))],
        );
        assert!(printer.is_mutator());

        printer.mutator_veto = true;
        assert!(!printer.is_mutator());
    }

    #[test]
    fn mutator_requires_matching_return() {
        let m = method(
            "printer",
            "isl_ctx",
            vec![handle("p", "isl_printer", Some(Semantics::Keep))],
        );
        assert!(!m.is_mutator());
    }
}
