//! Fixed tables describing the isl API surface: classes and the output part
//! each one lands in, canonical-class aliases, enum and scalar types that
//! cross the boundary by value, and the upcast hierarchy.
//!
//! Lookup order is significant everywhere: parts and classes are emitted in
//! the order listed here.

/// Classes per output part. Parts only exist to keep the generated
/// translation units a manageable size.
pub const PARTS: &[(&str, &[&str])] = &[
    (
        "part1",
        &[
            // lists
            "id_list",
            "val_list",
            "basic_set_list",
            "basic_map_list",
            "set_list",
            "map_list",
            "constraint_list",
            "aff_list",
            "pw_aff_list",
            "pw_multi_aff_list",
            "ast_expr_list",
            "ast_node_list",
            "qpolynomial_list",
            "pw_qpolynomial_list",
            "pw_qpolynomial_fold_list",
            "union_pw_aff_list",
            "union_pw_multi_aff_list",
            "union_set_list",
            "union_map_list",
            // maps
            "id_to_ast_expr",
            // others
            "ctx",
            "printer",
            "val",
            "multi_val",
            "vec",
            "mat",
            "fixed_box",
            "aff",
            "pw_aff",
            "union_pw_aff",
            "multi_aff",
            "multi_pw_aff",
            "pw_multi_aff",
            "union_pw_multi_aff",
            "multi_union_pw_aff",
            "id",
            "multi_id",
            "constraint",
            "space",
            "local_space",
        ],
    ),
    (
        "part2",
        &[
            "basic_set",
            "basic_map",
            "set",
            "map",
            "union_map",
            "union_set",
            "point",
            "vertex",
            "cell",
            "vertices",
            "stride_info",
        ],
    ),
    (
        "part3",
        &[
            "qpolynomial",
            "pw_qpolynomial",
            "qpolynomial_fold",
            "pw_qpolynomial_fold",
            "union_pw_qpolynomial_fold",
            "union_pw_qpolynomial",
            "term",
            "schedule",
            "schedule_constraints",
            "schedule_node",
            "access_info",
            "flow",
            "restriction",
            "union_access_info",
            "union_flow",
            "ast_expr",
            "ast_node",
            "ast_print_options",
            "ast_build",
        ],
    ),
];

/// All known classes, in part order.
pub fn classes() -> impl Iterator<Item = &'static str> {
    PARTS.iter().flat_map(|(_, classes)| classes.iter().copied())
}

/// Longest known class name that prefixes `name` (which has `isl_`
/// stripped already).
pub fn longest_class_prefix(name: &str) -> Option<&'static str> {
    classes()
        .filter(|cls| name.starts_with(cls))
        .fold(None, |best: Option<&str>, cls| match best {
            Some(b) if b.len() >= cls.len() => Some(b),
            _ => Some(cls),
        })
}

/// Name prefixes whose functions belong to a class other than the lexical
/// prefix. Checked before the generic longest-prefix scan.
pub enum SpecialPrefix {
    /// Move to `class`, dropping the prefix from the method name.
    StripInto { prefix: &'static str, class: &'static str },
    /// Move to `class`, keeping the full name as the method name.
    KeepInto { prefix: &'static str, class: &'static str },
    /// Exact name moved to `class` unchanged.
    Exact { name: &'static str, class: &'static str },
    /// Not bindable (bool helpers).
    Ignore { prefix: &'static str },
}

pub const SPECIAL_PREFIXES: &[SpecialPrefix] = &[
    SpecialPrefix::StripInto { prefix: "options_", class: "ctx" },
    SpecialPrefix::KeepInto { prefix: "equality_", class: "constraint" },
    SpecialPrefix::KeepInto { prefix: "inequality_", class: "constraint" },
    SpecialPrefix::Exact { name: "ast_op_type_set_print_name", class: "printer" },
    SpecialPrefix::Ignore { prefix: "bool_" },
];

/// Classes whose handles cannot be copied with `isl_<cls>_copy`.
pub const NON_COPYABLE: &[&str] = &["ctx", "printer", "access_info"];

/// Enum types that cross the boundary by value.
pub const ENUMS: &[&str] = &[
    // ctx.h
    "isl_error",
    "isl_stat",
    "isl_bool",
    // space.h
    "isl_dim_type",
    // schedule_type.h
    "isl_schedule_node_type",
    // ast_type.h
    "isl_ast_expr_op_type",
    "isl_ast_expr_type",
    "isl_ast_node_type",
    "isl_ast_loop_type",
    // polynomial_type.h
    "isl_fold",
];

const SAFE_SCALARS: &[&str] = &[
    "int",
    "unsigned",
    "uint32_t",
    "size_t",
    "double",
    "long",
    "unsigned long",
    "isl_size",
];

/// Types passed and returned by value without any marshaling.
pub fn is_safe_type(base_type: &str) -> bool {
    ENUMS.contains(&base_type) || SAFE_SCALARS.contains(&base_type)
}

/// Pseudo-functions produced by declaration macros and allocator helpers.
pub const SKIPPED_NAMES: &[&str] = &[
    "ISL_ARG_DECL",
    "ISL_DECLARE_LIST",
    "ISL_DECLARE_LIST_FN",
    "isl_ast_op_type_print_macro",
    "ISL_DECLARE_MULTI",
    "ISL_DECLARE_MULTI_CMP",
    "ISL_DECLARE_MULTI_NEG",
    "ISL_DECLARE_MULTI_DIMS",
    "ISL_DECLARE_MULTI_WITH_DOMAIN",
    "ISL_DECLARE_EXPORTED_LIST_FN",
    "ISL_DECLARE_MULTI_IDENTITY",
    "ISL_DECLARE_MULTI_ARITH",
    "ISL_DECLARE_MULTI_ZERO",
    "ISL_DECLARE_MULTI_NAN",
    "ISL_DECLARE_MULTI_DIM_ID",
    "ISL_DECLARE_MULTI_TUPLE_ID",
    "ISL_DECLARE_MULTI_BIND_DOMAIN",
    "ISL_DECLARE_MULTI_PARAM",
    "ISL_DECLARE_MULTI_DROP_DIMS",
    "isl_malloc_or_die",
    "isl_calloc_or_die",
    "isl_realloc_or_die",
    "isl_handle_error",
];

/// Reference-counting plumbing replaced by the wrapper's ownership model.
pub const EXCLUDED_METHODS: &[&str] = &["free", "cow", "ref", "deref"];

/// Words that cannot be used as Python attribute names.
pub const RESERVED_WORDS: &[&str] = &[
    "and", "del", "from", "not", "while", "as", "elif", "global", "or", "with", "assert",
    "else", "if", "pass", "yield", "break", "except", "import", "print", "class", "exec",
    "in", "raise", "continue", "finally", "is", "return", "def", "for", "lambda", "try",
];

/// Names that are not valid identifiers after prefix stripping.
pub fn renamed_identifier(name: &str) -> Option<&'static str> {
    match name {
        "2exp" => Some("two_exp"),
        _ => None,
    }
}

/// Integer out-parameters that become auxiliary return values.
pub const OUT_FLAG_NAMES: &[&str] = &["exact", "tight"];

/// Classes whose callback setters hand back the callback object so the
/// caller can keep it alive as long as the C side holds it.
pub const CALLBACK_LIFETIME_CLASSES: &[&str] = &["ast_build", "ast_print_options"];

/// Classes that only exist starting with a given isl release.
pub const ADD_VERSIONS: &[(&str, u32)] = &[
    ("union_pw_aff", 15),
    ("multi_union_pw_aff", 15),
    ("basic_map_list", 15),
    ("map_list", 15),
    ("union_set_list", 15),
];

/// Whether `cls` is available with the given isl version (`None` = newest).
pub fn class_available(cls: &str, isl_version: Option<u32>) -> bool {
    let Some(version) = isl_version else {
        return true;
    };
    ADD_VERSIONS
        .iter()
        .find(|(name, _)| *name == cls)
        .is_none_or(|(_, added)| *added <= version)
}

/// `(general, specific)` pairs: methods of `specific` are also exposed on
/// `general`, which converts into `specific` implicitly.
pub fn upcasts(part: &str) -> &'static [(&'static str, &'static str)] {
    match part {
        "part1" => &[
            ("aff", "pw_aff"),
            ("pw_aff", "union_pw_aff"),
            ("aff", "union_pw_aff"),
            ("space", "local_space"),
            ("multi_aff", "pw_multi_aff"),
            ("pw_multi_aff", "union_pw_multi_aff"),
            ("multi_aff", "union_pw_multi_aff"),
        ],
        "part2" => &[
            ("basic_set", "set"),
            ("set", "union_set"),
            ("basic_set", "union_set"),
            ("basic_map", "map"),
            ("map", "union_map"),
            ("basic_map", "union_map"),
        ],
        _ => &[],
    }
}

/// Headers parsed, in order. Order matters: the first header declaring a C
/// name wins.
pub const HEADERS: &[&str] = &[
    "isl/ctx.h",
    "isl/id.h",
    "isl/space.h",
    "isl/set.h",
    "isl/map.h",
    "isl/map_type.h",
    "isl/local_space.h",
    "isl/aff.h",
    "isl/polynomial.h",
    "isl/union_map.h",
    "isl/union_set.h",
    "isl/printer.h",
    "isl/vertices.h",
    "isl/point.h",
    "isl/constraint.h",
    "isl/val.h",
    "isl/vec.h",
    "isl/mat.h",
    "isl/stride_info.h",
    "isl/schedule.h",
    "isl/schedule_node.h",
    "isl/flow.h",
    "isl/options.h",
    "isl/ast.h",
    "isl/ast_build.h",
    "isl/ast_type.h",
    "isl/ilp.h",
];

/// Extension header parsed when barvinok support is requested.
pub const BARVINOK_HEADER: &str = "barvinok/isl.h";

/// Headers holding declaration macros; part of every preprocessing cache key.
pub const MACRO_HEADERS: &[&str] = &["isl/multi.h", "isl/list.h"];

/// Python-side class name for documentation, e.g. `pw_qpolynomial` →
/// `PwQPolynomial`.
pub fn to_py_class(cls: &str) -> String {
    let cls = cls.strip_prefix("isl_").unwrap_or(cls);
    if cls == "ctx" {
        return "Context".to_string();
    }
    let mut result = String::with_capacity(cls.len());
    let mut upper_next = true;
    for c in cls.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }
    result.replace("Qpoly", "QPoly")
}
