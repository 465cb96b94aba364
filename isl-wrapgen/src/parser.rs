//! Recursive-descent parser for isl function declarations and their
//! arguments.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! decl     := word* "*"* IDENT "(" arglist ")" ";"?
//! arglist  := "void" | arg ("," arg)*
//! arg      := word* "*"* IDENT
//!           | word* "*"* "(" "*" IDENT ")" "(" arglist ")"
//! ```
//!
//! `word` includes ownership annotations, `const`, `struct` and `enum`,
//! which are folded into the typed [`Argument`]/[`CallbackArgument`].

use std::fmt;

use crate::error::ParseError;
use crate::lexer::{Lexer, Token};
use crate::model::{Arg, Argument, CallbackArgument, PtrDepth, Semantics};

/// A function declaration with its arguments still in token form.
///
/// Arguments are parsed separately so that macro pseudo-functions (whose
/// "arguments" are class names) can be recognized and skipped first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Return type words, including annotations and export markers.
    pub return_words: Vec<String>,
    pub return_ptr: PtrDepth,
    pub c_name: String,
    pub args: Vec<Vec<Token>>,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => f.write_str(s),
            Token::Star => f.write_str("*"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::Ellipsis => f.write_str("..."),
            Token::Other(c) => write!(f, "{c}"),
            Token::Eof => Ok(()),
        }
    }
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one structurally complete declaration string.
pub fn parse_declaration(decl: &str) -> Result<Declaration, ParseError> {
    let tokens = Lexer::tokenize(decl);
    let malformed = || ParseError::Malformed(decl.trim().to_string());

    let open = tokens
        .iter()
        .position(|t| *t == Token::LParen)
        .ok_or_else(malformed)?;
    let close = matching_paren(&tokens, open).ok_or_else(malformed)?;

    let (head, c_name) = match tokens[..open].split_last() {
        Some((Token::Ident(name), head)) => (head, name.clone()),
        _ => return Err(malformed()),
    };
    let (mut return_words, stars) = words_then_stars(head).ok_or_else(malformed)?;
    let return_ptr = PtrDepth::from_stars(stars).ok_or_else(malformed)?;

    return_words.retain(|w| w != "__isl_overload" && w != "ISL_DEPRECATED");

    let mut args = split_top_level(&tokens[open + 1..close]);
    if args == [vec![Token::Ident("void".to_string())]] || args == [Vec::<Token>::new()] {
        args.clear();
    }

    Ok(Declaration {
        return_words,
        return_ptr,
        c_name,
        args,
    })
}

/// Parse one argument (as produced by [`parse_declaration`]).
pub fn parse_argument(tokens: &[Token]) -> Result<Arg, ParseError> {
    let text = render(tokens);
    if tokens.contains(&Token::Ellipsis) {
        return Err(ParseError::BadArg(text));
    }

    if let Some(open) = tokens
        .windows(2)
        .position(|w| w[0] == Token::LParen && w[1] == Token::Star)
    {
        return parse_callback(tokens, open).map(Arg::Callback);
    }

    let malformed = || ParseError::Malformed(text.clone());
    let (name, head) = match tokens.split_last() {
        Some((Token::Ident(name), head)) => (name.clone(), head),
        _ => return Err(malformed()),
    };
    let (words, stars) = words_then_stars(head).ok_or_else(malformed)?;
    let ptr = PtrDepth::from_stars(stars).ok_or_else(malformed)?;
    let (semantics, words) = split_semantics(words, &text)?;

    let mut words: Vec<String> = words
        .into_iter()
        .filter(|w| w != "struct" && w != "enum")
        .collect();
    let is_const = words.first().map(String::as_str) == Some("const");
    if is_const {
        words.remove(0);
    }
    if words.is_empty() {
        return Err(malformed());
    }

    Ok(Arg::Plain(Argument {
        name,
        is_const,
        semantics,
        base_type: words.join(" "),
        ptr,
    }))
}

/// `ret-words ret-stars ( * name ) ( args )`, with `open` the index of the
/// `(` that precedes the `*`.
fn parse_callback(tokens: &[Token], open: usize) -> Result<CallbackArgument, ParseError> {
    let text = render(tokens);
    let malformed = || ParseError::Malformed(text.clone());

    let name = match tokens.get(open + 2..open + 4) {
        Some([Token::Ident(name), Token::RParen]) => name.clone(),
        _ => return Err(malformed()),
    };
    let args_open = open + 4;
    if tokens.get(args_open) != Some(&Token::LParen) {
        return Err(malformed());
    }
    let args_close = matching_paren(tokens, args_open).ok_or_else(malformed)?;

    let (words, stars) = words_then_stars(&tokens[..open]).ok_or_else(malformed)?;
    let return_ptr = PtrDepth::from_stars(stars).ok_or_else(malformed)?;
    let (return_semantics, words) = split_semantics(words, &text)?;
    let words: Vec<String> = words
        .into_iter()
        .filter(|w| !matches!(w.as_str(), "struct" | "enum" | "const"))
        .collect();
    if words.is_empty() {
        return Err(malformed());
    }

    let args = split_top_level(&tokens[args_open + 1..args_close])
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| parse_argument(group))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CallbackArgument {
        name,
        return_semantics,
        return_base_type: words.join(" "),
        return_ptr,
        args,
    })
}

/// Pull the (single) ownership annotation out of a word list.
pub fn split_semantics(
    words: Vec<String>,
    context: &str,
) -> Result<(Option<Semantics>, Vec<String>), ParseError> {
    let mut semantics = None;
    let mut rest = Vec::with_capacity(words.len());
    for word in words {
        match Semantics::from_annotation(&word) {
            Some(_) if semantics.is_some() => {
                return Err(ParseError::ConflictingAnnotations(context.to_string()));
            }
            Some(s) => semantics = Some(s),
            None => rest.push(word),
        }
    }
    Ok((semantics, rest))
}

/// `IDENT* STAR*` → (words, star count). `None` if the shape differs.
fn words_then_stars(tokens: &[Token]) -> Option<(Vec<String>, usize)> {
    let mut words = Vec::new();
    let mut stars = 0;
    for tok in tokens {
        match tok {
            Token::Ident(w) if stars == 0 => words.push(w.clone()),
            Token::Star => stars += 1,
            _ => return None,
        }
    }
    Some((words, stars))
}

/// Index of the `)` matching the `(` at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        match tok {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split at commas that are not nested in parentheses.
fn split_top_level(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut groups = vec![Vec::new()];
    let mut depth = 0usize;
    for tok in tokens {
        match tok {
            Token::Comma if depth == 0 => {
                groups.push(Vec::new());
                continue;
            }
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
        if let Some(group) = groups.last_mut() {
            group.push(tok.clone());
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(decl: &str) -> Vec<Arg> {
        parse_declaration(decl)
            .unwrap()
            .args
            .iter()
            .map(|a| parse_argument(a).unwrap())
            .collect()
    }

    fn plain(arg: &Arg) -> &Argument {
        arg.as_plain().expect("plain argument")
    }

    #[test]
    fn parses_union_declaration() {
        let decl = parse_declaration(
            "__isl_export __isl_give isl_set *isl_set_union(__isl_take isl_set *set1, \
             __isl_keep isl_set *set2);",
        )
        .unwrap();
        assert_eq!(decl.c_name, "isl_set_union");
        assert_eq!(decl.return_words, vec!["__isl_export", "__isl_give", "isl_set"]);
        assert_eq!(decl.return_ptr, PtrDepth::Ptr);
        assert_eq!(decl.args.len(), 2);

        let args = args_of(
            "__isl_give isl_set *isl_set_union(__isl_take isl_set *set1, \
             __isl_keep isl_set *set2);",
        );
        let a0 = plain(&args[0]);
        assert_eq!(a0.name, "set1");
        assert_eq!(a0.semantics, Some(Semantics::Take));
        assert_eq!(a0.base_type, "isl_set");
        assert_eq!(a0.ptr, PtrDepth::Ptr);
        let a1 = plain(&args[1]);
        assert_eq!(a1.name, "set2");
        assert_eq!(a1.semantics, Some(Semantics::Keep));
    }

    #[test]
    fn void_argument_list_is_empty() {
        let decl = parse_declaration("isl_ctx *isl_ctx_alloc(void);").unwrap();
        assert!(decl.args.is_empty());
        let decl = parse_declaration("int isl_foo_bar();").unwrap();
        assert!(decl.args.is_empty());
    }

    #[test]
    fn overload_and_deprecated_markers_are_dropped() {
        let decl = parse_declaration(
            "__isl_overload ISL_DEPRECATED __isl_give isl_set *isl_set_f(__isl_take isl_set *s);",
        )
        .unwrap();
        assert_eq!(decl.return_words, vec!["__isl_give", "isl_set"]);
    }

    #[test]
    fn overload_marker_after_export_is_dropped() {
        let decl = parse_declaration(
            "__isl_export __isl_overload __isl_give isl_set *isl_set_fix_v(\
             __isl_take isl_set *set, __isl_take isl_val *v);",
        )
        .unwrap();
        assert_eq!(decl.return_words, vec!["__isl_export", "__isl_give", "isl_set"]);
        assert_eq!(decl.c_name, "isl_set_fix_v");
    }

    #[test]
    fn scalar_const_and_enum_arguments() {
        let args = args_of(
            "isl_size isl_set_dim(__isl_keep isl_set *set, enum isl_dim_type type, \
             const char *name, unsigned long n);",
        );
        assert_eq!(plain(&args[1]).base_type, "isl_dim_type");
        assert_eq!(plain(&args[1]).ptr, PtrDepth::Value);
        let name = plain(&args[2]);
        assert!(name.is_const);
        assert_eq!(name.base_type, "char");
        assert_eq!(name.ptr, PtrDepth::Ptr);
        assert_eq!(plain(&args[3]).base_type, "unsigned long");
    }

    #[test]
    fn double_pointer_out_argument() {
        let args = args_of(
            "__isl_give isl_pw_aff *isl_pw_aff_f(__isl_take isl_pw_aff *pa, \
             __isl_give isl_set **empty);",
        );
        let out = plain(&args[1]);
        assert_eq!(out.ptr, PtrDepth::PtrPtr);
        assert_eq!(out.semantics, Some(Semantics::Give));
    }

    #[test]
    fn callback_argument_is_nested() {
        let args = args_of(
            "isl_stat isl_set_foreach_basic_set(__isl_keep isl_set *set, \
             isl_stat (*fn)(__isl_take isl_basic_set *bset, void *user), void *user);",
        );
        assert_eq!(args.len(), 3);
        let Arg::Callback(cb) = &args[1] else {
            panic!("expected callback, got {:?}", args[1]);
        };
        assert_eq!(cb.name, "fn");
        assert_eq!(cb.return_base_type, "isl_stat");
        assert_eq!(cb.return_ptr, PtrDepth::Value);
        assert_eq!(cb.args.len(), 2);
        assert_eq!(cb.args[0].name(), "bset");
        assert_eq!(cb.visible_args().len(), 1);
        assert_eq!(args[2].name(), "user");
    }

    #[test]
    fn callback_with_handle_return() {
        let args = args_of(
            "__isl_give isl_ast_node *isl_ast_build_f(__isl_keep isl_ast_build *build, \
             __isl_give isl_ast_node *(*fn)(__isl_take isl_ast_node *node, \
             __isl_keep isl_ast_build *build, void *user), void *user);",
        );
        let Arg::Callback(cb) = &args[1] else {
            panic!("expected callback");
        };
        assert_eq!(cb.return_semantics, Some(Semantics::Give));
        assert_eq!(cb.return_base_type, "isl_ast_node");
        assert_eq!(cb.return_ptr, PtrDepth::Ptr);
        assert_eq!(cb.args.len(), 3);
    }

    #[test]
    fn variadic_is_bad_arg() {
        let decl = parse_declaration("int isl_printf(isl_ctx *ctx, const char *fmt, ...);").unwrap();
        let err = parse_argument(&decl.args[2]).unwrap_err();
        assert!(matches!(err, ParseError::BadArg(_)));
    }

    #[test]
    fn two_annotations_are_rejected() {
        let decl =
            parse_declaration("int isl_set_f(__isl_take __isl_keep isl_set *set);").unwrap();
        let err = parse_argument(&decl.args[0]).unwrap_err();
        assert!(matches!(err, ParseError::ConflictingAnnotations(_)));
    }

    #[test]
    fn malformed_declarations() {
        assert!(parse_declaration("isl_set *x;").is_err());
        assert!(parse_declaration("int isl_f(int x;").is_err());
        let decl = parse_declaration("int isl_f(int);").unwrap();
        assert!(parse_argument(&decl.args[0]).is_err());
    }

    #[test]
    fn macro_pseudo_function_keeps_raw_args() {
        let decl = parse_declaration("ISL_DECLARE_LIST(id)").unwrap();
        assert_eq!(decl.c_name, "ISL_DECLARE_LIST");
        assert!(decl.return_words.is_empty());
        assert_eq!(decl.args, vec![vec![Token::Ident("id".to_string())]]);
    }
}
