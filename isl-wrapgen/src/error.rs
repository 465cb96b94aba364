//! Error kinds for the parts of the pipeline that skip input instead of
//! aborting. Fatal conditions use `anyhow` directly.

use thiserror::Error;

/// A declaration or argument that the grammar rejects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Does not match the function-declaration grammar at all.
    #[error("declaration does not match the function grammar: `{0}`")]
    Malformed(String),

    /// An argument shape that is deliberately not modelled (e.g. `...`).
    #[error("unsupported argument `{0}`")]
    BadArg(String),

    /// More than one of `__isl_take`/`__isl_give`/`__isl_keep`/`__isl_null`.
    #[error("conflicting ownership annotations in `{0}`")]
    ConflictingAnnotations(String),
}

/// Why a method produced no wrapper.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("malformed declaration: {0}")]
    MalformedDeclaration(String),

    #[error("unsupported argument in {0}")]
    BadArg(String),

    /// An isl handle without an ownership annotation; collected into the
    /// end-of-run report.
    #[error("undocumented ownership semantics in {0}")]
    Undocumented(String),

    #[error("sig not supported: {0}")]
    UnsupportedSignature(String),
}

impl SkipReason {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        SkipReason::UnsupportedSignature(reason.into())
    }
}

impl From<ParseError> for SkipReason {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::BadArg(arg) => SkipReason::BadArg(arg),
            other => SkipReason::MalformedDeclaration(other.to_string()),
        }
    }
}
