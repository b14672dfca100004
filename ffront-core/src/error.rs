#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::path::PathBuf;

use ffront_ast::{SourceLocation, Span};
use ffront_lex::LexError;
use miette::Diagnostic;
use thiserror::Error;

/// The source handed to a decorator does not hold exactly one function.
#[derive(Debug, Error, Diagnostic)]
#[error("unsupported source: {message}")]
#[diagnostic(code(ffront::source_shape))]
#[allow(unused_assignments)]
pub struct SourceShapeError {
    pub message: String,
    #[label]
    pub span: Option<Span>,
}

#[derive(Debug, Error, Diagnostic)]
#[error("source unavailable: {message}")]
#[diagnostic(code(ffront::source_unavailable))]
pub struct SourceUnavailableError {
    pub message: String,
}

#[derive(Debug, Error, Diagnostic)]
#[error("could not deduce type: {message} (at {location})")]
#[diagnostic(code(ffront::type_deduction))]
#[allow(unused_assignments)]
pub struct TypeDeductionError {
    pub message: String,
    pub location: SourceLocation,
    #[label]
    pub span: Option<Span>,
}

impl TypeDeductionError {
    pub fn new(message: impl Into<String>, location: &SourceLocation) -> Self {
        Self {
            message: message.into(),
            location: location.clone(),
            span: location.span,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ClosureError {
    #[error("unsupported closure kind: {message}")]
    #[diagnostic(code(ffront::closure::unsupported_kind))]
    UnsupportedClosureKind { message: String },

    #[error("reference to undefined symbol(s) `{}`", .names.join(", "))]
    #[diagnostic(code(ffront::closure::undefined_symbol))]
    UndefinedSymbolReference { names: Vec<String> },

    #[error("the following function(s) are not valid gt callables `{}`", .names.join(", "))]
    #[diagnostic(code(ffront::closure::invalid_callable))]
    InvalidGtCallable { names: Vec<String> },

    #[error(
        "name of the closure reference `{captured}` and the function it holds (`{definition}`) do not match"
    )]
    #[diagnostic(code(ffront::closure::name_mismatch))]
    ClosureNameMismatch { captured: String, definition: String },

    #[error(
        "direct call to field operator `{operator}` whose signature contains an argument `out` is not permitted"
    )]
    #[diagnostic(
        code(ffront::closure::reserved_parameter),
        help("wrap the operator in a program and pass `out` explicitly")
    )]
    ReservedParameterName { operator: String },

    #[error("cyclic closure: {}", .path.join(" -> "))]
    #[diagnostic(code(ffront::closure::cycle))]
    CyclicClosure { path: Vec<String> },
}

#[derive(Debug, Error, Diagnostic)]
pub enum CallError {
    #[error("function `{function}` takes {expected} arguments, but {given} were given")]
    #[diagnostic(code(ffront::call::arity))]
    ArityMismatch {
        function: String,
        expected: usize,
        given: usize,
    },

    #[error("keyword arguments are not supported yet (got `{}`)", .names.join(", "))]
    #[diagnostic(code(ffront::call::keyword_arguments))]
    UnsupportedKeywordArguments { names: Vec<String> },

    #[error("argument `{param}` has {given} extents, but its type declares {expected} dimensions")]
    #[diagnostic(code(ffront::call::argument_shape))]
    ArgumentShape {
        param: String,
        expected: usize,
        given: usize,
    },
}

#[derive(Debug, Error, Diagnostic)]
#[error("not supported: {message}")]
#[diagnostic(code(ffront::unsupported))]
pub struct UnsupportedError {
    pub message: String,
}

impl UnsupportedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by a parser, lowering or backend implementation.
#[derive(Debug, Error, Diagnostic)]
#[error("{stage} failed: {message}")]
#[diagnostic(code(ffront::collaborator))]
pub struct CollaboratorError {
    pub stage: String,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    #[diagnostic(code(ffront::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config{}: {source}", .path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default())]
    #[diagnostic(code(ffront::config::parse))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum FrontendError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    SourceShape(#[from] SourceShapeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SourceUnavailable(#[from] SourceUnavailableError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TypeDeduction(#[from] TypeDeductionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Closure(#[from] ClosureError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unsupported(#[from] UnsupportedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Non-fatal condition surfaced to the caller alongside a successful result.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(ffront::warning), severity(Warning))]
pub struct FrontendWarning {
    pub message: String,
}
