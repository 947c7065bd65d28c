//! Error types for rendering, directive resolution and template loading.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::directive::ArgumentType;
use crate::parser::ParseError;

/// A directive name with no registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown directive '{name}' in namespace '{namespace}'{}", did_you_mean(suggestions))]
pub struct UnknownDirectiveError {
    pub namespace: String,
    pub name: String,
    pub suggestions: Vec<String>,
}

/// Why an argument could not be bound to a directive invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingErrorKind {
    /// A required argument was not supplied.
    Missing,
    /// The supplied argument is not declared by the directive.
    Unknown { suggestions: Vec<String> },
    /// The value cannot be coerced to the declared type.
    TypeMismatch {
        expected: ArgumentType,
        found: &'static str,
    },
    /// The directive rejected the combination of arguments.
    Invalid(String),
}

impl fmt::Display for BindingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingErrorKind::Missing => write!(f, "required argument is missing"),
            BindingErrorKind::Unknown { suggestions } => {
                write!(f, "argument is not declared{}", did_you_mean(suggestions))
            }
            BindingErrorKind::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, got {found}")
            }
            BindingErrorKind::Invalid(message) => write!(f, "{message}"),
        }
    }
}

/// An error that aborts a render call.
///
/// Errors are never swallowed during evaluation: the first failing node
/// aborts the whole render and no partial output is produced.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The directive is not (or no longer) registered with the resolver.
    #[error(transparent)]
    UnknownDirective(#[from] UnknownDirectiveError),

    /// Missing required, unknown, or type-mismatched argument.
    #[error("argument '{argument}' of '{directive}': {kind}")]
    ArgumentBinding {
        directive: String,
        argument: String,
        kind: BindingErrorKind,
    },

    /// `f:render` named a section that is not registered and no fallback was given.
    #[error("section '{name}' not found{}", did_you_mean(suggestions))]
    SectionNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    /// The template source loader could not provide a template.
    #[error("template '{identity}' not found")]
    TemplateNotFound { identity: String },

    /// A partial was loaded but failed to parse.
    #[error("partial '{identity}' is invalid: {source}")]
    InvalidPartial {
        identity: String,
        #[source]
        source: ParseError,
    },

    /// A variable path did not resolve while strict variables are enabled.
    #[error("undefined variable '{path}'")]
    UndefinedVariable { path: String },

    /// Nested section or partial rendering went deeper than allowed.
    #[error("maximum render depth of {max_depth} exceeded")]
    MaxDepthExceeded { max_depth: usize },
}

impl RenderError {
    pub(crate) fn binding(
        directive: impl Into<String>,
        argument: impl Into<String>,
        kind: BindingErrorKind,
    ) -> Self {
        RenderError::ArgumentBinding {
            directive: directive.into(),
            argument: argument.into(),
            kind,
        }
    }
}

/// Errors raised by template source loaders.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No template is known under this identity.
    #[error("template '{identity}' not found")]
    NotFound { identity: String },

    /// File I/O error when reading a template file.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Computes "did you mean" suggestions for an unresolved name.
///
/// Returns up to three candidates within a Levenshtein distance of 1 (for
/// names of three characters or fewer) or 2 (longer names), closest first.
pub fn compute_suggestions(target: &str, available: &[String]) -> Vec<String> {
    let max_distance = if target.chars().count() <= 3 { 1 } else { 2 };
    let mut candidates: Vec<(usize, &String)> = available
        .iter()
        .map(|candidate| (strsim::levenshtein(target, candidate), candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    candidates
        .into_iter()
        .take(3)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean: {}?", suggestions.join(", "))
    }
}
