//! Miette diagnostic wrapper for rill parse errors.
//!
//! Note: This module has an exception for `unused_assignments` because miette
//! derive macros read struct fields in generated code that rustc cannot track.
#![allow(unused_assignments)]

use miette::{Diagnostic, NamedSource, SourceSpan};
use rill::parser::{ParseError, Position};
use std::path::Path;
use thiserror::Error;

/// A miette-compatible diagnostic for template parse errors.
///
/// Note: Fields are read by miette derive macros, not directly by code.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(rill::parse))]
pub struct TemplateDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    message: String,

    #[help]
    help: Option<String>,
}

impl TemplateDiagnostic {
    /// Create a diagnostic from a ParseError with source context.
    pub fn from_parse_error(path: &Path, content: &str, err: &ParseError) -> Self {
        let help = match err {
            ParseError::UnknownDirective { source, .. } if !source.suggestions.is_empty() => {
                Some(format!("did you mean '{}'?", source.suggestions.join("', '")))
            }
            ParseError::Syntax { .. }
            | ParseError::UnknownDirective { .. }
            | ParseError::InvalidArgument { .. } => None,
        };

        TemplateDiagnostic {
            src: NamedSource::new(path.display().to_string(), content.to_string()),
            span: (byte_offset(content, err.position()), 1).into(),
            message: err.message(),
            help,
        }
    }
}

/// Converts a 1-based line:column position to a byte offset into `content`.
///
/// Clamped to the content length to avoid a miette panic on out-of-bounds spans.
fn byte_offset(content: &str, position: Position) -> usize {
    let line_start = content
        .split_inclusive('\n')
        .take(position.line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>();
    let column = content[line_start.min(content.len())..]
        .char_indices()
        .nth(position.column.saturating_sub(1))
        .map_or(0, |(offset, _)| offset);
    (line_start + column).min(content.len())
}
