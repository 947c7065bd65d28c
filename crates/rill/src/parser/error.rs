//! Parse error types for rill templates.

use thiserror::Error;

use super::ast::Position;
use crate::interpreter::UnknownDirectiveError;

/// An error that occurred during parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Malformed markup with location information.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// A tag used a known prefix but names no registered directive.
    #[error("{position}: {source}")]
    UnknownDirective {
        position: Position,
        #[source]
        source: UnknownDirectiveError,
    },

    /// A parse-time hook rejected a directive's arguments.
    #[error("{position}: invalid argument '{argument}' of '{directive}': {message}")]
    InvalidArgument {
        position: Position,
        directive: String,
        argument: String,
        message: String,
    },
}

impl ParseError {
    /// Location of the error in the template source.
    pub fn position(&self) -> Position {
        match self {
            ParseError::Syntax { line, column, .. } => Position {
                line: *line,
                column: *column,
            },
            ParseError::UnknownDirective { position, .. }
            | ParseError::InvalidArgument { position, .. } => *position,
        }
    }

    /// The error text without the location prefix.
    pub fn message(&self) -> String {
        match self {
            ParseError::Syntax { message, .. } => message.clone(),
            ParseError::UnknownDirective { source, .. } => source.to_string(),
            ParseError::InvalidArgument {
                directive,
                argument,
                message,
                ..
            } => format!("invalid argument '{argument}' of '{directive}': {message}"),
        }
    }
}
