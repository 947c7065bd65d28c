//! Template parser.
//!
//! This module turns template source into a syntax tree that can be
//! interpreted directly, compiled, or inspected by external tooling.

pub mod ast;
pub mod error;
mod expression;
mod parsed;
mod template;

pub use ast::*;
pub use error::ParseError;
pub use expression::{parse_argument, parse_condition};
pub use parsed::{ParseState, ParsedTemplate, parse};
