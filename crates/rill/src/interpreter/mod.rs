//! Rendering by interpretation, plus the state every render path shares.
//!
//! This module provides the per-render [`RenderingContext`], tree evaluation,
//! output conversion, and the error types raised while rendering.

mod context;
mod error;
mod evaluator;

pub use context::{RenderingContext, SharedState, VariableScope, Variables};
pub use error::{
    BindingErrorKind, LoadError, RenderError, UnknownDirectiveError, compute_suggestions,
};
pub use evaluator::{
    append_output, bind_node_arguments, invoke_directive, render_fragments, render_nodes,
    to_output,
};

pub(crate) use evaluator::{compare, numeric_value, plain, resolve_path};
