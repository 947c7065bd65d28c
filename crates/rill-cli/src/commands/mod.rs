//! CLI command implementations.

mod check;
mod directives;
mod render;

pub use check::{run_check, CheckArgs};
pub use directives::{run_directives, DirectivesArgs};
pub use render::{run_render, RenderArgs};
