//! The render entry point shared by parsed and compiled templates.

use crate::interpreter::{RenderError, RenderingContext, Variables, to_output};
use crate::types::{TemplateId, Value};

/// Variable holding the current template's section registry.
///
/// Maps section names to node references; `f:render` looks sections up here.
pub const SECTIONS_VARIABLE: &str = "sections";

/// A template that can be rendered: a [`ParsedTemplate`](crate::ParsedTemplate),
/// interpreted, or a [`CompiledUnit`](crate::CompiledUnit).
pub trait Renderable: Send + Sync {
    /// Cache key of the template.
    fn id(&self) -> TemplateId;

    /// Identity the template was parsed under.
    fn identity(&self) -> &str;

    /// Whether compiling this template may still succeed.
    fn is_compilable(&self) -> bool;

    /// Whether this is a compiled unit.
    fn is_compiled(&self) -> bool;

    /// The section registry as a map of node references.
    fn sections_value(&self) -> Value;

    /// Evaluates the template body under `context` without exposing sections.
    fn evaluate_root(&self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError>;

    /// Renders the template to its output string.
    ///
    /// The section registry is bound as [`SECTIONS_VARIABLE`] in a frame
    /// pushed for the duration of the call.
    fn render(&self, context: &mut RenderingContext<'_>) -> Result<String, RenderError> {
        let mut frame = Variables::new();
        frame.insert(SECTIONS_VARIABLE.to_string(), self.sections_value());
        context.with_scope(frame, |context| {
            let value = self.evaluate_root(context)?;
            to_output(&value, context)
        })
    }
}
