//! `f:section`: named, deferred template content.

use std::sync::Arc;

use crate::directive::{ArgumentDefinitions, ArgumentType, Invocation, PostParseHook, ViewHelper};
use crate::interpreter::RenderError;
use crate::parser::{DirectiveNode, Node, ParseError, ParseState};
use crate::types::Value;

/// Shared-state key set by `f:render` right before it evaluates a section.
pub const RENDERING_SECTION: &str = "isCurrentlyRenderingSection";

/// Declares a named block of content that `f:render` can invoke.
///
/// Reached through normal evaluation the section renders nothing. Only a
/// section invoked by `f:render` renders its children: the render sets a
/// one-shot flag in the shared state which the section consumes. Compiled
/// units take the same path, so inline sections still bind their arguments.
#[derive(Debug, Default)]
pub struct SectionViewHelper;

impl ViewHelper for SectionViewHelper {
    fn initialize_arguments(arguments: &mut ArgumentDefinitions) {
        arguments.register_required("name", ArgumentType::String, "Name of the section");
    }

    fn escape_output() -> bool {
        false
    }

    fn post_parse_hook() -> Option<PostParseHook> {
        Some(register_section)
    }

    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError> {
        let invoked = invocation
            .context()
            .shared_mut()
            .take::<SectionViewHelper>(RENDERING_SECTION)
            .is_some();
        if invoked {
            invocation.render_children()
        } else {
            Ok(Value::empty())
        }
    }
}

/// Registers the section under its literal name.
fn register_section(node: &Arc<DirectiveNode>, state: &mut ParseState) -> Result<(), ParseError> {
    match node.argument("name") {
        Some(Node::Text(name)) if !name.is_empty() => {
            state.register_section(name.clone(), Arc::clone(node));
            Ok(())
        }
        Some(_) => Err(ParseError::InvalidArgument {
            position: node.position,
            directive: node.tag_name(),
            argument: "name".to_string(),
            message: "section name must be a non-empty literal".to_string(),
        }),
        // Missing names are reported as binding errors at render time.
        None => Ok(()),
    }
}
