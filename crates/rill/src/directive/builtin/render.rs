//! `f:render`: invokes a section or a partial template.

use indexmap::IndexMap;

use crate::directive::{ArgumentDefinitions, ArgumentType, Invocation, ViewHelper};
use crate::interpreter::{
    BindingErrorKind, RenderError, RenderingContext, Variables, compute_suggestions, to_output,
};
use crate::template::SECTIONS_VARIABLE;
use crate::types::{NodeRef, Value};

use super::section::{RENDERING_SECTION, SectionViewHelper};

/// Renders a named section of the current template, or a partial template
/// (optionally one of its sections).
///
/// ```text
/// <f:render section="item" arguments="{label: 'Home', href: '/'}" />
/// <f:render partial="footer" optional="true" />
/// ```
///
/// A section renders in a nested scope: `arguments` extend (and shadow) the
/// variables visible at the call site. A partial renders in an isolated
/// scope holding only `arguments`. When the section is missing the fallbacks
/// are, in order: `default`, the directive's own children, and empty output
/// for `optional="true"`.
#[derive(Debug, Default)]
pub struct RenderViewHelper;

/// Outcome of looking up and rendering a section.
enum Lookup {
    Rendered(Value),
    Missing { available: Vec<String> },
}

impl ViewHelper for RenderViewHelper {
    fn initialize_arguments(arguments: &mut ArgumentDefinitions) {
        arguments
            .register("section", ArgumentType::String, "Name of the section to render")
            .register("partial", ArgumentType::String, "Identity of the partial to render")
            .register_with_default(
                "arguments",
                ArgumentType::Array,
                "Variables passed to the section or partial",
                Value::Map(IndexMap::new()),
            )
            .register_with_default(
                "optional",
                ArgumentType::Boolean,
                "Render nothing instead of failing when the section is missing",
                false,
            )
            .register("default", ArgumentType::Any, "Output used when the section is missing");
    }

    fn escape_output() -> bool {
        false
    }

    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError> {
        let arguments = invocation.arguments().clone();
        let section = arguments.string("section");
        let frame = argument_frame(arguments.get("arguments"))?;

        let lookup = match (arguments.string("partial"), section) {
            (Some(partial), section) => {
                render_partial(invocation.context(), partial, section, frame)?
            }
            (None, Some(section)) => render_section(invocation.context(), section, frame)?,
            (None, None) => {
                return Err(RenderError::binding(
                    "f:render",
                    "section",
                    BindingErrorKind::Invalid(
                        "either 'section' or 'partial' must be given".to_string(),
                    ),
                ));
            }
        };

        let available = match lookup {
            Lookup::Rendered(value) => return Ok(value),
            Lookup::Missing { available } => available,
        };
        if arguments.is_set("default") {
            let output = to_output(arguments.get("default"), invocation.context())?;
            return Ok(Value::Safe(output));
        }
        if !invocation.children().is_empty() {
            return invocation.render_children();
        }
        if arguments.truthy("optional") {
            return Ok(Value::empty());
        }
        let name = section.unwrap_or_default().to_string();
        Err(RenderError::SectionNotFound {
            suggestions: compute_suggestions(&name, &available),
            name,
        })
    }
}

/// Builds the scope frame of a section or partial from the `arguments` value.
///
/// Only keyed arrays name their variables. An empty list (what an undefined
/// variable coerces to) binds nothing; any other list is rejected.
fn argument_frame(arguments: &Value) -> Result<Variables, RenderError> {
    match arguments {
        Value::Map(entries) => Ok(entries
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()),
        Value::List(items) if !items.is_empty() => Err(RenderError::binding(
            "f:render",
            "arguments",
            BindingErrorKind::Invalid(
                "'arguments' must be a keyed array such as {name: value}".to_string(),
            ),
        )),
        _ => Ok(Variables::new()),
    }
}

/// Looks up a section node in the registry exposed by the current template.
fn lookup_section(sections: Option<&Value>, name: &str) -> Result<NodeRef, Vec<String>> {
    let registry = sections.and_then(Value::as_map);
    match registry.and_then(|sections| sections.get(name)).and_then(Value::as_node) {
        Some(node) => Ok(node.clone()),
        None => Err(registry
            .map(|sections| sections.keys().cloned().collect())
            .unwrap_or_default()),
    }
}

/// Evaluates a section node with the one-shot rendering flag set.
///
/// The flag is removed afterwards whether or not the section consumed it or
/// the evaluation failed.
fn invoke_section(
    context: &mut RenderingContext<'_>,
    name: &str,
    node: &NodeRef,
) -> Result<Value, RenderError> {
    context
        .shared_mut()
        .insert::<SectionViewHelper>(RENDERING_SECTION, name);
    let result = node.evaluate(context);
    context
        .shared_mut()
        .take::<SectionViewHelper>(RENDERING_SECTION);
    result
}

fn render_section(
    context: &mut RenderingContext<'_>,
    name: &str,
    frame: Variables,
) -> Result<Lookup, RenderError> {
    let node = match lookup_section(context.variables().get(SECTIONS_VARIABLE), name) {
        Ok(node) => node,
        Err(available) => return Ok(Lookup::Missing { available }),
    };
    tracing::trace!(section = name, depth = context.depth(), "rendering section");
    context
        .descend(|context| {
            context.with_scope(frame, |context| invoke_section(context, name, &node))
        })
        .map(Lookup::Rendered)
}

fn render_partial(
    context: &mut RenderingContext<'_>,
    identity: &str,
    section: Option<&str>,
    mut frame: Variables,
) -> Result<Lookup, RenderError> {
    let Some(engine) = context.engine() else {
        return Err(RenderError::TemplateNotFound {
            identity: identity.to_string(),
        });
    };
    let template = engine.partial(identity)?;
    let sections = template.sections_value();

    let node = match section {
        Some(name) => match lookup_section(Some(&sections), name) {
            Ok(node) => Some((name, node)),
            Err(available) => return Ok(Lookup::Missing { available }),
        },
        None => None,
    };

    frame.insert(SECTIONS_VARIABLE.to_string(), sections);
    context
        .descend(|context| {
            context.with_isolated_scope(frame, |context| match &node {
                Some((name, node)) => invoke_section(context, name, node),
                None => template.evaluate_root(context),
            })
        })
        .map(Lookup::Rendered)
}
