//! Tree evaluation: the interpreted rendering path.
//!
//! Every node variant evaluates to a [`Value`] under a rendering context.
//! Output conversion and comparison helpers here are shared with compiled
//! fragments so both rendering paths produce byte-identical output.

use indexmap::IndexMap;

use crate::compiler::Fragment;
use crate::directive::{Arguments, Children, HandlerType};
use crate::interpreter::{RenderError, RenderingContext};
use crate::parser::ast::{ArrayNode, Comparator, Condition, DirectiveNode, Node, Numeric};
use crate::types::{Deferred, Value};

impl Node {
    /// Evaluates this node under `context`.
    pub fn evaluate(&self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
        match self {
            Node::Root(root) => render_nodes(&root.children, context),
            Node::Text(text) => Ok(Value::Safe(text.clone())),
            Node::Numeric(numeric) => Ok(numeric_value(*numeric)),
            Node::ObjectAccessor(accessor) => resolve_path(&accessor.path, context),
            Node::Boolean(boolean) => {
                evaluate_condition(&boolean.expression, context).map(Value::Bool)
            }
            Node::Directive(directive) => invoke_directive(directive, context),
            Node::Array(array) => evaluate_array(array, context),
        }
    }
}

impl Deferred for DirectiveNode {
    fn evaluate(&self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
        invoke_directive(self, context)
    }
}

pub(crate) fn numeric_value(numeric: Numeric) -> Value {
    match numeric {
        Numeric::Integer(n) => Value::Number(n),
        Numeric::Float(f) => Value::Float(f),
    }
}

/// Resolves a variable path; missing paths are null unless strict variables are on.
pub(crate) fn resolve_path(
    path: &[String],
    context: &RenderingContext<'_>,
) -> Result<Value, RenderError> {
    match context.variables().resolve(path) {
        Some(value) => Ok(value.clone()),
        None if context.config().strict_variables => Err(RenderError::UndefinedVariable {
            path: path.join("."),
        }),
        None => Ok(Value::Null),
    }
}

fn evaluate_condition(
    condition: &Condition,
    context: &mut RenderingContext<'_>,
) -> Result<bool, RenderError> {
    match condition {
        Condition::Operand(node) => Ok(node.evaluate(context)?.is_truthy()),
        Condition::Not(inner) => Ok(!evaluate_condition(inner, context)?),
        Condition::And(left, right) => {
            Ok(evaluate_condition(left, context)? && evaluate_condition(right, context)?)
        }
        Condition::Or(left, right) => {
            Ok(evaluate_condition(left, context)? || evaluate_condition(right, context)?)
        }
        Condition::Compare {
            left,
            comparator,
            right,
        } => {
            let left = left.evaluate(context)?;
            let right = right.evaluate(context)?;
            Ok(compare(&left, *comparator, &right))
        }
    }
}

/// Applies a comparator to two evaluated operands.
pub(crate) fn compare(left: &Value, comparator: Comparator, right: &Value) -> bool {
    match comparator {
        Comparator::Equal => left.loose_eq(right),
        Comparator::NotEqual => !left.loose_eq(right),
        Comparator::Greater => left.compare(right).is_some_and(|o| o.is_gt()),
        Comparator::Less => left.compare(right).is_some_and(|o| o.is_lt()),
        Comparator::GreaterOrEqual => left.compare(right).is_some_and(|o| o.is_ge()),
        Comparator::LessOrEqual => left.compare(right).is_some_and(|o| o.is_le()),
    }
}

fn evaluate_array(
    array: &ArrayNode,
    context: &mut RenderingContext<'_>,
) -> Result<Value, RenderError> {
    match array {
        ArrayNode::List(items) => items
            .iter()
            .map(|item| item.evaluate(context).map(plain))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        ArrayNode::Keyed(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key.clone(), plain(item.evaluate(context)?));
            }
            Ok(Value::Map(map))
        }
    }
}

/// Array literal entries are data, not markup: quoted literals become plain strings.
pub(crate) fn plain(value: Value) -> Value {
    match value {
        Value::Safe(text) => Value::String(text),
        other => other,
    }
}

/// Invokes a directive node: resolve the handler type from the context's
/// resolver, bind arguments, then render a fresh handler instance.
pub fn invoke_directive(
    node: &DirectiveNode,
    context: &mut RenderingContext<'_>,
) -> Result<Value, RenderError> {
    let handler_type = context.resolver().resolve(&node.namespace, &node.name)?;
    let arguments = bind_node_arguments(node, handler_type, context)?;
    handler_type.invoke(arguments, Children::Nodes(&node.children), context)
}

/// Checks a directive node's argument names, evaluates the supplied values
/// and binds them to the handler type's contract.
pub fn bind_node_arguments(
    node: &DirectiveNode,
    handler_type: &HandlerType,
    context: &mut RenderingContext<'_>,
) -> Result<Arguments, RenderError> {
    let directive = node.tag_name();
    let definitions = handler_type.arguments();
    definitions.check_names(&directive, node.argument_names())?;
    let mut supplied = Vec::with_capacity(node.arguments.len());
    for (name, argument) in &node.arguments {
        supplied.push((name.as_str(), argument.evaluate(context)?));
    }
    definitions.bind(&directive, supplied)
}

/// Evaluates nodes in order and concatenates their output.
pub fn render_nodes(nodes: &[Node], context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
    let mut output = String::new();
    for node in nodes {
        let value = node.evaluate(context)?;
        append_output(&mut output, &value, context)?;
    }
    Ok(Value::Safe(output))
}

/// Evaluates compiled fragments in order and concatenates their output.
pub fn render_fragments<'f>(
    fragments: impl IntoIterator<Item = &'f Fragment>,
    context: &mut RenderingContext<'_>,
) -> Result<Value, RenderError> {
    let mut output = String::new();
    for fragment in fragments {
        let value = fragment(context)?;
        append_output(&mut output, &value, context)?;
    }
    Ok(Value::Safe(output))
}

/// Appends the output form of a value.
///
/// Plain strings are escaped (when enabled), safe strings are emitted as is,
/// node references are evaluated in place, and null and collections emit
/// nothing.
pub fn append_output(
    output: &mut String,
    value: &Value,
    context: &mut RenderingContext<'_>,
) -> Result<(), RenderError> {
    match value {
        Value::Null | Value::List(_) | Value::Map(_) => {}
        Value::String(text) => {
            if context.config().escape_output {
                output.push_str(&(context.config().escaper)(text));
            } else {
                output.push_str(text);
            }
        }
        Value::Safe(text) => output.push_str(text),
        Value::Bool(_) | Value::Number(_) | Value::Float(_) => output.push_str(&value.to_string()),
        Value::Node(node) => {
            let evaluated = node.evaluate(context)?;
            append_output(output, &evaluated, context)?;
        }
    }
    Ok(())
}

/// Converts a value to its final output string.
pub fn to_output(value: &Value, context: &mut RenderingContext<'_>) -> Result<String, RenderError> {
    let mut output = String::new();
    append_output(&mut output, value, context)?;
    Ok(output)
}
