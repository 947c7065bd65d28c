//! `f:for`: iteration over lists and maps.

use indexmap::IndexMap;

use crate::directive::{ArgumentDefinitions, ArgumentType, Invocation, ViewHelper};
use crate::interpreter::{RenderError, Variables, append_output};
use crate::types::Value;

/// Renders its children once per element of `each`.
///
/// ```text
/// <f:for each="{users}" as="user" key="position" iteration="loop">
///     {loop.cycle}. {user.name}
/// </f:for>
/// ```
///
/// Every iteration runs in its own scope frame binding `as` (and `key` and
/// `iteration` when given). List keys are indices, map keys are the entry
/// keys.
#[derive(Debug, Default)]
pub struct ForViewHelper;

impl ViewHelper for ForViewHelper {
    fn initialize_arguments(arguments: &mut ArgumentDefinitions) {
        arguments
            .register_required("each", ArgumentType::Array, "Collection to iterate over")
            .register_required("as", ArgumentType::String, "Variable bound to the current element")
            .register("key", ArgumentType::String, "Variable bound to the current key")
            .register(
                "iteration",
                ArgumentType::String,
                "Variable bound to the iteration record",
            )
            .register_with_default("reverse", ArgumentType::Boolean, "Iterate backwards", false);
    }

    fn escape_output() -> bool {
        false
    }

    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError> {
        let arguments = invocation.arguments().clone();
        let Some(element) = arguments.string("as") else {
            return Ok(Value::empty());
        };
        let key = arguments.string("key");
        let iteration = arguments.string("iteration");

        let mut entries: Vec<(Value, Value)> = match arguments.get("each") {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| (Value::from(index), item.clone()))
                .collect(),
            Value::Map(map) => map
                .iter()
                .map(|(key, item)| (Value::from(key.as_str()), item.clone()))
                .collect(),
            _ => Vec::new(),
        };
        if arguments.truthy("reverse") {
            entries.reverse();
        }

        let children = invocation.children();
        let context = invocation.context();
        let total = entries.len();
        let mut output = String::new();
        for (index, (entry_key, item)) in entries.into_iter().enumerate() {
            let mut frame = Variables::new();
            frame.insert(element.to_string(), item);
            if let Some(key) = key {
                frame.insert(key.to_string(), entry_key);
            }
            if let Some(iteration) = iteration {
                frame.insert(iteration.to_string(), iteration_record(index, total));
            }
            let value = context.with_scope(frame, |context| children.render(context))?;
            append_output(&mut output, &value, context)?;
        }
        Ok(Value::Safe(output))
    }
}

fn iteration_record(index: usize, total: usize) -> Value {
    let cycle = index + 1;
    let mut record = IndexMap::new();
    record.insert("index".to_string(), Value::from(index));
    record.insert("cycle".to_string(), Value::from(cycle));
    record.insert("total".to_string(), Value::from(total));
    record.insert("isFirst".to_string(), Value::Bool(index == 0));
    record.insert("isLast".to_string(), Value::Bool(cycle == total));
    record.insert("isEven".to_string(), Value::Bool(cycle % 2 == 0));
    record.insert("isOdd".to_string(), Value::Bool(cycle % 2 == 1));
    Value::Map(record)
}
