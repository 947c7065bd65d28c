//! `f:if` and `f:else`.

use std::sync::Arc;

use crate::compiler::{CompiledChild, CompiledDirective, Fragment, fragment};
use crate::directive::{
    ArgumentDefinitions, ArgumentType, Arguments, CompileHook, DirectiveResolver, HandlerType,
    Invocation, PostParseHook, ViewHelper,
};
use crate::interpreter::{
    RenderError, RenderingContext, append_output, bind_node_arguments, render_fragments,
    render_nodes,
};
use crate::parser::{Condition, DirectiveNode, Node, ParseError, ParseState};
use crate::types::Value;

/// Renders its children when `condition` holds, otherwise the first
/// matching `f:else` child.
///
/// ```text
/// <f:if condition="{user.admin}">
///     Admin
///     <f:else if="{user.editor}">Editor</f:else>
///     <f:else>Reader</f:else>
/// </f:if>
/// ```
///
/// Immediate `f:else` children are never part of the then-branch, and
/// branches not taken are not evaluated. Which children are `f:else` is
/// decided against the rendering context's resolver.
#[derive(Debug, Default)]
pub struct IfViewHelper;

impl ViewHelper for IfViewHelper {
    fn initialize_arguments(arguments: &mut ArgumentDefinitions) {
        arguments.register_required(
            "condition",
            ArgumentType::Boolean,
            "Condition selecting the then-branch",
        );
    }

    fn escape_output() -> bool {
        false
    }

    fn compile_hook() -> Option<CompileHook> {
        Some(compile_if)
    }

    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError> {
        let condition = invocation.arguments().truthy("condition");
        let children = invocation.children();
        if let Some(compiled) = children.compiled() {
            return render_compiled(condition, compiled, invocation.context());
        }
        let nodes = children.nodes().unwrap_or_default();
        let context = invocation.context();
        let resolver = context.resolver();

        if condition {
            let mut output = String::new();
            for node in nodes {
                if else_directive(node, resolver).is_some() {
                    continue;
                }
                let value = node.evaluate(context)?;
                append_output(&mut output, &value, context)?;
            }
            return Ok(Value::Safe(output));
        }

        for node in nodes {
            let Some(branch) = else_directive(node, resolver) else {
                continue;
            };
            let handler_type = resolver.resolve(&branch.namespace, &branch.name)?;
            let arguments = bind_node_arguments(branch, handler_type, context)?;
            if branch_taken(&arguments) {
                return render_nodes(&branch.children, context);
            }
        }
        Ok(Value::empty())
    }
}

/// The alternative branch of an enclosing `f:if`.
///
/// With an `if` argument the branch is only taken when that condition holds,
/// which chains conditions. Rendered outside an `f:if`, it renders its
/// children.
#[derive(Debug, Default)]
pub struct ElseViewHelper;

impl ViewHelper for ElseViewHelper {
    fn initialize_arguments(arguments: &mut ArgumentDefinitions) {
        arguments.register("if", ArgumentType::Boolean, "Condition for an else-if branch");
    }

    fn escape_output() -> bool {
        false
    }

    fn post_parse_hook() -> Option<PostParseHook> {
        Some(reject_empty_condition)
    }

    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError> {
        invocation.render_children()
    }
}

/// An `if=""` would bind as false and silently turn the branch off.
fn reject_empty_condition(
    node: &Arc<DirectiveNode>,
    _: &mut ParseState,
) -> Result<(), ParseError> {
    let Some(Node::Boolean(boolean)) = node.argument("if") else {
        return Ok(());
    };
    if boolean.expression != Condition::Operand(Box::new(Node::Text(String::new()))) {
        return Ok(());
    }
    Err(ParseError::InvalidArgument {
        position: node.position,
        directive: node.tag_name(),
        argument: "if".to_string(),
        message: "condition must not be empty; omit 'if' for a plain else".to_string(),
    })
}

fn branch_taken(arguments: &Arguments) -> bool {
    !arguments.is_set("if") || arguments.truthy("if")
}

/// Returns the node as an `f:else` directive, if it is one.
fn else_directive<'n>(
    node: &'n Node,
    resolver: &DirectiveResolver,
) -> Option<&'n Arc<DirectiveNode>> {
    node.as_directive()
        .filter(|directive| is_else(resolver, &directive.namespace, &directive.name))
}

/// Returns the compiled child as an `f:else` directive, if it is one.
fn else_branch<'c>(
    child: &'c CompiledChild,
    resolver: &DirectiveResolver,
) -> Option<&'c CompiledDirective> {
    child
        .directive()
        .filter(|directive| is_else(resolver, directive.namespace(), directive.name()))
}

fn is_else(resolver: &DirectiveResolver, namespace: &str, name: &str) -> bool {
    resolver
        .resolve(namespace, name)
        .is_ok_and(HandlerType::is::<ElseViewHelper>)
}

fn render_compiled(
    condition: bool,
    children: &[CompiledChild],
    context: &mut RenderingContext<'_>,
) -> Result<Value, RenderError> {
    let resolver = context.resolver();
    if condition {
        let mut output = String::new();
        for child in children {
            if else_branch(child, resolver).is_some() {
                continue;
            }
            let value = child.render(context)?;
            append_output(&mut output, &value, context)?;
        }
        return Ok(Value::Safe(output));
    }

    for branch in children
        .iter()
        .filter_map(|child| else_branch(child, resolver))
    {
        let handler_type = resolver.resolve(branch.namespace(), branch.name())?;
        let arguments = branch.arguments().bind(handler_type.arguments(), context)?;
        if branch_taken(&arguments) {
            let fragments = branch.children().iter().map(CompiledChild::fragment);
            return render_fragments(fragments, context);
        }
    }
    Ok(Value::empty())
}

/// Selects the branch without instantiating a handler.
fn compile_if(_: &DirectiveNode, directive: &Arc<CompiledDirective>) -> Option<Fragment> {
    let directive = Arc::clone(directive);
    Some(fragment(move |context| {
        let handler_type = context
            .resolver()
            .resolve(directive.namespace(), directive.name())?;
        let bound = directive.arguments().bind(handler_type.arguments(), context)?;
        render_compiled(bound.truthy("condition"), directive.children(), context)
    }))
}
