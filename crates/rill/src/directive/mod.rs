//! Directive handler protocol.
//!
//! A directive (`<f:if>`, `<f:section>`, ...) is implemented by a handler
//! type implementing [`ViewHelper`]. The type's argument contract and
//! capabilities are captured once, at registration, in a [`HandlerType`];
//! every invocation then gets a fresh handler instance from the type's
//! factory, so per-invocation state never leaks between calls (including
//! recursive self-invocation).

mod arguments;
pub mod builtin;
mod resolver;

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

pub use arguments::{ArgumentDefinition, ArgumentDefinitions, ArgumentType, Arguments};
pub use resolver::{CORE_NAMESPACE, DirectiveResolver};

use crate::compiler::{CompiledChild, CompiledDirective, Fragment};
use crate::interpreter::{RenderError, RenderingContext, render_fragments, render_nodes};
use crate::parser::{DirectiveNode, Node, ParseError, ParseState};
use crate::types::Value;

/// Compile hook: emits an executable fragment for a directive node from its
/// compiled arguments and children, or declines (`None`), which makes the
/// whole template non-compilable.
pub type CompileHook = fn(&DirectiveNode, &Arc<CompiledDirective>) -> Option<Fragment>;

/// Post-parse hook: runs once per directive node after the tree is built.
pub type PostParseHook = fn(&Arc<DirectiveNode>, &mut ParseState) -> Result<(), ParseError>;

/// Implementation of one directive.
///
/// The `Sized`-bound associated functions describe the directive type and
/// are evaluated once, when the type is registered. [`ViewHelper::render`]
/// runs on a fresh instance per invocation.
pub trait ViewHelper: 'static {
    /// Declares the arguments this directive accepts.
    fn initialize_arguments(arguments: &mut ArgumentDefinitions)
    where
        Self: Sized;

    /// Whether string output is HTML-escaped by the renderer.
    fn escape_output() -> bool
    where
        Self: Sized,
    {
        true
    }

    /// Custom compilation. `None` compiles the directive generically: the
    /// fragment re-creates a handler instance on every render.
    fn compile_hook() -> Option<CompileHook>
    where
        Self: Sized,
    {
        None
    }

    /// Parse-time side effect (e.g. section registration).
    fn post_parse_hook() -> Option<PostParseHook>
    where
        Self: Sized,
    {
        None
    }

    /// Produces this invocation's output.
    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError>;
}

/// Capabilities a handler type declares beyond producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Supplies its own compile hook.
    pub compiles: bool,
    /// Mutates the parse state after parsing.
    pub parse_hook: bool,
}

/// A registered directive type: argument contract, capabilities and factory.
#[derive(Clone)]
pub struct HandlerType {
    namespace: String,
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    arguments: Arc<ArgumentDefinitions>,
    escape_output: bool,
    factory: fn() -> Box<dyn ViewHelper>,
    compile_hook: Option<CompileHook>,
    post_parse_hook: Option<PostParseHook>,
}

fn instantiate<H: ViewHelper + Default>() -> Box<dyn ViewHelper> {
    Box::new(H::default())
}

impl HandlerType {
    /// Captures the contract of handler `H` under `namespace`/`name`.
    pub fn new<H: ViewHelper + Default>(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let mut arguments = ArgumentDefinitions::new();
        H::initialize_arguments(&mut arguments);
        Self {
            namespace: namespace.into(),
            name: name.into(),
            type_id: TypeId::of::<H>(),
            type_name: type_name::<H>(),
            arguments: Arc::new(arguments),
            escape_output: H::escape_output(),
            factory: instantiate::<H>,
            compile_hook: H::compile_hook(),
            post_parse_hook: H::post_parse_hook(),
        }
    }

    /// Namespace URI the type is registered under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Local directive name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the handler, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether this type is implemented by handler `H`.
    pub fn is<H: ViewHelper>(&self) -> bool {
        self.type_id == TypeId::of::<H>()
    }

    /// Identity of the implementing handler type.
    pub fn implementation(&self) -> TypeId {
        self.type_id
    }

    /// The declared argument contract.
    pub fn arguments(&self) -> &ArgumentDefinitions {
        &self.arguments
    }

    /// Whether string output is escaped.
    pub fn escape_output(&self) -> bool {
        self.escape_output
    }

    /// Declared capabilities.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            compiles: self.compile_hook.is_some(),
            parse_hook: self.post_parse_hook.is_some(),
        }
    }

    pub(crate) fn compile_hook(&self) -> Option<CompileHook> {
        self.compile_hook
    }

    pub(crate) fn post_parse_hook(&self) -> Option<PostParseHook> {
        self.post_parse_hook
    }

    /// Creates a fresh handler instance.
    pub fn instantiate(&self) -> Box<dyn ViewHelper> {
        (self.factory)()
    }

    /// Runs a handler for one invocation with already bound arguments and
    /// applies output escaping.
    pub fn invoke(
        &self,
        arguments: Arguments,
        children: Children<'_>,
        context: &mut RenderingContext<'_>,
    ) -> Result<Value, RenderError> {
        tracing::trace!(directive = %self.name, namespace = %self.namespace, "invoking directive");
        let mut handler = self.instantiate();
        let mut invocation = Invocation {
            arguments,
            children,
            context,
        };
        let value = handler.render(&mut invocation)?;
        Ok(finish_output(
            value,
            self.escape_output,
            invocation.context,
        ))
    }
}

impl fmt::Debug for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerType")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("arguments", &self.arguments)
            .field("escape_output", &self.escape_output)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Marks handler output safe, escaping plain strings when the handler asks for it.
///
/// Escaping is decided by value kind: only `Value::String` is ever escaped,
/// so nested directive output (already `Safe`) and node references are never
/// escaped twice.
fn finish_output(value: Value, escape: bool, context: &RenderingContext<'_>) -> Value {
    match value {
        Value::String(text) if escape && context.config().escape_output => {
            Value::Safe((context.config().escaper)(&text))
        }
        Value::String(text) => Value::Safe(text),
        other => other,
    }
}

/// Child content of a directive, rendered only on demand.
#[derive(Clone, Copy)]
pub enum Children<'a> {
    /// Syntax-tree children (interpreted rendering).
    Nodes(&'a [Node]),
    /// Compiled children.
    Compiled(&'a [CompiledChild]),
}

impl<'a> Children<'a> {
    /// Evaluates all children in order and concatenates their output.
    pub fn render(self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
        match self {
            Children::Nodes(nodes) => render_nodes(nodes, context),
            Children::Compiled(children) => {
                render_fragments(children.iter().map(CompiledChild::fragment), context)
            }
        }
    }

    /// The syntax-tree children, when rendering from the tree.
    pub fn nodes(self) -> Option<&'a [Node]> {
        match self {
            Children::Nodes(nodes) => Some(nodes),
            Children::Compiled(_) => None,
        }
    }

    /// The compiled children, when rendering a compiled unit.
    pub fn compiled(self) -> Option<&'a [CompiledChild]> {
        match self {
            Children::Nodes(_) => None,
            Children::Compiled(children) => Some(children),
        }
    }

    /// Whether there are no children.
    pub fn is_empty(self) -> bool {
        match self {
            Children::Nodes(nodes) => nodes.is_empty(),
            Children::Compiled(children) => children.is_empty(),
        }
    }
}

impl fmt::Debug for Children<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Children::Nodes(nodes) => f.debug_tuple("Nodes").field(&nodes.len()).finish(),
            Children::Compiled(children) => {
                f.debug_tuple("Compiled").field(&children.len()).finish()
            }
        }
    }
}

/// Everything one handler invocation sees: bound arguments, children, context.
pub struct Invocation<'a, 'r> {
    arguments: Arguments,
    children: Children<'a>,
    context: &'a mut RenderingContext<'r>,
}

impl<'a, 'r> Invocation<'a, 'r> {
    /// Bound argument values.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Child content, unevaluated.
    pub fn children(&self) -> Children<'a> {
        self.children
    }

    /// The rendering context of this invocation.
    pub fn context(&mut self) -> &mut RenderingContext<'r> {
        self.context
    }

    /// Evaluates and concatenates all children under the current context.
    pub fn render_children(&mut self) -> Result<Value, RenderError> {
        self.children.render(self.context)
    }
}
