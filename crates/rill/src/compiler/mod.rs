//! Template compiler.
//!
//! Compilation turns a parsed tree into a tree of closures ([`Fragment`]s)
//! that no longer reference syntax nodes. Each directive either supplies a
//! compile hook or is compiled generically; a hook that declines makes the
//! whole template non-compilable, and rendering falls back to interpreting
//! the tree.
//!
//! Hooked fragments check on every render that the directive still resolves
//! to the handler type that compiled it, and otherwise run the generic
//! fragment, so a unit renders like the tree under any resolver.

mod cache;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

pub use cache::{Compilation, TemplateCache};

use crate::directive::{ArgumentDefinitions, Arguments, Children, DirectiveResolver};
use crate::interpreter::{
    RenderError, RenderingContext, compare, numeric_value, plain, render_fragments, resolve_path,
};
use crate::parser::{ArrayNode, Condition, DirectiveNode, Node, ParsedTemplate};
use crate::template::Renderable;
use crate::types::{Deferred, NodeRef, TemplateId, Value};

/// An executable piece of a compiled template.
pub type Fragment =
    Arc<dyn Fn(&mut RenderingContext<'_>) -> Result<Value, RenderError> + Send + Sync>;

type Predicate =
    Arc<dyn Fn(&mut RenderingContext<'_>) -> Result<bool, RenderError> + Send + Sync>;

/// Wraps a closure as a [`Fragment`].
pub fn fragment<F>(f: F) -> Fragment
where
    F: Fn(&mut RenderingContext<'_>) -> Result<Value, RenderError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&mut RenderingContext<'_>) -> Result<bool, RenderError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compiles syntax nodes into fragments.
///
/// Every method returns `None` when some node in the subtree declines
/// compilation.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'r> {
    resolver: &'r DirectiveResolver,
}

impl<'r> Compiler<'r> {
    /// Create a compiler resolving directives against `resolver`.
    pub fn new(resolver: &'r DirectiveResolver) -> Self {
        Self { resolver }
    }

    /// The resolver directive hooks are looked up in.
    pub fn resolver(&self) -> &'r DirectiveResolver {
        self.resolver
    }

    /// Compiles a parsed template, or returns `None` if any node declines.
    pub fn compile(&self, template: &ParsedTemplate) -> Option<CompiledUnit> {
        let root = self.node(template.root())?;
        let mut sections = IndexMap::with_capacity(template.sections().len());
        for (name, node) in template.sections() {
            let fragment = self.generic(node)?;
            sections.insert(
                name.clone(),
                Arc::new(CompiledSection {
                    name: name.clone(),
                    fragment,
                }),
            );
        }
        Some(CompiledUnit {
            id: template.id(),
            identity: template.identity().to_string(),
            root,
            sections,
        })
    }

    /// Compiles one node.
    pub fn node(&self, node: &Node) -> Option<Fragment> {
        Some(match node {
            Node::Root(root) => {
                let children = self.nodes(&root.children)?;
                fragment(move |context| render_fragments(&children, context))
            }
            Node::Text(text) => {
                let text = text.clone();
                fragment(move |_| Ok(Value::Safe(text.clone())))
            }
            Node::Numeric(numeric) => {
                let value = numeric_value(*numeric);
                fragment(move |_| Ok(value.clone()))
            }
            Node::ObjectAccessor(accessor) => {
                let path = accessor.path.clone();
                fragment(move |context| resolve_path(&path, context))
            }
            Node::Boolean(boolean) => {
                let condition = self.condition(&boolean.expression)?;
                fragment(move |context| condition(context).map(Value::Bool))
            }
            Node::Directive(directive) => self.directive(directive)?,
            Node::Array(array) => self.array(array)?,
        })
    }

    /// Compiles a node sequence.
    pub fn nodes(&self, nodes: &[Node]) -> Option<Vec<Fragment>> {
        nodes.iter().map(|node| self.node(node)).collect()
    }

    /// Compiles a directive's supplied argument values.
    pub fn arguments(&self, node: &DirectiveNode) -> Option<CompiledArguments> {
        let mut arguments = Vec::with_capacity(node.arguments.len());
        for (name, value) in &node.arguments {
            arguments.push((name.clone(), self.node(value)?));
        }
        Some(CompiledArguments {
            directive: node.tag_name(),
            arguments,
        })
    }

    /// Compiles a directive through its handler's compile hook, or
    /// generically when it has none.
    pub fn directive(&self, node: &DirectiveNode) -> Option<Fragment> {
        self.compile_directive(node).map(|(fragment, _)| fragment)
    }

    /// Compiles a directive without consulting its compile hook.
    ///
    /// The fragment resolves the handler type from the rendering context's
    /// resolver and creates a fresh handler instance on every render.
    pub fn generic(&self, node: &DirectiveNode) -> Option<Fragment> {
        let directive = Arc::new(self.parts(node)?);
        Some(generic_fragment(&directive))
    }

    /// Compiles a directive's arguments and children once and derives its
    /// fragment from them.
    fn compile_directive(
        &self,
        node: &DirectiveNode,
    ) -> Option<(Fragment, Arc<CompiledDirective>)> {
        let handler_type = self.resolver.resolve(&node.namespace, &node.name).ok()?;
        let directive = Arc::new(self.parts(node)?);
        let generic = generic_fragment(&directive);
        let Some(hook) = handler_type.compile_hook() else {
            return Some((generic, directive));
        };
        let Some(hooked) = hook(node, &directive) else {
            tracing::debug!(
                directive = %node.tag_name(),
                position = %node.position,
                "directive declined compilation"
            );
            return None;
        };
        let implementation = handler_type.implementation();
        let current = Arc::clone(&directive);
        let guarded = fragment(move |context| {
            let handler_type = context.resolver().resolve(current.namespace(), current.name())?;
            if handler_type.implementation() == implementation {
                hooked(context)
            } else {
                generic(context)
            }
        });
        Some((guarded, directive))
    }

    fn parts(&self, node: &DirectiveNode) -> Option<CompiledDirective> {
        let arguments = self.arguments(node)?;
        let children = node
            .children
            .iter()
            .map(|child| self.child(child))
            .collect::<Option<Vec<_>>>()?;
        Some(CompiledDirective {
            namespace: node.namespace.clone(),
            name: node.name.clone(),
            arguments,
            children,
        })
    }

    fn child(&self, node: &Node) -> Option<CompiledChild> {
        match node {
            Node::Directive(directive) => {
                let (fragment, directive) = self.compile_directive(directive)?;
                Some(CompiledChild {
                    fragment,
                    directive: Some(directive),
                })
            }
            other => Some(CompiledChild {
                fragment: self.node(other)?,
                directive: None,
            }),
        }
    }

    fn condition(&self, condition: &Condition) -> Option<Predicate> {
        Some(match condition {
            Condition::Operand(node) => {
                let operand = self.node(node)?;
                predicate(move |context| Ok(operand(context)?.is_truthy()))
            }
            Condition::Not(inner) => {
                let inner = self.condition(inner)?;
                predicate(move |context| Ok(!inner(context)?))
            }
            Condition::And(left, right) => {
                let left = self.condition(left)?;
                let right = self.condition(right)?;
                predicate(move |context| Ok(left(context)? && right(context)?))
            }
            Condition::Or(left, right) => {
                let left = self.condition(left)?;
                let right = self.condition(right)?;
                predicate(move |context| Ok(left(context)? || right(context)?))
            }
            Condition::Compare {
                left,
                comparator,
                right,
            } => {
                let left = self.node(left)?;
                let right = self.node(right)?;
                let comparator = *comparator;
                predicate(move |context| {
                    let left = left(context)?;
                    let right = right(context)?;
                    Ok(compare(&left, comparator, &right))
                })
            }
        })
    }

    fn array(&self, array: &ArrayNode) -> Option<Fragment> {
        Some(match array {
            ArrayNode::List(items) => {
                let items = self.nodes(items)?;
                fragment(move |context| {
                    items
                        .iter()
                        .map(|item| item(context).map(plain))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::List)
                })
            }
            ArrayNode::Keyed(entries) => {
                let mut compiled = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    compiled.push((key.clone(), self.node(item)?));
                }
                fragment(move |context| {
                    let mut map = IndexMap::with_capacity(compiled.len());
                    for (key, item) in &compiled {
                        map.insert(key.clone(), plain(item(context)?));
                    }
                    Ok(Value::Map(map))
                })
            }
        })
    }
}

fn generic_fragment(directive: &Arc<CompiledDirective>) -> Fragment {
    let directive = Arc::clone(directive);
    fragment(move |context| directive.invoke(context))
}

/// One directive occurrence, compiled: argument values and children.
///
/// Holds no handler type; every invocation resolves it again.
pub struct CompiledDirective {
    namespace: String,
    name: String,
    arguments: CompiledArguments,
    children: Vec<CompiledChild>,
}

impl CompiledDirective {
    /// Namespace URI of the directive.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Local directive name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The supplied argument values.
    pub fn arguments(&self) -> &CompiledArguments {
        &self.arguments
    }

    /// The compiled children in source order.
    pub fn children(&self) -> &[CompiledChild] {
        &self.children
    }

    /// Resolves the handler type from the context's resolver, binds the
    /// arguments and invokes a fresh handler instance.
    pub fn invoke(&self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
        let handler_type = context.resolver().resolve(&self.namespace, &self.name)?;
        let bound = self.arguments.bind(handler_type.arguments(), context)?;
        handler_type.invoke(bound, Children::Compiled(&self.children), context)
    }
}

impl fmt::Debug for CompiledDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledDirective")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("children", &self.children.len())
            .finish()
    }
}

/// A compiled child node, with its directive parts when it is a directive.
#[derive(Clone)]
pub struct CompiledChild {
    fragment: Fragment,
    directive: Option<Arc<CompiledDirective>>,
}

impl CompiledChild {
    /// The child's fragment.
    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// The child's compiled directive, if it is one.
    pub fn directive(&self) -> Option<&CompiledDirective> {
        self.directive.as_deref()
    }

    /// Renders the child.
    pub fn render(&self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
        (self.fragment)(context)
    }
}

/// Compiled argument values of one directive occurrence.
#[derive(Clone)]
pub struct CompiledArguments {
    directive: String,
    arguments: Vec<(String, Fragment)>,
}

impl CompiledArguments {
    /// Checks names against `definitions`, evaluates the values and binds them.
    pub fn bind(
        &self,
        definitions: &ArgumentDefinitions,
        context: &mut RenderingContext<'_>,
    ) -> Result<Arguments, RenderError> {
        definitions.check_names(&self.directive, self.names())?;
        let mut supplied = Vec::with_capacity(self.arguments.len());
        for (name, value) in &self.arguments {
            supplied.push((name.as_str(), value(context)?));
        }
        definitions.bind(&self.directive, supplied)
    }

    /// Supplied argument names in source order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for CompiledArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledArguments")
            .field("directive", &self.directive)
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// A compiled section body, referenced from the sections variable.
pub struct CompiledSection {
    name: String,
    fragment: Fragment,
}

impl CompiledSection {
    /// The section name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Deferred for CompiledSection {
    fn evaluate(&self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
        (self.fragment)(context)
    }
}

impl fmt::Debug for CompiledSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An immutable executable template.
///
/// Holds no reference to the syntax tree and is safe to render concurrently
/// from any number of threads.
pub struct CompiledUnit {
    id: TemplateId,
    identity: String,
    root: Fragment,
    sections: IndexMap<String, Arc<CompiledSection>>,
}

impl CompiledUnit {
    /// Names of the compiled sections.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

impl Renderable for CompiledUnit {
    fn id(&self) -> TemplateId {
        self.id
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn is_compilable(&self) -> bool {
        false
    }

    fn is_compiled(&self) -> bool {
        true
    }

    fn sections_value(&self) -> Value {
        Value::Map(
            self.sections
                .iter()
                .map(|(name, section)| {
                    let node: NodeRef = section.clone();
                    (name.clone(), Value::Node(node))
                })
                .collect(),
        )
    }

    fn evaluate_root(&self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
        (self.root)(context)
    }
}

impl fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("sections", &self.sections.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
