//! Parsed templates and the post-parse pass.

use std::slice;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;

use super::ast::{DirectiveNode, Node, RootNode};
use super::error::ParseError;
use super::template::parse_markup;
use crate::directive::DirectiveResolver;
use crate::interpreter::{RenderError, RenderingContext};
use crate::template::Renderable;
use crate::types::{NodeRef, TemplateId, Value};

/// Mutable state threaded through post-parse hooks.
#[derive(Debug, Default)]
pub struct ParseState {
    sections: IndexMap<String, Arc<DirectiveNode>>,
}

impl ParseState {
    /// Registers a section node under `name`. A later registration of the
    /// same name replaces the earlier one.
    pub fn register_section(&mut self, name: impl Into<String>, node: Arc<DirectiveNode>) {
        let name = name.into();
        if self.sections.contains_key(&name) {
            tracing::debug!(section = %name, "section redefined, last definition wins");
        }
        self.sections.insert(name, node);
    }

    /// Sections registered so far, in first-registration order.
    pub fn sections(&self) -> &IndexMap<String, Arc<DirectiveNode>> {
        &self.sections
    }
}

/// The result of parsing one template source.
///
/// Immutable after parsing except for the compilable flag, which flips to
/// false once when a compile attempt is declined.
#[derive(Debug)]
pub struct ParsedTemplate {
    id: TemplateId,
    identity: String,
    root: Node,
    sections: IndexMap<String, Arc<DirectiveNode>>,
    compilable: AtomicBool,
}

impl ParsedTemplate {
    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Top-level nodes.
    pub fn nodes(&self) -> &[Node] {
        match &self.root {
            Node::Root(root) => &root.children,
            other => slice::from_ref(other),
        }
    }

    /// Sections registered by the post-parse pass.
    pub fn sections(&self) -> &IndexMap<String, Arc<DirectiveNode>> {
        &self.sections
    }

    /// Get a section by name.
    pub fn section(&self, name: &str) -> Option<&Arc<DirectiveNode>> {
        self.sections.get(name)
    }

    pub(crate) fn mark_uncompilable(&self) {
        self.compilable.store(false, Ordering::Release);
    }
}

impl Renderable for ParsedTemplate {
    fn id(&self) -> TemplateId {
        self.id
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn is_compilable(&self) -> bool {
        self.compilable.load(Ordering::Acquire)
    }

    fn is_compiled(&self) -> bool {
        false
    }

    fn sections_value(&self) -> Value {
        Value::Map(
            self.sections
                .iter()
                .map(|(name, node)| {
                    let node: NodeRef = node.clone();
                    (name.clone(), Value::Node(node))
                })
                .collect(),
        )
    }

    fn evaluate_root(&self, context: &mut RenderingContext<'_>) -> Result<Value, RenderError> {
        self.root.evaluate(context)
    }
}

/// Parse template source into a [`ParsedTemplate`].
///
/// Directive tags are resolved against `resolver` while parsing; after the
/// tree is built, every directive's post-parse hook runs once, in document
/// order, which registers sections.
///
/// # Example
///
/// ```
/// use rill::{DirectiveResolver, parse};
///
/// let resolver = DirectiveResolver::with_defaults();
/// let template = parse("<f:section name=\"title\">Hi</f:section>", "page.html", &resolver).unwrap();
/// assert!(template.section("title").is_some());
/// ```
pub fn parse(
    source: &str,
    identity: &str,
    resolver: &DirectiveResolver,
) -> Result<ParsedTemplate, ParseError> {
    let children = parse_markup(source, resolver)?;
    let root = Node::Root(RootNode { children });
    let mut state = ParseState::default();
    post_parse(slice::from_ref(&root), resolver, &mut state)?;
    tracing::debug!(
        identity,
        sections = state.sections.len(),
        "parsed template"
    );
    Ok(ParsedTemplate {
        id: TemplateId::new(identity, source),
        identity: identity.to_string(),
        root,
        sections: state.sections,
        compilable: AtomicBool::new(true),
    })
}

fn post_parse(
    nodes: &[Node],
    resolver: &DirectiveResolver,
    state: &mut ParseState,
) -> Result<(), ParseError> {
    for node in nodes {
        match node {
            Node::Root(root) => post_parse(&root.children, resolver, state)?,
            Node::Directive(directive) => {
                let handler_type = resolver
                    .resolve(&directive.namespace, &directive.name)
                    .map_err(|source| ParseError::UnknownDirective {
                        position: directive.position,
                        source,
                    })?;
                if let Some(hook) = handler_type.post_parse_hook() {
                    hook(directive, state)?;
                }
                post_parse(&directive.children, resolver, state)?;
            }
            _ => {}
        }
    }
    Ok(())
}
