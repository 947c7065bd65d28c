//! Static analysis of parsed templates.
//!
//! Detects directive misuse that renders without error but is almost
//! certainly a mistake, without rendering the template.

use std::collections::HashSet;
use std::fmt;

use crate::directive::builtin::{ElseViewHelper, IfViewHelper, RenderViewHelper, SectionViewHelper};
use crate::directive::{DirectiveResolver, ViewHelper};
use crate::parser::{DirectiveNode, Node, ParsedTemplate, Position};

/// A problem found by [`analyze`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateWarning {
    /// `f:else` that is not an immediate child of `f:if`.
    ElseOutsideIf { position: Position },

    /// A section name declared more than once; the last declaration wins.
    DuplicateSection { name: String, position: Position },

    /// A section never rendered by this template.
    UnusedSection { name: String, position: Position },

    /// `f:render` of a section that is not declared and has no fallback.
    UndefinedSection { name: String, position: Position },
}

impl TemplateWarning {
    /// Location the warning refers to.
    pub fn position(&self) -> Position {
        match self {
            TemplateWarning::ElseOutsideIf { position }
            | TemplateWarning::DuplicateSection { position, .. }
            | TemplateWarning::UnusedSection { position, .. }
            | TemplateWarning::UndefinedSection { position, .. } => *position,
        }
    }
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateWarning::ElseOutsideIf { position } => {
                write!(f, "{position}: f:else outside of f:if renders unconditionally")
            }
            TemplateWarning::DuplicateSection { name, position } => {
                write!(f, "{position}: section '{name}' is declared more than once")
            }
            TemplateWarning::UnusedSection { name, position } => {
                write!(f, "{position}: section '{name}' is never rendered")
            }
            TemplateWarning::UndefinedSection { name, position } => {
                write!(f, "{position}: section '{name}' is rendered but never declared")
            }
        }
    }
}

/// Runs all analysis rules over a parsed template, returning warnings in
/// document order per rule.
pub fn analyze(template: &ParsedTemplate, resolver: &DirectiveResolver) -> Vec<TemplateWarning> {
    let mut walk = Walk {
        resolver,
        declared: Vec::new(),
        rendered: Vec::new(),
        warnings: Vec::new(),
    };
    walk.nodes(template.nodes(), false);

    let mut warnings = walk.warnings;
    let mut seen = HashSet::new();
    for (name, position) in &walk.declared {
        if !seen.insert(name.as_str()) {
            warnings.push(TemplateWarning::DuplicateSection {
                name: name.clone(),
                position: *position,
            });
        }
    }
    let rendered: HashSet<&str> = walk
        .rendered
        .iter()
        .map(|reference| reference.name.as_str())
        .collect();
    let mut reported = HashSet::new();
    for (name, position) in &walk.declared {
        if !rendered.contains(name.as_str()) && reported.insert(name.as_str()) {
            warnings.push(TemplateWarning::UnusedSection {
                name: name.clone(),
                position: *position,
            });
        }
    }
    for reference in &walk.rendered {
        if !reference.has_fallback && !seen.contains(reference.name.as_str()) {
            warnings.push(TemplateWarning::UndefinedSection {
                name: reference.name.clone(),
                position: reference.position,
            });
        }
    }
    warnings
}

struct SectionReference {
    name: String,
    position: Position,
    has_fallback: bool,
}

struct Walk<'r> {
    resolver: &'r DirectiveResolver,
    declared: Vec<(String, Position)>,
    rendered: Vec<SectionReference>,
    warnings: Vec<TemplateWarning>,
}

impl Walk<'_> {
    fn nodes(&mut self, nodes: &[Node], inside_if: bool) {
        for node in nodes {
            match node {
                Node::Root(root) => self.nodes(&root.children, false),
                Node::Directive(directive) => self.directive(directive, inside_if),
                _ => {}
            }
        }
    }

    fn is<H: ViewHelper>(&self, node: &DirectiveNode) -> bool {
        self.resolver
            .resolve(&node.namespace, &node.name)
            .is_ok_and(|handler_type| handler_type.is::<H>())
    }

    fn directive(&mut self, node: &DirectiveNode, inside_if: bool) {
        if self.is::<ElseViewHelper>(node) && !inside_if {
            self.warnings.push(TemplateWarning::ElseOutsideIf {
                position: node.position,
            });
        }
        if self.is::<SectionViewHelper>(node) {
            if let Some(name) = node.argument("name").and_then(Node::as_text) {
                self.declared.push((name.to_string(), node.position));
            }
        }
        if self.is::<RenderViewHelper>(node) && node.argument("partial").is_none() {
            if let Some(name) = node.argument("section").and_then(Node::as_text) {
                self.rendered.push(SectionReference {
                    name: name.to_string(),
                    position: node.position,
                    has_fallback: node.argument("default").is_some()
                        || node.argument("optional").is_some()
                        || !node.children.is_empty(),
                });
            }
        }
        self.nodes(&node.children, self.is::<IfViewHelper>(node));
    }
}
