//! Syntax tree types for rill templates.
//!
//! These types are public to enable external tooling (linters, inspectors,
//! custom compile hooks). The node set is closed: every variant supports
//! interpretation, and all but non-compilable directives support compilation.

use std::fmt;
use std::sync::Arc;

/// A 1-based source location, used for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Ordered sequence of children; evaluates to their concatenated output.
    Root(RootNode),
    /// Literal markup.
    Text(String),
    /// A numeric literal from an array or boolean expression.
    Numeric(Numeric),
    /// A dotted variable path: `{user.name}`.
    ObjectAccessor(ObjectAccessorNode),
    /// A boolean expression bound to a boolean-typed argument.
    Boolean(BooleanNode),
    /// A directive invocation: `<f:if condition="...">...</f:if>`.
    Directive(Arc<DirectiveNode>),
    /// An array literal: `{a: 1, b: 'two'}` or `{x, y}`.
    Array(ArrayNode),
}

impl Node {
    /// Wraps a directive node.
    pub fn directive(node: DirectiveNode) -> Self {
        Node::Directive(Arc::new(node))
    }

    /// Returns the directive node, if this is one.
    pub fn as_directive(&self) -> Option<&Arc<DirectiveNode>> {
        match self {
            Node::Directive(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the literal text, if this is a text node.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// The root of a template or a mixed argument value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootNode {
    pub children: Vec<Node>,
}

/// A numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Float(f64),
}

/// A variable path resolved against the current scope, innermost frame first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAccessorNode {
    pub path: Vec<String>,
}

impl ObjectAccessorNode {
    /// The path joined with dots, as written in the template.
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }
}

/// A boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanNode {
    pub expression: Condition,
}

/// Boolean expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single operand, coerced by truthiness.
    Operand(Box<Node>),
    /// `!condition`
    Not(Box<Condition>),
    /// `left && right`
    And(Box<Condition>, Box<Condition>),
    /// `left || right`
    Or(Box<Condition>, Box<Condition>),
    /// `left op right`
    Compare {
        left: Box<Node>,
        comparator: Comparator,
        right: Box<Node>,
    },
}

/// Comparison operator in a boolean expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

impl Comparator {
    /// The operator as written in templates.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Equal => "==",
            Comparator::NotEqual => "!=",
            Comparator::Greater => ">",
            Comparator::Less => "<",
            Comparator::GreaterOrEqual => ">=",
            Comparator::LessOrEqual => "<=",
        }
    }
}

/// An array literal; entries stay unevaluated until render.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayNode {
    /// `{a, b, c}`
    List(Vec<Node>),
    /// `{key: a, other: b}`
    Keyed(Vec<(String, Node)>),
}

/// A directive invocation resolved against the directive resolver at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveNode {
    /// Namespace URI the prefix resolved to.
    pub namespace: String,
    /// Prefix as written in the template, kept for diagnostics.
    pub prefix: String,
    /// Local directive name.
    pub name: String,
    /// Supplied arguments in source order.
    pub arguments: Vec<(String, Node)>,
    /// Child nodes, evaluated on demand by the handler.
    pub children: Vec<Node>,
    /// Location of the opening tag.
    pub position: Position,
}

impl DirectiveNode {
    /// The tag name as written: `f:if`.
    pub fn tag_name(&self) -> String {
        format!("{}:{}", self.prefix, self.name)
    }

    /// Returns the argument node supplied under `name`.
    pub fn argument(&self, name: &str) -> Option<&Node> {
        self.arguments
            .iter()
            .find(|(argument, _)| argument == name)
            .map(|(_, node)| node)
    }

    /// Iterates over the names of the supplied arguments.
    pub fn argument_names(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().map(|(name, _)| name.as_str())
    }
}
