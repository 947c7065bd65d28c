//! Template markup parser using winnow.
//!
//! Parses template source into a syntax tree. Handles:
//! - Literal markup, passed through as text
//! - Directive tags `<f:name arg="...">...</f:name>` and `<f:name ... />`
//!   for every prefix bound to a namespace
//! - Object accessors `{path.to.value}`
//! - Namespace declarations `{namespace x=https://...}`
//!
//! Tags with unbound prefixes and braces that open no accessor are literal
//! text. Directive names are resolved while parsing, so an unknown directive
//! is a parse error.

use std::collections::HashMap;

use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated_pair};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, none_of, one_of, take_while};

use super::ast::{DirectiveNode, Node, ObjectAccessorNode, Position};
use super::error::ParseError;
use super::expression::{accessor, parse_argument, parse_condition};
use crate::directive::{ArgumentType, DirectiveResolver};

/// Parse template markup into a list of top-level nodes.
pub(crate) fn parse_markup(
    source: &str,
    resolver: &DirectiveResolver,
) -> Result<Vec<Node>, ParseError> {
    let parser = MarkupParser {
        source,
        resolver,
        declared: declared_namespaces(source),
    };
    parser.parse()
}

/// Calculate line and column from original input and remaining input.
pub(crate) fn calculate_position(original: &str, remaining: &str) -> Position {
    let consumed = original.len() - remaining.len();
    let consumed_str = &original[..consumed];
    let line = consumed_str.chars().filter(|&c| c == '\n').count() + 1;
    let last_newline = consumed_str.rfind('\n');
    let column = match last_newline {
        Some(pos) => consumed - pos,
        None => consumed + 1,
    };
    Position { line, column }
}

/// Collects every `{namespace prefix=uri}` declaration in the source.
///
/// Declarations apply to the whole template regardless of where they appear.
fn declared_namespaces(source: &str) -> HashMap<String, String> {
    let mut declared = HashMap::new();
    for (offset, _) in source.match_indices("{namespace") {
        let mut input = &source[offset..];
        if let Ok((prefix, uri)) = namespace_declaration(&mut input) {
            declared.insert(prefix.to_string(), uri.to_string());
        }
    }
    declared
}

struct MarkupParser<'s, 'r> {
    source: &'s str,
    resolver: &'r DirectiveResolver,
    declared: HashMap<String, String>,
}

/// A parsed opening tag, before directive resolution.
struct OpenTag<'s> {
    prefix: &'s str,
    name: &'s str,
    attributes: Vec<(&'s str, &'s str)>,
    self_closing: bool,
}

impl<'s> MarkupParser<'s, '_> {
    fn parse(&self) -> Result<Vec<Node>, ParseError> {
        let mut tree = TreeBuilder::default();
        let mut input = self.source;
        while !input.is_empty() {
            if input.starts_with('<') {
                if let Some(remaining) = self.directive_tag(input, &mut tree)? {
                    input = remaining;
                    continue;
                }
                tree.push(Node::Text("<".to_string()));
                input = &input[1..];
            } else if input.starts_with('{') {
                let mut attempt = input;
                if namespace_declaration(&mut attempt).is_ok() {
                    input = attempt;
                    continue;
                }
                let mut attempt = input;
                if let Ok(path) = accessor(&mut attempt) {
                    tree.push(Node::ObjectAccessor(ObjectAccessorNode { path }));
                    input = attempt;
                    continue;
                }
                tree.push(Node::Text("{".to_string()));
                input = &input[1..];
            } else {
                let end = input.find(['<', '{']).unwrap_or(input.len());
                tree.push(Node::Text(input[..end].to_string()));
                input = &input[end..];
            }
        }
        tree.finish(self)
    }

    fn namespace(&self, prefix: &str) -> Option<&str> {
        self.declared
            .get(prefix)
            .map(String::as_str)
            .or_else(|| self.resolver.namespace(prefix))
    }

    fn position(&self, remaining: &str) -> Position {
        calculate_position(self.source, remaining)
    }

    fn position_of(&self, slice: &str) -> Position {
        let offset = (slice.as_ptr() as usize).saturating_sub(self.source.as_ptr() as usize);
        self.position(&self.source[offset.min(self.source.len())..])
    }

    fn syntax_error(&self, position: Position, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: position.line,
            column: position.column,
            message: message.into(),
        }
    }

    /// Consumes a directive tag at the start of `input`.
    ///
    /// Returns `None` when the tag does not use a bound prefix, in which case
    /// it is plain markup.
    fn directive_tag(
        &self,
        input: &'s str,
        tree: &mut TreeBuilder,
    ) -> Result<Option<&'s str>, ParseError> {
        let mut probe = input;
        let Ok((closing, prefix)) = tag_head(&mut probe) else {
            return Ok(None);
        };
        let Some(namespace) = self.namespace(prefix) else {
            return Ok(None);
        };
        let position = self.position(input);
        let mut remaining = input;
        if closing {
            let (prefix, name) = close_tag(&mut remaining).map_err(|_| {
                self.syntax_error(position, format!("malformed closing tag for prefix '{prefix}'"))
            })?;
            tree.close(prefix, name, position, self)?;
        } else {
            let tag = open_tag(&mut remaining).map_err(|_| {
                self.syntax_error(position, format!("malformed tag for prefix '{prefix}'"))
            })?;
            let node = self.directive_node(namespace, &tag, position)?;
            if tag.self_closing {
                tree.push(Node::directive(node));
            } else {
                tree.open(node);
            }
        }
        Ok(Some(remaining))
    }

    /// Resolves a tag against the resolver and parses its argument values.
    fn directive_node(
        &self,
        namespace: &str,
        tag: &OpenTag<'s>,
        position: Position,
    ) -> Result<DirectiveNode, ParseError> {
        let handler_type = self
            .resolver
            .resolve(namespace, tag.name)
            .map_err(|source| ParseError::UnknownDirective { position, source })?;

        let mut arguments = Vec::with_capacity(tag.attributes.len());
        for &(name, raw) in &tag.attributes {
            if arguments.iter().any(|(existing, _)| existing == name) {
                return Err(self.syntax_error(
                    self.position_of(name),
                    format!("duplicate argument '{name}' on <{}:{}>", tag.prefix, tag.name),
                ));
            }
            let value = unescape_attribute(raw);
            let kind = handler_type.arguments().get(name).map(|definition| definition.kind);
            let parsed = match kind {
                Some(ArgumentType::Boolean) => parse_condition(&value),
                _ => parse_argument(&value),
            };
            let node = parsed.map_err(|message| self.syntax_error(self.position_of(raw), message))?;
            arguments.push((name.to_string(), node));
        }

        Ok(DirectiveNode {
            namespace: namespace.to_string(),
            prefix: tag.prefix.to_string(),
            name: tag.name.to_string(),
            arguments,
            children: Vec::new(),
            position,
        })
    }
}

/// Builds the tree from a stack of open directive frames.
#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<DirectiveNode>,
}

impl TreeBuilder {
    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(node) => &mut node.children,
            None => &mut self.root,
        }
    }

    /// Appends a node, merging adjacent text.
    fn push(&mut self, node: Node) {
        let children = self.children_mut();
        if let (Node::Text(text), Some(Node::Text(previous))) = (&node, children.last_mut()) {
            previous.push_str(text);
            return;
        }
        children.push(node);
    }

    fn open(&mut self, node: DirectiveNode) {
        self.open.push(node);
    }

    fn close(
        &mut self,
        prefix: &str,
        name: &str,
        position: Position,
        parser: &MarkupParser<'_, '_>,
    ) -> Result<(), ParseError> {
        let Some(node) = self.open.pop() else {
            return Err(parser.syntax_error(
                position,
                format!("unexpected closing tag </{prefix}:{name}>"),
            ));
        };
        if node.prefix != prefix || node.name != name {
            return Err(parser.syntax_error(
                position,
                format!(
                    "expected </{}> (opened at {}), found </{prefix}:{name}>",
                    node.tag_name(),
                    node.position
                ),
            ));
        }
        self.push(Node::directive(node));
        Ok(())
    }

    fn finish(mut self, parser: &MarkupParser<'_, '_>) -> Result<Vec<Node>, ParseError> {
        if let Some(node) = self.open.pop() {
            return Err(parser.syntax_error(
                node.position,
                format!("unclosed tag <{}>", node.tag_name()),
            ));
        }
        Ok(self.root)
    }
}

/// Removes backslash escapes from a raw attribute value.
fn unescape_attribute(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped @ ('"' | '\'' | '\\')) => value.push(escaped),
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => value.push('\\'),
            },
            _ => value.push(c),
        }
    }
    value
}

/// Parse the start of a tag: `<prefix:` or `</prefix:`
fn tag_head<'i>(input: &mut &'i str) -> ModalResult<(bool, &'i str)> {
    ('<', opt('/'), tag_prefix, ':')
        .map(|(_, slash, prefix, _)| (slash.is_some(), prefix))
        .parse_next(input)
}

/// Parse an opening tag: <prefix:name attr="value" ...> or .../>
fn open_tag<'i>(input: &mut &'i str) -> ModalResult<OpenTag<'i>> {
    let (prefix, name) =
        preceded('<', separated_pair(tag_prefix, ':', directive_name)).parse_next(input)?;
    let attributes: Vec<(&str, &str)> =
        repeat(0.., preceded(multispace1, attribute)).parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let self_closing = alt(("/>".value(true), ">".value(false))).parse_next(input)?;
    Ok(OpenTag {
        prefix,
        name,
        attributes,
        self_closing,
    })
}

/// Parse a closing tag: </prefix:name>
fn close_tag<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str)> {
    delimited(
        "</",
        separated_pair(tag_prefix, ':', directive_name),
        (multispace0, '>'),
    )
    .parse_next(input)
}

/// Parse an attribute: name="value"
fn attribute<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str)> {
    separated_pair(
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
        (multispace0, '=', multispace0),
        attribute_value,
    )
    .parse_next(input)
}

/// Parse a quoted attribute value, returning the raw text between the quotes.
fn attribute_value<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    alt((quoted_raw('"'), quoted_raw('\''))).parse_next(input)
}

/// Parse text delimited by `quote`, allowing backslash escapes.
fn quoted_raw<'i>(quote: char) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    delimited(
        quote,
        repeat::<_, _, (), _, _>(
            0..,
            alt((('\\', any).void(), none_of([quote, '\\']).void())),
        )
        .take(),
        quote,
    )
}

/// Parse a namespace declaration: {namespace prefix=uri}
fn namespace_declaration<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str)> {
    delimited(
        ("{namespace", multispace1),
        separated_pair(
            tag_prefix,
            (multispace0, '=', multispace0),
            take_while(1.., |c: char| c != '}' && !c.is_whitespace()),
        ),
        (multispace0, '}'),
    )
    .parse_next(input)
}

/// Parse a tag prefix.
fn tag_prefix<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic()),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Parse a directive name.
fn directive_name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
    })
    .parse_next(input)
}
