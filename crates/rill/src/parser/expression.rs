//! Argument value grammar: accessors, array literals and boolean expressions.
//!
//! Handles:
//! - `{path.to.value}` object accessors
//! - `{key: item, ...}` and `{item, ...}` array literals
//! - boolean expressions with comparators `== != > < >= <=` and connectives
//!   `&& || !` (also `and`, `or`)
//! - mixed text such as `prefix-{id}`

use winnow::ascii::{digit1, multispace0, multispace1};
use winnow::combinator::{
    alt, delimited, eof, not, opt, peek, preceded, repeat, separated, terminated,
};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use super::ast::{
    ArrayNode, BooleanNode, Comparator, Condition, Node, Numeric, ObjectAccessorNode, RootNode,
};

/// Parse a non-boolean argument value into a node.
///
/// A value consisting of a single accessor or array literal becomes that
/// node, plain text becomes a text node, anything else a root node of parts.
pub fn parse_argument(value: &str) -> Result<Node, String> {
    let mut remaining = value;
    let mut parts: Vec<Node> = Vec::new();
    while !remaining.is_empty() {
        if remaining.starts_with('{') {
            let mut attempt = remaining;
            if let Ok(path) = accessor(&mut attempt) {
                parts.push(Node::ObjectAccessor(ObjectAccessorNode { path }));
                remaining = attempt;
                continue;
            }
            let mut attempt = remaining;
            match array(&mut attempt) {
                Ok(array) => {
                    parts.push(Node::Array(array));
                    remaining = attempt;
                    continue;
                }
                Err(ErrMode::Cut(_)) => {
                    return Err(format!("malformed array literal in '{value}'"));
                }
                Err(_) => {}
            }
            push_text(&mut parts, "{");
            remaining = &remaining[1..];
            continue;
        }
        let end = remaining.find('{').unwrap_or(remaining.len());
        push_text(&mut parts, &remaining[..end]);
        remaining = &remaining[end..];
    }
    Ok(match parts.len() {
        0 => Node::Text(String::new()),
        1 => parts.remove(0),
        _ => Node::Root(RootNode { children: parts }),
    })
}

/// Parse a boolean argument value into a boolean node.
pub fn parse_condition(value: &str) -> Result<Node, String> {
    let mut remaining = value;
    let _ = multispace0::<_, ContextError>.parse_next(&mut remaining);
    if remaining.is_empty() {
        return Ok(Node::Boolean(BooleanNode {
            expression: Condition::Operand(Box::new(Node::Text(String::new()))),
        }));
    }
    match terminated(or_condition, multispace0).parse_next(&mut remaining) {
        Ok(expression) if remaining.is_empty() => Ok(Node::Boolean(BooleanNode { expression })),
        Ok(_) => Err(format!(
            "unexpected '{}' in condition '{value}'",
            remaining.chars().next().unwrap_or('?')
        )),
        Err(_) => Err(format!("malformed condition '{value}'")),
    }
}

fn push_text(parts: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(previous)) = parts.last_mut() {
        previous.push_str(text);
    } else {
        parts.push(Node::Text(text.to_string()));
    }
}

/// Parse an object accessor: { path }
pub(crate) fn accessor(input: &mut &str) -> ModalResult<Vec<String>> {
    delimited(('{', multispace0), path, (multispace0, '}')).parse_next(input)
}

/// Parse a dotted variable path.
pub(crate) fn path(input: &mut &str) -> ModalResult<Vec<String>> {
    separated(1.., path_segment.map(str::to_string), '.').parse_next(input)
}

/// Parse one path segment.
fn path_segment<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-').parse_next(input)
}

/// Parse an array literal: { key: item, ... } or { item, ... }
///
/// Fails with a cut error when the braces were entered and an entry is
/// malformed, so callers can tell a broken literal from plain text.
fn array(input: &mut &str) -> ModalResult<ArrayNode> {
    ('{', multispace0).parse_next(input)?;
    if opt('}').parse_next(input)?.is_some() {
        return Ok(ArrayNode::Keyed(Vec::new()));
    }
    let entries: Vec<(Option<String>, Node)> =
        separated(1.., array_entry, (multispace0, ',', multispace0)).parse_next(input)?;
    let _ = opt((multispace0, ',')).parse_next(input)?;
    (multispace0, '}').parse_next(input).map_err(ErrMode::cut)?;

    let keyed = entries.iter().filter(|(key, _)| key.is_some()).count();
    if keyed == entries.len() {
        Ok(ArrayNode::Keyed(
            entries
                .into_iter()
                .filter_map(|(key, node)| key.map(|key| (key, node)))
                .collect(),
        ))
    } else if keyed == 0 {
        Ok(ArrayNode::List(entries.into_iter().map(|(_, node)| node).collect()))
    } else {
        Err(ErrMode::Cut(ContextError::new()))
    }
}

/// Parse an array entry with an optional key.
fn array_entry(input: &mut &str) -> ModalResult<(Option<String>, Node)> {
    let key = opt(terminated(
        array_key,
        (multispace0, ':', multispace0),
    ))
    .parse_next(input)?;
    if key.is_some() {
        // A key commits to an item.
        let item = array_item.parse_next(input).map_err(ErrMode::cut)?;
        return Ok((key, item));
    }
    let item = array_item.parse_next(input)?;
    Ok((None, item))
}

/// Parse an array key: identifier or quoted string.
fn array_key(input: &mut &str) -> ModalResult<String> {
    alt((
        quoted_string,
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            .map(str::to_string),
    ))
    .parse_next(input)
}

/// Parse an array item.
fn array_item(input: &mut &str) -> ModalResult<Node> {
    alt((
        quoted_string.map(Node::Text),
        number.map(Node::Numeric),
        boolean_keyword,
        accessor.map(|path| Node::ObjectAccessor(ObjectAccessorNode { path })),
        array.map(Node::Array),
        path.map(|path| Node::ObjectAccessor(ObjectAccessorNode { path })),
    ))
    .parse_next(input)
}

/// Parse a single-quoted (or double-quoted) string literal.
fn quoted_string(input: &mut &str) -> ModalResult<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut text = String::new();
    loop {
        let c = any.parse_next(input).map_err(ErrMode::cut)?;
        if c == quote {
            return Ok(text);
        }
        if c == '\\' {
            let escaped = any.parse_next(input).map_err(ErrMode::cut)?;
            text.push(escaped);
        } else {
            text.push(c);
        }
    }
}

/// Parse a numeric literal: -?digits(.digits)?
fn number(input: &mut &str) -> ModalResult<Numeric> {
    let literal: &str = (opt('-'), digit1, opt(('.', digit1)))
        .take()
        .parse_next(input)?;
    // Reject identifiers that merely start with digits.
    peek(alt((
        eof.value(()),
        one_of(|c: char| !c.is_ascii_alphanumeric() && c != '_').value(()),
    )))
    .parse_next(input)?;
    if let Ok(integer) = literal.parse::<i64>() {
        return Ok(Numeric::Integer(integer));
    }
    literal
        .parse::<f64>()
        .map(Numeric::Float)
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

/// Parse `true` / `false` as a boolean literal node.
fn boolean_keyword(input: &mut &str) -> ModalResult<Node> {
    let value = terminated(
        alt(("true".value(true), "false".value(false))),
        peek(alt((
            eof.value(()),
            one_of(|c: char| !c.is_ascii_alphanumeric() && c != '_').value(()),
        ))),
    )
    .parse_next(input)?;
    Ok(boolean_literal(value))
}

fn boolean_literal(value: bool) -> Node {
    Node::Boolean(BooleanNode {
        expression: Condition::Operand(Box::new(Node::Numeric(Numeric::Integer(i64::from(
            value,
        ))))),
    })
}

/// Parse a disjunction: and ( || and )*
fn or_condition(input: &mut &str) -> ModalResult<Condition> {
    let first = and_condition(input)?;
    let rest: Vec<Condition> = repeat(
        0..,
        preceded((multispace0, or_operator, multispace0), and_condition),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |left, right| {
        Condition::Or(Box::new(left), Box::new(right))
    }))
}

/// Parse a conjunction: comparison ( && comparison )*
fn and_condition(input: &mut &str) -> ModalResult<Condition> {
    let first = comparison(input)?;
    let rest: Vec<Condition> = repeat(
        0..,
        preceded((multispace0, and_operator, multispace0), comparison),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |left, right| {
        Condition::And(Box::new(left), Box::new(right))
    }))
}

fn or_operator(input: &mut &str) -> ModalResult<()> {
    alt(("||".void(), terminated("or", peek(multispace1)).void())).parse_next(input)
}

fn and_operator(input: &mut &str) -> ModalResult<()> {
    alt(("&&".void(), terminated("and", peek(multispace1)).void())).parse_next(input)
}

/// Parse `term (comparator operand)?`.
///
/// Negation binds tighter than comparison: `!{a} == 1` compares the negated
/// operand with `1`.
fn comparison(input: &mut &str) -> ModalResult<Condition> {
    let left = term(input)?;
    let mut attempt = *input;
    let comparator = opt(preceded(multispace0, comparator)).parse_next(&mut attempt)?;
    let Some(comparator) = comparator else {
        return Ok(left);
    };
    *input = attempt;
    let _ = multispace0.parse_next(input)?;
    let right = operand.parse_next(input).map_err(ErrMode::cut)?;
    Ok(Condition::Compare {
        left: Box::new(comparand(left)),
        comparator,
        right: Box::new(right),
    })
}

/// Parse a negated term, a parenthesised condition or a single operand.
fn term(input: &mut &str) -> ModalResult<Condition> {
    if opt(('!', peek(not('='))))
        .parse_next(input)?
        .is_some()
    {
        let _ = multispace0.parse_next(input)?;
        let inner = term(input)?;
        return Ok(Condition::Not(Box::new(inner)));
    }
    if opt('(').parse_next(input)?.is_some() {
        let inner = delimited(multispace0, or_condition, multispace0).parse_next(input)?;
        ')'.parse_next(input)?;
        return Ok(inner);
    }
    operand
        .map(|node| Condition::Operand(Box::new(node)))
        .parse_next(input)
}

/// The left side of a comparison as a node.
fn comparand(condition: Condition) -> Node {
    match condition {
        Condition::Operand(node) => *node,
        expression => Node::Boolean(BooleanNode { expression }),
    }
}

/// Parse a comparator.
fn comparator(input: &mut &str) -> ModalResult<Comparator> {
    alt((
        "==".value(Comparator::Equal),
        "!=".value(Comparator::NotEqual),
        ">=".value(Comparator::GreaterOrEqual),
        "<=".value(Comparator::LessOrEqual),
        ">".value(Comparator::Greater),
        "<".value(Comparator::Less),
    ))
    .parse_next(input)
}

/// Parse a condition operand.
fn operand(input: &mut &str) -> ModalResult<Node> {
    alt((
        accessor.map(|path| Node::ObjectAccessor(ObjectAccessorNode { path })),
        array.map(Node::Array),
        quoted_string.map(Node::Text),
        number.map(Node::Numeric),
        boolean_keyword,
        bare_word.map(Node::Text),
    ))
    .parse_next(input)
}

/// Parse a bare word, taken as literal text.
fn bare_word(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| {
        c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
    })
    .verify(|word: &str| word != "and" && word != "or")
    .map(str::to_string)
    .parse_next(input)
}
