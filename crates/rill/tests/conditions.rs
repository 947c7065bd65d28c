//! Tests for `f:if` / `f:else` and boolean expression evaluation.
//!
//! Every template is rendered both interpreted and compiled; the two paths
//! must agree on output and on errors.

use std::sync::Arc;

use rill::{Engine, Error, ParseError, RenderConfig, RenderError, TemplateCache, Variables, vars};

fn engine() -> Engine {
    Engine::builder().cache(Arc::new(TemplateCache::new())).build()
}

fn render_with(engine: &Engine, source: &str, variables: Variables) -> Result<String, RenderError> {
    let template = engine.parse(source, "test").unwrap();
    let interpreted = engine.render_interpreted(&template, variables.clone());
    let compiled = engine.render(&template, variables);
    match (&interpreted, &compiled) {
        (Ok(a), Ok(b)) => assert_eq!(a, b, "interpreted and compiled output differ"),
        (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
        _ => panic!("paths disagree: interpreted {interpreted:?}, compiled {compiled:?}"),
    }
    compiled
}

fn render(source: &str, variables: Variables) -> String {
    render_with(&engine(), source, variables).unwrap()
}

// =============================================================================
// Then / else
// =============================================================================

const IF_ELSE: &str = "<f:if condition=\"{show}\">yes<f:else>no</f:else></f:if>";

#[test]
fn test_then_branch() {
    assert_eq!(render(IF_ELSE, vars! { "show" => true }), "yes");
}

#[test]
fn test_else_branch() {
    assert_eq!(render(IF_ELSE, vars! { "show" => false }), "no");
}

#[test]
fn test_missing_variable_is_false() {
    assert_eq!(render(IF_ELSE, vars! {}), "no");
}

#[test]
fn test_false_without_else_renders_nothing() {
    assert_eq!(
        render("[<f:if condition=\"{show}\">yes</f:if>]", vars! { "show" => false }),
        "[]"
    );
}

#[test]
fn test_else_children_excluded_from_then_branch() {
    let source = "<f:if condition=\"1\">a<f:else>b</f:else>c</f:if>";
    assert_eq!(render(source, vars! {}), "ac");
}

#[test]
fn test_else_if_chain() {
    let source = concat!(
        "<f:if condition=\"{n} == 1\">one",
        "<f:else if=\"{n} == 2\">two</f:else>",
        "<f:else if=\"{n} == 3\">three</f:else>",
        "<f:else>many</f:else>",
        "</f:if>"
    );
    assert_eq!(render(source, vars! { "n" => 1 }), "one");
    assert_eq!(render(source, vars! { "n" => 2 }), "two");
    assert_eq!(render(source, vars! { "n" => 3 }), "three");
    assert_eq!(render(source, vars! { "n" => 7 }), "many");
}

#[test]
fn test_first_matching_else_wins() {
    let source = concat!(
        "<f:if condition=\"0\">x",
        "<f:else if=\"1\">first</f:else>",
        "<f:else if=\"1\">second</f:else>",
        "</f:if>"
    );
    assert_eq!(render(source, vars! {}), "first");
}

#[test]
fn test_nested_if() {
    let source = concat!(
        "<f:if condition=\"{a}\">",
        "<f:if condition=\"{b}\">ab<f:else>a</f:else></f:if>",
        "<f:else>none</f:else>",
        "</f:if>"
    );
    assert_eq!(render(source, vars! { "a" => true, "b" => true }), "ab");
    assert_eq!(render(source, vars! { "a" => true, "b" => false }), "a");
    assert_eq!(render(source, vars! { "a" => false, "b" => true }), "none");
}

#[test]
fn test_untaken_branches_are_not_evaluated() {
    let engine = Engine::builder()
        .cache(Arc::new(TemplateCache::new()))
        .config(RenderConfig::builder().strict_variables(true).build())
        .build();
    let source = "<f:if condition=\"{ok}\">fine<f:else>{missing}</f:else></f:if>";

    assert_eq!(
        render_with(&engine, source, vars! { "ok" => true }).unwrap(),
        "fine"
    );
    let err = render_with(&engine, source, vars! { "ok" => false }).unwrap_err();
    assert!(matches!(err, RenderError::UndefinedVariable { ref path } if path == "missing"));
}

#[test]
fn test_branch_output_is_escaped_once() {
    let source = "<f:if condition=\"1\"><b>{html}</b></f:if>";
    assert_eq!(
        render(source, vars! { "html" => "<i>&</i>" }),
        "<b>&lt;i&gt;&amp;&lt;/i&gt;</b>"
    );
}

#[test]
fn test_doc_example() {
    let engine = engine();
    let output = engine
        .render_source(
            "<f:if condition=\"{admin}\">Hi {name}</f:if>",
            "greeting",
            vars! { "admin" => true, "name" => "<Ann>" },
        )
        .unwrap();
    assert_eq!(output, "Hi &lt;Ann&gt;");
}

// =============================================================================
// Expressions
// =============================================================================

fn holds(condition: &str, variables: Variables) -> bool {
    let source = format!("<f:if condition=\"{condition}\">T<f:else>F</f:else></f:if>");
    match render(&source, variables).as_str() {
        "T" => true,
        "F" => false,
        other => panic!("unexpected output {other:?}"),
    }
}

#[test]
fn test_truthiness() {
    assert!(holds("{v}", vars! { "v" => 1 }));
    assert!(!holds("{v}", vars! { "v" => 0 }));
    assert!(holds("{v}", vars! { "v" => "text" }));
    assert!(!holds("{v}", vars! { "v" => "" }));
    assert!(!holds("{v}", vars! { "v" => Vec::<i64>::new() }));
    assert!(holds("{v}", vars! { "v" => vec![1] }));
    assert!(!holds("", vars! {}));
}

#[test]
fn test_literals() {
    assert!(holds("true", vars! {}));
    assert!(!holds("false", vars! {}));
    assert!(holds("1", vars! {}));
    assert!(!holds("0", vars! {}));
}

#[test]
fn test_numeric_comparisons() {
    let v = || vars! { "count" => 5 };
    assert!(holds("{count} > 3", v()));
    assert!(holds("{count} >= 5", v()));
    assert!(!holds("{count} < 5", v()));
    assert!(holds("{count} <= 5", v()));
    assert!(holds("{count} == 5", v()));
    assert!(holds("{count} != 4", v()));
    assert!(holds("{count} == '5'", v()));
}

#[test]
fn test_string_comparisons() {
    let v = || vars! { "name" => "Ann" };
    assert!(holds("{name} == 'Ann'", v()));
    assert!(holds("{name} == Ann", v()));
    assert!(!holds("{name} == 'Bob'", v()));
    assert!(holds("{name} < 'Bob'", v()));
}

#[test]
fn test_comparing_two_variables() {
    assert!(holds("{a} == {b}", vars! { "a" => 3, "b" => 3.0 }));
    assert!(!holds("{a} > {b}", vars! { "a" => 2, "b" => 3 }));
}

#[test]
fn test_connectives() {
    let v = || vars! { "a" => true, "b" => false };
    assert!(!holds("{a} && {b}", v()));
    assert!(holds("{a} || {b}", v()));
    assert!(holds("!{b}", v()));
    assert!(holds("{a} and !{b}", v()));
    assert!(!holds("!({a} or {b})", v()));
}

#[test]
fn test_negation_binds_tighter_than_comparison() {
    assert!(!holds("!{a} == 1", vars! { "a" => 2 }));
    assert!(holds("!{a} == 1", vars! { "a" => 0 }));
    assert!(holds("!({a} == 1)", vars! { "a" => 2 }));
    assert!(holds("!!{a} == 1", vars! { "a" => 2 }));
    assert!(holds("!{a} != {b}", vars! { "a" => 0, "b" => false }));
    assert!(holds("({a} > 1) == {b}", vars! { "a" => 2, "b" => true }));
}

#[test]
fn test_nested_path_in_condition() {
    let user = rill::Value::Map(
        [("roles".to_string(), rill::Value::from(vec!["admin", "editor"]))]
            .into_iter()
            .collect(),
    );
    assert!(holds("{user.roles.0} == 'admin'", vars! { "user" => user }));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_condition_is_required() {
    let err = render_with(&engine(), "<f:if>x</f:if>", vars! {}).unwrap_err();
    assert!(matches!(
        err,
        RenderError::ArgumentBinding { ref argument, .. } if argument == "condition"
    ));
}

#[test]
fn test_empty_else_if_is_rejected() {
    for condition in ["", "  "] {
        let source = format!("<f:if condition=\"0\">a<f:else if=\"{condition}\">b</f:else></f:if>");
        match engine().parse(&source, "t") {
            Err(ParseError::InvalidArgument {
                directive, argument, ..
            }) => {
                assert_eq!(directive, "f:else");
                assert_eq!(argument, "if");
            }
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }
    assert_eq!(
        render("<f:if condition=\"0\">a<f:else if=\"{b}\">b</f:else></f:if>", vars! {}),
        ""
    );
}

#[test]
fn test_render_source_wraps_errors() {
    let err = engine()
        .render_source("<f:if>x</f:if>", "t", vars! {})
        .unwrap_err();
    assert!(matches!(err, Error::Render(RenderError::ArgumentBinding { .. })));

    let err = engine()
        .render_source("<f:if condition=\"1\">x", "t", vars! {})
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}
