//! Tests for `f:section` and `f:render`.

use std::sync::Arc;

use rill::{
    BindingErrorKind, Engine, RenderConfig, RenderError, TemplateCache, Variables, vars,
};

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

fn render_err(source: &str) -> RenderError {
    render_with(&engine(), source, vars! {}).unwrap_err()
}

// =============================================================================
// Definition and invocation
// =============================================================================

#[test]
fn test_section_renders_only_when_invoked() {
    let source = "<f:section name=\"s\">hello</f:section> <f:render section=\"s\"/>";
    assert_eq!(render(source, vars! {}), " hello");
}

#[test]
fn test_unrendered_section_is_silent() {
    assert_eq!(render("a<f:section name=\"s\">hidden</f:section>b", vars! {}), "ab");
}

#[test]
fn test_render_before_definition() {
    let source = "<f:render section=\"late\"/><f:section name=\"late\">L</f:section>";
    assert_eq!(render(source, vars! {}), "L");
}

#[test]
fn test_section_rendered_twice() {
    let source = "<f:section name=\"s\">x</f:section><f:render section=\"s\"/>-<f:render section=\"s\"/>";
    assert_eq!(render(source, vars! {}), "x-x");
}

#[test]
fn test_last_definition_wins() {
    let source = concat!(
        "<f:section name=\"s\">first</f:section>",
        "<f:section name=\"s\">second</f:section>",
        "<f:render section=\"s\"/>"
    );
    assert_eq!(render(source, vars! {}), "second");
}

#[test]
fn test_section_renders_another_section() {
    let source = concat!(
        "<f:section name=\"a\">[<f:render section=\"b\"/>]</f:section>",
        "<f:section name=\"b\">B</f:section>",
        "<f:render section=\"a\"/>"
    );
    assert_eq!(render(source, vars! {}), "[B]");
}

#[test]
fn test_section_inside_if_is_registered() {
    let source = concat!(
        "<f:if condition=\"0\"><f:section name=\"s\">S</f:section></f:if>",
        "<f:render section=\"s\"/>"
    );
    assert_eq!(render(source, vars! {}), "S");
}

#[test]
fn test_section_name_from_variable() {
    let source = "<f:section name=\"wide\">W</f:section><f:render section=\"{layout}\"/>";
    assert_eq!(render(source, vars! { "layout" => "wide" }), "W");
}

// =============================================================================
// Scoping
// =============================================================================

#[test]
fn test_arguments_are_visible_in_section() {
    let source = concat!(
        "<f:section name=\"greet\">Hi {who}</f:section>",
        "<f:render section=\"greet\" arguments=\"{who: 'Ann'}\"/>"
    );
    assert_eq!(render(source, vars! {}), "Hi Ann");
}

#[test]
fn test_section_sees_outer_variables() {
    let source = concat!(
        "<f:section name=\"s\">{site}: {who}</f:section>",
        "<f:render section=\"s\" arguments=\"{who: name}\"/>"
    );
    assert_eq!(
        render(source, vars! { "site" => "rill", "name" => "Bo" }),
        "rill: Bo"
    );
}

#[test]
fn test_arguments_shadow_outer_variables_only_inside() {
    let source = concat!(
        "<f:section name=\"s\">{who}</f:section>",
        "<f:render section=\"s\" arguments=\"{who: 'inner'}\"/>|{who}"
    );
    assert_eq!(render(source, vars! { "who" => "outer" }), "inner|outer");
}

#[test]
fn test_argument_values_are_escaped() {
    let source = concat!(
        "<f:section name=\"s\">{v}</f:section>",
        "<f:render section=\"s\" arguments=\"{v: raw}\"/>"
    );
    assert_eq!(render(source, vars! { "raw" => "<x>" }), "&lt;x&gt;");
}

// =============================================================================
// Fallbacks
// =============================================================================

#[test]
fn test_missing_section_uses_default() {
    assert_eq!(
        render("<f:render section=\"nope\" default=\"fallback\"/>", vars! {}),
        "fallback"
    );
}

#[test]
fn test_variable_default_is_escaped() {
    assert_eq!(
        render("<f:render section=\"nope\" default=\"{v}\"/>", vars! { "v" => "<b>" }),
        "&lt;b&gt;"
    );
}

#[test]
fn test_missing_section_uses_children() {
    assert_eq!(
        render("<f:render section=\"nope\">child {x}</f:render>", vars! { "x" => 1 }),
        "child 1"
    );
}

#[test]
fn test_default_takes_precedence_over_children() {
    assert_eq!(
        render("<f:render section=\"nope\" default=\"d\">child</f:render>", vars! {}),
        "d"
    );
}

#[test]
fn test_missing_optional_section_renders_nothing() {
    assert_eq!(
        render("[<f:render section=\"nope\" optional=\"true\"/>]", vars! {}),
        "[]"
    );
}

#[test]
fn test_existing_section_ignores_fallbacks() {
    let source = concat!(
        "<f:section name=\"s\">real</f:section>",
        "<f:render section=\"s\" default=\"d\" optional=\"true\">child</f:render>"
    );
    assert_eq!(render(source, vars! {}), "real");
}

#[test]
fn test_missing_section_error_suggests() {
    let source = "<f:section name=\"header\">H</f:section><f:render section=\"heade\"/>";
    match render_err(source) {
        RenderError::SectionNotFound { name, suggestions } => {
            assert_eq!(name, "heade");
            assert_eq!(suggestions, vec!["header".to_string()]);
        }
        other => panic!("expected missing section, got {other:?}"),
    }
}

#[test]
fn test_render_requires_section_or_partial() {
    match render_err("<f:render/>") {
        RenderError::ArgumentBinding { kind, .. } => {
            assert!(matches!(kind, BindingErrorKind::Invalid(_)));
        }
        other => panic!("expected binding error, got {other:?}"),
    }
}

#[test]
fn test_list_arguments_are_rejected() {
    let literal = "<f:section name=\"s\">x</f:section><f:render section=\"s\" arguments=\"{'a', 'b'}\"/>";
    match render_err(literal) {
        RenderError::ArgumentBinding {
            directive,
            argument,
            kind,
        } => {
            assert_eq!(directive, "f:render");
            assert_eq!(argument, "arguments");
            assert!(matches!(kind, BindingErrorKind::Invalid(_)));
        }
        other => panic!("expected binding error, got {other:?}"),
    }

    let from_variable = "<f:section name=\"s\">x</f:section><f:render section=\"s\" arguments=\"{items}\"/>";
    let err = render_with(&engine(), from_variable, vars! { "items" => vec![1] }).unwrap_err();
    assert!(matches!(err, RenderError::ArgumentBinding { .. }));

    // An undefined variable coerces to an empty list and binds nothing.
    assert_eq!(render(from_variable, vars! {}), "x");
}

#[test]
fn test_section_without_name_fails_at_render() {
    match render_err("<f:section>x</f:section>") {
        RenderError::ArgumentBinding { argument, kind, .. } => {
            assert_eq!(argument, "name");
            assert_eq!(kind, BindingErrorKind::Missing);
        }
        other => panic!("expected binding error, got {other:?}"),
    }
}

// =============================================================================
// Recursion
// =============================================================================

#[test]
fn test_unbounded_recursion_is_stopped() {
    let engine = Engine::builder()
        .cache(Arc::new(TemplateCache::new()))
        .config(RenderConfig::builder().max_depth(8).build())
        .build();
    let source = "<f:section name=\"loop\">.<f:render section=\"loop\"/></f:section><f:render section=\"loop\"/>";
    let err = render_with(&engine, source, vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::MaxDepthExceeded { max_depth: 8 }));
}

#[test]
fn test_bounded_recursion_over_data() {
    let source = concat!(
        "<f:section name=\"tree\">({node.label}",
        "<f:for each=\"{node.children}\" as=\"child\">",
        "<f:render section=\"tree\" arguments=\"{node: child}\"/>",
        "</f:for>)</f:section>",
        "<f:render section=\"tree\" arguments=\"{node: root}\"/>"
    );
    let leaf = |label: &str| {
        rill::Value::Map(
            [("label".to_string(), rill::Value::from(label))]
                .into_iter()
                .collect(),
        )
    };
    let root = rill::Value::Map(
        [
            ("label".to_string(), rill::Value::from("r")),
            (
                "children".to_string(),
                rill::Value::List(vec![leaf("a"), leaf("b")]),
            ),
        ]
        .into_iter()
        .collect(),
    );
    assert_eq!(render(source, vars! { "root" => root }), "(r(a)(b))");
}
