//! Tests for argument declaration, binding, coercion and output escaping.

use std::sync::Arc;

use rill::{
    ArgumentDefinitions, ArgumentType, BindingErrorKind, Capabilities, DirectiveResolver, Engine,
    Invocation, RenderConfig, RenderError, TemplateCache, Value, Variables, ViewHelper, vars,
};

const EXAMPLE_NS: &str = "https://example.com/ns/test";

/// Repeats `text` `times` times.
#[derive(Debug, Default)]
struct Repeat;

impl ViewHelper for Repeat {
    fn initialize_arguments(arguments: &mut ArgumentDefinitions) {
        arguments
            .register_required("text", ArgumentType::String, "Text to repeat")
            .register_with_default("times", ArgumentType::Integer, "Repetitions", 2)
            .register("separator", ArgumentType::String, "Inserted between repetitions");
    }

    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError> {
        let arguments = invocation.arguments();
        let text = arguments.string("text").unwrap_or_default();
        let times = usize::try_from(arguments.integer("times").unwrap_or(0)).unwrap_or(0);
        let separator = arguments.string("separator").unwrap_or_default();
        Ok(Value::String(vec![text; times].join(separator)))
    }
}

/// Emits its `markup` argument unescaped.
#[derive(Debug, Default)]
struct Raw;

impl ViewHelper for Raw {
    fn initialize_arguments(arguments: &mut ArgumentDefinitions) {
        arguments.register_required("markup", ArgumentType::String, "Markup to emit");
    }

    fn escape_output() -> bool {
        false
    }

    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError> {
        Ok(Value::String(
            invocation.arguments().string("markup").unwrap_or_default().to_string(),
        ))
    }
}

/// Renders the kind and value of every bound argument.
#[derive(Debug, Default)]
struct Describe;

impl ViewHelper for Describe {
    fn initialize_arguments(arguments: &mut ArgumentDefinitions) {
        arguments
            .register("integer", ArgumentType::Integer, "")
            .register("float", ArgumentType::Float, "")
            .register("flag", ArgumentType::Boolean, "")
            .register("list", ArgumentType::Array, "");
    }

    fn render(&mut self, invocation: &mut Invocation<'_, '_>) -> Result<Value, RenderError> {
        let parts: Vec<String> = invocation
            .arguments()
            .iter()
            .map(|(name, value)| format!("{name}={}:{value}", value.kind()))
            .collect();
        Ok(Value::String(parts.join(" ")))
    }
}

fn engine() -> Engine {
    engine_with_config(RenderConfig::default())
}

fn engine_with_config(config: RenderConfig) -> Engine {
    let mut resolver = DirectiveResolver::with_defaults();
    resolver
        .register_namespace("x", EXAMPLE_NS)
        .register::<Repeat>(EXAMPLE_NS, "repeat")
        .register::<Raw>(EXAMPLE_NS, "raw")
        .register::<Describe>(EXAMPLE_NS, "describe");
    Engine::builder()
        .resolver(resolver)
        .config(config)
        .cache(Arc::new(TemplateCache::new()))
        .build()
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

fn render(source: &str, variables: Variables) -> Result<String, RenderError> {
    render_with(&engine(), source, variables)
}

fn binding_error(source: &str, variables: Variables) -> (String, String, BindingErrorKind) {
    match render(source, variables) {
        Err(RenderError::ArgumentBinding {
            directive,
            argument,
            kind,
        }) => (directive, argument, kind),
        other => panic!("expected binding error, got {other:?}"),
    }
}

// =============================================================================
// Declaration
// =============================================================================

#[test]
fn test_definitions_in_registration_order() {
    let resolver = {
        let mut resolver = DirectiveResolver::new();
        resolver.register::<Repeat>(EXAMPLE_NS, "repeat");
        resolver
    };
    let handler_type = resolver.resolve(EXAMPLE_NS, "repeat").unwrap();
    let names: Vec<&str> = handler_type
        .arguments()
        .iter()
        .map(|definition| definition.name.as_str())
        .collect();
    assert_eq!(names, vec!["text", "times", "separator"]);

    let times = handler_type.arguments().get("times").unwrap();
    assert!(!times.required);
    assert_eq!(times.kind, ArgumentType::Integer);
    assert_eq!(times.default, Some(Value::Number(2)));
    assert!(handler_type.is::<Repeat>());
    assert!(!handler_type.is::<Raw>());
    assert!(handler_type.escape_output());
    assert_eq!(
        handler_type.capabilities(),
        Capabilities {
            compiles: false,
            parse_hook: false,
        }
    );
}

#[test]
fn test_reregistering_an_argument_replaces_it() {
    let mut definitions = ArgumentDefinitions::new();
    definitions
        .register("a", ArgumentType::String, "first")
        .register_required("a", ArgumentType::Integer, "second");
    assert_eq!(definitions.len(), 1);
    let a = definitions.get("a").unwrap();
    assert!(a.required);
    assert_eq!(a.description, "second");
}

#[test]
fn test_builtin_capabilities() {
    let resolver = DirectiveResolver::with_defaults();
    let core = rill::CORE_NAMESPACE;
    assert!(resolver.resolve(core, "if").unwrap().capabilities().compiles);
    assert!(resolver.resolve(core, "section").unwrap().capabilities().parse_hook);
    assert!(!resolver.resolve(core, "section").unwrap().capabilities().compiles);
    assert!(!resolver.resolve(core, "else").unwrap().capabilities().compiles);
    assert!(!resolver.resolve(core, "render").unwrap().capabilities().compiles);
    assert!(!resolver.resolve(core, "for").unwrap().escape_output());
}

// =============================================================================
// Binding
// =============================================================================

#[test]
fn test_defaults_fill_unsupplied_arguments() {
    assert_eq!(render("<x:repeat text=\"ab\"/>", vars! {}).unwrap(), "abab");
}

#[test]
fn test_string_coerced_to_integer() {
    assert_eq!(
        render("<x:repeat text=\"ab\" times=\"3\" separator=\"-\"/>", vars! {}).unwrap(),
        "ab-ab-ab"
    );
}

#[test]
fn test_variable_argument_values() {
    assert_eq!(
        render("<x:repeat text=\"{t}\" times=\"{n}\"/>", vars! { "t" => "z", "n" => 4 }).unwrap(),
        "zzzz"
    );
}

#[test]
fn test_mixed_argument_value() {
    assert_eq!(
        render("<x:repeat text=\"[{t}]\" times=\"1\"/>", vars! { "t" => "z" }).unwrap(),
        "[z]"
    );
}

#[test]
fn test_coercions() {
    let output = render(
        "<x:describe integer=\"7.0\" float=\"{f}\" flag=\"{items}\" list=\"{missing}\"/>",
        vars! { "f" => 2, "items" => vec![1] },
    )
    .unwrap();
    assert_eq!(output, "integer=integer:7 float=float:2 flag=boolean:true list=list:[]");
}

#[test]
fn test_missing_required_argument() {
    let (directive, argument, kind) = binding_error("<x:repeat times=\"1\"/>", vars! {});
    assert_eq!(directive, "x:repeat");
    assert_eq!(argument, "text");
    assert_eq!(kind, BindingErrorKind::Missing);
}

#[test]
fn test_unknown_argument_suggests() {
    let (_, argument, kind) = binding_error("<x:repeat text=\"a\" tims=\"2\"/>", vars! {});
    assert_eq!(argument, "tims");
    assert_eq!(
        kind,
        BindingErrorKind::Unknown {
            suggestions: vec!["times".to_string()],
        }
    );
}

#[test]
fn test_unknown_argument_checked_before_evaluation() {
    let engine = engine_with_config(RenderConfig::builder().strict_variables(true).build());
    let err = render_with(&engine, "<x:repeat text=\"{undefined}\" bogus=\"1\"/>", vars! {})
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::ArgumentBinding { ref argument, .. } if argument == "bogus"
    ));
}

#[test]
fn test_type_mismatch() {
    let (directive, argument, kind) = binding_error(
        "<f:for each=\"{name}\" as=\"x\">{x}</f:for>",
        vars! { "name" => "text" },
    );
    assert_eq!(directive, "f:for");
    assert_eq!(argument, "each");
    assert_eq!(
        kind,
        BindingErrorKind::TypeMismatch {
            expected: ArgumentType::Array,
            found: "string",
        }
    );
}

#[test]
fn test_non_numeric_integer_mismatch() {
    let (_, argument, kind) = binding_error("<x:repeat text=\"a\" times=\"many\"/>", vars! {});
    assert_eq!(argument, "times");
    assert!(matches!(
        kind,
        BindingErrorKind::TypeMismatch {
            expected: ArgumentType::Integer,
            ..
        }
    ));
}

#[test]
fn test_else_and_section_validate_arguments() {
    let (directive, argument, _) =
        binding_error("<f:section name=\"s\" title=\"x\">body</f:section>", vars! {});
    assert_eq!(directive, "f:section");
    assert_eq!(argument, "title");

    let (directive, argument, _) = binding_error(
        "<f:if condition=\"0\"><f:else unless=\"1\">x</f:else></f:if>",
        vars! {},
    );
    assert_eq!(directive, "f:else");
    assert_eq!(argument, "unless");
}

#[test]
fn test_binding_error_message() {
    let err = render("<x:repeat text=\"a\" tims=\"2\"/>", vars! {}).unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument 'tims' of 'x:repeat': argument is not declared; did you mean: times?"
    );
}

// =============================================================================
// Escaping
// =============================================================================

#[test]
fn test_escaping_directive_output() {
    assert_eq!(
        render("<x:repeat text=\"<&>\" times=\"1\"/>", vars! {}).unwrap(),
        "&lt;&amp;&gt;"
    );
}

#[test]
fn test_non_escaping_directive_output() {
    assert_eq!(
        render("<x:raw markup=\"<br/>\"/>", vars! {}).unwrap(),
        "<br/>"
    );
}

#[test]
fn test_nested_directive_output_is_not_escaped_twice() {
    assert_eq!(
        render("<f:if condition=\"1\"><x:repeat text=\"&\" times=\"2\"/></f:if>", vars! {})
            .unwrap(),
        "&amp;&amp;"
    );
}

#[test]
fn test_escaping_can_be_disabled() {
    let engine = engine_with_config(RenderConfig::builder().escape_output(false).build());
    assert_eq!(
        render_with(&engine, "{v}<x:repeat text=\"{v}\" times=\"1\"/>", vars! { "v" => "<i>" })
            .unwrap(),
        "<i><i>"
    );
}

#[test]
fn test_custom_escaper() {
    fn brackets(text: &str) -> String {
        text.replace('<', "[").replace('>', "]")
    }
    let engine = engine_with_config(RenderConfig::builder().escaper(brackets).build());
    assert_eq!(
        render_with(&engine, "{v}", vars! { "v" => "<i>" }).unwrap(),
        "[i]"
    );
}

#[test]
fn test_escape_html() {
    assert_eq!(
        rill::escape_html("<a href=\"x\">'&'</a>"),
        "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
    );
}
