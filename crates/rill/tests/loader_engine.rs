//! Tests for template loaders, partial rendering and the engine entry points.

use std::fs;
use std::sync::Arc;

use rill::{
    Engine, Error, FileSystemLoader, LoadError, MemoryLoader, ParseError, RenderConfig,
    RenderError, Renderable, TemplateCache, TemplateLoader, Variables, vars,
};

fn engine_with(loader: Arc<dyn TemplateLoader>) -> Engine {
    Engine::builder()
        .loader(loader)
        .cache(Arc::new(TemplateCache::new()))
        .build()
}

fn memory_engine(templates: &[(&str, &str)]) -> Engine {
    let loader = templates
        .iter()
        .fold(MemoryLoader::new(), |loader, (identity, source)| {
            loader.with(*identity, *source)
        });
    engine_with(Arc::new(loader))
}

fn render_with(engine: &Engine, source: &str, variables: Variables) -> Result<String, RenderError> {
    let template = engine.parse(source, "main").unwrap();
    let interpreted = engine.render_interpreted(&template, variables.clone());
    let compiled = engine.render(&template, variables);
    match (&interpreted, &compiled) {
        (Ok(a), Ok(b)) => assert_eq!(a, b, "interpreted and compiled output differ"),
        (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
        _ => panic!("paths disagree: interpreted {interpreted:?}, compiled {compiled:?}"),
    }
    compiled
}

// =============================================================================
// Partials
// =============================================================================

#[test]
fn test_partial_with_arguments() {
    let engine = memory_engine(&[("card", "<b>{title}</b>")]);
    let output = render_with(
        &engine,
        "<f:render partial=\"card\" arguments=\"{title: t}\"/>",
        vars! { "t" => "<x>" },
    )
    .unwrap();
    assert_eq!(output, "<b>&lt;x&gt;</b>");
}

#[test]
fn test_partial_scope_is_isolated() {
    let engine = memory_engine(&[("p", "[{outer}|{inner}]")]);
    let output = render_with(
        &engine,
        "<f:render partial=\"p\" arguments=\"{inner: 'i'}\"/>{inner}",
        vars! { "outer" => "o" },
    )
    .unwrap();
    assert_eq!(output, "[|i]");
}

#[test]
fn test_partial_section() {
    let engine = memory_engine(&[(
        "p",
        "<f:section name=\"s\">S{v}</f:section>body",
    )]);
    assert_eq!(
        render_with(
            &engine,
            "<f:render partial=\"p\" section=\"s\" arguments=\"{v: 1}\"/>",
            vars! {}
        )
        .unwrap(),
        "S1"
    );
    assert_eq!(
        render_with(&engine, "<f:render partial=\"p\"/>", vars! {}).unwrap(),
        "body"
    );
}

#[test]
fn test_partial_renders_its_own_sections() {
    let engine = memory_engine(&[(
        "p",
        "<f:section name=\"a\">partial</f:section><f:render section=\"a\"/>",
    )]);
    let source = "<f:section name=\"a\">main</f:section><f:render partial=\"p\"/>|<f:render section=\"a\"/>";
    assert_eq!(render_with(&engine, source, vars! {}).unwrap(), "partial|main");
}

#[test]
fn test_missing_partial_section() {
    let engine = memory_engine(&[("p", "<f:section name=\"header\">H</f:section>")]);
    assert_eq!(
        render_with(
            &engine,
            "<f:render partial=\"p\" section=\"footer\" default=\"none\"/>",
            vars! {}
        )
        .unwrap(),
        "none"
    );
    match render_with(&engine, "<f:render partial=\"p\" section=\"heder\"/>", vars! {}) {
        Err(RenderError::SectionNotFound { name, suggestions }) => {
            assert_eq!(name, "heder");
            assert_eq!(suggestions, vec!["header".to_string()]);
        }
        other => panic!("expected missing section, got {other:?}"),
    }
}

#[test]
fn test_partial_inside_loop() {
    let engine = memory_engine(&[("item", "<li>{label}</li>")]);
    let output = render_with(
        &engine,
        "<f:for each=\"{items}\" as=\"x\"><f:render partial=\"item\" arguments=\"{label: x}\"/></f:for>",
        vars! { "items" => vec!["a", "b"] },
    )
    .unwrap();
    assert_eq!(output, "<li>a</li><li>b</li>");
}

#[test]
fn test_missing_partial() {
    let engine = memory_engine(&[]);
    let err = render_with(&engine, "<f:render partial=\"nope\"/>", vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::TemplateNotFound { ref identity } if identity == "nope"));
}

#[test]
fn test_invalid_partial() {
    let engine = memory_engine(&[("bad", "<f:if condition=\"1\">open")]);
    match render_with(&engine, "<f:render partial=\"bad\"/>", vars! {}) {
        Err(RenderError::InvalidPartial { identity, source }) => {
            assert_eq!(identity, "bad");
            assert!(matches!(source, ParseError::Syntax { .. }));
        }
        other => panic!("expected invalid partial, got {other:?}"),
    }
}

#[test]
fn test_recursive_partial_is_stopped() {
    let engine = Engine::builder()
        .loader(Arc::new(
            MemoryLoader::new().with("self", ".<f:render partial=\"self\"/>"),
        ))
        .config(RenderConfig::builder().max_depth(4).build())
        .cache(Arc::new(TemplateCache::new()))
        .build();
    let err = render_with(&engine, "<f:render partial=\"self\"/>", vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::MaxDepthExceeded { max_depth: 4 }));
}

#[test]
fn test_partials_need_a_loader() {
    let engine = Engine::builder().cache(Arc::new(TemplateCache::new())).build();
    let err = render_with(&engine, "<f:render partial=\"card\"/>", vars! {}).unwrap_err();
    assert!(matches!(err, RenderError::TemplateNotFound { .. }));
    assert!(matches!(
        engine.load("card"),
        Err(Error::Load(LoadError::NotFound { .. }))
    ));
}

#[test]
fn test_partial_is_compiled() {
    let engine = memory_engine(&[("card", "<f:if condition=\"{x}\">x</f:if>")]);
    let partial = engine.partial("card").unwrap();
    assert!(partial.is_compiled());
    assert_eq!(partial.identity(), "card");
    assert_eq!(engine.cache().len(), 1);
}

// =============================================================================
// Engine::load and render_template
// =============================================================================

#[test]
fn test_render_template() {
    let engine = memory_engine(&[("page", "Hello {name}")]);
    assert_eq!(
        engine.render_template("page", vars! { "name" => "Ann" }).unwrap(),
        "Hello Ann"
    );
    assert!(matches!(
        engine.render_template("missing", vars! {}),
        Err(Error::Load(LoadError::NotFound { ref identity })) if identity == "missing"
    ));
}

#[test]
fn test_load_reuses_parsed_template_until_source_changes() {
    let loader = Arc::new(MemoryLoader::new().with("page", "v1"));
    let engine = engine_with(loader.clone());

    let first = engine.load("page").unwrap();
    let second = engine.load("page").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    loader.insert("page", "v2");
    let third = engine.load("page").unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_ne!(first.id(), third.id());
    assert_eq!(engine.render(&third, vars! {}).unwrap(), "v2");
}

#[test]
fn test_removed_template_is_not_found() {
    let loader = Arc::new(MemoryLoader::new().with("page", "x"));
    let engine = engine_with(loader.clone());
    assert!(engine.load("page").is_ok());
    assert_eq!(loader.remove("page").as_deref(), Some("x"));
    assert!(matches!(engine.load("page"), Err(Error::Load(_))));
}

// =============================================================================
// FileSystemLoader
// =============================================================================

#[test]
fn test_file_system_loader_reads_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("partials")).unwrap();
    fs::write(dir.path().join("partials/footer.html"), "<p>{year}</p>").unwrap();

    let loader = FileSystemLoader::new(dir.path());
    assert_eq!(loader.base_dir(), dir.path());
    assert_eq!(loader.load("partials/footer.html").unwrap(), "<p>{year}</p>");

    let engine = engine_with(Arc::new(loader));
    let output = render_with(
        &engine,
        "<f:render partial=\"partials/footer.html\" arguments=\"{year: 2024}\"/>",
        vars! {},
    )
    .unwrap();
    assert_eq!(output, "<p>2024</p>");
}

#[test]
fn test_file_system_loader_rejects_escaping_paths() {
    let dir = tempfile::tempdir().unwrap();
    let inner = dir.path().join("templates");
    fs::create_dir(&inner).unwrap();
    fs::write(dir.path().join("secret.html"), "secret").unwrap();

    let loader = FileSystemLoader::new(&inner);
    for identity in ["../secret.html", "a/../../secret.html", "", "/etc/passwd"] {
        assert!(
            matches!(loader.load(identity), Err(LoadError::NotFound { .. })),
            "{identity:?} should be rejected"
        );
    }
}

#[test]
fn test_file_system_loader_missing_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("partials")).unwrap();

    let loader = FileSystemLoader::new(dir.path());
    assert!(matches!(
        loader.load("missing.html"),
        Err(LoadError::NotFound { ref identity }) if identity == "missing.html"
    ));
    assert!(matches!(
        loader.load("partials"),
        Err(LoadError::NotFound { .. })
    ));
}
