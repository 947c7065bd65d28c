pub mod analysis;
pub mod compiler;
pub mod config;
pub mod directive;
pub mod engine;
pub mod escape;
pub mod interpreter;
pub mod loader;
pub mod parser;
pub mod template;
pub mod types;

pub use analysis::{TemplateWarning, analyze};
pub use compiler::{
    Compilation, CompiledArguments, CompiledChild, CompiledDirective, CompiledSection, CompiledUnit,
    Compiler, Fragment,
    TemplateCache, fragment,
};
pub use config::RenderConfig;
pub use directive::builtin::{
    ElseViewHelper, ForViewHelper, IfViewHelper, RENDERING_SECTION, RenderViewHelper,
    SectionViewHelper,
};
pub use directive::{
    ArgumentDefinition, ArgumentDefinitions, ArgumentType, Arguments, CORE_NAMESPACE,
    Capabilities, Children, CompileHook, DirectiveResolver, HandlerType, Invocation,
    PostParseHook, ViewHelper,
};
pub use engine::{Engine, Error};
pub use escape::escape_html;
pub use interpreter::{
    BindingErrorKind, LoadError, RenderError, RenderingContext, SharedState,
    UnknownDirectiveError, VariableScope, Variables, compute_suggestions,
};
pub use loader::{FileSystemLoader, MemoryLoader, TemplateLoader};
pub use parser::{
    ParseError, ParseState, ParsedTemplate, parse, parse_argument, parse_condition,
};
pub use template::{Renderable, SECTIONS_VARIABLE};
pub use types::{Deferred, NodeRef, TemplateId, Value};

/// Creates a `HashMap<String, Value>` of template variables from key-value
/// pairs.
///
/// Values are converted via `Into<Value>`, so you can pass booleans,
/// integers, floats, strings, vectors or options directly.
///
/// # Example
///
/// ```
/// use rill::vars;
///
/// let v = vars! { "count" => 3, "name" => "Alice" };
/// assert_eq!(v.len(), 2);
/// assert_eq!(v["count"].as_number(), Some(3));
/// assert_eq!(v["name"].as_str(), Some("Alice"));
/// ```
#[macro_export]
macro_rules! vars {
    {} => {
        ::std::collections::HashMap::<String, $crate::Value>::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut map = ::std::collections::HashMap::<String, $crate::Value>::new();
            $(
                map.insert($key.to_string(), ::std::convert::Into::<$crate::Value>::into($value));
            )+
            map
        }
    };
}
