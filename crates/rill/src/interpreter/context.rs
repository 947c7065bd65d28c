//! Rendering context: variable scope and directive-shared state for one render call.

use std::any::TypeId;
use std::collections::HashMap;
use std::mem;

use crate::config::RenderConfig;
use crate::directive::DirectiveResolver;
use crate::engine::Engine;
use crate::interpreter::RenderError;
use crate::types::Value;

/// A frame of named variables.
pub type Variables = HashMap<String, Value>;

/// Ordered stack of variable frames; the innermost frame wins.
#[derive(Debug, Clone)]
pub struct VariableScope {
    frames: Vec<Variables>,
}

impl Default for VariableScope {
    fn default() -> Self {
        Self::new(Variables::new())
    }
}

impl VariableScope {
    /// Create a scope with a single root frame.
    pub fn new(root: Variables) -> Self {
        Self { frames: vec![root] }
    }

    /// Looks up a variable, innermost frame first, falling back outward.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Resolves a dotted path: the first segment is a variable, the rest
    /// index into maps (by key) and lists (by position).
    pub fn resolve(&self, path: &[String]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut value = self.get(first)?;
        for segment in rest {
            value = value.get(segment)?;
        }
        Some(value)
    }

    /// Whether a variable is bound in any frame.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Binds a variable in the innermost frame.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value.into());
        }
    }

    /// Pushes a new innermost frame.
    pub fn push(&mut self, frame: Variables) {
        self.frames.push(frame);
    }

    /// Pops the innermost frame. The root frame is never popped.
    pub fn pop(&mut self) -> Option<Variables> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Number of frames, including the root frame.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Key-value store for cross-directive coordination within one render call.
///
/// Entries are namespaced by the handler type that owns them, so unrelated
/// directives cannot collide on key names.
#[derive(Debug, Default)]
pub struct SharedState {
    entries: HashMap<(TypeId, String), Value>,
}

impl SharedState {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` for handler type `H`, returning the previous value.
    pub fn insert<H: 'static>(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries
            .insert((TypeId::of::<H>(), key.into()), value.into())
    }

    /// Reads `key` for handler type `H`.
    pub fn get<H: 'static>(&self, key: &str) -> Option<&Value> {
        self.entries.get(&(TypeId::of::<H>(), key.to_string()))
    }

    /// Whether `key` is set for handler type `H`.
    pub fn contains<H: 'static>(&self, key: &str) -> bool {
        self.get::<H>(key).is_some()
    }

    /// Removes and returns `key` for handler type `H` in one step.
    pub fn take<H: 'static>(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(&(TypeId::of::<H>(), key.to_string()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-render mutable state.
///
/// A context is created fresh for each top-level render call and is never
/// shared between concurrent calls. It owns the variable scope and the
/// directive-shared state store and borrows the resolver (and optionally the
/// engine, for partials).
pub struct RenderingContext<'r> {
    resolver: &'r DirectiveResolver,
    engine: Option<&'r Engine>,
    config: RenderConfig,
    variables: VariableScope,
    shared: SharedState,
    depth: usize,
}

impl<'r> RenderingContext<'r> {
    /// Create a context with top-level variable bindings and default config.
    pub fn new(resolver: &'r DirectiveResolver, variables: Variables) -> Self {
        Self {
            resolver,
            engine: None,
            config: RenderConfig::default(),
            variables: VariableScope::new(variables),
            shared: SharedState::new(),
            depth: 0,
        }
    }

    /// Replaces the render configuration.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches an engine, enabling partial rendering.
    pub fn with_engine(mut self, engine: &'r Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// The directive resolver used for handler instantiation.
    pub fn resolver(&self) -> &'r DirectiveResolver {
        self.resolver
    }

    /// The engine, when rendering through one.
    pub fn engine(&self) -> Option<&'r Engine> {
        self.engine
    }

    /// Render configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Variable scope.
    pub fn variables(&self) -> &VariableScope {
        &self.variables
    }

    /// Mutable variable scope.
    pub fn variables_mut(&mut self) -> &mut VariableScope {
        &mut self.variables
    }

    /// Directive-shared state store.
    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Mutable directive-shared state store.
    pub fn shared_mut(&mut self) -> &mut SharedState {
        &mut self.shared
    }

    /// Current nesting depth of section and partial renders.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Runs `f` with `frame` pushed as the innermost scope frame.
    ///
    /// The frame is popped when `f` returns, whether or not it failed.
    pub fn with_scope<T>(&mut self, frame: Variables, f: impl FnOnce(&mut Self) -> T) -> T {
        self.variables.push(frame);
        let result = f(self);
        self.variables.pop();
        result
    }

    /// Runs `f` in a scope containing only `frame`; outer variables are hidden.
    pub fn with_isolated_scope<T>(&mut self, frame: Variables, f: impl FnOnce(&mut Self) -> T) -> T {
        let outer = mem::replace(&mut self.variables, VariableScope::new(frame));
        let result = f(self);
        self.variables = outer;
        result
    }

    /// Runs a nested render, enforcing the configured maximum depth.
    pub fn descend<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RenderError>,
    ) -> Result<T, RenderError> {
        if self.depth >= self.config.max_depth {
            return Err(RenderError::MaxDepthExceeded {
                max_depth: self.config.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}
