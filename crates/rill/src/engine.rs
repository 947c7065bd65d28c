//! Engine: one place holding the resolver, loader, configuration and caches.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use bon::Builder;
use thiserror::Error;

use crate::analysis::{TemplateWarning, analyze};
use crate::compiler::{Compilation, TemplateCache};
use crate::config::RenderConfig;
use crate::directive::DirectiveResolver;
use crate::interpreter::{LoadError, RenderError, RenderingContext, Variables};
use crate::loader::TemplateLoader;
use crate::parser::{ParseError, ParsedTemplate, parse};
use crate::template::Renderable;
use crate::types::TemplateId;

/// Errors from the one-shot engine entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The template source is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The template source could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// A template engine.
///
/// Renders through the compiled-unit cache when a template compiles and
/// interprets the syntax tree otherwise. Partials are loaded through the
/// configured [`TemplateLoader`].
///
/// # Example
///
/// ```
/// use rill::{Engine, vars};
///
/// let engine = Engine::new();
/// let output = engine
///     .render_source("<f:if condition=\"{admin}\">Hi {name}</f:if>", "greeting", vars! {
///         "admin" => true,
///         "name" => "<Ann>",
///     })
///     .unwrap();
/// assert_eq!(output, "Hi &lt;Ann&gt;");
/// ```
#[derive(Builder)]
pub struct Engine {
    /// Directive handler types and default prefixes.
    #[builder(default = DirectiveResolver::with_defaults())]
    resolver: DirectiveResolver,

    /// Source of partials and named templates.
    loader: Option<Arc<dyn TemplateLoader>>,

    /// Settings applied to every render.
    #[builder(default)]
    config: RenderConfig,

    /// Compiled units; the process-wide cache unless replaced.
    #[builder(default = TemplateCache::shared())]
    cache: Arc<TemplateCache>,

    /// Parsed templates by identity, revalidated against the source hash.
    #[builder(skip)]
    parsed: RwLock<HashMap<String, Arc<ParsedTemplate>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::builder().build()
    }
}

impl Engine {
    /// Create an engine with the core directives, no loader and default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// The directive resolver.
    pub fn resolver(&self) -> &DirectiveResolver {
        &self.resolver
    }

    /// Mutable access to the directive resolver.
    ///
    /// Compiled units stay valid: they resolve handler types on every render.
    /// Later compilations are cached under the changed resolver fingerprint.
    pub fn resolver_mut(&mut self) -> &mut DirectiveResolver {
        &mut self.resolver
    }

    /// The render configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The compiled-unit cache.
    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    /// Parse template source under `identity`.
    pub fn parse(&self, source: &str, identity: &str) -> Result<ParsedTemplate, ParseError> {
        parse(source, identity, &self.resolver)
    }

    /// Returns the compiled form of a template through the cache.
    pub fn compile(&self, template: &ParsedTemplate) -> Compilation {
        self.cache.get_or_compile(template, &self.resolver)
    }

    /// Create a fresh rendering context bound to this engine.
    pub fn context(&self, variables: Variables) -> RenderingContext<'_> {
        RenderingContext::new(&self.resolver, variables)
            .with_config(self.config.clone())
            .with_engine(self)
    }

    /// Renders a parsed template, compiled when possible.
    pub fn render(
        &self,
        template: &ParsedTemplate,
        variables: Variables,
    ) -> Result<String, RenderError> {
        let mut context = self.context(variables);
        match self.compile(template) {
            Compilation::Compiled(unit) => unit.render(&mut context),
            Compilation::Deferred => template.render(&mut context),
        }
    }

    /// Renders a parsed template by interpreting its tree.
    pub fn render_interpreted(
        &self,
        template: &ParsedTemplate,
        variables: Variables,
    ) -> Result<String, RenderError> {
        let mut context = self.context(variables);
        template.render(&mut context)
    }

    /// Parses and renders template source in one step.
    pub fn render_source(
        &self,
        source: &str,
        identity: &str,
        variables: Variables,
    ) -> Result<String, Error> {
        let template = self.parse(source, identity)?;
        Ok(self.render(&template, variables)?)
    }

    /// Loads and parses a template through the loader.
    ///
    /// Parsed templates are reused while their source is unchanged.
    pub fn load(&self, identity: &str) -> Result<Arc<ParsedTemplate>, Error> {
        let Some(loader) = &self.loader else {
            return Err(LoadError::NotFound {
                identity: identity.to_string(),
            }
            .into());
        };
        let source = loader.load(identity)?;
        let id = TemplateId::new(identity, &source);
        let cached = self
            .parsed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .filter(|template| template.id() == id)
            .cloned();
        if let Some(template) = cached {
            return Ok(template);
        }

        let template = Arc::new(self.parse(&source, identity)?);
        self.parsed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.to_string(), Arc::clone(&template));
        Ok(template)
    }

    /// Loads, parses and renders a named template.
    pub fn render_template(&self, identity: &str, variables: Variables) -> Result<String, Error> {
        let template = self.load(identity)?;
        Ok(self.render(&template, variables)?)
    }

    /// Loads a partial and returns its renderable form, compiled when possible.
    pub fn partial(&self, identity: &str) -> Result<Arc<dyn Renderable>, RenderError> {
        let parsed = self.load(identity).map_err(|error| match error {
            Error::Parse(source) => RenderError::InvalidPartial {
                identity: identity.to_string(),
                source,
            },
            Error::Render(error) => error,
            Error::Load(_) => RenderError::TemplateNotFound {
                identity: identity.to_string(),
            },
        })?;
        tracing::debug!(identity, "loaded partial");
        let template: Arc<dyn Renderable> = match self.compile(&parsed) {
            Compilation::Compiled(unit) => unit,
            Compilation::Deferred => parsed,
        };
        Ok(template)
    }

    /// Runs static analysis against this engine's resolver.
    pub fn analyze(&self, template: &ParsedTemplate) -> Vec<TemplateWarning> {
        analyze(template, &self.resolver)
    }
}
