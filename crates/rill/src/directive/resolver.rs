//! Directive resolver: maps `(namespace, name)` to handler types.

use std::collections::HashMap;

use const_fnv1a_hash::fnv1a_hash_str_64;
use indexmap::IndexMap;

use super::builtin::{
    ElseViewHelper, ForViewHelper, IfViewHelper, RenderViewHelper, SectionViewHelper,
};
use super::{HandlerType, ViewHelper};
use crate::interpreter::{UnknownDirectiveError, compute_suggestions};

/// Namespace URI of the built-in directives.
pub const CORE_NAMESPACE: &str = "https://rill.dev/ns/core";

/// A registry of directive handler types keyed by namespace and local name.
///
/// Resolution is namespace-scoped, so several directive families can share
/// short local names. Template prefixes (`f` in `<f:if>`) are mapped to
/// namespace URIs here as defaults; templates may declare more with
/// `{namespace x=uri}`.
///
/// # Example
///
/// ```
/// use rill::{CORE_NAMESPACE, DirectiveResolver};
///
/// let resolver = DirectiveResolver::with_defaults();
/// assert_eq!(resolver.namespace("f"), Some(CORE_NAMESPACE));
/// assert!(resolver.resolve(CORE_NAMESPACE, "if").is_ok());
/// assert!(resolver.resolve(CORE_NAMESPACE, "iff").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DirectiveResolver {
    /// Handler types by namespace URI, then local name.
    handlers: IndexMap<String, IndexMap<String, HandlerType>>,
    /// Default prefix bindings: prefix -> namespace URI.
    namespaces: HashMap<String, String>,
    /// Hash of every mapping above, refreshed on each change.
    fingerprint: u64,
}

impl DirectiveResolver {
    /// Create a resolver with no directives and no prefixes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with the core directives registered under prefix `f`.
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();
        resolver
            .register_namespace("f", CORE_NAMESPACE)
            .register::<IfViewHelper>(CORE_NAMESPACE, "if")
            .register::<ElseViewHelper>(CORE_NAMESPACE, "else")
            .register::<SectionViewHelper>(CORE_NAMESPACE, "section")
            .register::<RenderViewHelper>(CORE_NAMESPACE, "render")
            .register::<ForViewHelper>(CORE_NAMESPACE, "for");
        resolver
    }

    /// Binds a template prefix to a namespace URI.
    pub fn register_namespace(
        &mut self,
        prefix: impl Into<String>,
        namespace: impl Into<String>,
    ) -> &mut Self {
        self.namespaces.insert(prefix.into(), namespace.into());
        self.refresh_fingerprint();
        self
    }

    /// Registers handler `H` as `name` in `namespace`, replacing any previous mapping.
    ///
    /// The handler's argument contract is captured here, once per type.
    pub fn register<H: ViewHelper + Default>(
        &mut self,
        namespace: &str,
        name: &str,
    ) -> &mut Self {
        let handler_type = HandlerType::new::<H>(namespace, name);
        self.handlers
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), handler_type);
        self.refresh_fingerprint();
        self
    }

    /// Removes a directive mapping.
    pub fn unregister(&mut self, namespace: &str, name: &str) -> Option<HandlerType> {
        let removed = self
            .handlers
            .get_mut(namespace)
            .and_then(|names| names.shift_remove(name));
        self.refresh_fingerprint();
        removed
    }

    /// A hash of every directive mapping and prefix binding.
    ///
    /// Two resolvers with the same registrations share a fingerprint; any
    /// `register`, `unregister` or `register_namespace` call changes it.
    /// Compiled units are cached per fingerprint.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    fn refresh_fingerprint(&mut self) {
        let handlers = self.handler_types().map(|handler_type| {
            fnv1a_hash_str_64(&format!(
                "{}\0{}\0{:?}",
                handler_type.namespace(),
                handler_type.name(),
                handler_type.implementation()
            ))
        });
        let prefixes = self
            .namespaces()
            .into_iter()
            .map(|(prefix, uri)| fnv1a_hash_str_64(&format!("{prefix}={uri}")));
        let fingerprint = handlers
            .chain(prefixes)
            .fold(0_u64, |fingerprint, hash| fingerprint.rotate_left(31) ^ hash);
        self.fingerprint = fingerprint;
    }

    /// Namespace URI bound to a template prefix.
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// Resolves a directive to its handler type.
    pub fn resolve(&self, namespace: &str, name: &str) -> Result<&HandlerType, UnknownDirectiveError> {
        if let Some(handler_type) = self
            .handlers
            .get(namespace)
            .and_then(|names| names.get(name))
        {
            return Ok(handler_type);
        }
        let available: Vec<String> = self
            .handlers
            .get(namespace)
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default();
        Err(UnknownDirectiveError {
            namespace: namespace.to_string(),
            name: name.to_string(),
            suggestions: compute_suggestions(name, &available),
        })
    }

    /// Iterates over all registered handler types in registration order.
    pub fn handler_types(&self) -> impl Iterator<Item = &HandlerType> {
        self.handlers.values().flat_map(IndexMap::values)
    }

    /// Iterates over default prefix bindings, sorted by prefix.
    pub fn namespaces(&self) -> Vec<(&str, &str)> {
        let mut bindings: Vec<(&str, &str)> = self
            .namespaces
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
            .collect();
        bindings.sort_unstable();
        bindings
    }
}
