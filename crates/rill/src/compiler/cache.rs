//! Process-wide cache of compiled templates.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock};

use super::{CompiledUnit, Compiler};
use crate::directive::DirectiveResolver;
use crate::parser::ParsedTemplate;
use crate::template::Renderable;
use crate::types::TemplateId;

static SHARED_CACHE: LazyLock<Arc<TemplateCache>> = LazyLock::new(|| Arc::new(TemplateCache::new()));

/// Result of asking for a compiled form of a template.
#[derive(Debug, Clone)]
pub enum Compilation {
    /// The template compiled; render the unit.
    Compiled(Arc<CompiledUnit>),
    /// Some node declined compilation; interpret the tree.
    Deferred,
}

impl Compilation {
    /// The compiled unit, if compilation succeeded.
    pub fn unit(&self) -> Option<&Arc<CompiledUnit>> {
        match self {
            Compilation::Compiled(unit) => Some(unit),
            Compilation::Deferred => None,
        }
    }
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Compiled(Arc<CompiledUnit>),
    Uncompilable,
}

impl From<CacheEntry> for Compilation {
    fn from(entry: CacheEntry) -> Self {
        match entry {
            CacheEntry::Compiled(unit) => Compilation::Compiled(unit),
            CacheEntry::Uncompilable => Compilation::Deferred,
        }
    }
}

/// Template identity plus the fingerprint of the resolver it compiled against.
type CacheKey = (TemplateId, u64);

/// Compiled units keyed by template identity and resolver fingerprint.
///
/// Engines with different directive registrations never share a unit, even
/// when they share the cache. Reads are concurrent. Compilation runs under a single lock with a second
/// lookup inside it, so concurrent first renders of the same template
/// compile it at most once and all observe the same unit.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    compile_lock: Mutex<()>,
}

impl TemplateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn shared() -> Arc<TemplateCache> {
        Arc::clone(&SHARED_CACHE)
    }

    /// Returns the unit cached for `id` as compiled against `resolver`.
    pub fn get(&self, id: TemplateId, resolver: &DirectiveResolver) -> Option<Arc<CompiledUnit>> {
        match self.entry((id, resolver.fingerprint()))? {
            CacheEntry::Compiled(unit) => Some(unit),
            CacheEntry::Uncompilable => None,
        }
    }

    /// Returns the compiled form of `template`, compiling it on first access.
    ///
    /// Never fails: a template that declines compilation is marked
    /// non-compilable and every later call returns [`Compilation::Deferred`]
    /// without retrying.
    pub fn get_or_compile(
        &self,
        template: &ParsedTemplate,
        resolver: &DirectiveResolver,
    ) -> Compilation {
        if !template.is_compilable() {
            return Compilation::Deferred;
        }
        let id = template.id();
        let key = (id, resolver.fingerprint());
        if let Some(entry) = self.entry(key) {
            return observe(template, entry);
        }

        let _guard = self
            .compile_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = self.entry(key) {
            return observe(template, entry);
        }

        let entry = match Compiler::new(resolver).compile(template) {
            Some(unit) => {
                tracing::debug!(identity = template.identity(), %id, "compiled template");
                CacheEntry::Compiled(Arc::new(unit))
            }
            None => {
                tracing::debug!(
                    identity = template.identity(),
                    %id,
                    "template not compilable, interpreting"
                );
                CacheEntry::Uncompilable
            }
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry.clone());
        observe(template, entry)
    }

    /// Evicts every entry for `id`, whatever resolver it compiled against.
    /// Returns whether any was present.
    pub fn remove(&self, id: TemplateId) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry_id, _), _| *entry_id != id);
        entries.len() != before
    }

    /// Evicts every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached entries, compiled or not.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: CacheKey) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }
}

fn observe(template: &ParsedTemplate, entry: CacheEntry) -> Compilation {
    if matches!(entry, CacheEntry::Uncompilable) {
        template.mark_uncompilable();
    }
    entry.into()
}
