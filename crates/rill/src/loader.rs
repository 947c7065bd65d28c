//! Template source loaders.
//!
//! A loader turns a template identity (a name such as `partials/footer.html`)
//! into source text. The engine uses it for `f:render partial="..."` and
//! [`Engine::load`](crate::Engine::load).

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::interpreter::LoadError;

/// Source of template text.
pub trait TemplateLoader: fmt::Debug + Send + Sync {
    /// Returns the source text of the template named `identity`.
    fn load(&self, identity: &str) -> Result<String, LoadError>;
}

/// In-memory loader, mostly for tests and embedded templates.
///
/// # Example
///
/// ```
/// use rill::{MemoryLoader, TemplateLoader};
///
/// let loader = MemoryLoader::new().with("footer", "<p>bye</p>");
/// assert_eq!(loader.load("footer").unwrap(), "<p>bye</p>");
/// assert!(loader.load("header").is_err());
/// ```
#[derive(Debug, Default)]
pub struct MemoryLoader {
    templates: RwLock<HashMap<String, String>>,
}

impl MemoryLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, builder style.
    pub fn with(self, identity: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(identity, source);
        self
    }

    /// Adds or replaces a template.
    pub fn insert(&self, identity: impl Into<String>, source: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.into(), source.into());
    }

    /// Removes a template, returning its source.
    pub fn remove(&self, identity: &str) -> Option<String> {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity)
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, identity: &str) -> Result<String, LoadError> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                identity: identity.to_string(),
            })
    }
}

/// Loads templates from files below a base directory.
///
/// Identities are relative paths. Absolute paths and `..` components are
/// rejected so a template can never reach outside the base directory.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    base_dir: PathBuf,
}

impl FileSystemLoader {
    /// Create a loader rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves an identity to a path inside the base directory.
    fn resolve(&self, identity: &str) -> Result<PathBuf, LoadError> {
        let relative = Path::new(identity);
        let escapes = relative.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || identity.is_empty() {
            return Err(LoadError::NotFound {
                identity: identity.to_string(),
            });
        }
        Ok(self.base_dir.join(relative))
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, identity: &str) -> Result<String, LoadError> {
        let path = self.resolve(identity)?;
        if path.is_dir() {
            return Err(LoadError::NotFound {
                identity: identity.to_string(),
            });
        }
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound {
                identity: identity.to_string(),
            },
            _ => LoadError::Io { path, source },
        })
    }
}
