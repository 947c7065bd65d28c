use std::fmt;

use const_fnv1a_hash::fnv1a_hash_str_64;
use serde::{Deserialize, Serialize};

/// A compact, stable identity for one template source.
///
/// `TemplateId` wraps a 64-bit FNV-1a hash of the template's name combined
/// with its source text, so editing a template's source yields a new identity
/// and stale compiled units are never reused for it. It is the key of the
/// compiled-unit cache.
///
/// # Example
///
/// ```
/// use rill::TemplateId;
///
/// let a = TemplateId::new("page.html", "<p>{title}</p>");
/// let b = TemplateId::new("page.html", "<p>{title}</p>");
/// let c = TemplateId::new("page.html", "<h1>{title}</h1>");
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct TemplateId(u64);

impl TemplateId {
    /// Computes the identity of a named template source.
    pub fn new(name: &str, source: &str) -> Self {
        let name_hash = fnv1a_hash_str_64(name);
        let source_hash = fnv1a_hash_str_64(source);
        Self(name_hash.rotate_left(31) ^ source_hash)
    }

    /// Get the raw hash value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateId({:016x})", self.0)
    }
}
