//! Render configuration.

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::escape::escape_html;

/// Settings applied to every render call of an engine.
///
/// # Example
///
/// ```
/// use rill::RenderConfig;
///
/// let config = RenderConfig::builder().strict_variables(true).build();
/// assert!(config.escape_output);
/// assert_eq!(config.max_depth, 64);
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Escape variable output and the output of escaping directives.
    #[builder(default = true)]
    pub escape_output: bool,

    /// Fail on unresolvable variable paths instead of rendering null.
    #[builder(default)]
    pub strict_variables: bool,

    /// Maximum nesting of section and partial renders.
    #[builder(default = 64)]
    pub max_depth: usize,

    /// Escaping function for output.
    #[builder(default = escape_html as fn(&str) -> String)]
    #[serde(skip, default = "default_escaper")]
    pub escaper: fn(&str) -> String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig::builder().build()
    }
}

fn default_escaper() -> fn(&str) -> String {
    escape_html
}
