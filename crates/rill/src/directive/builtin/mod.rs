//! Core directives, registered under the `f` prefix by
//! [`DirectiveResolver::with_defaults`](crate::DirectiveResolver::with_defaults).

mod conditional;
mod for_each;
mod render;
mod section;

pub use conditional::{ElseViewHelper, IfViewHelper};
pub use for_each::ForViewHelper;
pub use render::RenderViewHelper;
pub use section::{RENDERING_SECTION, SectionViewHelper};
