mod template_id;
mod value;

pub use template_id::TemplateId;
pub use value::{Deferred, NodeRef, Value};
