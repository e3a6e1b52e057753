pub mod template;
pub mod usage;

pub use template::{Template, TemplateBuilder, TemplateConfig, TemplateMetadata};
pub use usage::{Usage, UsageEntry};
