//! Application services: use case orchestration over the ports.

pub mod template_service;

pub use template_service::{
    ApplyOptions, ApplyOutcome, AvailableTemplates, TemplateListing, TemplateService,
    TemplateServiceConfig,
};
