//! Application layer for Smart QR.
//!
//! This layer contains:
//! - **Services**: Pipeline orchestration (TemplateService)
//! - **Use cases**: Transport-facing envelopes (GenerateSmartQrUseCase)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! business logic itself. All business rules live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;
pub mod usecases;

// Re-export main services
pub use services::{ApplyOptions, ApplyOutcome, TemplateService, TemplateServiceConfig};

pub use usecases::{GenerateSmartQrRequest, GenerateSmartQrResponse, GenerateSmartQrUseCase};

// Re-export port traits (for adapter implementation)
pub use ports::{TemplateRepository, UsageStore};

pub use error::ApplicationError;
