//! Smart QR Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Smart QR
//! generation service, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          smartqr-cli (CLI)              │
//! │      (Implements Driving Ports)         │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     Use Case / Application Service      │
//! │ (GenerateSmartQrUseCase, TemplateService)│
//! │         Orchestrates the pipeline       │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │  (Driven: TemplateRepository, UsageStore)│
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    smartqr-adapters (Infrastructure)    │
//! │ (InMemoryTemplateRepository, UsageStore)│
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │        (Template, Usage, events)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The [`events::EventBus`] cuts across the layers: services publish,
//! anything (analytics, monitoring, cache warming) subscribes. It is always
//! injected, never a global.

// Re-export domain layer (stable, well-defined API)
pub mod domain;

// Re-export application layer (orchestration logic)
pub mod application;

// Event bus and typed event payloads
pub mod events;

// Re-export error types
pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        ApplyOptions, GenerateSmartQrRequest, GenerateSmartQrResponse, GenerateSmartQrUseCase,
        TemplateService, TemplateServiceConfig,
        ports::{TemplateRepository, UsageStore},
    };
    pub use crate::domain::{
        DEFAULT_DAILY_LIMIT, DomainError, Template, TemplateBuilder, TemplateConfig,
        TemplateMetadata, Usage, UsageEntry,
    };
    pub use crate::error::{SmartQrError, SmartQrResult};
    pub use crate::events::{EventBus, EventTopic, SmartQrEvent};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
