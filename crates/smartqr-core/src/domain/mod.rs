//! Core domain layer for Smart QR.
//!
//! Pure business logic: template matching and ranking, and the per-day
//! usage ledger. No I/O, no clocks beyond `Utc::now()`, no ports.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No storage, network, or external calls
//! - **Immutable entities**: Transitions return new instances
//! - **Rich domain model**: Matching, ranking, and quota rules live in
//!   entities, not services

// Public API - what the world sees
pub mod entities;
pub mod error;

// Re-exports for convenience
pub use entities::{
    template::{
        FrameConfig, GradientConfig, LogoConfig, Template, TemplateAnalytics, TemplateBuilder,
        TemplateConfig, TemplateMetadata, TemplatePatch,
    },
    usage::{
        DEFAULT_DAILY_LIMIT, DailyUsage, Usage, UsageEntry, UsageSnapshot, UserUsageStats,
    },
};

pub use error::{DomainError, ErrorCategory};
