//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `smartqr-adapters` crate provides implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Template, Usage, UsageEntry, UserUsageStats};
use crate::error::{ErrorCategory, SmartQrResult};

/// Failures raised by port implementations.
#[derive(Debug, Error, Clone)]
pub enum RepositoryError {
    #[error("Template with id {id} not found")]
    NotFound { id: String },

    #[error("Template with id {id} already exists")]
    Duplicate { id: String },

    #[error("Invalid record: {0}")]
    Validation(String),

    /// Store unreachable or lock poisoned. Retryable.
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl RepositoryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Duplicate { .. } | Self::Validation(_) => ErrorCategory::Validation,
            Self::Unavailable { .. } => ErrorCategory::Internal,
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound { id } => vec![
                format!("No template with id '{id}'"),
                "Run the templates command to list what is available".into(),
            ],
            Self::Duplicate { id } => vec![
                format!("Template '{id}' already exists"),
                "Pick a different id, or delete the existing template first".into(),
            ],
            Self::Validation(reason) => vec![format!("Rejected: {reason}")],
            Self::Unavailable { .. } => vec!["Try again in a moment".into()],
        }
    }
}

// ============================================================================
// Query DTOs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateFilter {
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub domains: Option<Vec<String>>,
    pub min_usage: Option<u64>,
    pub max_usage: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Usage,
    Priority,
    Name,
    CreatedAt,
    LastUsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

/// Combined listing options; `None` fields mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateQuery {
    pub filter: Option<TemplateFilter>,
    pub sort: Option<TemplateSort>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Partial analytics mutation applied by the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsUpdate {
    pub increment_usage: bool,
    pub conversion_rate: Option<f64>,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryStatistics {
    pub total: usize,
    pub active: usize,
    pub total_usage: u64,
    pub average_usage_per_template: f64,
    pub most_used_template_id: Option<String>,
    pub templates_by_tag: HashMap<String, usize>,
}

// ============================================================================
// Ports
// ============================================================================

/// Port for template storage and retrieval.
///
/// Implemented by:
/// - `smartqr_adapters::template_repo::InMemoryTemplateRepository` (built-ins)
///
/// `find_by_url` performs the ranked resolution: among active templates whose
/// domains match the URL, highest `priority_score` wins, ascending id breaks
/// ties.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> SmartQrResult<Option<Template>>;

    /// Best-matching template for a URL, or `None` when nothing matches.
    async fn find_by_url(&self, url: &str) -> SmartQrResult<Option<Template>>;

    async fn find_all(&self, query: TemplateQuery) -> SmartQrResult<Paginated<Template>>;

    async fn find_by_tag(&self, tag: &str) -> SmartQrResult<Vec<Template>>;

    async fn find_most_used(&self, limit: usize) -> SmartQrResult<Vec<Template>>;

    async fn find_recently_used(&self, limit: usize) -> SmartQrResult<Vec<Template>>;

    /// Insert or replace by id.
    async fn save(&self, template: Template) -> SmartQrResult<()>;

    async fn save_many(&self, templates: Vec<Template>) -> SmartQrResult<()>;

    async fn delete(&self, id: &str) -> SmartQrResult<()>;

    async fn update_analytics(&self, id: &str, update: AnalyticsUpdate) -> SmartQrResult<()>;

    /// Case-insensitive match on name, id, or any domain.
    async fn search(&self, query: &str) -> SmartQrResult<Vec<Template>>;

    async fn exists(&self, id: &str) -> SmartQrResult<bool>;

    async fn get_statistics(&self) -> SmartQrResult<RepositoryStatistics>;
}

/// Port for the per-user daily usage ledger.
///
/// `record` is the quota gate: the check and the increment happen in one
/// atomic step inside the implementation, so concurrent callers can never
/// commit past the limit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Today's ledger for a user; a fresh empty one if none exists yet.
    async fn today(&self, user_id: &str, daily_limit: u32) -> SmartQrResult<Usage>;

    /// Atomically record one generation against today's quota.
    ///
    /// Returns the post-increment ledger, or
    /// `SmartQrError::Domain(DomainError::QuotaExceeded)` when the quota
    /// was already exhausted.
    async fn record(
        &self,
        user_id: &str,
        entry: UsageEntry,
        daily_limit: u32,
    ) -> SmartQrResult<Usage>;

    /// Aggregated usage over the trailing `days` calendar days.
    async fn history(&self, user_id: &str, days: u32) -> SmartQrResult<UserUsageStats>;

    /// Drop today's ledger for a user. A missing ledger is not an error.
    async fn reset(&self, user_id: &str) -> SmartQrResult<()>;
}
