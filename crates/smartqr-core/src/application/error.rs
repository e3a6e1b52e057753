//! Application layer errors.
//!
//! These errors represent failures in orchestration, not business logic.
//! Business logic errors are `DomainError` from `crate::domain`.

use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Request rejected before any work was done.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The operation needs an authenticated user and none was supplied.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// An orchestrated step exceeded its deadline.
    #[error("Operation '{operation}' timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ValidationFailed(reason) => vec![
                format!("Request rejected: {reason}"),
                "Check the URL and options, then retry".into(),
            ],
            Self::AuthenticationRequired => vec![
                "This operation needs a user id".into(),
                "Pass one with --user".into(),
            ],
            Self::Timeout { operation, .. } => vec![
                format!("'{operation}' did not complete in time"),
                "Retry; if it persists, raise the service timeout".into(),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationFailed(_) => ErrorCategory::Validation,
            Self::AuthenticationRequired => ErrorCategory::Authentication,
            Self::Timeout { .. } => ErrorCategory::Internal,
        }
    }
}
