//! Unified error handling for the Smart QR core.
//!
//! This module provides a unified error type that wraps domain, application,
//! and repository errors, with user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::application::ports::output::RepositoryError;
use crate::domain::DomainError;

/// Root error type for Smart QR core operations.
#[derive(Debug, Error, Clone)]
pub enum SmartQrError {
    /// Errors from the domain layer (business rule outcomes).
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Errors from the application layer (orchestration failures).
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Errors from a driven port implementation.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl SmartQrError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Repository(e) => e.suggestions(),
            Self::Internal { .. } => vec![
                "This appears to be a bug".into(),
                "Please report it with the command you ran".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Quota => ErrorCategory::Quota,
                crate::domain::ErrorCategory::Integrity => ErrorCategory::Integrity,
            },
            Self::Application(e) => e.category(),
            Self::Repository(e) => e.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Quota exhaustion is an expected outcome, not a failure; callers
    /// branch on this rather than on message text.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::Domain(DomainError::QuotaExceeded { .. }))
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Repository(RepositoryError::Unavailable { .. })
                | Self::Application(ApplicationError::Timeout { .. })
        )
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Quota,
    Authentication,
    NotFound,
    Integrity,
    Internal,
}

/// Convenient result type alias.
pub type SmartQrResult<T> = Result<T, SmartQrError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> SmartQrResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> SmartQrResult<T> {
        self.map_err(|e| SmartQrError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}
