//! Domain-level errors: expected business outcomes a caller can branch on.

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (for retry logic)
/// - Categorizable (for CLI display)
/// - Branchable (typed variants, no stringly-typed control flow)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Quota Errors (429-level equivalent)
    // ========================================================================
    /// The user's daily quota is exhausted. Not retryable until the next
    /// UTC calendar day.
    ///
    /// The rendered message contains the word "limit" so that callers which
    /// only display text still say something meaningful, but classification
    /// happens on the variant, never on the message.
    #[error("Daily limit reached ({remaining} generations remaining today)")]
    QuotaExceeded { remaining: u32 },

    // ========================================================================
    // Integrity Errors
    // ========================================================================
    /// A usage record was loaded with `count > daily_limit`. Clamping would
    /// mask a quota-bypass bug, so this is surfaced loudly instead.
    #[error("usage record '{id}' is corrupt: count {count} exceeds daily limit {daily_limit}")]
    DataIntegrity {
        id: String,
        count: u32,
        daily_limit: u32,
    },

    // ========================================================================
    // Validation Errors (400-level equivalent)
    // ========================================================================
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid usage record: {0}")]
    InvalidUsage(String),
}

impl DomainError {
    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::QuotaExceeded { .. } => ErrorCategory::Quota,
            Self::DataIntegrity { .. } => ErrorCategory::Integrity,
            Self::InvalidTemplate(_) | Self::InvalidUsage(_) => ErrorCategory::Validation,
        }
    }

    /// Expected business outcomes can be handled by branching callers;
    /// everything else indicates corrupted state or bad construction.
    pub fn is_expected_outcome(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::QuotaExceeded { .. } => vec![
                "Your daily generation quota is used up".into(),
                "The quota resets at midnight UTC".into(),
                "Premium accounts have a higher daily limit".into(),
            ],
            Self::DataIntegrity { id, .. } => vec![
                format!("Usage record '{id}' holds an impossible count"),
                "Inspect the usage store for this user and day".into(),
            ],
            Self::InvalidTemplate(reason) => vec![
                format!("Template rejected: {reason}"),
                "Templates need a non-empty id, name, and at least one domain".into(),
            ],
            Self::InvalidUsage(reason) => {
                vec![format!("Usage record rejected: {reason}")]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Quota,
    Integrity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_message_mentions_limit() {
        // Human-facing contract: clients display this string verbatim.
        let err = DomainError::QuotaExceeded { remaining: 0 };
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn quota_exceeded_is_expected() {
        assert!(DomainError::QuotaExceeded { remaining: 0 }.is_expected_outcome());
        assert!(
            !DomainError::DataIntegrity {
                id: "usage_u1_2026-01-01".into(),
                count: 5,
                daily_limit: 3,
            }
            .is_expected_outcome()
        );
    }
}
