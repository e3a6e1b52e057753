//! Domain events and the in-process event bus.
//!
//! Every interesting transition in the generation pipeline is published as a
//! [`SmartQrEvent`] so that analytics, warming, and monitoring can attach
//! without the services knowing about them. Topics are closed (an enum, not
//! free-form strings) so a typo cannot silently create a dead channel.

mod bus;

pub use bus::{EventBus, Subscription};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// The closed set of event channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    Requested,
    Generated,
    Failed,
    LimitReached,
    TemplateNotFound,
    AnalyticsTrack,
}

impl EventTopic {
    /// Wire name, stable across releases (external consumers key on it).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Requested => "smartqr.requested",
            Self::Generated => "smartqr.generated",
            Self::Failed => "smartqr.failed",
            Self::LimitReached => "smartqr.limit.reached",
            Self::TemplateNotFound => "smartqr.template.notfound",
            Self::AnalyticsTrack => "smartqr.analytics.track",
        }
    }
}

impl std::fmt::Display for EventTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedPayload {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub template_found: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPayload {
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub url: String,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub url: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitReachedPayload {
    pub user_id: String,
    pub current_count: u32,
    pub limit: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNotFoundPayload {
    pub url: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTrackPayload {
    pub event: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One event: topic is carried by the variant, payload by its struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SmartQrEvent {
    Requested(RequestedPayload),
    Generated(GeneratedPayload),
    Failed(FailedPayload),
    LimitReached(LimitReachedPayload),
    TemplateNotFound(TemplateNotFoundPayload),
    AnalyticsTrack(AnalyticsTrackPayload),
}

impl SmartQrEvent {
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Requested(_) => EventTopic::Requested,
            Self::Generated(_) => EventTopic::Generated,
            Self::Failed(_) => EventTopic::Failed,
            Self::LimitReached(_) => EventTopic::LimitReached,
            Self::TemplateNotFound(_) => EventTopic::TemplateNotFound,
            Self::AnalyticsTrack(_) => EventTopic::AnalyticsTrack,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Requested(p) => p.timestamp,
            Self::Generated(p) => p.timestamp,
            Self::Failed(p) => p.timestamp,
            Self::LimitReached(p) => p.timestamp,
            Self::TemplateNotFound(p) => p.timestamp,
            Self::AnalyticsTrack(p) => p.timestamp,
        }
    }
}
