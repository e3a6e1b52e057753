//! Generate Smart QR use case: the application boundary.
//!
//! Turns a transport-shaped request into a transport-shaped response
//! envelope. Nothing here throws: every failure is classified into a stable
//! error code so callers (CLI today, HTTP tomorrow) can branch without
//! inspecting message text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, instrument};

use crate::application::ApplicationError;
use crate::application::services::{ApplyOptions, TemplateService};
use crate::domain::DomainError;
use crate::error::{ErrorCategory, SmartQrError};

/// Stable error codes of the response envelope.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const AUTHENTICATION_REQUIRED: &str = "AUTHENTICATION_REQUIRED";
    pub const LIMIT_REACHED: &str = "LIMIT_REACHED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateSmartQrRequest {
    pub url: String,
    pub user_id: Option<String>,
    /// `premium` raises the daily limit, `admin` bypasses it entirely.
    pub user_role: Option<String>,
    pub preferred_template_id: Option<String>,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    /// Embed the whole template in the configuration (debugging/admin).
    pub return_full_template: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSmartQrResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<GenerateData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateData {
    pub template_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    pub configuration: Value,
    pub remaining: u32,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Wall-clock time of the whole call, milliseconds.
    pub analysis_time: u64,
    pub domain: String,
    pub is_known_domain: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl GenerateSmartQrResponse {
    fn failure(code: &'static str, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorEnvelope {
                code,
                message: message.into(),
                details,
            }),
        }
    }

    /// Classify an orchestration failure into the envelope. The message is
    /// the user-facing text; the full error lands in `details.reason`.
    fn application_failure(err: ApplicationError) -> Self {
        let code = match err.category() {
            ErrorCategory::Validation => codes::VALIDATION_ERROR,
            ErrorCategory::Authentication => codes::AUTHENTICATION_REQUIRED,
            _ => codes::INTERNAL_ERROR,
        };
        let message = match &err {
            ApplicationError::ValidationFailed(reason) => reason.clone(),
            ApplicationError::AuthenticationRequired => {
                "Smart QR requires user authentication".into()
            }
            _ => "Failed to generate Smart QR".into(),
        };
        Self::failure(code, message, Some(json!({ "reason": err.to_string() })))
    }
}

pub struct GenerateSmartQrUseCase {
    service: Arc<TemplateService>,
    /// Ceiling for one generation including the analysis delay.
    timeout: Duration,
}

impl GenerateSmartQrUseCase {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(service: Arc<TemplateService>) -> Self {
        Self {
            service,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the full pipeline. Infallible by construction: errors come back
    /// inside the envelope.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn execute(&self, request: GenerateSmartQrRequest) -> GenerateSmartQrResponse {
        let started = Instant::now();

        // Cheap rejections first: no quota or repository work.
        if let Err(reason) = Self::validate_url(&request.url) {
            return GenerateSmartQrResponse::application_failure(
                ApplicationError::ValidationFailed(reason),
            );
        }
        let Some(user_id) = request.user_id.as_deref() else {
            return GenerateSmartQrResponse::application_failure(
                ApplicationError::AuthenticationRequired,
            );
        };

        let role = request.user_role.as_deref();
        let opts = ApplyOptions {
            is_premium: matches!(role, Some("premium") | Some("admin")),
            skip_limit_check: matches!(role, Some("admin")),
            preferred_template_id: request.preferred_template_id.clone(),
        };

        let applied = tokio::time::timeout(
            self.timeout,
            self.service
                .apply_smart_template(&request.url, Some(user_id), opts),
        )
        .await;

        let result = match applied {
            Ok(result) => result,
            Err(_elapsed) => {
                let err = ApplicationError::Timeout {
                    operation: "apply_smart_template",
                    millis: self.timeout.as_millis() as u64,
                };
                error!(error = %err, "generation timed out");
                return GenerateSmartQrResponse::application_failure(err);
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(SmartQrError::Domain(DomainError::QuotaExceeded { remaining })) => {
                return GenerateSmartQrResponse::failure(
                    codes::LIMIT_REACHED,
                    DomainError::QuotaExceeded { remaining }.to_string(),
                    Some(json!({ "remaining": remaining })),
                );
            }
            Err(err) => {
                error!(error = %err, "generation failed");
                return GenerateSmartQrResponse::failure(
                    codes::INTERNAL_ERROR,
                    "Failed to generate Smart QR",
                    Some(json!({ "reason": err.to_string() })),
                );
            }
        };

        let mut configuration = match (&outcome.template, &outcome.config) {
            (Some(template), Some(config)) => {
                let mut config = config.clone();
                if let Value::Object(map) = &mut config {
                    map.insert(
                        "_smartQR".into(),
                        json!({
                            "version": crate::VERSION,
                            "templateApplied": true,
                            "templateId": template.id,
                        }),
                    );
                }
                config
            }
            _ => json!({
                "_smartQR": {
                    "version": crate::VERSION,
                    "templateApplied": false,
                    "reason": "No template available for this domain",
                }
            }),
        };

        if request.options.return_full_template {
            if let (Some(template), Value::Object(map)) = (&outcome.template, &mut configuration) {
                map.insert(
                    "_fullTemplate".into(),
                    serde_json::to_value(template).unwrap_or(Value::Null),
                );
            }
        }

        GenerateSmartQrResponse {
            success: true,
            data: Some(GenerateData {
                template_applied: outcome.template.is_some(),
                template_id: outcome.template.as_ref().map(|t| t.id.clone()),
                template_name: outcome.template.as_ref().map(|t| t.name.clone()),
                configuration,
                remaining: outcome.remaining,
                metadata: ResponseMetadata {
                    analysis_time: started.elapsed().as_millis() as u64,
                    domain: TemplateService::extract_domain(&TemplateService::normalize_url(
                        &request.url,
                    )),
                    is_known_domain: outcome.template.is_some(),
                },
            }),
            error: None,
        }
    }

    /// Hostname-shaped check after scheme defaulting. Looser than full URL
    /// grammar on purpose; the repository tolerates odd inputs downstream.
    fn validate_url(url: &str) -> Result<(), String> {
        if url.trim().is_empty() {
            return Err("URL is required".into());
        }
        let normalized = TemplateService::normalize_url(url);
        let parsed = url::Url::parse(&normalized).map_err(|_| "Invalid URL format".to_string())?;
        let host = parsed
            .host_str()
            .ok_or_else(|| "Invalid URL format".to_string())?;

        let labels: Vec<&str> = host.split('.').collect();
        let shaped = labels.len() >= 2
            && labels.iter().all(|label| {
                !label.is_empty()
                    && label
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
            && labels
                .last()
                .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));
        if shaped { Ok(()) } else { Err("Invalid URL format".into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::output::{
        MockTemplateRepository, MockUsageStore, TemplateRepository, UsageStore,
    };
    use crate::application::services::TemplateServiceConfig;
    use crate::domain::{Template, Usage, UsageEntry};
    use crate::events::{EventBus, EventTopic};
    use chrono::Utc;

    fn instagram() -> Template {
        Template::builder("instagram-v1", "Instagram Style")
            .domain("instagram.com")
            .priority(100)
            .build()
            .unwrap()
    }

    fn usage_with(count: u32, limit: u32) -> Usage {
        let entries = (0..count)
            .map(|i| UsageEntry::new(None, format!("https://u{i}.example")))
            .collect();
        Usage::new("u1", Utc::now().date_naive(), count, entries, limit).unwrap()
    }

    fn use_case(
        repo: MockTemplateRepository,
        usage: MockUsageStore,
    ) -> (GenerateSmartQrUseCase, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        let service = TemplateService::new(
            Arc::new(repo) as Arc<dyn TemplateRepository>,
            Arc::new(usage) as Arc<dyn UsageStore>,
            Arc::clone(&bus),
            TemplateServiceConfig {
                enable_analytics: false,
                ..Default::default()
            },
        );
        (GenerateSmartQrUseCase::new(Arc::new(service)), bus)
    }

    fn request(url: &str, user: Option<&str>) -> GenerateSmartQrRequest {
        GenerateSmartQrRequest {
            url: url.into(),
            user_id: user.map(String::from),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_url_is_a_validation_error() {
        let (uc, _) = use_case(MockTemplateRepository::new(), MockUsageStore::new());
        let resp = uc.execute(request("  ", Some("u1"))).await;
        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().code, codes::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn garbage_url_is_a_validation_error() {
        let (uc, _) = use_case(MockTemplateRepository::new(), MockUsageStore::new());
        let resp = uc.execute(request("not a url at all", Some("u1"))).await;
        assert_eq!(resp.error.unwrap().code, codes::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn missing_user_fails_before_any_quota_work() {
        let mut usage = MockUsageStore::new();
        usage.expect_today().times(0);
        usage.expect_record().times(0);
        let (uc, bus) = use_case(MockTemplateRepository::new(), usage);

        let resp = uc.execute(request("https://instagram.com/nasa", None)).await;
        assert_eq!(resp.error.unwrap().code, codes::AUTHENTICATION_REQUIRED);
        // Nothing reached the pipeline.
        assert!(bus.history(None).is_empty());
    }

    #[tokio::test]
    async fn happy_path_builds_the_full_envelope() {
        let mut repo = MockTemplateRepository::new();
        repo.expect_find_by_url()
            .returning(|_| Ok(Some(instagram())));
        let mut usage = MockUsageStore::new();
        usage.expect_today().returning(|_, limit| Ok(usage_with(0, limit)));
        usage.expect_record().returning(|_, entry, limit| {
            Ok(usage_with(0, limit).record_usage(entry).unwrap())
        });

        let (uc, _) = use_case(repo, usage);
        let resp = uc
            .execute(request("instagram.com/nasa", Some("u1")))
            .await;

        assert!(resp.success);
        let data = resp.data.unwrap();
        assert!(data.template_applied);
        assert_eq!(data.template_id.as_deref(), Some("instagram-v1"));
        assert_eq!(data.remaining, 2);
        assert_eq!(data.metadata.domain, "instagram.com");
        assert!(data.metadata.is_known_domain);
        assert_eq!(data.configuration["_smartQR"]["templateApplied"], true);
        assert!(data.configuration.get("_fullTemplate").is_none());
    }

    #[tokio::test]
    async fn unknown_domain_succeeds_without_template() {
        let mut repo = MockTemplateRepository::new();
        repo.expect_find_by_url().returning(|_| Ok(None));
        let mut usage = MockUsageStore::new();
        usage.expect_today().returning(|_, limit| Ok(usage_with(0, limit)));
        usage.expect_record().times(0);

        let (uc, _) = use_case(repo, usage);
        let resp = uc
            .execute(request("https://some-blog.example", Some("u1")))
            .await;

        assert!(resp.success);
        let data = resp.data.unwrap();
        assert!(!data.template_applied);
        assert!(!data.metadata.is_known_domain);
        assert_eq!(data.configuration["_smartQR"]["templateApplied"], false);
        assert_eq!(data.remaining, 3);
    }

    #[tokio::test]
    async fn quota_exhaustion_maps_to_limit_reached() {
        let mut repo = MockTemplateRepository::new();
        repo.expect_find_by_url().times(0);
        let mut usage = MockUsageStore::new();
        usage.expect_today().returning(|_, limit| Ok(usage_with(limit, limit)));

        let (uc, bus) = use_case(repo, usage);
        let resp = uc
            .execute(request("https://instagram.com/nasa", Some("u1")))
            .await;

        let err = resp.error.unwrap();
        assert_eq!(err.code, codes::LIMIT_REACHED);
        assert_eq!(err.details.unwrap()["remaining"], 0);
        assert_eq!(bus.history(Some(EventTopic::LimitReached)).len(), 1);
    }

    #[tokio::test]
    async fn admin_role_bypasses_the_quota() {
        let mut repo = MockTemplateRepository::new();
        repo.expect_find_by_url()
            .returning(|_| Ok(Some(instagram())));
        let mut usage = MockUsageStore::new();
        usage.expect_today().times(0);
        usage.expect_record().times(0);

        let (uc, _) = use_case(repo, usage);
        let mut req = request("https://instagram.com/nasa", Some("root"));
        req.user_role = Some("admin".into());
        let resp = uc.execute(req).await;

        assert!(resp.success);
        assert!(resp.data.unwrap().template_applied);
    }

    #[tokio::test]
    async fn full_template_is_embedded_on_request() {
        let mut repo = MockTemplateRepository::new();
        repo.expect_find_by_url()
            .returning(|_| Ok(Some(instagram())));
        let mut usage = MockUsageStore::new();
        usage.expect_today().returning(|_, limit| Ok(usage_with(0, limit)));
        usage.expect_record().returning(|_, entry, limit| {
            Ok(usage_with(0, limit).record_usage(entry).unwrap())
        });

        let (uc, _) = use_case(repo, usage);
        let mut req = request("https://instagram.com/nasa", Some("u1"));
        req.options.return_full_template = true;
        let resp = uc.execute(req).await;

        let data = resp.data.unwrap();
        assert_eq!(
            data.configuration["_fullTemplate"]["id"],
            "instagram-v1"
        );
    }

    #[tokio::test]
    async fn slow_generation_times_out_with_internal_error() {
        let mut repo = MockTemplateRepository::new();
        repo.expect_find_by_url()
            .returning(|_| Ok(Some(instagram())));
        let mut usage = MockUsageStore::new();
        usage.expect_today().returning(|_, limit| Ok(usage_with(0, limit)));
        // The deadline fires during the analysis pause, before billing.
        usage.expect_record().times(0);

        let service = TemplateService::new(
            Arc::new(repo) as Arc<dyn TemplateRepository>,
            Arc::new(usage) as Arc<dyn UsageStore>,
            Arc::new(EventBus::new()),
            TemplateServiceConfig {
                enable_analytics: false,
                analysis_delay: Duration::from_millis(200),
                ..Default::default()
            },
        );
        let uc = GenerateSmartQrUseCase::new(Arc::new(service))
            .with_timeout(Duration::from_millis(20));

        let resp = uc
            .execute(request("https://instagram.com/nasa", Some("u1")))
            .await;

        let err = resp.error.unwrap();
        assert_eq!(err.code, codes::INTERNAL_ERROR);
        assert_eq!(err.message, "Failed to generate Smart QR");
        let reason = err.details.unwrap()["reason"].as_str().unwrap().to_string();
        assert!(reason.contains("timed out"));
    }

    #[tokio::test]
    async fn repository_failure_maps_to_internal_error() {
        let mut repo = MockTemplateRepository::new();
        repo.expect_find_by_url().returning(|_| {
            Err(SmartQrError::Internal {
                message: "boom".into(),
            })
        });
        let mut usage = MockUsageStore::new();
        usage.expect_today().returning(|_, limit| Ok(usage_with(0, limit)));

        let (uc, _) = use_case(repo, usage);
        let resp = uc
            .execute(request("https://instagram.com/nasa", Some("u1")))
            .await;

        let err = resp.error.unwrap();
        assert_eq!(err.code, codes::INTERNAL_ERROR);
        assert_eq!(err.message, "Failed to generate Smart QR");
    }
}
