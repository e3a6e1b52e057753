//! Template Service - smart template resolution and usage-gated application.
//!
//! Orchestrates the full pipeline: quota gate, URL normalization, template
//! resolution, usage recording, analytics, and event emission. Business
//! rules (matching, ranking, quota math) live in the domain entities; this
//! service only sequences them against the ports.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::application::ports::output::{
    AnalyticsUpdate, RepositoryStatistics, SortDirection, SortField, TemplateFilter,
    TemplateQuery, TemplateRepository, TemplateSort, UsageStore,
};
use crate::domain::{DEFAULT_DAILY_LIMIT, Template, Usage, UsageEntry, UserUsageStats};
use crate::error::{SmartQrError, SmartQrResult};
use crate::events::{
    AnalyticsTrackPayload, EventBus, EventTopic, FailedPayload, GeneratedPayload,
    LimitReachedPayload, RequestedPayload, SmartQrEvent, TemplateNotFoundPayload,
};

/// Tunables for the service. Defaults suit interactive use.
#[derive(Debug, Clone)]
pub struct TemplateServiceConfig {
    pub daily_limit: u32,
    pub premium_daily_limit: u32,
    /// Artificial pause before applying a matched template, so the caller's
    /// UI can show an analysis phase. Zero disables it.
    pub analysis_delay: Duration,
    pub enable_analytics: bool,
}

impl Default for TemplateServiceConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            premium_daily_limit: 10,
            analysis_delay: Duration::ZERO,
            enable_analytics: true,
        }
    }
}

/// Per-call options for [`TemplateService::apply_smart_template`].
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub is_premium: bool,
    /// Admin bypass: resolution still happens, nothing is billed.
    pub skip_limit_check: bool,
    pub preferred_template_id: Option<String>,
}

/// Outcome of a successful apply call. `template: None` means the URL is
/// valid but unknown; that is a success, not an error.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub template: Option<Template>,
    /// Enriched configuration (`_metadata` block included) when a template
    /// was applied.
    pub config: Option<Value>,
    pub remaining: u32,
    pub message: String,
    pub processing_time_ms: u64,
}

/// Listing row for template discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateListing {
    pub id: String,
    pub name: String,
    pub preview: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailableTemplates {
    pub templates: Vec<TemplateListing>,
    /// Highest-scoring match, ties broken by ascending id.
    pub recommended_id: Option<String>,
}

pub struct TemplateService {
    repo: Arc<dyn TemplateRepository>,
    usage: Arc<dyn UsageStore>,
    events: Arc<EventBus>,
    config: TemplateServiceConfig,
}

impl TemplateService {
    pub fn new(
        repo: Arc<dyn TemplateRepository>,
        usage: Arc<dyn UsageStore>,
        events: Arc<EventBus>,
        config: TemplateServiceConfig,
    ) -> Self {
        let service = Self {
            repo,
            usage,
            events,
            config,
        };
        if service.config.enable_analytics {
            service.attach_analytics_logging();
        }
        service
    }

    /// Debug-level visibility into the pipeline without a real analytics
    /// backend attached.
    fn attach_analytics_logging(&self) {
        self.events.on(EventTopic::Generated, |event| async move {
            if let SmartQrEvent::Generated(p) = event {
                debug!(template_id = %p.template_id, url = %p.url, "smart QR generated");
            }
        });
        self.events.on(EventTopic::TemplateNotFound, |event| async move {
            if let SmartQrEvent::TemplateNotFound(p) = event {
                debug!(domain = %p.domain, "no template for domain");
            }
        });
    }

    // ========================================================================
    // Generation pipeline
    // ========================================================================

    /// Apply the best-matching template to a URL, billed against the user's
    /// daily quota.
    ///
    /// Quota exhaustion surfaces as `DomainError::QuotaExceeded`; a valid
    /// URL with no matching template is a *success* with `template: None`
    /// and does not consume quota.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn apply_smart_template(
        &self,
        url: &str,
        user_id: Option<&str>,
        opts: ApplyOptions,
    ) -> SmartQrResult<ApplyOutcome> {
        let result = self.apply_inner(url, user_id, &opts).await;
        if let Err(err) = &result {
            if err.is_quota_exhausted() {
                // Reported on the limit.reached channel at detection time.
                return result;
            }
            self.events.emit(SmartQrEvent::Failed(FailedPayload {
                error: err.to_string(),
                user_id: user_id.map(String::from),
                url: url.to_string(),
                reason: err.to_string(),
                timestamp: Utc::now(),
            }));
        }
        result
    }

    async fn apply_inner(
        &self,
        url: &str,
        user_id: Option<&str>,
        opts: &ApplyOptions,
    ) -> SmartQrResult<ApplyOutcome> {
        let started = Instant::now();
        let limit = self.effective_limit(opts.is_premium);

        // 1. Quota gate. Resolution is still free; only application bills.
        if let Some(user) = user_id {
            if !opts.skip_limit_check {
                let today = self.usage.today(user, limit).await?;
                if !today.can_generate() {
                    self.emit_limit_reached(user, &today);
                    return Err(SmartQrError::Domain(
                        crate::domain::DomainError::QuotaExceeded { remaining: 0 },
                    ));
                }
            }
        }

        // 2. Normalize before any matching.
        let normalized = Self::normalize_url(url);

        // 3. Resolve: explicit preference first, re-validated against the
        //    URL; fall through to ranked lookup.
        let mut template: Option<Template> = None;
        if let Some(preferred) = &opts.preferred_template_id {
            template = self
                .repo
                .find_by_id(preferred)
                .await?
                .filter(|t| t.matches(&normalized));
            if template.is_none() {
                debug!(preferred = %preferred, "preferred template rejected, falling back");
            }
        }
        if template.is_none() {
            template = self
                .repo
                .find_by_url(&normalized)
                .await?
                // The repository already checks this; re-validate anyway so
                // a buggy adapter cannot hand out a non-matching config.
                .filter(|t| t.matches(&normalized));
        }

        // 4. Request event, fire-and-forget.
        self.events.emit(SmartQrEvent::Requested(RequestedPayload {
            url: normalized.clone(),
            user_id: user_id.map(String::from),
            template_found: template.is_some(),
            timestamp: Utc::now(),
        }));

        // 5. No match: non-billable success.
        let Some(template) = template else {
            self.events
                .emit(SmartQrEvent::TemplateNotFound(TemplateNotFoundPayload {
                    url: normalized.clone(),
                    domain: Self::extract_domain(&normalized),
                    user_id: user_id.map(String::from),
                    timestamp: Utc::now(),
                }));

            let remaining = match user_id {
                Some(user) if !opts.skip_limit_check => {
                    self.usage.today(user, limit).await?.remaining_today()
                }
                // Skipped or anonymous: nothing billed, full allowance.
                _ => limit,
            };
            return Ok(ApplyOutcome {
                template: None,
                config: None,
                remaining,
                message: "No smart template available for this URL".into(),
                processing_time_ms: started.elapsed().as_millis() as u64,
            });
        };

        // 6. Matched: optional analysis pause, then bill and persist.
        if !self.config.analysis_delay.is_zero() {
            tokio::time::sleep(self.config.analysis_delay).await;
        }

        let config = self.enrich_config(&template, user_id);

        let remaining = match user_id {
            Some(user) if !opts.skip_limit_check => {
                let entry = UsageEntry::new(Some(template.id.clone()), normalized.clone())
                    .processing_time(started.elapsed().as_millis() as u64);
                // Atomic check-and-increment; a concurrent racer may still
                // lose here even after passing the gate above.
                match self.usage.record(user, entry, limit).await {
                    Ok(ledger) => ledger.remaining_today(),
                    Err(err) if err.is_quota_exhausted() => {
                        let today = self.usage.today(user, limit).await?;
                        self.emit_limit_reached(user, &today);
                        return Err(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            // Skipped or anonymous: nothing billed, full allowance.
            _ => limit,
        };

        if self.config.enable_analytics {
            if let Err(err) = self
                .repo
                .update_analytics(
                    &template.id,
                    AnalyticsUpdate {
                        increment_usage: true,
                        conversion_rate: None,
                        last_used: Some(Utc::now()),
                    },
                )
                .await
            {
                // Usage is already billed; analytics drift is tolerable.
                warn!(template_id = %template.id, error = %err, "analytics update failed");
            }
        }

        let processing_time_ms = started.elapsed().as_millis() as u64;
        self.events.emit(SmartQrEvent::Generated(GeneratedPayload {
            template_id: template.id.clone(),
            user_id: user_id.map(String::from),
            url: normalized,
            processing_time_ms,
            timestamp: Utc::now(),
        }));

        info!(template_id = %template.id, "template applied");
        let message = format!("Applied {} template", template.name);
        Ok(ApplyOutcome {
            config: Some(config),
            template: Some(template),
            remaining,
            message,
            processing_time_ms,
        })
    }

    fn emit_limit_reached(&self, user: &str, today: &Usage) {
        self.events
            .emit(SmartQrEvent::LimitReached(LimitReachedPayload {
                user_id: user.to_string(),
                current_count: today.count(),
                limit: today.daily_limit(),
                timestamp: Utc::now(),
            }));
    }

    // ========================================================================
    // Discovery & reporting
    // ========================================================================

    /// Active templates matching a URL, best first, plus the recommendation.
    pub async fn available_templates(&self, url: &str) -> SmartQrResult<AvailableTemplates> {
        let normalized = Self::normalize_url(url);
        let all = self
            .repo
            .find_all(TemplateQuery {
                filter: Some(TemplateFilter {
                    is_active: Some(true),
                    ..Default::default()
                }),
                sort: Some(TemplateSort {
                    field: SortField::Priority,
                    direction: SortDirection::Desc,
                }),
                pagination: None,
            })
            .await?;

        let mut matching: Vec<Template> = all
            .data
            .into_iter()
            .filter(|t| t.matches(&normalized))
            .collect();
        matching.sort_by(|a, b| {
            b.priority_score()
                .partial_cmp(&a.priority_score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(AvailableTemplates {
            recommended_id: matching.first().map(|t| t.id.clone()),
            templates: matching
                .iter()
                .map(|t| TemplateListing {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    preview: Self::preview_description(t),
                    tags: t.metadata.tags.clone(),
                })
                .collect(),
        })
    }

    pub async fn template(&self, id: &str) -> SmartQrResult<Option<Template>> {
        self.repo.find_by_id(id).await
    }

    pub async fn popular_templates(&self, limit: usize) -> SmartQrResult<Vec<Template>> {
        self.repo.find_most_used(limit).await
    }

    pub async fn statistics(&self) -> SmartQrResult<RepositoryStatistics> {
        self.repo.get_statistics().await
    }

    /// Trailing usage aggregates for a user.
    pub async fn user_usage_stats(
        &self,
        user_id: &str,
        days: u32,
    ) -> SmartQrResult<UserUsageStats> {
        self.usage.history(user_id, days).await
    }

    pub async fn remaining_today(&self, user_id: &str, is_premium: bool) -> SmartQrResult<u32> {
        let limit = self.effective_limit(is_premium);
        Ok(self.usage.today(user_id, limit).await?.remaining_today())
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Insert or replace a template.
    pub async fn save_template(&self, template: Template) -> SmartQrResult<()> {
        template.validate()?;
        let is_new = !self.repo.exists(&template.id).await?;
        let id = template.id.clone();
        self.repo.save(template).await?;

        self.events
            .emit(SmartQrEvent::AnalyticsTrack(AnalyticsTrackPayload {
                event: "template.saved".into(),
                properties: json!({ "templateId": id, "isNew": is_new }),
                user_id: None,
                timestamp: Utc::now(),
            }));
        Ok(())
    }

    pub async fn delete_template(&self, id: &str) -> SmartQrResult<()> {
        self.repo.delete(id).await?;

        self.events
            .emit(SmartQrEvent::AnalyticsTrack(AnalyticsTrackPayload {
                event: "template.deleted".into(),
                properties: json!({ "templateId": id }),
                user_id: None,
                timestamp: Utc::now(),
            }));
        Ok(())
    }

    /// Wipe today's ledger for a user, restoring the full allowance.
    /// Support operation; quota resets on its own at midnight UTC.
    pub async fn reset_user_usage(&self, user_id: &str) -> SmartQrResult<()> {
        self.usage.reset(user_id).await?;

        self.events
            .emit(SmartQrEvent::AnalyticsTrack(AnalyticsTrackPayload {
                event: "usage.reset".into(),
                properties: json!({ "userId": user_id }),
                user_id: Some(user_id.to_string()),
                timestamp: Utc::now(),
            }));
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn effective_limit(&self, is_premium: bool) -> u32 {
        if is_premium {
            self.config.premium_daily_limit
        } else {
            self.config.daily_limit
        }
    }

    /// Default the scheme to https and strip one trailing slash.
    pub fn normalize_url(url: &str) -> String {
        let trimmed = url.trim();
        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        with_scheme.trim_end_matches('/').to_string()
    }

    /// Hostname of a URL; degrades to a string split when parsing fails.
    pub fn extract_domain(url: &str) -> String {
        match url::Url::parse(url) {
            Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
            Err(_) => {
                let stripped = url
                    .trim_start_matches("https://")
                    .trim_start_matches("http://");
                stripped.split('/').next().unwrap_or_default().to_string()
            }
        }
    }

    /// Human-readable feature summary for listing output.
    pub fn preview_description(template: &Template) -> String {
        let mut features = Vec::new();
        if template.config.gradient.is_some() {
            features.push("Custom gradient");
        }
        if template.config.logo.is_some() {
            features.push("Brand logo");
        }
        if !template.config.effects.is_empty() {
            features.push("Visual effects");
        }
        if features.is_empty() {
            "Standard design".to_string()
        } else {
            features.join(" + ")
        }
    }

    /// Serialize the user's variant with a `_metadata` block attached.
    fn enrich_config(&self, template: &Template, user_id: Option<&str>) -> Value {
        let variant = template.variant_for(user_id, None);
        let mut value = serde_json::to_value(&variant).unwrap_or_else(|_| json!({}));
        if let Value::Object(map) = &mut value {
            map.insert(
                "_metadata".into(),
                json!({
                    "templateId": template.id,
                    "templateName": template.name,
                    "templateVersion": template.version,
                    "appliedAt": Utc::now().to_rfc3339(),
                }),
            );
        }
        value
    }
}
