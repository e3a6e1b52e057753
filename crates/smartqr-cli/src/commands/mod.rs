//! Command handlers.
//!
//! Each submodule exposes one `execute` function. Wiring of the service
//! graph is shared here so every command sees the same configuration.

pub mod generate;
pub mod stats;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use smartqr_adapters::{InMemoryTemplateRepository, InMemoryUsageStore};
use smartqr_core::application::{TemplateService, TemplateServiceConfig};
use smartqr_core::events::EventBus;

use crate::config::AppConfig;
use crate::error::CliResult;

/// Wire the in-process service graph from configuration.
///
/// Each invocation starts from the built-in catalogue with an empty usage
/// ledger, so quotas reset per process. A persistent backend would slot in
/// here without the commands changing.
pub(crate) fn build_service(config: &AppConfig) -> CliResult<Arc<TemplateService>> {
    let repo = Arc::new(InMemoryTemplateRepository::with_builtin()?);
    let usage = Arc::new(InMemoryUsageStore::new());
    let events = Arc::new(EventBus::new());

    let service_config = TemplateServiceConfig {
        daily_limit: config.limits.daily,
        premium_daily_limit: config.limits.premium_daily,
        analysis_delay: Duration::from_millis(config.service.analysis_delay_ms),
        enable_analytics: config.service.enable_analytics,
    };

    Ok(Arc::new(TemplateService::new(
        repo,
        usage,
        events,
        service_config,
    )))
}
