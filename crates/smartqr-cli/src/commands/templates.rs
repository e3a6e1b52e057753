//! Implementation of the `smartqr templates` command.

use serde_json::json;
use smartqr_core::application::ports::output::{
    SortDirection, SortField, TemplateFilter, TemplateQuery, TemplateRepository, TemplateSort,
};
use smartqr_core::application::services::TemplateService;
use smartqr_adapters::InMemoryTemplateRepository;

use crate::{
    cli::{OutputFormat, TemplatesArgs, global::GlobalArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub async fn execute(
    args: TemplatesArgs,
    _global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let json_mode = args.json || output.format() == OutputFormat::Json;

    match &args.url {
        Some(url) => ranked(url, &config, json_mode, &output).await,
        None => catalogue(args.tag.as_deref(), json_mode, &output).await,
    }
}

/// Rank the catalogue against a URL: only matching templates, best first.
async fn ranked(
    url: &str,
    config: &AppConfig,
    json_mode: bool,
    output: &OutputManager,
) -> CliResult<()> {
    let service = super::build_service(config)?;
    let available = service.available_templates(url).await?;

    if json_mode {
        let json = json!({
            "url": url,
            "recommendedId": available.recommended_id,
            "templates": available.templates.iter().map(|t| json!({
                "id": t.id,
                "name": t.name,
                "preview": t.preview,
                "tags": t.tags,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return Ok(());
    }

    if available.templates.is_empty() {
        output.warning(&format!("No templates match {url}"))?;
        return Ok(());
    }

    output.header(&format!("Templates matching {url}:"))?;
    for listing in &available.templates {
        let marker = if available.recommended_id.as_deref() == Some(listing.id.as_str()) {
            " (recommended)"
        } else {
            ""
        };
        output.print(&format!(
            "  {:<16} {} [{}]{}",
            listing.id,
            listing.preview,
            listing.tags.join(", "),
            marker
        ))?;
    }

    Ok(())
}

/// Full catalogue listing, highest priority first.
async fn catalogue(tag: Option<&str>, json_mode: bool, output: &OutputManager) -> CliResult<()> {
    let repo = InMemoryTemplateRepository::with_builtin()?;

    let query = TemplateQuery {
        filter: tag.map(|t| TemplateFilter {
            tags: Some(vec![t.to_string()]),
            ..TemplateFilter::default()
        }),
        sort: Some(TemplateSort {
            field: SortField::Priority,
            direction: SortDirection::Desc,
        }),
        pagination: None,
    };
    let page = repo.find_all(query).await?;

    if json_mode {
        let json = json!({
            "total": page.total,
            "templates": page.data.iter().map(|t| json!({
                "id": t.id,
                "name": t.name,
                "priority": t.metadata.priority,
                "domains": t.metadata.domains,
                "tags": t.metadata.tags,
                "usage": t.metadata.analytics.usage,
                "preview": TemplateService::preview_description(t),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return Ok(());
    }

    if page.data.is_empty() {
        output.warning("No templates found")?;
        return Ok(());
    }

    output.header("Available templates:")?;
    for template in &page.data {
        output.print(&format!(
            "  {:<16} {:<12} priority {:<4} {}",
            template.id,
            template.name,
            template.metadata.priority,
            template.metadata.domains.join(", ")
        ))?;
    }
    output.print("")?;
    output.print(&format!("{} templates total", page.total))?;

    Ok(())
}
