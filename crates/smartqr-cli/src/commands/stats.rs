//! Implementation of the `smartqr stats` command.

use serde_json::json;

use crate::{
    cli::{OutputFormat, StatsArgs, global::GlobalArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub async fn execute(
    args: StatsArgs,
    _global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let service = super::build_service(&config)?;
    let json_mode = args.json || output.format() == OutputFormat::Json;

    match &args.user {
        Some(user) => {
            let stats = service.user_usage_stats(user, args.days).await?;
            let remaining = service.remaining_today(user, false).await?;

            if json_mode {
                let json = json!({
                    "userId": user,
                    "days": args.days,
                    "total": stats.total,
                    "averagePerDay": stats.average_per_day,
                    "remainingToday": remaining,
                    "daily": stats.daily.iter().map(|d| json!({
                        "date": d.date.to_string(),
                        "count": d.count,
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
                return Ok(());
            }

            output.header(&format!("Usage for {user} (last {} days):", args.days))?;
            for day in &stats.daily {
                output.print(&format!("  {}  {}", day.date, bar(day.count)))?;
            }
            output.print("")?;
            output.key_value("Total", &stats.total.to_string())?;
            output.key_value("Daily average", &format!("{:.1}", stats.average_per_day))?;
            output.key_value("Remaining", &remaining.to_string())?;
        }

        None => {
            let stats = service.statistics().await?;

            if json_mode {
                let json = json!({
                    "total": stats.total,
                    "active": stats.active,
                    "totalUsage": stats.total_usage,
                    "averageUsagePerTemplate": stats.average_usage_per_template,
                    "mostUsedTemplateId": stats.most_used_template_id,
                    "templatesByTag": stats.templates_by_tag,
                });
                println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
                return Ok(());
            }

            output.header("Template catalogue:")?;
            output.key_value("Templates", &stats.total.to_string())?;
            output.key_value("Active", &stats.active.to_string())?;
            output.key_value("Total usage", &stats.total_usage.to_string())?;
            output.key_value(
                "Avg usage",
                &format!("{:.1}", stats.average_usage_per_template),
            )?;
            if let Some(id) = &stats.most_used_template_id {
                output.key_value("Most used", id)?;
            }

            if !stats.templates_by_tag.is_empty() {
                output.print("")?;
                output.print("By tag:")?;
                let mut tags: Vec<_> = stats.templates_by_tag.iter().collect();
                tags.sort_by(|a, b| a.0.cmp(b.0));
                for (tag, count) in tags {
                    output.key_value(tag, &count.to_string())?;
                }
            }
        }
    }

    Ok(())
}

/// Tiny ASCII bar for the daily breakdown.
fn bar(count: u32) -> String {
    let filled = "#".repeat(count as usize);
    format!("{filled} ({count})")
}
