//! Implementation of the `smartqr generate` command.

use std::time::Duration;

use smartqr_core::application::usecases::generate_smart_qr::{
    GenerateOptions, GenerateSmartQrRequest, GenerateSmartQrResponse, GenerateSmartQrUseCase, codes,
};

use crate::{
    cli::{GenerateArgs, global::GlobalArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

pub async fn execute(
    args: GenerateArgs,
    _global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let service = super::build_service(&config)?;
    let use_case = GenerateSmartQrUseCase::new(service)
        .with_timeout(Duration::from_secs(config.service.timeout_secs));

    let request = GenerateSmartQrRequest {
        url: args.url.clone(),
        user_id: args.user,
        user_role: args.role.map(|r| r.as_str().to_string()),
        preferred_template_id: args.template,
        options: GenerateOptions {
            return_full_template: args.full_template,
        },
    };

    let response = use_case.execute(request).await;

    if args.json || output.format() == crate::cli::OutputFormat::Json {
        // JSON bypasses OutputManager: it must stay parseable in pipes.
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| CliError::Generation {
                code: codes::INTERNAL_ERROR.into(),
                message: format!("Failed to serialise response: {e}"),
            })?;
        println!("{json}");
        return if response.success {
            Ok(())
        } else {
            Err(envelope_error(&response))
        };
    }

    render_human(&args.url, response, &output)
}

/// Human-readable rendering of the response envelope.
fn render_human(
    url: &str,
    response: GenerateSmartQrResponse,
    output: &OutputManager,
) -> CliResult<()> {
    if !response.success {
        return Err(envelope_error(&response));
    }

    let Some(data) = response.data else {
        return Err(CliError::Generation {
            code: codes::INTERNAL_ERROR.into(),
            message: "Response carried neither data nor error".into(),
        });
    };

    if data.template_applied {
        output.success(&format!(
            "Applied {} template",
            data.template_name.as_deref().unwrap_or("unknown")
        ))?;
        if let Some(id) = &data.template_id {
            output.key_value("Template", id)?;
        }
    } else {
        output.warning(&format!(
            "No template matched {url}; default styling applies"
        ))?;
    }

    output.key_value("Domain", &data.metadata.domain)?;
    output.key_value("Remaining", &data.remaining.to_string())?;
    output.key_value(
        "Analysis",
        &format!("{} ms", data.metadata.analysis_time),
    )?;

    output.print("")?;
    output.print("Configuration:")?;
    let pretty = serde_json::to_string_pretty(&data.configuration)
        .unwrap_or_else(|_| data.configuration.to_string());
    output.print(&pretty)?;

    Ok(())
}

/// Map the structured error envelope to a typed `CliError`.
fn envelope_error(response: &GenerateSmartQrResponse) -> CliError {
    let Some(envelope) = &response.error else {
        return CliError::Generation {
            code: codes::INTERNAL_ERROR.into(),
            message: "Generation failed without an error envelope".into(),
        };
    };

    match envelope.code {
        codes::LIMIT_REACHED => {
            let remaining = envelope
                .details
                .as_ref()
                .and_then(|d| d.get("remaining"))
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32;
            CliError::LimitReached { remaining }
        }
        codes::VALIDATION_ERROR | codes::AUTHENTICATION_REQUIRED => CliError::InvalidInput {
            message: envelope.message.clone(),
        },
        _ => CliError::Generation {
            code: envelope.code.into(),
            message: envelope.message.clone(),
        },
    }
}
