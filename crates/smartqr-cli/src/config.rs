//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value. The
//! CLI layer owns config; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. Environment variables (`SMARTQR_LIMITS__DAILY=5` etc.)
//! 3. Config file (`--config`, or the platform config dir)
//! 4. Built-in defaults (always present)

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daily quota settings.
    pub limits: LimitsConfig,
    /// Generation pipeline settings.
    pub service: ServiceConfig,
    /// Output settings.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Generations per user per UTC day.
    pub daily: u32,
    /// Allowance for premium accounts.
    pub premium_daily: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Artificial analysis pause before applying a template. Zero for the
    /// CLI; interactive frontends may want a visible analysis phase.
    pub analysis_delay_ms: u64,
    /// Ceiling for one generation, seconds.
    pub timeout_secs: u64,
    pub enable_analytics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig {
                daily: 3,
                premium_daily: 10,
            },
            service: ServiceConfig {
                analysis_delay_ms: 0,
                timeout_secs: 30,
                enable_analytics: true,
            },
            output: OutputConfig {
                no_color: false,
                format: "human".into(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then file, then `SMARTQR_*` env vars.
    ///
    /// A file passed via `--config` must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("limits.daily", defaults.limits.daily)?
            .set_default("limits.premium_daily", defaults.limits.premium_daily)?
            .set_default("service.analysis_delay_ms", defaults.service.analysis_delay_ms)?
            .set_default("service.timeout_secs", defaults.service.timeout_secs)?
            .set_default("service.enable_analytics", defaults.service.enable_analytics)?
            .set_default("output.no_color", defaults.output.no_color)?
            .set_default("output.format", defaults.output.format.clone())?;

        builder = match config_file {
            Some(path) => builder.add_source(File::from(path.clone()).required(true)),
            None => builder.add_source(File::from(Self::config_path()).required(false)),
        };

        // SMARTQR_LIMITS__DAILY=5 → limits.daily. The prefix is joined with
        // a single underscore; `__` only separates nested keys.
        builder = builder.add_source(
            Environment::with_prefix("SMARTQR")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = builder.build()?.try_deserialize::<Self>()?;
        if config.limits.daily == 0 {
            anyhow::bail!("limits.daily must be at least 1");
        }
        Ok(config)
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.smartqr.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("com", "smartqr", "smartqr")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".smartqr.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_daily_limit_is_three() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.limits.daily, 3);
        assert_eq!(cfg.limits.premium_daily, 10);
    }

    #[test]
    fn default_delay_is_zero() {
        assert_eq!(AppConfig::default().service.analysis_delay_ms, 0);
    }

    #[test]
    fn config_path_is_non_empty() {
        assert!(!AppConfig::config_path().as_os_str().is_empty());
    }
}
