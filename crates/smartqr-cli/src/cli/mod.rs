//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums. No business logic lives here.

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "smartqr",
    bin_name = "smartqr",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{25a3} Smart QR template resolution with daily quotas",
    long_about = "Smart QR resolves the best visual template for a destination \
                  URL and applies it, billed against a per-user daily quota.",
    after_help = "EXAMPLES:\n\
        \x20 smartqr generate https://instagram.com/nasa --user alice\n\
        \x20 smartqr generate youtu.be/dQw4w9WgXcQ --user bob --role premium --json\n\
        \x20 smartqr templates https://open.spotify.com/track/x\n\
        \x20 smartqr stats --user alice --days 30",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a smart QR configuration for a URL.
    #[command(
        visible_alias = "g",
        about = "Generate a smart QR configuration",
        after_help = "EXAMPLES:\n\
            \x20 smartqr generate https://instagram.com/nasa --user alice\n\
            \x20 smartqr generate x.com/nasa --user bob --template twitter-v1\n\
            \x20 smartqr generate wa.me/123 --user ops --role admin --full-template --json"
    )]
    Generate(GenerateArgs),

    /// List templates, optionally ranked against a URL.
    #[command(
        visible_alias = "ls",
        about = "List available templates",
        after_help = "EXAMPLES:\n\
            \x20 smartqr templates\n\
            \x20 smartqr templates https://www.youtube.com/watch?v=x\n\
            \x20 smartqr templates --tag social"
    )]
    Templates(TemplatesArgs),

    /// Show usage statistics.
    #[command(
        about = "Show usage or catalogue statistics",
        after_help = "EXAMPLES:\n\
            \x20 smartqr stats --user alice\n\
            \x20 smartqr stats --user alice --days 30\n\
            \x20 smartqr stats            # catalogue-wide statistics"
    )]
    Stats(StatsArgs),
}

// ── generate ──────────────────────────────────────────────────────────────────

/// Arguments for `smartqr generate`.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Destination URL. A bare domain is accepted (`https://` is assumed).
    #[arg(value_name = "URL", help = "Destination URL")]
    pub url: String,

    /// User the generation is billed to.
    #[arg(
        short = 'u',
        long = "user",
        value_name = "ID",
        help = "User id (generation is billed to this user)"
    )]
    pub user: Option<String>,

    /// Account role.
    #[arg(
        short = 'r',
        long = "role",
        value_enum,
        value_name = "ROLE",
        help = "Account role (premium raises the limit, admin bypasses it)"
    )]
    pub role: Option<UserRole>,

    /// Prefer a specific template; ignored when it does not match the URL.
    #[arg(
        short = 't',
        long = "template",
        value_name = "ID",
        help = "Preferred template id"
    )]
    pub template: Option<String>,

    /// Embed the full template in the configuration output.
    #[arg(long = "full-template", help = "Embed the full template (debugging)")]
    pub full_template: bool,

    /// Print the raw response envelope as JSON.
    #[arg(long = "json", help = "Print the response envelope as JSON")]
    pub json: bool,
}

/// Account roles the service distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UserRole {
    Free,
    Premium,
    Admin,
}

impl UserRole {
    /// Wire name passed to the use case.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Admin => "admin",
        }
    }
}

// ── templates ─────────────────────────────────────────────────────────────────

/// Arguments for `smartqr templates`.
#[derive(Debug, Args)]
pub struct TemplatesArgs {
    /// Rank templates against this URL instead of listing everything.
    #[arg(value_name = "URL", help = "URL to match templates against")]
    pub url: Option<String>,

    /// Only show templates carrying this tag.
    #[arg(long = "tag", value_name = "TAG", help = "Filter by tag")]
    pub tag: Option<String>,

    /// Print as JSON.
    #[arg(long = "json", help = "Print as JSON")]
    pub json: bool,
}

// ── stats ─────────────────────────────────────────────────────────────────────

/// Arguments for `smartqr stats`.
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Show this user's usage; omit for catalogue-wide statistics.
    #[arg(short = 'u', long = "user", value_name = "ID", help = "User id")]
    pub user: Option<String>,

    /// Trailing window in days.
    #[arg(
        short = 'd',
        long = "days",
        value_name = "N",
        default_value_t = 7,
        help = "Trailing window in days"
    )]
    pub days: u32,

    /// Print as JSON.
    #[arg(long = "json", help = "Print as JSON")]
    pub json: bool,
}
