//! Built-in brand templates.
//!
//! The catalogue that ships with the service: well-known destinations with
//! hand-tuned visual configurations. [`all`] is the single entry point;
//! repositories seed themselves from it.
//!
//! Adding a brand means adding one function here and listing it in [`all`].
//! Priorities are relative ranks within the catalogue, not absolutes: more
//! popular destinations sit higher so that overlap (e.g. a generic "social"
//! template) resolves predictably.

use smartqr_core::domain::{
    DomainError, FrameConfig, GradientConfig, LogoConfig, Template, TemplateConfig,
};

/// Every built-in template, highest priority first.
pub fn all() -> Result<Vec<Template>, DomainError> {
    Ok(vec![
        instagram()?,
        youtube()?,
        facebook()?,
        linkedin()?,
        twitter()?,
        whatsapp()?,
        tiktok()?,
        spotify()?,
    ])
}

fn gradient(kind: &str, colors: &[&str], angle: f64) -> GradientConfig {
    GradientConfig {
        kind: kind.into(),
        colors: colors.iter().map(|c| c.to_string()).collect(),
        angle: Some(angle),
    }
}

fn logo(url: &str, size: f64, padding: f64, shape: &str) -> LogoConfig {
    LogoConfig {
        url: url.into(),
        size,
        padding: Some(padding),
        shape: Some(shape.into()),
    }
}

fn instagram() -> Result<Template, DomainError> {
    Template::builder("instagram-v1", "Instagram Style")
        .domains(["instagram.com", "www.instagram.com"])
        .priority(100)
        .tags(["social", "photo", "popular"])
        .config(TemplateConfig {
            gradient: Some(gradient("radial", &["#833AB4", "#FD1D1D"], 45.0)),
            eye_shape: Some("leaf".into()),
            data_pattern: Some("dots".into()),
            logo: Some(logo("/logos/instagram.svg", 0.2, 8.0, "rounded_square")),
            ..Default::default()
        })
        .build()
}

fn youtube() -> Result<Template, DomainError> {
    Template::builder("youtube-v1", "YouTube Style")
        .domains(["youtube.com", "www.youtube.com", "youtu.be", "m.youtube.com"])
        .priority(95)
        .tags(["social", "video", "popular"])
        .config(TemplateConfig {
            gradient: Some(gradient("linear", &["#FF0000", "#CC0000"], 90.0)),
            eye_shape: Some("square".into()),
            data_pattern: Some("square".into()),
            logo: Some(logo("/logos/youtube.svg", 0.25, 8.0, "square")),
            frame: Some(FrameConfig {
                kind: "simple".into(),
                text: Some("Watch on YouTube".into()),
            }),
            ..Default::default()
        })
        .build()
}

fn facebook() -> Result<Template, DomainError> {
    Template::builder("facebook-v1", "Facebook Classic")
        .domains(["facebook.com", "www.facebook.com", "fb.com", "m.facebook.com"])
        .priority(92)
        .tags(["social", "classic"])
        .config(TemplateConfig {
            gradient: Some(gradient("linear", &["#1877F2", "#0C63D4"], 90.0)),
            eye_shape: Some("rounded_square".into()),
            data_pattern: Some("square".into()),
            logo: Some(logo("/logos/facebook.svg", 0.3, 10.0, "rounded_square")),
            ..Default::default()
        })
        .build()
}

fn linkedin() -> Result<Template, DomainError> {
    Template::builder("linkedin-v1", "LinkedIn Professional")
        .domains(["linkedin.com", "www.linkedin.com"])
        .priority(90)
        .tags(["professional", "business", "social"])
        .config(TemplateConfig {
            gradient: Some(gradient("linear", &["#0077B5", "#004471"], 135.0)),
            eye_shape: Some("square".into()),
            data_pattern: Some("square".into()),
            logo: Some(logo("/logos/linkedin.svg", 0.28, 12.0, "rounded_square")),
            effects: vec!["professional-border".into()],
            ..Default::default()
        })
        .build()
}

fn twitter() -> Result<Template, DomainError> {
    Template::builder("twitter-v1", "Twitter/X Minimal")
        .domains(["twitter.com", "x.com", "www.twitter.com", "www.x.com"])
        .priority(88)
        .tags(["social", "news", "minimal"])
        .config(TemplateConfig {
            gradient: Some(gradient("linear", &["#1DA1F2", "#14171A"], 180.0)),
            eye_shape: Some("circle".into()),
            data_pattern: Some("dots".into()),
            logo: Some(logo("/logos/twitter.svg", 0.25, 8.0, "circle")),
            ..Default::default()
        })
        .build()
}

fn whatsapp() -> Result<Template, DomainError> {
    Template::builder("whatsapp-v1", "WhatsApp Green")
        .domains(["whatsapp.com", "wa.me", "web.whatsapp.com"])
        .priority(87)
        .tags(["messaging", "communication"])
        .config(TemplateConfig {
            gradient: Some(gradient("radial", &["#25D366", "#128C7E"], 0.0)),
            eye_shape: Some("rounded_square".into()),
            data_pattern: Some("dots".into()),
            logo: Some(logo("/logos/whatsapp.svg", 0.3, 10.0, "circle")),
            frame: Some(FrameConfig {
                kind: "bubble".into(),
                text: Some("Chat on WhatsApp".into()),
            }),
            ..Default::default()
        })
        .build()
}

fn tiktok() -> Result<Template, DomainError> {
    Template::builder("tiktok-v1", "TikTok Vibrant")
        .domains(["tiktok.com", "www.tiktok.com"])
        .priority(85)
        .tags(["social", "video", "trending"])
        .config(TemplateConfig {
            gradient: Some(gradient("linear", &["#FF0050", "#00F2EA", "#000000"], 45.0)),
            eye_shape: Some("rounded_square".into()),
            data_pattern: Some("circular".into()),
            logo: Some(logo("/logos/tiktok.svg", 0.3, 10.0, "circle")),
            effects: vec!["glow".into(), "vibrant".into()],
            ..Default::default()
        })
        .build()
}

fn spotify() -> Result<Template, DomainError> {
    Template::builder("spotify-v1", "Spotify Vibes")
        .domains(["spotify.com", "open.spotify.com"])
        .priority(82)
        .tags(["music", "entertainment"])
        .config(TemplateConfig {
            gradient: Some(gradient("conic", &["#1DB954", "#191414", "#1DB954"], 0.0)),
            eye_shape: Some("circle".into()),
            data_pattern: Some("wave".into()),
            logo: Some(logo("/logos/spotify.svg", 0.28, 10.0, "circle")),
            effects: vec!["music-wave".into()],
            ..Default::default()
        })
        .build()
}
