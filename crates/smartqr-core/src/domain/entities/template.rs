//! Template domain aggregate.
//!
//! A [`Template`] is a named, versioned visual configuration bound to one or
//! more domains. It is the central concept of SmartQR: given a destination
//! URL, the highest-ranked matching template decides how the generated code
//! looks.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Template Domain                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Template (Aggregate Root)                                  │
//! │  ├── TemplateConfig (Value Object) - What to render         │
//! │  │    └── gradient / eyes / pattern / logo / frame / extra  │
//! │  └── TemplateMetadata (Value Object) - When to apply        │
//! │       ├── domains, priority, tags                           │
//! │       └── TemplateAnalytics - usage, conversion, recency    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  matches(url)        -> bool   (never fails, never panics)  │
//! │  priority_score()    -> f64    (total order, no NaN)        │
//! │  record_usage()      -> Template (pure, caller persists)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Decisions
//!
//! ### 1. Why is `record_usage` pure?
//!
//! The entity never persists itself. Returning a new `Template` with the
//! incremented analytics forces the caller (the repository-backed service)
//! to perform the actual write through `update_analytics`, which keeps the
//! storage layer the single place where concurrent increments are resolved.
//!
//! ### 2. Why does `TemplateConfig` carry an open extension map?
//!
//! The customization payload is structurally open: the rendering collaborator
//! owns its meaning. Unknown keys are captured via `#[serde(flatten)]` so a
//! config loaded from storage round-trips untouched even when this crate
//! predates the key.
//!
//! ### 3. Why lenient URL matching?
//!
//! `matches` accepts arbitrary strings, not just well-formed URLs. A parse
//! failure degrades to substring containment against each configured domain
//! rather than failing hard — a QR destination is user input, and "no match"
//! is always an acceptable answer while an error is not.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::domain::error::DomainError;

// ============================================================================
// Visual Configuration
// ============================================================================

/// Gradient fill applied to the code body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientConfig {
    /// Gradient geometry: `linear`, `radial`, `conic`, `diamond`, `spiral`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Color stops, ordered.
    pub colors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

/// Logo embedded in the code center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoConfig {
    pub url: String,
    /// Relative size, 0.0..=1.0 of the code area.
    pub size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

/// Decorative frame around the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// The opaque customization payload a template applies to a generated code.
///
/// Known fields are typed for convenience; everything else survives in
/// `extra` so the payload round-trips byte-for-byte through storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<GradientConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_shape: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<LogoConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameConfig>,
    /// Open extension point — unknown keys land here untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Partial overrides for [`Template::clone_with`]. A `None` field keeps the
/// source value; config and metadata patches are shallow-merged.
#[derive(Debug, Clone, Default)]
pub struct TemplatePatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub config: Option<TemplateConfig>,
    pub domains: Option<Vec<String>>,
    pub priority: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

// ============================================================================
// Ranking Metadata
// ============================================================================

/// Analytics counters used for ranking. Mutated only by constructing a new
/// snapshot (see [`Template::record_usage`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAnalytics {
    /// Total times this template has been applied.
    pub usage: u64,
    pub conversion_rate: f64,
    /// `None` = never used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

impl Default for TemplateAnalytics {
    fn default() -> Self {
        Self {
            usage: 0,
            conversion_rate: 0.0,
            last_used: None,
        }
    }
}

/// Matching rules and ranking inputs: when does this template apply, and how
/// strongly is it preferred over other matches?
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    /// Hostnames (or suffixes) the template is bound to. Matching is
    /// case-insensitive and accepts any subdomain.
    pub domains: Vec<String>,
    /// Base rank; analytics boosts are layered on top in `priority_score`.
    pub priority: i64,
    /// Searchable tags for discovery.
    pub tags: Vec<String>,
    pub analytics: TemplateAnalytics,
}

// ============================================================================
// Core Template Aggregate
// ============================================================================

/// The central domain aggregate: a reusable visual blueprint for one or more
/// destination domains.
///
/// ## Invariants (enforced by `validate()`)
///
/// 1. `id` is non-empty
/// 2. `name` is non-empty
/// 3. At least one domain is configured (a domainless template can never
///    match and is almost certainly a data error)
///
/// ## Lifecycle
///
/// Created by an administrative process, persisted through the repository,
/// ranked and applied by `TemplateService`. The aggregate itself is a value:
/// every "mutation" returns a new instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    /// Semver-like; only the major segment participates in compatibility.
    pub version: String,
    pub config: TemplateConfig,
    pub metadata: TemplateMetadata,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Start the builder pattern for fluent construction.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(id, name)
    }

    /// Validate all invariants.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.is_empty() {
            return Err(DomainError::InvalidTemplate(
                "template id cannot be empty".into(),
            ));
        }
        if self.name.is_empty() {
            return Err(DomainError::InvalidTemplate(
                "template name cannot be empty".into(),
            ));
        }
        if self.metadata.domains.is_empty() {
            return Err(DomainError::InvalidTemplate(format!(
                "template '{}' has no domains and can never match",
                self.id
            )));
        }
        Ok(())
    }

    /// Check whether a URL belongs to one of this template's domains.
    ///
    /// An inactive template never matches. Hostname comparison is
    /// case-insensitive and accepts the exact domain or any subdomain
    /// (`sub.example.com` matches a template bound to `example.com`).
    /// Input that cannot be parsed as a URL degrades to case-insensitive
    /// substring containment. No failure mode escapes this method.
    pub fn matches(&self, raw_url: &str) -> bool {
        if !self.is_active {
            return false;
        }

        let candidate = if raw_url.starts_with("http") {
            raw_url.to_string()
        } else {
            format!("https://{raw_url}")
        };

        match Url::parse(&candidate).ok().and_then(|u| {
            u.host_str().map(|h| h.to_ascii_lowercase())
        }) {
            Some(hostname) => self.metadata.domains.iter().any(|domain| {
                let domain = domain.to_ascii_lowercase();
                hostname == domain || hostname.ends_with(&format!(".{domain}"))
            }),
            None => {
                // Lenient degradation: not a URL, try plain containment.
                let lowered = raw_url.to_ascii_lowercase();
                self.metadata
                    .domains
                    .iter()
                    .any(|domain| lowered.contains(&domain.to_ascii_lowercase()))
            }
        }
    }

    /// Major-version compatibility check, used to gate `config` schema
    /// migrations. `"1.4.2"` is compatible with `"1.0.0"` but not `"2.0.0"`.
    pub fn is_compatible_with(&self, version: &str) -> bool {
        let major = self.version.split('.').next();
        let requested_major = version.split('.').next();
        major == requested_major
    }

    /// Select the configuration variant for a user/context.
    ///
    /// Presently the identity function; the signature is the seam where
    /// per-user A/B variant selection lands without touching callers.
    /// Must not fail.
    pub fn variant_for(&self, _user_id: Option<&str>, _context: Option<&Value>) -> TemplateConfig {
        self.config.clone()
    }

    /// Structural copy with shallow-merged overrides.
    ///
    /// The derived template gets `{id}-clone` unless the patch supplies an
    /// id; `created_at` is preserved, `updated_at` is stamped. The source is
    /// not touched.
    pub fn clone_with(&self, patch: TemplatePatch) -> Template {
        let mut config = self.config.clone();
        if let Some(over) = patch.config {
            if over.gradient.is_some() {
                config.gradient = over.gradient;
            }
            if over.eye_shape.is_some() {
                config.eye_shape = over.eye_shape;
            }
            if over.data_pattern.is_some() {
                config.data_pattern = over.data_pattern;
            }
            if over.logo.is_some() {
                config.logo = over.logo;
            }
            if !over.effects.is_empty() {
                config.effects = over.effects;
            }
            if over.frame.is_some() {
                config.frame = over.frame;
            }
            for (key, value) in over.extra {
                config.extra.insert(key, value);
            }
        }

        Template {
            id: patch.id.unwrap_or_else(|| format!("{}-clone", self.id)),
            name: patch.name.unwrap_or_else(|| self.name.clone()),
            version: patch.version.unwrap_or_else(|| self.version.clone()),
            config,
            metadata: TemplateMetadata {
                domains: patch.domains.unwrap_or_else(|| self.metadata.domains.clone()),
                priority: patch.priority.unwrap_or(self.metadata.priority),
                tags: patch.tags.unwrap_or_else(|| self.metadata.tags.clone()),
                analytics: self.metadata.analytics.clone(),
            },
            is_active: patch.is_active.unwrap_or(self.is_active),
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    /// Pure analytics increment: returns a new `Template` with `usage + 1`
    /// and `last_used = now`. The caller persists the change through the
    /// repository's `update_analytics`.
    #[must_use = "record_usage returns a new Template; the receiver is unchanged"]
    pub fn record_usage(&self) -> Template {
        let now = Utc::now();
        let mut next = self.clone();
        next.metadata.analytics.usage += 1;
        next.metadata.analytics.last_used = Some(now);
        next.updated_at = now;
        next
    }

    /// Derived ranking value for conflict resolution between matches.
    ///
    /// `priority + log10(usage + 1) * 10 + recency_bonus`, where the recency
    /// bonus is 5 when the template was used within the past 24 hours.
    /// Monotonically non-decreasing in usage, bounded recency boost, and a
    /// total order (never NaN).
    pub fn priority_score(&self) -> f64 {
        let base = self.metadata.priority as f64;
        let usage_boost = ((self.metadata.analytics.usage + 1) as f64).log10() * 10.0;
        let recency_boost = if self.used_recently() { 5.0 } else { 0.0 };
        base + usage_boost + recency_boost
    }

    fn used_recently(&self) -> bool {
        self.metadata
            .analytics
            .last_used
            .is_some_and(|at| Utc::now() - at < Duration::hours(24))
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for constructing templates with validation.
///
/// All seeding and test code goes through here; `build()` enforces the
/// aggregate invariants so invalid templates never enter the system.
pub struct TemplateBuilder {
    id: String,
    name: String,
    version: String,
    config: TemplateConfig,
    domains: Vec<String>,
    priority: i64,
    tags: Vec<String>,
    is_active: bool,
}

impl TemplateBuilder {
    fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: "1.0.0".into(),
            config: TemplateConfig::default(),
            domains: Vec::new(),
            priority: 0,
            tags: Vec::new(),
            is_active: true,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn config(mut self, config: TemplateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains.extend(domains.into_iter().map(Into::into));
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Consume builder and construct a validated `Template`.
    pub fn build(self) -> Result<Template, DomainError> {
        let now = Utc::now();
        let template = Template {
            id: self.id,
            name: self.name,
            version: self.version,
            config: self.config,
            metadata: TemplateMetadata {
                domains: self.domains,
                priority: self.priority,
                tags: self.tags,
                analytics: TemplateAnalytics::default(),
            },
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        };
        template.validate()?;
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instagram() -> Template {
        Template::builder("instagram-v1", "Instagram Style")
            .domain("instagram.com")
            .priority(10)
            .build()
            .unwrap()
    }

    #[test]
    fn matches_exact_domain_and_path() {
        let t = instagram();
        assert!(t.matches("https://instagram.com/user"));
        assert!(!t.matches("https://notinstagram.com"));
    }

    #[test]
    fn matches_subdomain() {
        let t = instagram();
        assert!(t.matches("https://www.instagram.com/reel/abc"));
        // Suffix that is not a subdomain boundary must not match.
        assert!(!t.matches("https://eviltaginstagram.com"));
    }

    #[test]
    fn matches_is_case_insensitive() {
        let t = instagram();
        assert_eq!(t.matches("Example.COM"), t.matches("example.com"));
        assert!(t.matches("https://INSTAGRAM.com/x"));
        assert!(t.matches("Instagram.COM"));
    }

    #[test]
    fn matches_without_scheme() {
        let t = instagram();
        assert!(t.matches("instagram.com/profile"));
    }

    #[test]
    fn matches_degrades_to_substring_on_unparseable_input() {
        let t = instagram();
        // Spaces make this unparseable as a URL even with a scheme prefix.
        assert!(t.matches("open instagram.com in a browser"));
        assert!(!t.matches("no social network here"));
    }

    #[test]
    fn inactive_template_never_matches() {
        let t = Template::builder("x", "X")
            .domain("instagram.com")
            .inactive()
            .build()
            .unwrap();
        assert!(!t.matches("https://instagram.com"));
    }

    #[test]
    fn version_compatibility_uses_major_segment() {
        let t = instagram();
        assert!(t.is_compatible_with("1.9.3"));
        assert!(!t.is_compatible_with("2.0.0"));
    }

    #[test]
    fn priority_score_is_monotonic_in_usage() {
        let a = instagram();
        let mut b = instagram();
        b.metadata.analytics.usage = 50;
        assert!(b.priority_score() >= a.priority_score());
        assert!(a.priority_score().is_finite());
        assert!(b.priority_score().is_finite());
    }

    #[test]
    fn recent_usage_adds_bounded_bonus() {
        let cold = instagram();
        let mut warm = instagram();
        warm.metadata.analytics.last_used = Some(Utc::now());
        let delta = warm.priority_score() - cold.priority_score();
        assert!((delta - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_usage_is_pure() {
        let before = instagram();
        let after = before.record_usage();
        assert_eq!(before.metadata.analytics.usage, 0);
        assert_eq!(after.metadata.analytics.usage, 1);
        assert!(after.metadata.analytics.last_used.is_some());
    }

    #[test]
    fn clone_with_empty_patch_changes_identity_only() {
        let source = instagram();
        let cloned = source.clone_with(TemplatePatch::default());
        assert_eq!(cloned.id, "instagram-v1-clone");
        assert_eq!(cloned.config, source.config);
        assert_eq!(cloned.metadata.domains, source.metadata.domains);
        // Source untouched.
        assert_eq!(source.id, "instagram-v1");
    }

    #[test]
    fn clone_with_merges_config_shallowly() {
        let mut source = instagram();
        source.config.eye_shape = Some("rounded".into());
        source.config.data_pattern = Some("dots".into());

        let cloned = source.clone_with(TemplatePatch {
            id: Some("ig-dark".into()),
            config: Some(TemplateConfig {
                eye_shape: Some("square".into()),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(cloned.id, "ig-dark");
        assert_eq!(cloned.config.eye_shape.as_deref(), Some("square"));
        // Untouched keys survive the merge.
        assert_eq!(cloned.config.data_pattern.as_deref(), Some("dots"));
    }

    #[test]
    fn unknown_config_keys_round_trip() {
        let json = serde_json::json!({
            "eyeShape": "rounded",
            "holographic": { "intensity": 0.8 }
        });
        let config: TemplateConfig = serde_json::from_value(json.clone()).unwrap();
        assert!(config.extra.contains_key("holographic"));
        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn builder_rejects_domainless_template() {
        let result = Template::builder("bad", "Bad").build();
        assert!(result.is_err());
    }
}
