//! Usage ledger: per-user, per-day quota accounting.
//!
//! A [`Usage`] records how many gated generations a user has performed on a
//! given UTC calendar day, plus the metadata of each generation. The type is
//! a **value**: `record_usage` returns a new instance rather than mutating,
//! which pushes the actual persistence (and the compare-and-swap that
//! prevents double-counting under concurrency) down to the storage adapter.
//!
//! ## Invariants
//!
//! 1. `count <= daily_limit` for every instance that exists — construction
//!    from storage with a larger count is a `DataIntegrity` error, never
//!    silently clamped (clamping could mask a quota-bypass bug).
//! 2. `date` is normalized to UTC midnight; calendar comparisons ignore
//!    time-of-day.
//! 3. `entries` is append-only and `entries.len()` tracks `count`.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Metadata of a single gated generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    /// Applied template, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub url: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    /// Optional client hint, recorded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl UsageEntry {
    pub fn new(template_id: Option<String>, url: impl Into<String>) -> Self {
        Self {
            template_id,
            url: url.into(),
            generated_at: Utc::now(),
            processing_time_ms: None,
            user_agent: None,
        }
    }

    pub fn processing_time(mut self, millis: u64) -> Self {
        self.processing_time_ms = Some(millis);
        self
    }
}

/// Point-in-time statistics derived from a single day's ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub total_usage: u32,
    pub remaining: u32,
    pub template_breakdown: HashMap<String, u32>,
    pub average_processing_time_ms: f64,
    pub last_used: Option<DateTime<Utc>>,
}

/// Aggregate over several days of usage, produced by the store's history
/// query. Read-only reporting shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUsageStats {
    pub daily: Vec<DailyUsage>,
    pub total: u32,
    pub average_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub count: u32,
}

/// Per-user, per-day quota ledger.
///
/// Identity is the `(user_id, day)` pair, materialized as
/// `usage_{userId}_{YYYY-MM-DD}`. Fields are private so the count/limit
/// invariant cannot be bypassed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    id: String,
    user_id: String,
    /// UTC midnight of the day this ledger covers.
    date: DateTime<Utc>,
    count: u32,
    entries: Vec<UsageEntry>,
    daily_limit: u32,
}

/// Default number of gated generations per user per day.
pub const DEFAULT_DAILY_LIMIT: u32 = 3;

impl Usage {
    /// Rehydrate a ledger (typically from storage).
    ///
    /// # Errors
    ///
    /// `DataIntegrity` when `count > daily_limit` — corrupted storage or a
    /// concurrency bug upstream; must be surfaced, never clamped.
    pub fn new(
        user_id: impl Into<String>,
        day: NaiveDate,
        count: u32,
        entries: Vec<UsageEntry>,
        daily_limit: u32,
    ) -> Result<Self, DomainError> {
        let user_id = user_id.into();
        let id = Self::id_for(&user_id, day);
        if count > daily_limit {
            return Err(DomainError::DataIntegrity {
                id,
                count,
                daily_limit,
            });
        }
        Ok(Self {
            id,
            user_id,
            date: day
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always a valid time")
                .and_utc(),
            count,
            entries,
            daily_limit,
        })
    }

    /// Create the fresh (empty) ledger for the current UTC day.
    pub fn for_today(user_id: impl Into<String>, daily_limit: u32) -> Self {
        let day = Utc::now().date_naive();
        Self::new(user_id, day, 0, Vec::new(), daily_limit)
            .expect("zero count never exceeds a limit")
    }

    /// Canonical ledger id: `usage_{userId}_{YYYY-MM-DD}`.
    pub fn id_for(user_id: &str, day: NaiveDate) -> String {
        format!("usage_{user_id}_{}", day.format("%Y-%m-%d"))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// UTC midnight of the covered day.
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn entries(&self) -> &[UsageEntry] {
        &self.entries
    }

    // ── Derived queries ───────────────────────────────────────────────────

    /// `true` while the user has quota left today.
    pub fn can_generate(&self) -> bool {
        self.count < self.daily_limit
    }

    pub fn remaining_today(&self) -> u32 {
        self.daily_limit.saturating_sub(self.count)
    }

    /// One generation away from the ceiling — the UI warns here.
    pub fn is_approaching_limit(&self) -> bool {
        self.count + 1 == self.daily_limit
    }

    /// Calendar-date comparison against the evaluator's current UTC day.
    pub fn is_today(&self) -> bool {
        self.day() == Utc::now().date_naive()
    }

    /// How many of today's generations used the given template.
    pub fn template_usage(&self, template_id: &str) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.template_id.as_deref() == Some(template_id))
            .count() as u32
    }

    /// Aggregate view over this day's ledger.
    pub fn stats(&self) -> UsageSnapshot {
        let mut breakdown: HashMap<String, u32> = HashMap::new();
        for entry in &self.entries {
            if let Some(id) = &entry.template_id {
                *breakdown.entry(id.clone()).or_insert(0) += 1;
            }
        }

        let timings: Vec<u64> = self
            .entries
            .iter()
            .filter_map(|e| e.processing_time_ms)
            .collect();
        let average_processing_time_ms = if timings.is_empty() {
            0.0
        } else {
            timings.iter().sum::<u64>() as f64 / timings.len() as f64
        };

        UsageSnapshot {
            total_usage: self.count,
            remaining: self.remaining_today(),
            template_breakdown: breakdown,
            average_processing_time_ms,
            last_used: self.entries.last().map(|e| e.generated_at),
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Pure increment: returns a new `Usage` with `count + 1` and the entry
    /// appended, or `QuotaExceeded` if the ledger is already at its limit.
    ///
    /// Never mutates in place — the storage adapter performs the actual
    /// conditional write, so two concurrent requests cannot both observe
    /// `count = N` and both commit `N + 1`.
    #[must_use = "record_usage returns a new Usage; the receiver is unchanged"]
    pub fn record_usage(&self, entry: UsageEntry) -> Result<Usage, DomainError> {
        if !self.can_generate() {
            return Err(DomainError::QuotaExceeded { remaining: 0 });
        }
        let mut entries = self.entries.clone();
        entries.push(entry);
        Ok(Usage {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            date: self.date,
            count: self.count + 1,
            entries,
            daily_limit: self.daily_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> UsageEntry {
        UsageEntry::new(None, url)
    }

    #[test]
    fn fresh_ledger_has_full_quota() {
        let usage = Usage::for_today("u1", 3);
        assert_eq!(usage.count(), 0);
        assert_eq!(usage.remaining_today(), 3);
        assert!(usage.can_generate());
        assert!(usage.is_today());
    }

    #[test]
    fn id_encodes_user_and_day() {
        let day = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert_eq!(Usage::id_for("u1", day), "usage_u1_2026-08-30");
    }

    #[test]
    fn record_usage_returns_new_instance() {
        let original = Usage::for_today("u1", 3);
        let next = original.record_usage(entry("x")).unwrap();
        assert_eq!(next.count(), 1);
        assert_eq!(next.entries().len(), 1);
        // Original untouched.
        assert_eq!(original.count(), 0);
        assert!(original.entries().is_empty());
    }

    #[test]
    fn count_is_monotonic_within_a_day() {
        let mut usage = Usage::for_today("u1", 3);
        let mut seen = vec![usage.count()];
        for i in 0..3 {
            usage = usage.record_usage(entry(&format!("url-{i}"))).unwrap();
            seen.push(usage.count());
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn record_usage_fails_at_limit() {
        let usage = Usage::for_today("u1", 1);
        let at_limit = usage.record_usage(entry("a")).unwrap();
        assert!(!at_limit.can_generate());
        let err = at_limit.record_usage(entry("b")).unwrap_err();
        assert_eq!(err, DomainError::QuotaExceeded { remaining: 0 });
        // Failed transition leaves the ledger at the ceiling, not past it.
        assert_eq!(at_limit.count(), 1);
    }

    #[test]
    fn approaching_limit_is_exactly_one_below() {
        let usage = Usage::for_today("u1", 3);
        assert!(!usage.is_approaching_limit());
        let two = usage
            .record_usage(entry("a"))
            .unwrap()
            .record_usage(entry("b"))
            .unwrap();
        assert!(two.is_approaching_limit());
        let three = two.record_usage(entry("c")).unwrap();
        assert!(!three.is_approaching_limit());
    }

    #[test]
    fn corrupted_count_is_rejected_not_clamped() {
        let day = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let err = Usage::new("u1", day, 5, Vec::new(), 3).unwrap_err();
        assert!(matches!(
            err,
            DomainError::DataIntegrity {
                count: 5,
                daily_limit: 3,
                ..
            }
        ));
    }

    #[test]
    fn template_usage_counts_matching_entries() {
        let usage = Usage::for_today("u1", 5)
            .record_usage(UsageEntry::new(Some("ig".into()), "a"))
            .unwrap()
            .record_usage(UsageEntry::new(Some("yt".into()), "b"))
            .unwrap()
            .record_usage(UsageEntry::new(Some("ig".into()), "c"))
            .unwrap();
        assert_eq!(usage.template_usage("ig"), 2);
        assert_eq!(usage.template_usage("yt"), 1);
        assert_eq!(usage.template_usage("missing"), 0);
    }

    #[test]
    fn stats_aggregates_timings_and_breakdown() {
        let usage = Usage::for_today("u1", 5)
            .record_usage(UsageEntry::new(Some("ig".into()), "a").processing_time(100))
            .unwrap()
            .record_usage(UsageEntry::new(Some("ig".into()), "b").processing_time(300))
            .unwrap();

        let stats = usage.stats();
        assert_eq!(stats.total_usage, 2);
        assert_eq!(stats.remaining, 3);
        assert_eq!(stats.template_breakdown.get("ig"), Some(&2));
        assert!((stats.average_processing_time_ms - 200.0).abs() < f64::EPSILON);
        assert!(stats.last_used.is_some());
    }

    #[test]
    fn past_day_is_not_today() {
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let usage = Usage::new("u1", day, 0, Vec::new(), 3).unwrap();
        assert!(!usage.is_today());
    }
}
