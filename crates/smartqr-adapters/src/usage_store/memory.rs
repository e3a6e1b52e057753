//! In-memory usage store.
//!
//! The quota gate lives here: `record` does the load-or-create, the limit
//! check, and the insert inside one mutex critical section, so concurrent
//! requests serialize on the ledger and can never commit past the limit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::debug;

use smartqr_core::application::ports::output::{RepositoryError, UsageStore};
use smartqr_core::domain::{DailyUsage, Usage, UsageEntry, UserUsageStats};
use smartqr_core::error::{SmartQrError, SmartQrResult};

type LedgerKey = (String, chrono::NaiveDate);

/// Thread-safe in-memory usage ledger, keyed by user and UTC day.
#[derive(Clone, Default)]
pub struct InMemoryUsageStore {
    inner: Arc<Mutex<HashMap<LedgerKey, Usage>>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<LedgerKey, Usage>>, SmartQrError> {
        self.inner.lock().map_err(|_| {
            RepositoryError::Unavailable {
                reason: "usage store lock poisoned".into(),
            }
            .into()
        })
    }

    /// Current ledger under the lock, rebuilt when the caller's limit
    /// differs from the stored one (premium status can change mid-day; a
    /// downgrade below the recorded count is a `DataIntegrity` error).
    fn load_or_create(
        map: &mut HashMap<LedgerKey, Usage>,
        user_id: &str,
        daily_limit: u32,
    ) -> SmartQrResult<Usage> {
        let day = Utc::now().date_naive();
        let key = (user_id.to_string(), day);
        match map.get(&key) {
            Some(existing) if existing.daily_limit() == daily_limit => Ok(existing.clone()),
            Some(existing) => Ok(Usage::new(
                user_id,
                day,
                existing.count(),
                existing.entries().to_vec(),
                daily_limit,
            )?),
            None => Ok(Usage::for_today(user_id, daily_limit)),
        }
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn today(&self, user_id: &str, daily_limit: u32) -> SmartQrResult<Usage> {
        let mut map = self.lock()?;
        Self::load_or_create(&mut map, user_id, daily_limit)
    }

    async fn record(
        &self,
        user_id: &str,
        entry: UsageEntry,
        daily_limit: u32,
    ) -> SmartQrResult<Usage> {
        // One critical section from read to write: the CAS boundary.
        let mut map = self.lock()?;
        let current = Self::load_or_create(&mut map, user_id, daily_limit)?;
        let next = current.record_usage(entry)?;
        debug!(user_id, count = next.count(), "usage recorded");
        map.insert((user_id.to_string(), next.day()), next.clone());
        Ok(next)
    }

    async fn history(&self, user_id: &str, days: u32) -> SmartQrResult<UserUsageStats> {
        let map = self.lock()?;
        let today = Utc::now().date_naive();

        let mut daily = Vec::with_capacity(days as usize);
        let mut total = 0u32;
        // Oldest first, today inclusive.
        for offset in (0..days as i64).rev() {
            let date = today - Duration::days(offset);
            let count = map
                .get(&(user_id.to_string(), date))
                .map_or(0, Usage::count);
            total += count;
            daily.push(DailyUsage { date, count });
        }

        Ok(UserUsageStats {
            daily,
            total,
            average_per_day: if days == 0 {
                0.0
            } else {
                f64::from(total) / f64::from(days)
            },
        })
    }

    async fn reset(&self, user_id: &str) -> SmartQrResult<()> {
        let mut map = self.lock()?;
        let day = Utc::now().date_naive();
        map.remove(&(user_id.to_string(), day));
        debug!(user_id, "usage reset");
        Ok(())
    }
}
