//! In-memory template repository.
//!
//! Reference implementation of the `TemplateRepository` port, seeded from
//! the built-in catalogue. Ranking lives here, not in the service: the port
//! contract says `find_by_url` already returns the best match.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use smartqr_core::application::ports::output::{
    AnalyticsUpdate, Paginated, RepositoryError, RepositoryStatistics, SortDirection, SortField,
    TemplateFilter, TemplateQuery, TemplateRepository, TemplateSort,
};
use smartqr_core::domain::Template;
use smartqr_core::error::{SmartQrError, SmartQrResult};

use crate::builtin_templates;

/// Thread-safe in-memory template repository.
#[derive(Clone)]
pub struct InMemoryTemplateRepository {
    inner: Arc<RwLock<HashMap<String, Template>>>,
}

impl InMemoryTemplateRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a repository seeded with the built-in brand catalogue.
    pub fn with_builtin() -> SmartQrResult<Self> {
        let repo = Self::new();
        {
            let mut inner = repo.write()?;
            for template in builtin_templates::all()? {
                inner.insert(template.id.clone(), template);
            }
        }
        Ok(repo)
    }

    /// Create a repository holding exactly the given templates.
    pub fn seeded(templates: impl IntoIterator<Item = Template>) -> Self {
        let repo = Self::new();
        {
            let mut inner = repo.inner.write().expect("fresh lock cannot be poisoned");
            for template in templates {
                inner.insert(template.id.clone(), template);
            }
        }
        repo
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Template>>, SmartQrError>
    {
        self.inner.read().map_err(|_| {
            RepositoryError::Unavailable {
                reason: "template store lock poisoned".into(),
            }
            .into()
        })
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Template>>, SmartQrError> {
        self.inner.write().map_err(|_| {
            RepositoryError::Unavailable {
                reason: "template store lock poisoned".into(),
            }
            .into()
        })
    }

    fn matches_filter(template: &Template, filter: &TemplateFilter) -> bool {
        if let Some(active) = filter.is_active {
            if template.is_active != active {
                return false;
            }
        }
        if let Some(tags) = &filter.tags {
            if !tags.iter().any(|tag| template.metadata.tags.contains(tag)) {
                return false;
            }
        }
        if let Some(domains) = &filter.domains {
            if !domains
                .iter()
                .any(|d| template.metadata.domains.contains(d))
            {
                return false;
            }
        }
        if let Some(min) = filter.min_usage {
            if template.metadata.analytics.usage < min {
                return false;
            }
        }
        if let Some(max) = filter.max_usage {
            if template.metadata.analytics.usage > max {
                return false;
            }
        }
        true
    }

    fn apply_sort(templates: &mut [Template], sort: TemplateSort) {
        templates.sort_by(|a, b| {
            let ordering = match sort.field {
                SortField::Usage => a.metadata.analytics.usage.cmp(&b.metadata.analytics.usage),
                SortField::Priority => a.metadata.priority.cmp(&b.metadata.priority),
                SortField::Name => a.name.cmp(&b.name),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::LastUsed => a
                    .metadata
                    .analytics
                    .last_used
                    .cmp(&b.metadata.analytics.last_used),
            };
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
}

impl Default for InMemoryTemplateRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn find_by_id(&self, id: &str) -> SmartQrResult<Option<Template>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn find_by_url(&self, url: &str) -> SmartQrResult<Option<Template>> {
        let inner = self.read()?;
        let mut candidates: Vec<&Template> = inner
            .values()
            .filter(|t| t.is_active && t.matches(url))
            .collect();

        // Highest score first; ascending id is the deterministic tie-break.
        candidates.sort_by(|a, b| {
            b.priority_score()
                .partial_cmp(&a.priority_score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let winner = candidates.first().map(|t| (*t).clone());
        debug!(
            url,
            candidates = candidates.len(),
            winner = winner.as_ref().map(|t| t.id.as_str()),
            "ranked lookup"
        );
        Ok(winner)
    }

    async fn find_all(&self, query: TemplateQuery) -> SmartQrResult<Paginated<Template>> {
        let inner = self.read()?;
        let mut templates: Vec<Template> = inner
            .values()
            .filter(|t| {
                query
                    .filter
                    .as_ref()
                    .is_none_or(|f| Self::matches_filter(t, f))
            })
            .cloned()
            .collect();

        match query.sort {
            Some(sort) => Self::apply_sort(&mut templates, sort),
            // Stable default so repeated listings do not shuffle.
            None => templates.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        let total = templates.len();
        let (page, data, total_pages) = match query.pagination {
            Some(p) if p.per_page > 0 => {
                let page = p.page.max(1);
                let total_pages = total.div_ceil(p.per_page).max(1);
                let start = (page - 1).saturating_mul(p.per_page);
                let data: Vec<Template> =
                    templates.into_iter().skip(start).take(p.per_page).collect();
                (page, data, total_pages)
            }
            _ => (1, templates, 1),
        };

        Ok(Paginated {
            data,
            total,
            page,
            total_pages,
        })
    }

    async fn find_by_tag(&self, tag: &str) -> SmartQrResult<Vec<Template>> {
        let inner = self.read()?;
        Ok(inner
            .values()
            .filter(|t| t.metadata.tags.iter().any(|candidate| candidate == tag))
            .cloned()
            .collect())
    }

    async fn find_most_used(&self, limit: usize) -> SmartQrResult<Vec<Template>> {
        let inner = self.read()?;
        let mut templates: Vec<Template> = inner.values().cloned().collect();
        templates.sort_by(|a, b| {
            b.metadata
                .analytics
                .usage
                .cmp(&a.metadata.analytics.usage)
                .then_with(|| a.id.cmp(&b.id))
        });
        templates.truncate(limit);
        Ok(templates)
    }

    async fn find_recently_used(&self, limit: usize) -> SmartQrResult<Vec<Template>> {
        let inner = self.read()?;
        let mut templates: Vec<Template> = inner
            .values()
            .filter(|t| t.metadata.analytics.last_used.is_some())
            .cloned()
            .collect();
        templates.sort_by(|a, b| {
            b.metadata
                .analytics
                .last_used
                .cmp(&a.metadata.analytics.last_used)
        });
        templates.truncate(limit);
        Ok(templates)
    }

    async fn save(&self, template: Template) -> SmartQrResult<()> {
        template.validate()?;
        self.write()?.insert(template.id.clone(), template);
        Ok(())
    }

    async fn save_many(&self, templates: Vec<Template>) -> SmartQrResult<()> {
        let mut inner = self.write()?;
        for template in templates {
            template.validate()?;
            inner.insert(template.id.clone(), template);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> SmartQrResult<()> {
        match self.write()?.remove(id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound { id: id.to_string() }.into()),
        }
    }

    async fn update_analytics(&self, id: &str, update: AnalyticsUpdate) -> SmartQrResult<()> {
        let mut inner = self.write()?;
        let template = inner
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })?;

        if update.increment_usage {
            template.metadata.analytics.usage += 1;
        }
        if let Some(rate) = update.conversion_rate {
            template.metadata.analytics.conversion_rate = rate;
        }
        if let Some(last_used) = update.last_used {
            template.metadata.analytics.last_used = Some(last_used);
        }
        template.updated_at = Utc::now();
        Ok(())
    }

    async fn search(&self, query: &str) -> SmartQrResult<Vec<Template>> {
        let needle = query.to_lowercase();
        let inner = self.read()?;
        let mut found: Vec<Template> = inner
            .values()
            .filter(|t| {
                t.id.to_lowercase().contains(&needle)
                    || t.name.to_lowercase().contains(&needle)
                    || t.metadata
                        .domains
                        .iter()
                        .any(|d| d.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn exists(&self, id: &str) -> SmartQrResult<bool> {
        Ok(self.read()?.contains_key(id))
    }

    async fn get_statistics(&self) -> SmartQrResult<RepositoryStatistics> {
        let inner = self.read()?;
        let total = inner.len();
        let active = inner.values().filter(|t| t.is_active).count();
        let total_usage: u64 = inner.values().map(|t| t.metadata.analytics.usage).sum();

        let most_used_template_id = inner
            .values()
            .filter(|t| t.metadata.analytics.usage > 0)
            .max_by(|a, b| {
                a.metadata
                    .analytics
                    .usage
                    .cmp(&b.metadata.analytics.usage)
                    // Lowest id wins on a tie, so the answer is stable.
                    .then_with(|| b.id.cmp(&a.id))
            })
            .map(|t| t.id.clone());

        let mut templates_by_tag: HashMap<String, usize> = HashMap::new();
        for template in inner.values() {
            for tag in &template.metadata.tags {
                *templates_by_tag.entry(tag.clone()).or_insert(0) += 1;
            }
        }

        Ok(RepositoryStatistics {
            total,
            active,
            total_usage,
            average_usage_per_template: if total == 0 {
                0.0
            } else {
                total_usage as f64 / total as f64
            },
            most_used_template_id,
            templates_by_tag,
        })
    }
}
