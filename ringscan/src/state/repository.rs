// ringscan/src/state/repository.rs
//
// Read-only response repository seam.
//
// Detectors and the aggregator depend only on `ResponseRepository`
// ("fetch responses for survey X created within window W, optionally
// requiring device data, capped at N, newest first"). Any persistence layer
// can sit behind it.
//
// `MemoryRepository` is the in-process implementation used by the CLI and the
// tests: DashMap = sharded concurrent HashMap, so per-survey analyses running
// on separate threads can read it without a global lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::error::RepositoryError;
use crate::model::SurveyResponse;

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseQuery {
    pub survey_id:           String,
    pub since:               Option<DateTime<Utc>>,
    pub require_device_data: bool,
    pub limit:               Option<usize>,
}

impl ResponseQuery {
    pub fn survey(survey_id: &str) -> Self {
        Self {
            survey_id:           survey_id.to_string(),
            since:               None,
            require_device_data: false,
            limit:               None,
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_device_data(mut self) -> Self {
        self.require_device_data = true;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

pub trait ResponseRepository: Send + Sync {
    /// Matching responses ordered newest first.
    fn fetch(&self, query: &ResponseQuery) -> Result<Vec<SurveyResponse>, RepositoryError>;
}

impl<T: ResponseRepository + ?Sized> ResponseRepository for Arc<T> {
    fn fetch(&self, query: &ResponseQuery) -> Result<Vec<SurveyResponse>, RepositoryError> {
        (**self).fetch(query)
    }
}

// ── In-memory store ───────────────────────────────────────────────────────────

pub struct MemoryRepository {
    surveys: DashMap<String, Vec<SurveyResponse>>,
    pub total_responses: AtomicU64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self { surveys: DashMap::new(), total_responses: AtomicU64::new(0) }
    }

    pub fn insert(&self, response: SurveyResponse) {
        self.total_responses.fetch_add(1, Ordering::Relaxed);
        self.surveys
            .entry(response.survey_id.clone())
            .or_default()
            .push(response);
    }

    pub fn survey_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.surveys.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn n_surveys(&self) -> usize { self.surveys.len() }
}

impl Default for MemoryRepository { fn default() -> Self { Self::new() } }

impl FromIterator<SurveyResponse> for MemoryRepository {
    fn from_iter<I: IntoIterator<Item = SurveyResponse>>(iter: I) -> Self {
        let repo = Self::new();
        for r in iter {
            repo.insert(r);
        }
        repo
    }
}

impl ResponseRepository for MemoryRepository {
    fn fetch(&self, query: &ResponseQuery) -> Result<Vec<SurveyResponse>, RepositoryError> {
        let mut rows: Vec<SurveyResponse> = match self.surveys.get(&query.survey_id) {
            Some(all) => all.iter()
                .filter(|r| query.since.map_or(true, |t| r.created_at >= t))
                .filter(|r| !query.require_device_data || r.has_device_data())
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        // Newest first; id breaks ties so the order is stable across runs.
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(n) = query.limit {
            rows.truncate(n);
        }

        debug!("fetch survey={} rows={}", query.survey_id, rows.len());
        Ok(rows)
    }
}
