//! crates/library_core/src/search/service.rs
//!
//! Runs a search end to end: base predicate -> facet counts -> facet
//! filtering -> ordering -> pagination -> logging.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::facets::{count_facets, FacetCounts};
use super::pagination::{Page, PageRequest, BROWSE_PAGE_SIZE};
use super::predicate::Predicate;
use super::query::{FacetSelection, TextQuery, YearRange};
use super::sort::SortKey;
use crate::domain::{NewSearchRecord, Resource, SearchHistory, QUERY_TEXT_MAX_CHARS};
use crate::ports::{PortError, PortResult, ResourceStore, SearchLogStore};

/// Prefix marking advanced searches in the anonymous query log.
pub const ADVANCED_LOG_PREFIX: &str = "Advanced: ";
pub const SUGGESTION_LIMIT: u32 = 5;
pub const SUGGESTION_MIN_CHARS: usize = 2;
pub const RECENT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Store(#[from] PortError),
}

/// Who to attribute a search to, and the text to log for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLogEntry {
    pub user_id: Uuid,
    pub history_text: String,
    pub log_text: String,
}

/// Cuts `text` to the width of the log columns, on a char boundary.
fn clip(text: &str) -> String {
    match text.char_indices().nth(QUERY_TEXT_MAX_CHARS) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

impl SearchLogEntry {
    pub fn simple(user_id: Uuid, query: &str) -> Self {
        Self {
            user_id,
            history_text: clip(query),
            log_text: clip(query),
        }
    }

    pub fn advanced(user_id: Uuid, first_term: &str) -> Self {
        Self {
            user_id,
            history_text: clip(first_term),
            log_text: clip(&format!("{}{}", ADVANCED_LOG_PREFIX, first_term)),
        }
    }

    fn into_record(self, results_count: u64) -> NewSearchRecord {
        NewSearchRecord {
            user_id: self.user_id,
            history_text: self.history_text,
            log_text: self.log_text,
            results_count: results_count as i64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub text: TextQuery,
    pub years: YearRange,
    pub facets: FacetSelection,
    pub sort: SortKey,
    pub page: PageRequest,
    /// When set, the search is logged once its results are known.
    pub log_as: Option<SearchLogEntry>,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Page<Resource>,
    pub facets: FacetCounts,
    /// Set when results were computed but writing the log rows failed.
    pub log_warning: Option<String>,
}

#[derive(Clone)]
pub struct SearchService {
    resources: Arc<dyn ResourceStore>,
    logs: Arc<dyn SearchLogStore>,
}

impl SearchService {
    pub fn new(resources: Arc<dyn ResourceStore>, logs: Arc<dyn SearchLogStore>) -> Self {
        Self { resources, logs }
    }

    pub async fn run(&self, request: SearchRequest) -> Result<SearchOutcome, SearchError> {
        let base = request
            .text
            .base_predicate(&request.years)
            .ok_or(SearchError::EmptyQuery)?;

        let facets = count_facets(self.resources.as_ref(), &base).await?;

        let filtered = request.facets.apply(&base);
        let total = self.resources.count(&filtered).await?;
        let items = self
            .resources
            .fetch_page(&filtered, request.sort, &request.page)
            .await?;
        let results = Page::new(items, request.page, total);
        debug!(
            "Search matched {} resources, returning page {} of {}",
            total,
            results.page,
            results.total_pages()
        );

        let log_warning = match request.log_as {
            Some(entry) => self.record(entry.into_record(total)).await,
            None => None,
        };

        Ok(SearchOutcome {
            results,
            facets,
            log_warning,
        })
    }

    async fn record(&self, record: NewSearchRecord) -> Option<String> {
        match self.logs.record_search(record).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to record search: {:?}", e);
                Some(format!("Search could not be recorded: {}", e))
            }
        }
    }

    /// Every resource, most recently uploaded first.
    pub async fn browse(&self, page: i64) -> PortResult<Page<Resource>> {
        let request = PageRequest::new(page, BROWSE_PAGE_SIZE);
        let everything = Predicate::everything();
        let total = self.resources.count(&everything).await?;
        let items = self
            .resources
            .fetch_page(&everything, SortKey::Newest, &request)
            .await?;
        Ok(Page::new(items, request, total))
    }

    /// Titles containing `query`, for type-ahead. Short or missing queries
    /// yield nothing.
    pub async fn suggestions(&self, query: Option<&str>) -> PortResult<Vec<String>> {
        let query = query.map(str::trim).unwrap_or_default();
        if query.chars().count() < SUGGESTION_MIN_CHARS {
            return Ok(Vec::new());
        }
        self.resources
            .title_suggestions(query, SUGGESTION_LIMIT)
            .await
    }

    pub async fn recent_history(&self, user_id: Uuid) -> PortResult<Vec<SearchHistory>> {
        self.logs.recent_history(user_id, RECENT_HISTORY_LIMIT).await
    }
}
