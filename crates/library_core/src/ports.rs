//! crates/library_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete store (Postgres, in-memory, ...).

use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{Category, DownloadLog, NewSearchRecord, Resource, SearchHistory};
use crate::search::pagination::PageRequest;
use crate::search::predicate::Predicate;
use crate::search::sort::SortKey;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A single-valued column that results can be grouped and counted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetField {
    ResourceType,
    Language,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ResourceStore: Send + Sync {
    // --- Filtering and aggregation ---
    async fn count(&self, predicate: &Predicate) -> PortResult<u64>;

    /// Number of matching resources per distinct value of `field`.
    /// Null values are left out.
    async fn group_count(
        &self,
        predicate: &Predicate,
        field: FacetField,
    ) -> PortResult<BTreeMap<String, u64>>;

    async fn matching_ids(&self, predicate: &Predicate) -> PortResult<Vec<i64>>;

    /// Number of distinct resources among `resource_ids` tagged with each category.
    async fn category_counts(&self, resource_ids: &[i64]) -> PortResult<BTreeMap<i64, u64>>;

    /// One ordered page of matching resources, categories attached.
    async fn fetch_page(
        &self,
        predicate: &Predicate,
        sort: SortKey,
        page: &PageRequest,
    ) -> PortResult<Vec<Resource>>;

    // --- Lookups ---
    async fn get_resource(&self, resource_id: i64) -> PortResult<Resource>;

    async fn title_suggestions(&self, fragment: &str, limit: u32) -> PortResult<Vec<String>>;

    /// Distinct, non-null languages in the catalog.
    async fn languages(&self) -> PortResult<Vec<String>>;

    /// All categories, ordered by name.
    async fn categories(&self) -> PortResult<Vec<Category>>;
}

#[async_trait]
pub trait SearchLogStore: Send + Sync {
    /// Writes the history row and the anonymous query-log row together:
    /// both are stored or neither is.
    async fn record_search(&self, record: NewSearchRecord) -> PortResult<()>;

    /// A user's most recent searches, newest first.
    async fn recent_history(&self, user_id: Uuid, limit: u32) -> PortResult<Vec<SearchHistory>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolves a browser session id to the user that owns it.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    /// Whether the user holds the administrator role.
    async fn is_admin(&self, user_id: Uuid) -> PortResult<bool>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Fails with `Conflict` when the name is taken.
    async fn create_category(&self, name: &str) -> PortResult<Category>;

    /// Deletes the category and detaches it from its resources. The
    /// resources themselves stay.
    async fn remove_category(&self, category_id: i64) -> PortResult<Category>;
}

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn count_favorites(&self, user_id: Uuid) -> PortResult<u64>;

    /// One page of the user's favorites, title ascending.
    async fn fetch_favorites(&self, user_id: Uuid, page: &PageRequest) -> PortResult<Vec<Resource>>;

    /// Returns false when the resource was already a favorite.
    async fn add_favorite(&self, user_id: Uuid, resource_id: i64) -> PortResult<bool>;

    /// Returns false when the resource was not a favorite.
    async fn remove_favorite(&self, user_id: Uuid, resource_id: i64) -> PortResult<bool>;
}

#[async_trait]
pub trait DownloadStore: Send + Sync {
    async fn record_download(&self, user_id: Uuid, resource_id: i64) -> PortResult<()>;

    async fn count_downloads(&self) -> PortResult<u64>;

    /// Most recent downloads first.
    async fn recent_downloads(&self, page: &PageRequest) -> PortResult<Vec<DownloadLog>>;
}
