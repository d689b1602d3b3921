//! services/api/src/web/rest.rs
//!
//! Response payloads for the REST API and the master definition for the
//! OpenAPI specification.

use chrono::{DateTime, NaiveDate, Utc};
use library_core::domain::{Category, DownloadLog, Resource, SearchHistory};
use library_core::search::{FacetCounts, Page};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::search::search_handler,
        crate::web::search::advanced_search_handler,
        crate::web::search::advanced_search_submit_handler,
        crate::web::search::suggestions_handler,
        crate::web::catalog::browse_handler,
        crate::web::catalog::resource_detail_handler,
        crate::web::catalog::search_history_handler,
        crate::web::account::my_account_handler,
        crate::web::account::add_favorite_handler,
        crate::web::account::remove_favorite_handler,
        crate::web::account::download_handler,
        crate::web::admin::add_category_handler,
        crate::web::admin::delete_category_handler,
        crate::web::admin::recent_activity_handler,
    ),
    components(
        schemas(
            CategoryResponse,
            ResourceResponse,
            PaginationResponse,
            FacetCountsResponse,
            SearchResultsResponse,
            AdvancedSearchFormResponse,
            BrowseResponse,
            SearchHistoryResponse,
            MyAccountResponse,
            FavoriteChangeResponse,
            DownloadLogResponse,
            RecentActivityResponse,
            crate::web::admin::CategoryForm,
        )
    ),
    tags(
        (name = "Digital Library API", description = "Catalog browsing, faceted search, favorites and category management.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

/// A catalog entry as returned by listings and the detail endpoint.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ResourceResponse {
    pub id: i64,
    pub title: String,
    pub creator: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub resource_type: String,
    pub format: Option<String>,
    pub language: Option<String>,
    pub rights: Option<String>,
    pub filename: String,
    pub preview_image: Option<String>,
    pub upload_date: DateTime<Utc>,
    pub categories: Vec<CategoryResponse>,
}

impl From<Resource> for ResourceResponse {
    fn from(r: Resource) -> Self {
        Self {
            id: r.id,
            title: r.title,
            creator: r.creator,
            subject: r.subject,
            description: r.description,
            publisher: r.publisher,
            publication_date: r.publication_date,
            resource_type: r.resource_type.label().to_string(),
            format: r.format,
            language: r.language,
            rights: r.rights,
            filename: r.filename,
            preview_image: r.preview_image,
            upload_date: r.upload_date,
            categories: r.categories.into_iter().map(CategoryResponse::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct PaginationResponse {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> From<&Page<T>> for PaginationResponse {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            has_prev: page.has_prev(),
        }
    }
}

/// Result counts per facet value, taken before facet filtering.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct FacetCountsResponse {
    pub types: BTreeMap<String, u64>,
    pub languages: BTreeMap<String, u64>,
    /// Keyed by category id.
    pub categories: BTreeMap<String, u64>,
}

impl From<FacetCounts> for FacetCountsResponse {
    fn from(counts: FacetCounts) -> Self {
        Self {
            types: counts.types,
            languages: counts.languages,
            categories: counts
                .categories
                .into_iter()
                .map(|(id, count)| (id.to_string(), count))
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct SearchResultsResponse {
    pub title: String,
    pub query: String,
    pub results: Vec<ResourceResponse>,
    pub pagination: PaginationResponse,
    pub sort_by: String,
    pub facet_counts: FacetCountsResponse,
    pub all_types: Vec<String>,
    pub all_langs: Vec<String>,
    pub all_categories: Vec<CategoryResponse>,
    pub active_types: Vec<String>,
    pub active_langs: Vec<String>,
    pub active_categories: Vec<i64>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// Advanced-search fields to carry into pagination and facet links.
    pub advanced_params: Option<BTreeMap<String, String>>,
    /// Set when the results are valid but the search could not be logged.
    pub log_warning: Option<String>,
}

/// The choices offered by the advanced search form.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct AdvancedSearchFormResponse {
    pub fields: Vec<String>,
    pub operators: Vec<String>,
    pub years: Vec<i32>,
    pub errors: Vec<String>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct BrowseResponse {
    pub resources: Vec<ResourceResponse>,
    pub pagination: PaginationResponse,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct SearchHistoryResponse {
    pub query_text: String,
    pub search_date: DateTime<Utc>,
}

impl From<SearchHistory> for SearchHistoryResponse {
    fn from(h: SearchHistory) -> Self {
        Self {
            query_text: h.query_text,
            search_date: h.search_date,
        }
    }
}

/// The account page: favorites, title ascending, and recent searches.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct MyAccountResponse {
    pub favorites: Vec<ResourceResponse>,
    pub pagination: PaginationResponse,
    pub search_history: Vec<SearchHistoryResponse>,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct FavoriteChangeResponse {
    pub resource_id: i64,
    /// False when the favorite was already in the requested state.
    pub changed: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct DownloadLogResponse {
    pub id: i64,
    pub user_id: Uuid,
    pub resource_id: i64,
    pub resource_title: String,
    pub download_date: DateTime<Utc>,
}

impl From<DownloadLog> for DownloadLogResponse {
    fn from(d: DownloadLog) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            resource_id: d.resource_id,
            resource_title: d.resource_title,
            download_date: d.download_date,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct RecentActivityResponse {
    pub downloads: Vec<DownloadLogResponse>,
    pub pagination: PaginationResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_core::search::PageRequest;

    #[test]
    fn openapi_document_lists_search_endpoints() {
        let json = ApiDoc::openapi().to_json().unwrap();
        for path in [
            "/search",
            "/advanced-search",
            "/search/suggestions",
            "/browse",
            "/my-account",
            "/download/{id}",
            "/admin/category/add",
        ] {
            assert!(json.contains(&format!("\"{}\"", path)), "missing {}", path);
        }
    }

    #[test]
    fn pagination_metadata_mirrors_the_page() {
        let page = Page::from_ordered((1..=7).collect::<Vec<_>>(), PageRequest::new(2, 5));
        assert_eq!(
            PaginationResponse::from(&page),
            PaginationResponse {
                page: 2,
                per_page: 5,
                total: 7,
                total_pages: 2,
                has_next: false,
                has_prev: true,
            }
        );
    }

    #[test]
    fn category_counts_are_keyed_by_id_string() {
        let mut counts = FacetCounts::default();
        counts.categories.insert(12, 3);
        let response = FacetCountsResponse::from(counts);
        assert_eq!(response.categories.get("12"), Some(&3));
    }
}
