//! services/api/src/web/search.rs
//!
//! Axum handlers for simple search, advanced search and title suggestions.

use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{Datelike, Utc};
use library_core::domain::{Category, ResourceType};
use library_core::ports::PortError;
use library_core::search::{
    Combinator, FieldScope, PageRequest, SearchError, SearchLogEntry, SearchOutcome,
    SearchRequest, TextQuery, YearRange, SEARCH_PAGE_SIZE,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::web::params::{AdvancedSearchForm, ListingParams, Params, FORM_FIRST_YEAR};
use crate::web::rest::{
    AdvancedSearchFormResponse, CategoryResponse, PaginationResponse, ResourceResponse,
    SearchResultsResponse,
};
use crate::web::state::{AppState, CurrentUser};

pub const BROWSE_PATH: &str = "/browse";

fn current_year() -> i32 {
    Utc::now().year()
}

pub(crate) fn internal_error(context: &str, e: impl std::fmt::Debug) -> (StatusCode, String) {
    error!("{}: {:?}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

/// Maps a port failure to a response: missing rows are 404, name clashes
/// 409, anything else a logged 500.
pub(crate) fn port_error(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Conflict(message) => (StatusCode::CONFLICT, message),
        e => internal_error(context, e),
    }
}

fn redirect_to_browse() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, BROWSE_PATH)]).into_response()
}

async fn run_search(
    state: &AppState,
    request: SearchRequest,
) -> Result<SearchOutcome, (StatusCode, String)> {
    state.search().run(request).await.map_err(|e| match e {
        SearchError::EmptyQuery => (StatusCode::BAD_REQUEST, "Search query is empty".to_string()),
        SearchError::Store(e) => internal_error("Search failed", e),
    })
}

/// The option lists offered next to the facet counts.
struct FacetOptions {
    languages: Vec<String>,
    categories: Vec<Category>,
}

/// Loaded before the search runs, so a failure here leaves nothing logged.
async fn load_facet_options(state: &AppState) -> Result<FacetOptions, (StatusCode, String)> {
    let languages = state
        .resources
        .languages()
        .await
        .map_err(|e| internal_error("Failed to load languages", e))?;
    let categories = state
        .resources
        .categories()
        .await
        .map_err(|e| internal_error("Failed to load categories", e))?;
    Ok(FacetOptions {
        languages,
        categories,
    })
}

fn results_response(
    title: &str,
    query: String,
    outcome: SearchOutcome,
    options: FacetOptions,
    listing: &ListingParams,
    years: YearRange,
    advanced_params: Option<BTreeMap<String, String>>,
) -> SearchResultsResponse {
    let pagination = PaginationResponse::from(&outcome.results);
    SearchResultsResponse {
        title: title.to_string(),
        query,
        results: outcome
            .results
            .items
            .into_iter()
            .map(ResourceResponse::from)
            .collect(),
        pagination,
        sort_by: listing.sort.as_str().to_string(),
        facet_counts: outcome.facets.into(),
        all_types: ResourceType::ALL.iter().map(|t| t.label().to_string()).collect(),
        all_langs: options.languages,
        all_categories: options.categories.into_iter().map(CategoryResponse::from).collect(),
        active_types: listing.facets.types.iter().map(|t| t.label().to_string()).collect(),
        active_langs: listing.facets.languages.clone(),
        active_categories: listing.facets.categories.clone(),
        start_year: years.start,
        end_year: years.end,
        advanced_params,
        log_warning: outcome.log_warning,
    }
}

//=========================================================================================
// Simple Search
//=========================================================================================

/// Keyword search across title, description, creator and subject.
///
/// An empty `q` redirects to the browse listing without searching or logging.
#[utoipa::path(
    get,
    path = "/search",
    params(
        ("q" = Option<String>, Query, description = "Free-text query."),
        ("page" = Option<i64>, Query, description = "1-indexed page number."),
        ("sort" = Option<String>, Query, description = "date_desc | date_asc | title_asc | title_desc"),
        ("type" = Option<Vec<String>>, Query, description = "Selected resource types (repeatable)."),
        ("lang" = Option<Vec<String>>, Query, description = "Selected languages (repeatable)."),
        ("cat" = Option<Vec<String>>, Query, description = "Selected category ids (repeatable)."),
        ("start_year" = Option<i32>, Query, description = "Earliest publication year."),
        ("end_year" = Option<i32>, Query, description = "Latest publication year."),
    ),
    responses(
        (status = 200, description = "Search results", body = SearchResultsResponse),
        (status = 302, description = "Empty query, redirected to /browse"),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, (StatusCode, String)> {
    let params = Params(pairs);
    let query = params.first("q").unwrap_or_default().to_string();
    if query.is_empty() {
        return Ok(redirect_to_browse());
    }

    let listing = ListingParams::from_params(&params);
    let years = YearRange::parse(
        params.first("start_year"),
        params.first("end_year"),
        current_year(),
    );
    info!("User {} searched for '{}'", user_id, query);

    let request = SearchRequest {
        text: TextQuery::Simple(query.clone()),
        years,
        facets: listing.facets.clone(),
        sort: listing.sort,
        page: PageRequest::new(listing.page, SEARCH_PAGE_SIZE),
        log_as: Some(SearchLogEntry::simple(user_id, &query)),
    };
    let options = load_facet_options(&state).await?;
    let outcome = run_search(&state, request).await?;
    let body = results_response("Search Results", query, outcome, options, &listing, years, None);
    Ok(Json(body).into_response())
}

//=========================================================================================
// Advanced Search
//=========================================================================================

fn form_response(errors: Vec<String>) -> Response {
    let body = AdvancedSearchFormResponse {
        fields: FieldScope::CHOICES.iter().map(|c| c.to_string()).collect(),
        operators: Combinator::CHOICES.iter().map(|c| c.to_string()).collect(),
        years: (FORM_FIRST_YEAR..=current_year()).rev().collect(),
        errors,
    };
    Json(body).into_response()
}

async fn advanced_results(
    state: &AppState,
    form: &AdvancedSearchForm,
    listing: ListingParams,
    log_as: Option<SearchLogEntry>,
) -> Result<Response, (StatusCode, String)> {
    let Some(query) = form.to_query() else {
        return Ok(form_response(Vec::new()));
    };
    let years = form.years(current_year());
    let request = SearchRequest {
        text: TextQuery::Advanced(query),
        years,
        facets: listing.facets.clone(),
        sort: listing.sort,
        page: PageRequest::new(listing.page, SEARCH_PAGE_SIZE),
        log_as,
    };
    let options = load_facet_options(state).await?;
    let outcome = run_search(state, request).await?;
    let advanced_params = form.link_params().into_iter().collect();
    let body = results_response(
        "Advanced Search Results",
        "Advanced Search".to_string(),
        outcome,
        options,
        &listing,
        years,
        Some(advanced_params),
    );
    Ok(Json(body).into_response())
}

/// Re-renders advanced search results from URL parameters, or returns the
/// form choices when no first term is present. Never logs.
#[utoipa::path(
    get,
    path = "/advanced-search",
    params(
        ("term1" = Option<String>, Query, description = "First (required) term."),
        ("field1" = Option<String>, Query, description = "all | title | creator | subject | description"),
        ("op2" = Option<String>, Query, description = "AND | OR | NOT"),
        ("term2" = Option<String>, Query),
        ("field2" = Option<String>, Query),
        ("op3" = Option<String>, Query),
        ("term3" = Option<String>, Query),
        ("field3" = Option<String>, Query),
        ("start_year" = Option<i32>, Query),
        ("end_year" = Option<i32>, Query),
        ("page" = Option<i64>, Query),
        ("sort" = Option<String>, Query),
        ("type" = Option<Vec<String>>, Query),
        ("lang" = Option<Vec<String>>, Query),
        ("cat" = Option<Vec<String>>, Query),
    ),
    responses(
        (status = 200, description = "Results, or the form choices", body = SearchResultsResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn advanced_search_handler(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<CurrentUser>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, (StatusCode, String)> {
    let params = Params(pairs);
    let form = AdvancedSearchForm::from_params(&params);
    advanced_results(&state, &form, ListingParams::from_params(&params), None).await
}

/// Runs a submitted advanced search form. The search is logged only when
/// the submission validates.
#[utoipa::path(
    post,
    path = "/advanced-search",
    request_body(content_type = "application/x-www-form-urlencoded", description = "term1, field1, op2, term2, field2, op3, term3, field3, start_year, end_year"),
    responses(
        (status = 200, description = "Results, or the form choices with errors", body = SearchResultsResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn advanced_search_submit_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(pairs): Query<Vec<(String, String)>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, (StatusCode, String)> {
    let form = AdvancedSearchForm::from_params(&Params(fields));
    let listing = ListingParams::from_params(&Params(pairs));

    let log_as = match (form.validate(current_year()), form.first_term()) {
        (Ok(()), Some(term)) => {
            info!("User {} ran an advanced search for '{}'", user_id, term);
            Some(SearchLogEntry::advanced(user_id, term))
        }
        (Err(errors), None) => return Ok(form_response(errors)),
        (Err(errors), Some(_)) => {
            info!("Advanced search form did not validate: {:?}", errors);
            None
        }
        (Ok(()), None) => None,
    };

    advanced_results(&state, &form, listing, log_as).await
}

//=========================================================================================
// Suggestions
//=========================================================================================

#[derive(Deserialize)]
pub struct SuggestionParams {
    pub q: Option<String>,
}

/// Up to five titles containing `q`; `[]` when `q` is shorter than two characters.
#[utoipa::path(
    get,
    path = "/search/suggestions",
    params(("q" = Option<String>, Query, description = "Title fragment, at least 2 characters.")),
    responses(
        (status = 200, description = "Matching titles", body = Vec<String>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn suggestions_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    let titles = state
        .search()
        .suggestions(params.q.as_deref())
        .await
        .map_err(|e| internal_error("Failed to load suggestions", e))?;
    Ok(Json(titles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{body_json, pairs, test_state, ALICE};
    use async_trait::async_trait;
    use library_core::domain::Resource;
    use library_core::ports::{FacetField, PortResult, ResourceStore};
    use library_core::search::{Predicate, SortKey};
    use library_core::InMemoryLibrary;

    #[tokio::test]
    async fn empty_query_redirects_to_browse_without_logging() {
        let (state, lib) = test_state();
        let response = search_handler(State(state), Extension(ALICE), Query(pairs(&[("q", "")])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], BROWSE_PATH);
        assert!(lib.query_logs().is_empty());
    }

    #[tokio::test]
    async fn simple_search_returns_page_and_facets() {
        let (state, lib) = test_state();
        let response = search_handler(
            State(state),
            Extension(ALICE),
            Query(pairs(&[("q", "rust"), ("type", "E-book")])),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["facet_counts"]["types"]["E-book"], 2);
        assert_eq!(body["facet_counts"]["types"]["Journal"], 1);
        assert_eq!(body["active_types"][0], "E-book");
        assert_eq!(body["all_types"].as_array().unwrap().len(), 5);

        let logs = lib.query_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].results_count, 2);
    }

    #[tokio::test]
    async fn out_of_range_years_are_ignored() {
        let (state, _lib) = test_state();
        let response = search_handler(
            State(state),
            Extension(ALICE),
            Query(pairs(&[("q", "rust"), ("start_year", "999"), ("end_year", "soon")])),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert!(body["start_year"].is_null());
        assert!(body["end_year"].is_null());
        assert_eq!(body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn advanced_get_without_term_returns_form() {
        let (state, _lib) = test_state();
        let response = advanced_search_handler(State(state), Extension(ALICE), Query(Vec::new()))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["operators"].as_array().unwrap().len(), 3);
        assert_eq!(body["years"].as_array().unwrap().last().unwrap(), FORM_FIRST_YEAR);
    }

    #[tokio::test]
    async fn advanced_get_recomputes_without_logging() {
        let (state, lib) = test_state();
        let response = advanced_search_handler(
            State(state),
            Extension(ALICE),
            Query(pairs(&[("term1", "rust"), ("op2", "NOT"), ("term2", "journal"), ("field2", "title")])),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["advanced_params"]["term1"], "rust");
        assert!(lib.query_logs().is_empty());
    }

    #[tokio::test]
    async fn valid_advanced_submission_logs_once() {
        let (state, lib) = test_state();
        let response = advanced_search_submit_handler(
            State(state),
            Extension(ALICE),
            Query(pairs(&[("page", "1")])),
            Form(pairs(&[("term1", "rust"), ("field1", "all"), ("op2", "AND"), ("term2", "")])),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let logs = lib.query_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].query_text, "Advanced: rust");
        assert_eq!(logs[0].results_count, 3);
    }

    #[tokio::test]
    async fn invalid_advanced_submission_shows_results_but_does_not_log() {
        let (state, lib) = test_state();
        let response = advanced_search_submit_handler(
            State(state),
            Extension(ALICE),
            Query(Vec::new()),
            Form(pairs(&[("term1", "rust"), ("field1", "isbn")])),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["pagination"]["total"], 3);
        assert!(lib.query_logs().is_empty());
    }

    #[tokio::test]
    async fn suggestions_require_two_characters() {
        let (state, _lib) = test_state();
        let Json(none) = suggestions_handler(
            State(state.clone()),
            Query(SuggestionParams { q: Some("r".to_string()) }),
        )
        .await
        .unwrap();
        assert!(none.is_empty());

        let Json(titles) = suggestions_handler(
            State(state),
            Query(SuggestionParams { q: Some("rust".to_string()) }),
        )
        .await
        .unwrap();
        assert_eq!(titles.len(), 3);
    }

    #[test]
    fn port_errors_map_to_status_codes() {
        let missing = port_error("x", PortError::NotFound("gone".to_string()));
        assert_eq!(missing, (StatusCode::NOT_FOUND, "gone".to_string()));
        let clash = port_error("x", PortError::Conflict("taken".to_string()));
        assert_eq!(clash.0, StatusCode::CONFLICT);
        let broken = port_error("Lookup failed", PortError::Unexpected("io".to_string()));
        assert_eq!(broken, (StatusCode::INTERNAL_SERVER_ERROR, "Lookup failed".to_string()));
    }

    /// Serves the catalog from memory but cannot list categories.
    struct NoCategories(Arc<InMemoryLibrary>);

    #[async_trait]
    impl ResourceStore for NoCategories {
        async fn count(&self, predicate: &Predicate) -> PortResult<u64> {
            self.0.count(predicate).await
        }

        async fn group_count(
            &self,
            predicate: &Predicate,
            field: FacetField,
        ) -> PortResult<BTreeMap<String, u64>> {
            self.0.group_count(predicate, field).await
        }

        async fn matching_ids(&self, predicate: &Predicate) -> PortResult<Vec<i64>> {
            self.0.matching_ids(predicate).await
        }

        async fn category_counts(&self, resource_ids: &[i64]) -> PortResult<BTreeMap<i64, u64>> {
            self.0.category_counts(resource_ids).await
        }

        async fn fetch_page(
            &self,
            predicate: &Predicate,
            sort: SortKey,
            page: &PageRequest,
        ) -> PortResult<Vec<Resource>> {
            self.0.fetch_page(predicate, sort, page).await
        }

        async fn get_resource(&self, resource_id: i64) -> PortResult<Resource> {
            self.0.get_resource(resource_id).await
        }

        async fn title_suggestions(&self, fragment: &str, limit: u32) -> PortResult<Vec<String>> {
            self.0.title_suggestions(fragment, limit).await
        }

        async fn languages(&self) -> PortResult<Vec<String>> {
            self.0.languages().await
        }

        async fn categories(&self) -> PortResult<Vec<Category>> {
            Err(PortError::Unexpected("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_option_lists_leave_no_log_rows() {
        let (state, lib) = test_state();
        let mut broken = (*state).clone();
        broken.resources = Arc::new(NoCategories(lib.clone()));
        let broken = Arc::new(broken);

        let err = search_handler(
            State(broken.clone()),
            Extension(ALICE),
            Query(pairs(&[("q", "rust")])),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);

        let err = advanced_search_submit_handler(
            State(broken),
            Extension(ALICE),
            Query(Vec::new()),
            Form(pairs(&[("term1", "rust")])),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);

        assert!(lib.query_logs().is_empty());
    }
}
