//! services/api/src/web/catalog.rs
//!
//! Handlers for browsing the catalog, viewing a resource and the user's
//! recent search history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use library_core::ports::PortError;
use std::sync::Arc;

use crate::web::params::{page_param, Params};
use crate::web::rest::{BrowseResponse, PaginationResponse, ResourceResponse, SearchHistoryResponse};
use crate::web::search::internal_error;
use crate::web::state::{AppState, CurrentUser};

/// Every resource, most recently uploaded first, six per page.
#[utoipa::path(
    get,
    path = "/browse",
    params(("page" = Option<i64>, Query, description = "1-indexed page number.")),
    responses(
        (status = 200, description = "One page of the catalog", body = BrowseResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn browse_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<BrowseResponse>, (StatusCode, String)> {
    let page = state
        .search()
        .browse(page_param(&Params(pairs)))
        .await
        .map_err(|e| internal_error("Failed to browse resources", e))?;

    let pagination = PaginationResponse::from(&page);
    Ok(Json(BrowseResponse {
        resources: page.items.into_iter().map(ResourceResponse::from).collect(),
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/resource/{id}",
    params(("id" = i64, Path, description = "Resource id.")),
    responses(
        (status = 200, description = "The resource", body = ResourceResponse),
        (status = 404, description = "No such resource"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn resource_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(resource_id): Path<i64>,
) -> Result<Json<ResourceResponse>, (StatusCode, String)> {
    match state.resources.get_resource(resource_id).await {
        Ok(resource) => Ok(Json(resource.into())),
        Err(PortError::NotFound(message)) => Err((StatusCode::NOT_FOUND, message)),
        Err(e) => Err(internal_error("Failed to load resource", e)),
    }
}

/// The current user's ten most recent searches, newest first.
#[utoipa::path(
    get,
    path = "/my-account/history",
    responses(
        (status = 200, description = "Recent searches", body = Vec<SearchHistoryResponse>),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn search_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<SearchHistoryResponse>>, (StatusCode, String)> {
    let history = state
        .search()
        .recent_history(user_id)
        .await
        .map_err(|e| internal_error("Failed to load search history", e))?;
    Ok(Json(history.into_iter().map(SearchHistoryResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::search::search_handler;
    use crate::web::test_support::{pairs, test_state, ALICE, BOB};

    #[tokio::test]
    async fn browse_pages_newest_first() {
        let (state, _lib) = test_state();
        let Json(body) = browse_handler(State(state), Query(Vec::new())).await.unwrap();

        let ids: Vec<i64> = body.resources.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        assert_eq!(body.pagination.per_page, 6);
        assert_eq!(body.pagination.total_pages, 1);
    }

    #[tokio::test]
    async fn browse_past_the_end_is_empty() {
        let (state, _lib) = test_state();
        let Json(body) = browse_handler(State(state), Query(pairs(&[("page", "5")])))
            .await
            .unwrap();

        assert!(body.resources.is_empty());
        assert_eq!(body.pagination.total, 4);
        assert!(!body.pagination.has_next);
    }

    #[tokio::test]
    async fn missing_resource_is_404() {
        let (state, _lib) = test_state();
        let err = resource_detail_handler(State(state), Path(99)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resource_detail_includes_categories() {
        let (state, _lib) = test_state();
        let Json(resource) = resource_detail_handler(State(state), Path(1)).await.unwrap();
        assert_eq!(resource.resource_type, "E-book");
        assert_eq!(resource.categories.len(), 2);
    }

    #[tokio::test]
    async fn history_is_per_user_and_newest_first() {
        let (state, _lib) = test_state();
        for q in ["rust", "journal"] {
            search_handler(State(state.clone()), Extension(ALICE), Query(pairs(&[("q", q)])))
                .await
                .unwrap();
        }

        let Json(alice) = search_history_handler(State(state.clone()), Extension(ALICE))
            .await
            .unwrap();
        let texts: Vec<&str> = alice.iter().map(|h| h.query_text.as_str()).collect();
        assert_eq!(texts, vec!["journal", "rust"]);

        let Json(bob) = search_history_handler(State(state), Extension(BOB)).await.unwrap();
        assert!(bob.is_empty());
    }
}
