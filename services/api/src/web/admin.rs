//! services/api/src/web/admin.rs
//!
//! Administrator handlers: category management and recent download activity.
//! Routed behind both `require_auth` and `require_admin`.

use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use library_core::catalog::CatalogError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::web::params::{named_page_param, Params};
use crate::web::rest::{CategoryResponse, DownloadLogResponse, PaginationResponse, RecentActivityResponse};
use crate::web::search::{internal_error, port_error};
use crate::web::state::{AppState, CurrentUser};

#[derive(Deserialize, ToSchema, Debug)]
pub struct CategoryForm {
    /// 2 to 100 characters, unique.
    pub name: String,
}

#[utoipa::path(
    post,
    path = "/admin/category/add",
    request_body(content = CategoryForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Name too short or too long"),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "Name already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_category_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Form(form): Form<CategoryForm>,
) -> Result<(StatusCode, Json<CategoryResponse>), (StatusCode, String)> {
    info!("Admin {} is adding category '{}'", user_id, form.name);
    let category = state
        .catalog()
        .add_category(&form.name)
        .await
        .map_err(|e| match e {
            CatalogError::InvalidCategoryName { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
            CatalogError::Store(e) => port_error("Failed to add category", e),
        })?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Deletes a category. Its resources stay and only lose the tag.
#[utoipa::path(
    post,
    path = "/admin/category/delete/{id}",
    params(("id" = i64, Path, description = "Category id.")),
    responses(
        (status = 200, description = "The deleted category", body = CategoryResponse),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "No such category"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_category_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(category_id): Path<i64>,
) -> Result<Json<CategoryResponse>, (StatusCode, String)> {
    info!("Admin {} is deleting category {}", user_id, category_id);
    let category = state
        .catalog()
        .delete_category(category_id)
        .await
        .map_err(|e| port_error("Failed to delete category", e))?;
    Ok(Json(category.into()))
}

/// Latest downloads across all users, four per page.
#[utoipa::path(
    get,
    path = "/admin/activity",
    params(("activity_page" = Option<i64>, Query, description = "1-indexed page number.")),
    responses(
        (status = 200, description = "Recent downloads", body = RecentActivityResponse),
        (status = 403, description = "Not an administrator"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn recent_activity_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<RecentActivityResponse>, (StatusCode, String)> {
    let page = named_page_param(&Params(pairs), "activity_page");
    let downloads = state
        .catalog()
        .recent_downloads(page)
        .await
        .map_err(|e| internal_error("Failed to load recent downloads", e))?;

    let pagination = PaginationResponse::from(&downloads);
    Ok(Json(RecentActivityResponse {
        downloads: downloads
            .items
            .into_iter()
            .map(DownloadLogResponse::from)
            .collect(),
        pagination,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::account::download_handler;
    use crate::web::test_support::{pairs, test_state, ADMIN, ALICE};
    use library_core::ports::ResourceStore;

    fn form(name: &str) -> Form<CategoryForm> {
        Form(CategoryForm {
            name: name.to_string(),
        })
    }

    #[tokio::test]
    async fn categories_are_created_once() {
        let (state, _lib) = test_state();
        let (status, Json(created)) =
            add_category_handler(State(state.clone()), Extension(ADMIN), form(" Poetry "))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.name, "Poetry");

        let err = add_category_handler(State(state.clone()), Extension(ADMIN), form("Poetry"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let err = add_category_handler(State(state), Extension(ADMIN), form("P"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_a_category_detaches_it_from_resources() {
        let (state, lib) = test_state();
        let languages = lib
            .categories()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.name == "Languages")
            .unwrap();

        let Json(deleted) =
            delete_category_handler(State(state.clone()), Extension(ADMIN), Path(languages.id))
                .await
                .unwrap();
        assert_eq!(deleted.name, "Languages");

        let tagged = lib.get_resource(2).await.unwrap();
        assert!(tagged.categories.is_empty());
        assert_eq!(lib.get_resource(1).await.unwrap().categories.len(), 1);

        let err = delete_category_handler(State(state), Extension(ADMIN), Path(languages.id))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn activity_pages_recent_downloads_four_at_a_time() {
        let (state, _lib) = test_state();
        std::fs::write(state.config.upload_dir.join("upload-4.pdf"), b"seeds").unwrap();
        for _ in 0..5 {
            download_handler(State(state.clone()), Extension(ALICE), Path(4))
                .await
                .unwrap();
        }

        let Json(first) = recent_activity_handler(State(state.clone()), Query(Vec::new()))
            .await
            .unwrap();
        assert_eq!(first.downloads.len(), 4);
        assert_eq!(first.pagination.total, 5);
        assert!(first.pagination.has_next);
        assert_eq!(first.downloads[0].resource_title, "Gardening");

        let Json(second) =
            recent_activity_handler(State(state), Query(pairs(&[("activity_page", "2")])))
                .await
                .unwrap();
        assert_eq!(second.downloads.len(), 1);
    }
}
