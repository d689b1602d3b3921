//! services/api/src/web/account.rs
//!
//! Handlers for the user's own account page, favorites and file downloads.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use std::io::ErrorKind;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::web::params::{page_param, Params};
use crate::web::rest::{
    FavoriteChangeResponse, MyAccountResponse, PaginationResponse, ResourceResponse,
    SearchHistoryResponse,
};
use crate::web::search::{internal_error, port_error};
use crate::web::state::{AppState, CurrentUser};

/// The stored file for `filename`, ignoring any directory components.
fn upload_path(upload_dir: &FsPath, filename: &str) -> Option<PathBuf> {
    FsPath::new(filename)
        .file_name()
        .map(|name| upload_dir.join(name))
}

/// Favorites (title ascending, six per page) and the ten latest searches.
#[utoipa::path(
    get,
    path = "/my-account",
    params(("page" = Option<i64>, Query, description = "1-indexed favorites page.")),
    responses(
        (status = 200, description = "The account overview", body = MyAccountResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn my_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<MyAccountResponse>, (StatusCode, String)> {
    let favorites = state
        .catalog()
        .favorites(user_id, page_param(&Params(pairs)))
        .await
        .map_err(|e| internal_error("Failed to load favorites", e))?;
    let history = state
        .search()
        .recent_history(user_id)
        .await
        .map_err(|e| internal_error("Failed to load search history", e))?;

    let pagination = PaginationResponse::from(&favorites);
    Ok(Json(MyAccountResponse {
        favorites: favorites.items.into_iter().map(ResourceResponse::from).collect(),
        pagination,
        search_history: history.into_iter().map(SearchHistoryResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/add-favorite/{id}",
    params(("id" = i64, Path, description = "Resource id.")),
    responses(
        (status = 200, description = "Favorite state after the request", body = FavoriteChangeResponse),
        (status = 404, description = "No such resource"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_favorite_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<i64>,
) -> Result<Json<FavoriteChangeResponse>, (StatusCode, String)> {
    let changed = state
        .catalog()
        .add_favorite(user_id, resource_id)
        .await
        .map_err(|e| port_error("Failed to add favorite", e))?;
    let message = if changed {
        "Resource added to your favorites!"
    } else {
        "This resource is already in your favorites."
    };
    Ok(Json(FavoriteChangeResponse {
        resource_id,
        changed,
        message: message.to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/remove-favorite/{id}",
    params(("id" = i64, Path, description = "Resource id.")),
    responses(
        (status = 200, description = "Favorite state after the request", body = FavoriteChangeResponse),
        (status = 404, description = "No such resource"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn remove_favorite_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<i64>,
) -> Result<Json<FavoriteChangeResponse>, (StatusCode, String)> {
    let changed = state
        .catalog()
        .remove_favorite(user_id, resource_id)
        .await
        .map_err(|e| port_error("Failed to remove favorite", e))?;
    let message = if changed {
        "Resource removed from your favorites."
    } else {
        "This resource is not in your favorites."
    };
    Ok(Json(FavoriteChangeResponse {
        resource_id,
        changed,
        message: message.to_string(),
    }))
}

/// Sends the resource's file as an attachment and records the download.
#[utoipa::path(
    get,
    path = "/download/{id}",
    params(("id" = i64, Path, description = "Resource id.")),
    responses(
        (status = 200, description = "The file", content_type = "application/octet-stream"),
        (status = 404, description = "No such resource, or its file is missing"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<i64>,
) -> Result<Response, (StatusCode, String)> {
    let catalog = state.catalog();
    let resource = catalog
        .download_target(resource_id)
        .await
        .map_err(|e| port_error("Failed to load resource", e))?;

    let missing = || {
        (
            StatusCode::NOT_FOUND,
            format!("File for resource {} is missing", resource_id),
        )
    };
    let path = upload_path(&state.config.upload_dir, &resource.filename).ok_or_else(missing)?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(missing()),
        Err(e) => return Err(internal_error("Failed to read upload", e)),
    };

    catalog
        .record_download(user_id, resource.id)
        .await
        .map_err(|e| port_error("Failed to record download", e))?;
    info!("Serving {} ({} bytes)", path.display(), bytes.len());

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = resource
        .format
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
