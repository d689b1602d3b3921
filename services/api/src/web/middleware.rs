//! services/api/src/web/middleware.rs
//!
//! Authentication and authorization middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::web::state::{AppState, CurrentUser};

/// Reads the `session` cookie value from the request headers.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and resolves the user.
///
/// If valid, inserts a `CurrentUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Parse session ID from cookie
    let auth_session_id = session_cookie(req.headers())
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_string();

    // 2. Validate auth session, get user_id
    let user_id = state
        .sessions
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to validate auth session: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?;

    // 3. Insert the request-scoped user and continue to the handler
    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}

/// Middleware for administrator-only routes. Runs after `require_auth`.
///
/// Returns 401 when no user was resolved and 403 when the user is not an
/// administrator.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let CurrentUser(user_id) = req
        .extensions()
        .get::<CurrentUser>()
        .copied()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let is_admin = state.sessions.is_admin(user_id).await.map_err(|e| {
        error!("Failed to check the role of user {}: {:?}", user_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if !is_admin {
        warn!("User {} was refused an admin route", user_id);
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(req).await)
}
