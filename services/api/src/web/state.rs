//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request user context.

use crate::config::Config;
use library_core::catalog::CatalogService;
use library_core::ports::{
    CategoryStore, DownloadStore, FavoriteStore, ResourceStore, SearchLogStore, SessionStore,
};
use library_core::search::SearchService;
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<dyn ResourceStore>,
    pub search_logs: Arc<dyn SearchLogStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub downloads: Arc<dyn DownloadStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn search(&self) -> SearchService {
        SearchService::new(self.resources.clone(), self.search_logs.clone())
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(
            self.resources.clone(),
            self.categories.clone(),
            self.favorites.clone(),
            self.downloads.clone(),
        )
    }
}

//=========================================================================================
// Request Context
//=========================================================================================

/// The authenticated user of the current request, inserted by `require_auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);
