//! crates/library_core/src/catalog.rs
//!
//! Catalog upkeep outside of search: category management, per-user
//! favorites and download auditing.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Category, DownloadLog, Resource};
use crate::ports::{CategoryStore, DownloadStore, FavoriteStore, PortError, PortResult, ResourceStore};
use crate::search::pagination::{Page, PageRequest, ACTIVITY_PAGE_SIZE, BROWSE_PAGE_SIZE};

pub const CATEGORY_NAME_MIN_CHARS: usize = 2;
pub const CATEGORY_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Category name must be between {min} and {max} characters long")]
    InvalidCategoryName { min: usize, max: usize },
    #[error(transparent)]
    Store(#[from] PortError),
}

#[derive(Clone)]
pub struct CatalogService {
    resources: Arc<dyn ResourceStore>,
    categories: Arc<dyn CategoryStore>,
    favorites: Arc<dyn FavoriteStore>,
    downloads: Arc<dyn DownloadStore>,
}

impl CatalogService {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        categories: Arc<dyn CategoryStore>,
        favorites: Arc<dyn FavoriteStore>,
        downloads: Arc<dyn DownloadStore>,
    ) -> Self {
        Self {
            resources,
            categories,
            favorites,
            downloads,
        }
    }

    // --- Categories ---

    /// Creates a category from a trimmed, 2 to 100 character name.
    pub async fn add_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = name.trim();
        let length = name.chars().count();
        if !(CATEGORY_NAME_MIN_CHARS..=CATEGORY_NAME_MAX_CHARS).contains(&length) {
            return Err(CatalogError::InvalidCategoryName {
                min: CATEGORY_NAME_MIN_CHARS,
                max: CATEGORY_NAME_MAX_CHARS,
            });
        }
        let category = self.categories.create_category(name).await?;
        info!("Category '{}' added with id {}", category.name, category.id);
        Ok(category)
    }

    pub async fn delete_category(&self, category_id: i64) -> PortResult<Category> {
        let category = self.categories.remove_category(category_id).await?;
        info!("Category '{}' deleted", category.name);
        Ok(category)
    }

    // --- Favorites ---

    /// The user's favorites, title ascending, six per page.
    pub async fn favorites(&self, user_id: Uuid, page: i64) -> PortResult<Page<Resource>> {
        let request = PageRequest::new(page, BROWSE_PAGE_SIZE);
        let total = self.favorites.count_favorites(user_id).await?;
        let items = self.favorites.fetch_favorites(user_id, &request).await?;
        Ok(Page::new(items, request, total))
    }

    pub async fn add_favorite(&self, user_id: Uuid, resource_id: i64) -> PortResult<bool> {
        self.favorites.add_favorite(user_id, resource_id).await
    }

    pub async fn remove_favorite(&self, user_id: Uuid, resource_id: i64) -> PortResult<bool> {
        self.favorites.remove_favorite(user_id, resource_id).await
    }

    // --- Downloads ---

    /// Looks up the resource a user is about to download.
    pub async fn download_target(&self, resource_id: i64) -> PortResult<Resource> {
        self.resources.get_resource(resource_id).await
    }

    pub async fn record_download(&self, user_id: Uuid, resource_id: i64) -> PortResult<()> {
        self.downloads.record_download(user_id, resource_id).await?;
        info!("User {} downloaded resource {}", user_id, resource_id);
        Ok(())
    }

    /// Recent downloads across all users, four per page.
    pub async fn recent_downloads(&self, page: i64) -> PortResult<Page<DownloadLog>> {
        let request = PageRequest::new(page, ACTIVITY_PAGE_SIZE);
        let total = self.downloads.count_downloads().await?;
        let items = self.downloads.recent_downloads(&request).await?;
        Ok(Page::new(items, request, total))
    }
}
