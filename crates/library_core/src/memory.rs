//! crates/library_core/src/memory.rs
//!
//! An in-memory implementation of every port. It evaluates predicates with
//! `Predicate::matches`, so it doubles as the reference behaviour for the
//! SQL adapter.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::domain::{
    Category, DownloadLog, NewSearchRecord, Resource, SearchHistory, SearchQueryLog,
    QUERY_TEXT_MAX_CHARS,
};
use crate::ports::{
    CategoryStore, DownloadStore, FacetField, FavoriteStore, PortError, PortResult, ResourceStore,
    SearchLogStore, SessionStore,
};
use crate::search::pagination::PageRequest;
use crate::search::predicate::Predicate;
use crate::search::sort::SortKey;

#[derive(Default)]
struct Tables {
    resources: BTreeMap<i64, Resource>,
    categories: BTreeMap<i64, Category>,
    history: Vec<SearchHistory>,
    query_logs: Vec<SearchQueryLog>,
    sessions: HashMap<String, Uuid>,
    admins: HashSet<Uuid>,
    favorites: BTreeSet<(Uuid, i64)>,
    downloads: Vec<DownloadLog>,
    next_category_id: i64,
    next_log_id: i64,
    next_download_id: i64,
}

impl Tables {
    fn resource(&self, resource_id: i64) -> PortResult<&Resource> {
        self.resources
            .get(&resource_id)
            .ok_or_else(|| PortError::NotFound(format!("Resource {} not found", resource_id)))
    }
}

#[derive(Default)]
pub struct InMemoryLibrary {
    tables: RwLock<Tables>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> PortResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| PortError::Unexpected("library lock poisoned".to_string()))
    }

    fn write(&self) -> PortResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| PortError::Unexpected("library lock poisoned".to_string()))
    }

    /// Adds or replaces a resource under its own id.
    pub fn insert_resource(&self, resource: Resource) {
        if let Ok(mut tables) = self.write() {
            tables.resources.insert(resource.id, resource);
        }
    }

    /// Removes a resource along with its category links, favorites and
    /// download log entries.
    pub fn delete_resource(&self, resource_id: i64) -> PortResult<()> {
        let mut tables = self.write()?;
        tables
            .resources
            .remove(&resource_id)
            .ok_or_else(|| PortError::NotFound(format!("Resource {} not found", resource_id)))?;
        tables.favorites.retain(|(_, id)| *id != resource_id);
        tables.downloads.retain(|d| d.resource_id != resource_id);
        Ok(())
    }

    /// Creates a category. Names are unique.
    pub fn add_category(&self, name: &str) -> PortResult<Category> {
        let mut tables = self.write()?;
        if tables.categories.values().any(|c| c.name == name) {
            return Err(PortError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }
        tables.next_category_id += 1;
        let category = Category {
            id: tables.next_category_id,
            name: name.to_string(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    pub fn tag(&self, resource_id: i64, category_id: i64) -> PortResult<()> {
        let mut tables = self.write()?;
        let category = tables
            .categories
            .get(&category_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Category {} not found", category_id)))?;
        let resource = tables
            .resources
            .get_mut(&resource_id)
            .ok_or_else(|| PortError::NotFound(format!("Resource {} not found", resource_id)))?;
        if !resource.has_category(category_id) {
            resource.categories.push(category);
        }
        Ok(())
    }

    pub fn add_session(&self, session_id: &str, user_id: Uuid) {
        if let Ok(mut tables) = self.write() {
            tables.sessions.insert(session_id.to_string(), user_id);
        }
    }

    pub fn add_admin(&self, user_id: Uuid) {
        if let Ok(mut tables) = self.write() {
            tables.admins.insert(user_id);
        }
    }

    /// Removes the history, favorites and sessions owned by `user_id`, as
    /// deleting the user does.
    pub fn forget_user(&self, user_id: Uuid) {
        if let Ok(mut tables) = self.write() {
            tables.history.retain(|h| h.user_id != user_id);
            tables.sessions.retain(|_, owner| *owner != user_id);
            tables.favorites.retain(|(owner, _)| *owner != user_id);
            tables.admins.remove(&user_id);
        }
    }

    /// Snapshot of the anonymous query log, oldest first.
    pub fn query_logs(&self) -> Vec<SearchQueryLog> {
        self.read()
            .map(|tables| tables.query_logs.clone())
            .unwrap_or_default()
    }

    fn matching(&self, predicate: &Predicate) -> PortResult<Vec<Resource>> {
        Ok(self
            .read()?
            .resources
            .values()
            .filter(|r| predicate.matches(r))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResourceStore for InMemoryLibrary {
    async fn count(&self, predicate: &Predicate) -> PortResult<u64> {
        Ok(self.matching(predicate)?.len() as u64)
    }

    async fn group_count(
        &self,
        predicate: &Predicate,
        field: FacetField,
    ) -> PortResult<BTreeMap<String, u64>> {
        let mut counts = BTreeMap::new();
        for resource in self.matching(predicate)? {
            let key = match field {
                FacetField::ResourceType => Some(resource.resource_type.label().to_string()),
                FacetField::Language => resource.language,
            };
            if let Some(key) = key {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn matching_ids(&self, predicate: &Predicate) -> PortResult<Vec<i64>> {
        Ok(self.matching(predicate)?.iter().map(|r| r.id).collect())
    }

    async fn category_counts(&self, resource_ids: &[i64]) -> PortResult<BTreeMap<i64, u64>> {
        let tables = self.read()?;
        let wanted: BTreeSet<i64> = resource_ids.iter().copied().collect();
        let mut counts = BTreeMap::new();
        for id in wanted {
            let Some(resource) = tables.resources.get(&id) else {
                continue;
            };
            let tags: BTreeSet<i64> = resource.categories.iter().map(|c| c.id).collect();
            for tag in tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn fetch_page(
        &self,
        predicate: &Predicate,
        sort: SortKey,
        page: &PageRequest,
    ) -> PortResult<Vec<Resource>> {
        let mut matches = self.matching(predicate)?;
        sort.sort(&mut matches);
        Ok(matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn get_resource(&self, resource_id: i64) -> PortResult<Resource> {
        self.read()?
            .resources
            .get(&resource_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Resource {} not found", resource_id)))
    }

    async fn title_suggestions(&self, fragment: &str, limit: u32) -> PortResult<Vec<String>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .read()?
            .resources
            .values()
            .filter(|r| r.title.to_lowercase().contains(&needle))
            .take(limit as usize)
            .map(|r| r.title.clone())
            .collect())
    }

    async fn languages(&self) -> PortResult<Vec<String>> {
        let languages: BTreeSet<String> = self
            .read()?
            .resources
            .values()
            .filter_map(|r| r.language.clone())
            .collect();
        Ok(languages.into_iter().collect())
    }

    async fn categories(&self) -> PortResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.read()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[async_trait]
impl SearchLogStore for InMemoryLibrary {
    async fn record_search(&self, record: NewSearchRecord) -> PortResult<()> {
        for text in [&record.history_text, &record.log_text] {
            if text.chars().count() > QUERY_TEXT_MAX_CHARS {
                return Err(PortError::Unexpected(format!(
                    "query text longer than {} characters",
                    QUERY_TEXT_MAX_CHARS
                )));
            }
        }
        let mut tables = self.write()?;
        let now = Utc::now();
        tables.next_log_id += 1;
        let id = tables.next_log_id;
        tables.history.push(SearchHistory {
            id,
            user_id: record.user_id,
            query_text: record.history_text,
            search_date: now,
        });
        tables.query_logs.push(SearchQueryLog {
            id,
            query_text: record.log_text,
            results_count: record.results_count,
            search_date: now,
        });
        Ok(())
    }

    async fn recent_history(&self, user_id: Uuid, limit: u32) -> PortResult<Vec<SearchHistory>> {
        Ok(self
            .read()?
            .history
            .iter()
            .rev()
            .filter(|h| h.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionStore for InMemoryLibrary {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.read()?
            .sessions
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)
    }

    async fn is_admin(&self, user_id: Uuid) -> PortResult<bool> {
        Ok(self.read()?.admins.contains(&user_id))
    }
}

#[async_trait]
impl CategoryStore for InMemoryLibrary {
    async fn create_category(&self, name: &str) -> PortResult<Category> {
        self.add_category(name)
    }

    async fn remove_category(&self, category_id: i64) -> PortResult<Category> {
        let mut tables = self.write()?;
        let category = tables
            .categories
            .remove(&category_id)
            .ok_or_else(|| PortError::NotFound(format!("Category {} not found", category_id)))?;
        for resource in tables.resources.values_mut() {
            resource.categories.retain(|c| c.id != category_id);
        }
        Ok(category)
    }
}

#[async_trait]
impl FavoriteStore for InMemoryLibrary {
    async fn count_favorites(&self, user_id: Uuid) -> PortResult<u64> {
        let tables = self.read()?;
        Ok(tables.favorites.iter().filter(|(owner, _)| *owner == user_id).count() as u64)
    }

    async fn fetch_favorites(&self, user_id: Uuid, page: &PageRequest) -> PortResult<Vec<Resource>> {
        let tables = self.read()?;
        let mut favorites: Vec<Resource> = tables
            .favorites
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .filter_map(|(_, id)| tables.resources.get(id).cloned())
            .collect();
        SortKey::TitleAsc.sort(&mut favorites);
        Ok(favorites
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn add_favorite(&self, user_id: Uuid, resource_id: i64) -> PortResult<bool> {
        let mut tables = self.write()?;
        tables.resource(resource_id)?;
        Ok(tables.favorites.insert((user_id, resource_id)))
    }

    async fn remove_favorite(&self, user_id: Uuid, resource_id: i64) -> PortResult<bool> {
        let mut tables = self.write()?;
        tables.resource(resource_id)?;
        Ok(tables.favorites.remove(&(user_id, resource_id)))
    }
}

#[async_trait]
impl DownloadStore for InMemoryLibrary {
    async fn record_download(&self, user_id: Uuid, resource_id: i64) -> PortResult<()> {
        let mut tables = self.write()?;
        let resource_title = tables.resource(resource_id)?.title.clone();
        tables.next_download_id += 1;
        let id = tables.next_download_id;
        tables.downloads.push(DownloadLog {
            id,
            user_id,
            resource_id,
            resource_title,
            download_date: Utc::now(),
        });
        Ok(())
    }

    async fn count_downloads(&self) -> PortResult<u64> {
        Ok(self.read()?.downloads.len() as u64)
    }

    async fn recent_downloads(&self, page: &PageRequest) -> PortResult<Vec<DownloadLog>> {
        let mut downloads = self.read()?.downloads.clone();
        downloads.sort_by(|a, b| {
            b.download_date
                .cmp(&a.download_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(downloads
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }
}
