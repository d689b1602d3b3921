//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! store ports from the core crate (resources, search logs, sessions,
//! categories, favorites and downloads).
//! It handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use library_core::domain::{
    Category, DownloadLog, NewSearchRecord, Resource, ResourceType, SearchHistory,
};
use library_core::ports::{
    CategoryStore, DownloadStore, FacetField, FavoriteStore, PortError, PortResult, ResourceStore,
    SearchLogStore, SessionStore,
};
use library_core::search::{PageRequest, Predicate, SortKey};
use sqlx::{FromRow, PgPool};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use uuid::Uuid;

use super::sql::{contains_pattern, order_by, select_where, RESOURCE_COLUMNS};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Loads the categories of each listed resource, keyed by resource id.
    async fn categories_for(&self, resource_ids: &[i64]) -> PortResult<HashMap<i64, Vec<Category>>> {
        if resource_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, ResourceCategoryRecord>(
            "SELECT rc.resource_id, c.id, c.name FROM resource_categories rc \
             JOIN categories c ON c.id = rc.category_id \
             WHERE rc.resource_id = ANY($1) ORDER BY c.name ASC",
        )
        .bind(resource_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut by_resource: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in rows {
            by_resource.entry(row.resource_id).or_default().push(Category {
                id: row.id,
                name: row.name,
            });
        }
        Ok(by_resource)
    }

    async fn with_categories(&self, records: Vec<ResourceRecord>) -> PortResult<Vec<Resource>> {
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let mut categories = self.categories_for(&ids).await?;
        records
            .into_iter()
            .map(|record| {
                let tags = categories.remove(&record.id).unwrap_or_default();
                record.to_domain(tags)
            })
            .collect()
    }

    async fn ensure_resource(&self, resource_id: i64) -> PortResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM resources WHERE id = $1)")
            .bind(resource_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        if exists {
            Ok(())
        } else {
            Err(PortError::NotFound(format!("Resource {} not found", resource_id)))
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ResourceRecord {
    id: i64,
    filename: String,
    upload_date: DateTime<Utc>,
    title: String,
    creator: String,
    subject: Option<String>,
    description: Option<String>,
    publisher: Option<String>,
    publication_date: Option<NaiveDate>,
    resource_type: String,
    format: Option<String>,
    language: Option<String>,
    rights: Option<String>,
    preview_image: Option<String>,
}
impl ResourceRecord {
    fn to_domain(self, categories: Vec<Category>) -> PortResult<Resource> {
        let resource_type = ResourceType::from_label(&self.resource_type).ok_or_else(|| {
            PortError::Unexpected(format!(
                "Resource {} has unknown type '{}'",
                self.id, self.resource_type
            ))
        })?;
        Ok(Resource {
            id: self.id,
            filename: self.filename,
            upload_date: self.upload_date,
            title: self.title,
            creator: self.creator,
            subject: self.subject,
            description: self.description,
            publisher: self.publisher,
            publication_date: self.publication_date,
            resource_type,
            format: self.format,
            language: self.language,
            rights: self.rights,
            preview_image: self.preview_image,
            categories,
        })
    }
}

#[derive(FromRow)]
struct ResourceCategoryRecord {
    resource_id: i64,
    id: i64,
    name: String,
}

#[derive(FromRow)]
struct CategoryRecord {
    id: i64,
    name: String,
}
impl CategoryRecord {
    fn to_domain(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct SearchHistoryRecord {
    id: i64,
    user_id: Uuid,
    query_text: String,
    search_date: DateTime<Utc>,
}
impl SearchHistoryRecord {
    fn to_domain(self) -> SearchHistory {
        SearchHistory {
            id: self.id,
            user_id: self.user_id,
            query_text: self.query_text,
            search_date: self.search_date,
        }
    }
}

#[derive(FromRow)]
struct DownloadLogRecord {
    id: i64,
    user_id: Uuid,
    resource_id: i64,
    resource_title: String,
    download_date: DateTime<Utc>,
}
impl DownloadLogRecord {
    fn to_domain(self) -> DownloadLog {
        DownloadLog {
            id: self.id,
            user_id: self.user_id,
            resource_id: self.resource_id,
            resource_title: self.resource_title,
            download_date: self.download_date,
        }
    }
}

//=========================================================================================
// `ResourceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ResourceStore for DbAdapter {
    async fn count(&self, predicate: &Predicate) -> PortResult<u64> {
        let mut builder = select_where("COUNT(*)", predicate);
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u64)
    }

    async fn group_count(
        &self,
        predicate: &Predicate,
        field: FacetField,
    ) -> PortResult<BTreeMap<String, u64>> {
        let column = match field {
            FacetField::ResourceType => "r.resource_type",
            FacetField::Language => "r.language",
        };
        let mut builder = select_where(&format!("{}, COUNT(*)", column), predicate);
        builder.push(" GROUP BY ").push(column);

        let rows: Vec<(Option<String>, i64)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(rows
            .into_iter()
            .filter_map(|(value, count)| value.map(|v| (v, count as u64)))
            .collect())
    }

    async fn matching_ids(&self, predicate: &Predicate) -> PortResult<Vec<i64>> {
        let mut builder = select_where("r.id", predicate);
        builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn category_counts(&self, resource_ids: &[i64]) -> PortResult<BTreeMap<i64, u64>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT rc.category_id, COUNT(DISTINCT rc.resource_id) FROM resource_categories rc \
             WHERE rc.resource_id = ANY($1) GROUP BY rc.category_id",
        )
        .bind(resource_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(rows
            .into_iter()
            .map(|(category_id, count)| (category_id, count as u64))
            .collect())
    }

    async fn fetch_page(
        &self,
        predicate: &Predicate,
        sort: SortKey,
        page: &PageRequest,
    ) -> PortResult<Vec<Resource>> {
        let mut builder = select_where(RESOURCE_COLUMNS, predicate);
        builder
            .push(" ORDER BY ")
            .push(order_by(sort))
            .push(" LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        debug!("Fetching resource page: {}", builder.sql());

        let records: Vec<ResourceRecord> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        self.with_categories(records).await
    }

    async fn get_resource(&self, resource_id: i64) -> PortResult<Resource> {
        let record = sqlx::query_as::<_, ResourceRecord>(&format!(
            "SELECT {} FROM resources r WHERE r.id = $1",
            RESOURCE_COLUMNS
        ))
        .bind(resource_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Resource {} not found", resource_id))
            }
            _ => unexpected(e),
        })?;

        let mut resources = self.with_categories(vec![record]).await?;
        resources
            .pop()
            .ok_or_else(|| PortError::NotFound(format!("Resource {} not found", resource_id)))
    }

    async fn title_suggestions(&self, fragment: &str, limit: u32) -> PortResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT title FROM resources WHERE title ILIKE $1 ORDER BY id ASC LIMIT $2",
        )
        .bind(contains_pattern(fragment))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn languages(&self) -> PortResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT language FROM resources WHERE language IS NOT NULL ORDER BY language ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn categories(&self) -> PortResult<Vec<Category>> {
        let records =
            sqlx::query_as::<_, CategoryRecord>("SELECT id, name FROM categories ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `SearchLogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SearchLogStore for DbAdapter {
    async fn record_search(&self, record: NewSearchRecord) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("INSERT INTO search_history (user_id, query_text) VALUES ($1, $2)")
            .bind(record.user_id)
            .bind(&record.history_text)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        sqlx::query("INSERT INTO search_query_logs (query_text, results_count) VALUES ($1, $2)")
            .bind(&record.log_text)
            .bind(record.results_count)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn recent_history(&self, user_id: Uuid, limit: u32) -> PortResult<Vec<SearchHistory>> {
        let records = sqlx::query_as::<_, SearchHistoryRecord>(
            "SELECT id, user_id, query_text, search_date FROM search_history \
             WHERE user_id = $1 ORDER BY search_date DESC, id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for DbAdapter {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        user_id.ok_or(PortError::Unauthorized)
    }

    async fn is_admin(&self, user_id: Uuid) -> PortResult<bool> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(role.as_deref() == Some("admin"))
    }
}

//=========================================================================================
// `CategoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CategoryStore for DbAdapter {
    async fn create_category(&self, name: &str) -> PortResult<Category> {
        let record = sqlx::query_as::<_, CategoryRecord>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Category '{}' already exists", name))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn remove_category(&self, category_id: i64) -> PortResult<Category> {
        // resource_categories rows go with it through ON DELETE CASCADE.
        let record = sqlx::query_as::<_, CategoryRecord>(
            "DELETE FROM categories WHERE id = $1 RETURNING id, name",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record
            .map(|r| r.to_domain())
            .ok_or_else(|| PortError::NotFound(format!("Category {} not found", category_id)))
    }
}

//=========================================================================================
// `FavoriteStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl FavoriteStore for DbAdapter {
    async fn count_favorites(&self, user_id: Uuid) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u64)
    }

    async fn fetch_favorites(&self, user_id: Uuid, page: &PageRequest) -> PortResult<Vec<Resource>> {
        let records = sqlx::query_as::<_, ResourceRecord>(&format!(
            "SELECT {} FROM resources r JOIN favorites f ON f.resource_id = r.id \
             WHERE f.user_id = $1 ORDER BY {} LIMIT $2 OFFSET $3",
            RESOURCE_COLUMNS,
            order_by(SortKey::TitleAsc)
        ))
        .bind(user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.with_categories(records).await
    }

    async fn add_favorite(&self, user_id: Uuid, resource_id: i64) -> PortResult<bool> {
        self.ensure_resource(resource_id).await?;
        let result = sqlx::query(
            "INSERT INTO favorites (user_id, resource_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(resource_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_favorite(&self, user_id: Uuid, resource_id: i64) -> PortResult<bool> {
        self.ensure_resource(resource_id).await?;
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND resource_id = $2")
            .bind(user_id)
            .bind(resource_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }
}

//=========================================================================================
// `DownloadStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DownloadStore for DbAdapter {
    async fn record_download(&self, user_id: Uuid, resource_id: i64) -> PortResult<()> {
        sqlx::query("INSERT INTO download_logs (user_id, resource_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(resource_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    PortError::NotFound(format!("Resource {} not found", resource_id))
                }
                _ => unexpected(e),
            })?;
        Ok(())
    }

    async fn count_downloads(&self) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM download_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u64)
    }

    async fn recent_downloads(&self, page: &PageRequest) -> PortResult<Vec<DownloadLog>> {
        let records = sqlx::query_as::<_, DownloadLogRecord>(
            "SELECT d.id, d.user_id, d.resource_id, r.title AS resource_title, d.download_date \
             FROM download_logs d JOIN resources r ON r.id = d.resource_id \
             ORDER BY d.download_date DESC, d.id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
