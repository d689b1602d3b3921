//! crates/library_core/src/domain.rs
//!
//! Defines the pure, core data structures for the digital library.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

/// The fixed set of resource kinds a catalog entry can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    Ebook,
    Journal,
    ResearchPaper,
    Magazine,
    Newspaper,
}

impl ResourceType {
    /// Every resource type, in the order they are offered as facet options.
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Ebook,
        ResourceType::Journal,
        ResourceType::ResearchPaper,
        ResourceType::Magazine,
        ResourceType::Newspaper,
    ];

    /// The label stored in the database and shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceType::Ebook => "E-book",
            ResourceType::Journal => "Journal",
            ResourceType::ResearchPaper => "Research Paper",
            ResourceType::Magazine => "Magazine",
            ResourceType::Newspaper => "Newspaper",
        }
    }

    /// Parses a stored label. Matching is exact.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

/// A categorical tag that can be attached to many resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A catalogued item (e-book, journal, paper, ...).
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: i64,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    pub title: String,
    pub creator: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub resource_type: ResourceType,
    pub format: Option<String>,
    pub language: Option<String>,
    pub rights: Option<String>,
    pub preview_image: Option<String>,
    pub categories: Vec<Category>,
}

impl Resource {
    pub fn publication_year(&self) -> Option<i32> {
        self.publication_date.map(|d| d.year())
    }

    pub fn has_category(&self, category_id: i64) -> bool {
        self.categories.iter().any(|c| c.id == category_id)
    }
}

/// Longest query text either search log table stores.
pub const QUERY_TEXT_MAX_CHARS: usize = 200;

/// One entry of a user's personal search history.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    pub id: i64,
    pub user_id: Uuid,
    pub query_text: String,
    pub search_date: DateTime<Utc>,
}

/// Anonymous, global record of an executed query and how many results it produced.
#[derive(Debug, Clone)]
pub struct SearchQueryLog {
    pub id: i64,
    pub query_text: String,
    pub results_count: i64,
    pub search_date: DateTime<Utc>,
}

/// The pair of log rows written after a search has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSearchRecord {
    pub user_id: Uuid,
    /// Literal text stored in the user's history.
    pub history_text: String,
    /// Text stored in the anonymous query log.
    pub log_text: String,
    pub results_count: i64,
}

/// A user fetched a resource's file.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadLog {
    pub id: i64,
    pub user_id: Uuid,
    pub resource_id: i64,
    pub resource_title: String,
    pub download_date: DateTime<Utc>,
}
