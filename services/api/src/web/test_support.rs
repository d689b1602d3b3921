//! Shared fixtures for handler tests.

use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use library_core::domain::{Resource, ResourceType};
use library_core::InMemoryLibrary;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

use crate::config::Config;
use crate::web::state::{AppState, CurrentUser};

pub const ALICE: CurrentUser = CurrentUser(Uuid::from_u128(0xa11ce));
pub const BOB: CurrentUser = CurrentUser(Uuid::from_u128(0xb0b));
pub const ADMIN: CurrentUser = CurrentUser(Uuid::from_u128(0xad));

fn resource(
    id: i64,
    title: &str,
    kind: ResourceType,
    language: &str,
    year: Option<i32>,
) -> Resource {
    Resource {
        id,
        filename: format!("upload-{id}.pdf"),
        upload_date: Utc.with_ymd_and_hms(2025, 1, id as u32, 9, 0, 0).unwrap(),
        title: title.to_string(),
        creator: "Grace Hopper".to_string(),
        subject: None,
        description: Some("A catalogued work".to_string()),
        publisher: None,
        publication_date: year.and_then(|y| NaiveDate::from_ymd_opt(y, 2, 1)),
        resource_type: kind,
        format: Some("application/pdf".to_string()),
        language: Some(language.to_string()),
        rights: None,
        preview_image: None,
        categories: Vec::new(),
    }
}

/// Three resources mention "rust" (two E-books, one Journal); one does not.
/// Resource 1 carries both categories. Uploads live in a fresh temporary
/// directory that starts out empty.
pub fn test_state() -> (Arc<AppState>, Arc<InMemoryLibrary>) {
    let lib = Arc::new(InMemoryLibrary::new());
    lib.insert_resource(resource(1, "Rust in Action", ResourceType::Ebook, "English", Some(2020)));
    lib.insert_resource(resource(2, "Rust Journal", ResourceType::Journal, "French", Some(2018)));
    lib.insert_resource(resource(3, "Learning Rust", ResourceType::Ebook, "French", None));
    lib.insert_resource(resource(4, "Gardening", ResourceType::Magazine, "English", Some(2021)));
    let systems = lib.add_category("Systems").unwrap();
    let languages = lib.add_category("Languages").unwrap();
    lib.tag(1, systems.id).unwrap();
    lib.tag(1, languages.id).unwrap();
    lib.tag(2, languages.id).unwrap();
    lib.add_admin(ADMIN.0);

    let upload_dir = std::env::temp_dir().join(format!("library-uploads-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&upload_dir).unwrap();

    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        log_level: Level::INFO,
        db_max_connections: 1,
        cors_origin: "http://localhost:3000".to_string(),
        upload_dir,
    };
    let state = Arc::new(AppState {
        resources: lib.clone(),
        search_logs: lib.clone(),
        sessions: lib.clone(),
        categories: lib.clone(),
        favorites: lib.clone(),
        downloads: lib.clone(),
        config: Arc::new(config),
    });
    (state, lib)
}

pub fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
