pub mod account;
pub mod admin;
pub mod catalog;
pub mod middleware;
pub mod params;
pub mod rest;
pub mod search;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use account::{
    add_favorite_handler, download_handler, my_account_handler, remove_favorite_handler,
};
pub use admin::{add_category_handler, delete_category_handler, recent_activity_handler};
pub use catalog::{browse_handler, resource_detail_handler, search_history_handler};
pub use middleware::{require_admin, require_auth};
pub use search::{
    advanced_search_handler, advanced_search_submit_handler, search_handler, suggestions_handler,
};
