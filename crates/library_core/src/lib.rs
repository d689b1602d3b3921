pub mod catalog;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod search;

pub use catalog::{CatalogError, CatalogService};
pub use domain::{Category, DownloadLog, NewSearchRecord, Resource, ResourceType, SearchHistory, SearchQueryLog};
pub use memory::InMemoryLibrary;
pub use ports::{
    CategoryStore, DownloadStore, FacetField, FavoriteStore, PortError, PortResult, ResourceStore,
    SearchLogStore, SessionStore,
};
