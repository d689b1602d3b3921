//! crates/library_core/src/search/mod.rs
//!
//! The faceted search engine: query building, facet counting, sorting,
//! pagination and search logging.

pub mod facets;
pub mod pagination;
pub mod predicate;
pub mod query;
pub mod service;
pub mod sort;

pub use facets::{count_facets, FacetCounts};
pub use pagination::{Page, PageRequest, ACTIVITY_PAGE_SIZE, BROWSE_PAGE_SIZE, SEARCH_PAGE_SIZE};
pub use predicate::{Predicate, TextField};
pub use query::{
    AdvancedQuery, AdvancedTerm, Combinator, FacetSelection, FieldScope, TextQuery, YearRange,
};
pub use service::{SearchError, SearchLogEntry, SearchOutcome, SearchRequest, SearchService};
pub use sort::SortKey;
