//! crates/library_core/src/search/facets.rs
//!
//! Facet counts are always taken over the base predicate (text + years),
//! never over the facet-filtered set, so the count shown next to a facet
//! value does not change when other values are selected.

use std::collections::BTreeMap;
use tracing::debug;

use super::predicate::Predicate;
use crate::ports::{FacetField, PortResult, ResourceStore};

/// Per-value result counts. Values with no matches are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetCounts {
    pub types: BTreeMap<String, u64>,
    pub languages: BTreeMap<String, u64>,
    pub categories: BTreeMap<i64, u64>,
}

pub async fn count_facets(store: &dyn ResourceStore, base: &Predicate) -> PortResult<FacetCounts> {
    let types = store.group_count(base, FacetField::ResourceType).await?;
    let languages = store.group_count(base, FacetField::Language).await?;

    let ids = store.matching_ids(base).await?;
    let categories = if ids.is_empty() {
        BTreeMap::new()
    } else {
        store.category_counts(&ids).await?
    };

    debug!(
        "Facet counts over {} base matches: {} types, {} languages, {} categories",
        ids.len(),
        types.len(),
        languages.len(),
        categories.len()
    );

    Ok(FacetCounts {
        types,
        languages,
        categories,
    })
}
