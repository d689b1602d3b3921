//! crates/library_core/src/search/sort.rs

use crate::domain::Resource;
use std::cmp::Ordering;

/// Result orderings. Undated resources always sort last on date keys, and
/// every ordering breaks ties by ascending resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    TitleAsc,
    TitleDesc,
    /// Most recently uploaded first. Used by the browse listing only.
    Newest,
}

impl SortKey {
    /// Parses the `sort` request parameter. Unknown values fall back to
    /// `DateDesc`, and `Newest` is not selectable.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("date_asc") => SortKey::DateAsc,
            Some("title_asc") => SortKey::TitleAsc,
            Some("title_desc") => SortKey::TitleDesc,
            _ => SortKey::DateDesc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::DateDesc => "date_desc",
            SortKey::DateAsc => "date_asc",
            SortKey::TitleAsc => "title_asc",
            SortKey::TitleDesc => "title_desc",
            SortKey::Newest => "newest",
        }
    }

    pub fn compare(&self, a: &Resource, b: &Resource) -> Ordering {
        let primary = match self {
            SortKey::DateDesc => nulls_last(a.publication_date, b.publication_date, true),
            SortKey::DateAsc => nulls_last(a.publication_date, b.publication_date, false),
            SortKey::TitleAsc => a.title.cmp(&b.title),
            SortKey::TitleDesc => b.title.cmp(&a.title),
            SortKey::Newest => b.upload_date.cmp(&a.upload_date),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    pub fn sort(&self, resources: &mut [Resource]) {
        resources.sort_by(|a, b| self.compare(a, b));
    }
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceType;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn resource(id: i64, title: &str, year: Option<i32>) -> Resource {
        Resource {
            id,
            filename: format!("{id}.pdf"),
            upload_date: Utc.with_ymd_and_hms(2024, 1, id as u32, 0, 0, 0).unwrap(),
            title: title.to_string(),
            creator: "Anon".to_string(),
            subject: None,
            description: None,
            publisher: None,
            publication_date: year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
            resource_type: ResourceType::Journal,
            format: None,
            language: None,
            rights: None,
            preview_image: None,
            categories: Vec::new(),
        }
    }

    fn ids(resources: &[Resource]) -> Vec<i64> {
        resources.iter().map(|r| r.id).collect()
    }

    fn sample() -> Vec<Resource> {
        vec![
            resource(1, "Beta", Some(2001)),
            resource(2, "Alpha", None),
            resource(3, "Gamma", Some(2010)),
            resource(4, "Alpha", Some(2005)),
        ]
    }

    #[test]
    fn unknown_sort_falls_back_to_date_desc() {
        assert_eq!(SortKey::from_param(Some("relevance")), SortKey::DateDesc);
        assert_eq!(SortKey::from_param(None), SortKey::DateDesc);
        assert_eq!(SortKey::from_param(Some("newest")), SortKey::DateDesc);
    }

    #[test]
    fn undated_resources_sort_last_in_both_directions() {
        let mut items = sample();
        SortKey::DateDesc.sort(&mut items);
        assert_eq!(ids(&items), vec![3, 4, 1, 2]);

        SortKey::DateAsc.sort(&mut items);
        assert_eq!(ids(&items), vec![1, 4, 3, 2]);
    }

    #[test]
    fn title_ties_break_by_id() {
        let mut items = sample();
        SortKey::TitleAsc.sort(&mut items);
        assert_eq!(ids(&items), vec![2, 4, 1, 3]);

        SortKey::TitleDesc.sort(&mut items);
        assert_eq!(ids(&items), vec![3, 1, 2, 4]);
    }

    #[test]
    fn newest_orders_by_upload_date() {
        let mut items = sample();
        SortKey::Newest.sort(&mut items);
        assert_eq!(ids(&items), vec![4, 3, 2, 1]);
    }
}
