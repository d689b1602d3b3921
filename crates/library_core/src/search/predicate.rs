//! crates/library_core/src/search/predicate.rs
//!
//! A small expression tree describing which resources a search selects.
//! Adapters translate it into their native query language; `matches`
//! evaluates it directly against an in-memory `Resource`.

use crate::domain::{Resource, ResourceType};

/// A free-text column of `Resource` that substring matching can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Title,
    Creator,
    Subject,
    Description,
}

impl TextField {
    /// The four fields an "all metadata" match spans.
    pub const ALL: [TextField; 4] = [
        TextField::Title,
        TextField::Description,
        TextField::Creator,
        TextField::Subject,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::Creator => "creator",
            TextField::Subject => "subject",
            TextField::Description => "description",
        }
    }

    /// The field's value, with missing optional text read as "".
    pub fn value<'a>(&self, resource: &'a Resource) -> &'a str {
        match self {
            TextField::Title => &resource.title,
            TextField::Creator => &resource.creator,
            TextField::Subject => resource.subject.as_deref().unwrap_or(""),
            TextField::Description => resource.description.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Case-insensitive substring match of `needle` within `field`.
    Contains { field: TextField, needle: String },
    TypeIn(Vec<ResourceType>),
    LanguageIn(Vec<String>),
    /// The resource carries at least one of these category ids.
    CategoryIn(Vec<i64>),
    /// Inclusive bounds on the publication year. Resources without a
    /// publication date never satisfy a bounded range.
    YearRange { start: Option<i32>, end: Option<i32> },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Matches every resource.
    pub fn everything() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn contains(field: TextField, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            field,
            needle: needle.into(),
        }
    }

    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        match self {
            Predicate::Contains { field, needle } => field
                .value(resource)
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Predicate::TypeIn(types) => types.contains(&resource.resource_type),
            Predicate::LanguageIn(langs) => resource
                .language
                .as_ref()
                .is_some_and(|lang| langs.contains(lang)),
            Predicate::CategoryIn(ids) => ids.iter().any(|id| resource.has_category(*id)),
            Predicate::YearRange { start, end } => {
                if start.is_none() && end.is_none() {
                    return true;
                }
                match resource.publication_year() {
                    Some(year) => {
                        start.map_or(true, |s| year >= s) && end.map_or(true, |e| year <= e)
                    }
                    None => false,
                }
            }
            Predicate::And(clauses) => clauses.iter().all(|c| c.matches(resource)),
            Predicate::Or(clauses) => clauses.iter().any(|c| c.matches(resource)),
            Predicate::Not(inner) => !inner.matches(resource),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn resource() -> Resource {
        Resource {
            id: 1,
            filename: "rust.pdf".to_string(),
            upload_date: Utc::now(),
            title: "The Rust Book".to_string(),
            creator: "Steve Klabnik".to_string(),
            subject: None,
            description: Some("Systems programming".to_string()),
            publisher: None,
            publication_date: NaiveDate::from_ymd_opt(2020, 5, 1),
            resource_type: ResourceType::Ebook,
            format: Some("application/pdf".to_string()),
            language: Some("English".to_string()),
            rights: None,
            preview_image: None,
            categories: Vec::new(),
        }
    }

    #[test]
    fn contains_ignores_case() {
        let r = resource();
        assert!(Predicate::contains(TextField::Title, "rUsT").matches(&r));
        assert!(!Predicate::contains(TextField::Creator, "rust").matches(&r));
    }

    #[test]
    fn missing_text_reads_as_empty() {
        let r = resource();
        assert!(!Predicate::contains(TextField::Subject, "anything").matches(&r));
        assert!(Predicate::not(Predicate::contains(TextField::Subject, "anything")).matches(&r));
    }

    #[test]
    fn year_range_is_inclusive() {
        let r = resource();
        let range = |start, end| Predicate::YearRange { start, end };
        assert!(range(Some(2019), Some(2021)).matches(&r));
        assert!(range(Some(2020), Some(2020)).matches(&r));
        assert!(!range(Some(2021), Some(2022)).matches(&r));
    }

    #[test]
    fn undated_resource_fails_bounded_year_range() {
        let mut r = resource();
        r.publication_date = None;
        assert!(!Predicate::YearRange { start: Some(1000), end: None }.matches(&r));
        assert!(!Predicate::YearRange { start: None, end: Some(3000) }.matches(&r));
    }

    #[test]
    fn empty_conjunction_matches_everything() {
        assert!(Predicate::everything().matches(&resource()));
        assert!(!Predicate::Or(Vec::new()).matches(&resource()));
    }

    #[test]
    fn language_in_skips_unknown_language() {
        let mut r = resource();
        let p = Predicate::LanguageIn(vec!["English".to_string()]);
        assert!(p.matches(&r));
        r.language = None;
        assert!(!p.matches(&r));
    }
}
