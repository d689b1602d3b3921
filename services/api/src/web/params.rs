//! services/api/src/web/params.rs
//!
//! Parsing of search request parameters. Facet parameters repeat
//! (`type=E-book&type=Journal`), so requests are read as ordered key/value
//! pairs rather than into a flat struct.

use library_core::search::{
    AdvancedQuery, AdvancedTerm, Combinator, FacetSelection, FieldScope, SortKey, YearRange,
};

/// First year offered by the advanced search form.
pub const FORM_FIRST_YEAR: i32 = 1990;

/// Ordered key/value pairs from a query string or form body.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<(String, String)>);

impl Params {
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Page, sort and facet selections shared by both search endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingParams {
    pub page: i64,
    pub sort: SortKey,
    pub facets: FacetSelection,
}

impl ListingParams {
    pub fn from_params(params: &Params) -> Self {
        Self {
            page: page_param(params),
            sort: SortKey::from_param(params.first("sort")),
            facets: FacetSelection::parse(
                params.all("type"),
                params.all("lang"),
                params.all("cat"),
            ),
        }
    }
}

/// The `page` parameter; missing or non-numeric values mean page 1.
pub fn page_param(params: &Params) -> i64 {
    named_page_param(params, "page")
}

/// A 1-indexed page number read from `key`; missing or malformed values mean page 1.
pub fn named_page_param(params: &Params, key: &str) -> i64 {
    params
        .first(key)
        .and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(1)
}

/// The advanced search form, as submitted or as carried in a results URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancedSearchForm {
    pub term1: Option<String>,
    pub field1: Option<String>,
    pub op2: Option<String>,
    pub term2: Option<String>,
    pub field2: Option<String>,
    pub op3: Option<String>,
    pub term3: Option<String>,
    pub field3: Option<String>,
    pub start_year: Option<String>,
    pub end_year: Option<String>,
}

impl AdvancedSearchForm {
    pub fn from_params(params: &Params) -> Self {
        let get = |key: &str| params.first(key).map(str::to_string);
        Self {
            term1: get("term1"),
            field1: get("field1"),
            op2: get("op2"),
            term2: get("term2"),
            field2: get("field2"),
            op3: get("op3"),
            term3: get("term3"),
            field3: get("field3"),
            start_year: get("start_year"),
            end_year: get("end_year"),
        }
    }

    /// The first term, when one was given.
    pub fn first_term(&self) -> Option<&str> {
        self.term1.as_deref().filter(|t| !t.is_empty())
    }

    pub fn to_query(&self) -> Option<AdvancedQuery> {
        let first = self.first_term()?;
        let term = |op: &Option<String>, text: &Option<String>, field: &Option<String>| {
            AdvancedTerm {
                combinator: Combinator::parse(op.as_deref().unwrap_or_default()),
                text: text.clone().unwrap_or_default(),
                scope: FieldScope::parse(field.as_deref().unwrap_or_default()),
            }
        };
        Some(AdvancedQuery {
            first: first.to_string(),
            first_scope: FieldScope::parse(self.field1.as_deref().unwrap_or_default()),
            rest: vec![
                term(&self.op2, &self.term2, &self.field2),
                term(&self.op3, &self.term3, &self.field3),
            ],
        })
    }

    pub fn years(&self, current_year: i32) -> YearRange {
        YearRange::parse(
            self.start_year.as_deref(),
            self.end_year.as_deref(),
            current_year,
        )
    }

    /// Checks the submission the way the form would: a first term, field and
    /// operator values among the offered choices, and years either blank or
    /// one of the offered years.
    pub fn validate(&self, current_year: i32) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.first_term().is_none() {
            errors.push("term1: This field is required.".to_string());
        }
        for (name, value) in [
            ("field1", &self.field1),
            ("field2", &self.field2),
            ("field3", &self.field3),
        ] {
            if let Some(value) = value {
                if !FieldScope::CHOICES.contains(&value.as_str()) {
                    errors.push(format!("{}: Not a valid choice.", name));
                }
            }
        }
        for (name, value) in [("op2", &self.op2), ("op3", &self.op3)] {
            if let Some(value) = value {
                if !Combinator::CHOICES.contains(&value.as_str()) {
                    errors.push(format!("{}: Not a valid choice.", name));
                }
            }
        }
        for (name, value) in [("start_year", &self.start_year), ("end_year", &self.end_year)] {
            let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            let offered = value
                .parse::<i32>()
                .is_ok_and(|y| (FORM_FIRST_YEAR..=current_year).contains(&y));
            if !offered {
                errors.push(format!("{}: Not a valid choice.", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The advanced fields to carry in pagination and facet links.
    pub fn link_params(&self) -> Vec<(String, String)> {
        [
            ("term1", &self.term1),
            ("field1", &self.field1),
            ("op2", &self.op2),
            ("term2", &self.term2),
            ("field2", &self.field2),
            ("op3", &self.op3),
            ("term3", &self.term3),
            ("field3", &self.field3),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_core::ResourceType;

    fn params(pairs: &[(&str, &str)]) -> Params {
        Params(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn repeated_facet_params_are_collected() {
        let listing = ListingParams::from_params(&params(&[
            ("type", "E-book"),
            ("type", "Journal"),
            ("lang", "English"),
            ("cat", "4"),
            ("cat", "four"),
            ("sort", "title_desc"),
            ("page", "2"),
        ]));

        assert_eq!(listing.facets.types, vec![ResourceType::Ebook, ResourceType::Journal]);
        assert_eq!(listing.facets.categories, vec![4]);
        assert_eq!(listing.sort, SortKey::TitleDesc);
        assert_eq!(listing.page, 2);
    }

    #[test]
    fn bad_page_and_sort_fall_back() {
        let listing = ListingParams::from_params(&params(&[("page", "x"), ("sort", "best")]));
        assert_eq!(listing.page, 1);
        assert_eq!(listing.sort, SortKey::DateDesc);
    }

    #[test]
    fn form_without_first_term_has_no_query() {
        let form = AdvancedSearchForm::from_params(&params(&[("term1", ""), ("term2", "b")]));
        assert!(form.to_query().is_none());
        assert!(form.validate(2026).is_err());
    }

    #[test]
    fn form_builds_three_term_query() {
        let form = AdvancedSearchForm::from_params(&params(&[
            ("term1", "a"),
            ("field1", "title"),
            ("op2", "OR"),
            ("term2", "b"),
            ("field2", "creator"),
            ("op3", "AND"),
            ("term3", "c"),
            ("field3", "all"),
        ]));
        let query = form.to_query().unwrap();
        assert_eq!(query.first, "a");
        assert_eq!(query.rest.len(), 2);
        assert_eq!(query.rest[0].combinator, Combinator::Or);
        assert_eq!(query.clauses().len(), 2);
        assert!(form.validate(2026).is_ok());
    }

    #[test]
    fn validation_rejects_values_outside_the_choices() {
        let form = AdvancedSearchForm::from_params(&params(&[
            ("term1", "a"),
            ("field1", "publisher"),
            ("op2", "XOR"),
            ("start_year", "1989"),
            ("end_year", ""),
        ]));
        let errors = form.validate(2026).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn link_params_skip_missing_fields() {
        let form = AdvancedSearchForm::from_params(&params(&[("term1", "a"), ("op2", "NOT")]));
        assert_eq!(
            form.link_params(),
            vec![
                ("term1".to_string(), "a".to_string()),
                ("op2".to_string(), "NOT".to_string()),
            ]
        );
    }
}
