//! crates/library_core/src/search/query.rs
//!
//! Turns user input (a free-text query, or up to three advanced terms with
//! boolean combinators) plus a year range into the base `Predicate`, and
//! layers facet selections on top of it.

use super::predicate::{Predicate, TextField};
use crate::domain::ResourceType;

/// Smallest year accepted in a year-range bound.
pub const MIN_YEAR: i32 = 1000;

/// Where a search term is looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldScope {
    #[default]
    All,
    Only(TextField),
}

impl FieldScope {
    pub const CHOICES: [&'static str; 5] = ["all", "title", "creator", "subject", "description"];

    /// Unknown values fall back to `All`.
    pub fn parse(value: &str) -> Self {
        match value {
            "title" => FieldScope::Only(TextField::Title),
            "creator" => FieldScope::Only(TextField::Creator),
            "subject" => FieldScope::Only(TextField::Subject),
            "description" => FieldScope::Only(TextField::Description),
            _ => FieldScope::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldScope::All => "all",
            FieldScope::Only(field) => field.column(),
        }
    }
}

/// How an advanced term joins the terms before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
    Not,
}

impl Combinator {
    pub const CHOICES: [&'static str; 3] = ["AND", "OR", "NOT"];

    /// Anything that is not OR or NOT combines as AND.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("OR") {
            Combinator::Or
        } else if value.eq_ignore_ascii_case("NOT") {
            Combinator::Not
        } else {
            Combinator::And
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
            Combinator::Not => "NOT",
        }
    }
}

/// A term after the first one in an advanced search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedTerm {
    pub combinator: Combinator,
    pub text: String,
    pub scope: FieldScope,
}

/// A multi-term boolean query. The first term is always required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedQuery {
    pub first: String,
    pub first_scope: FieldScope,
    pub rest: Vec<AdvancedTerm>,
}

/// Matches `term` within the scoped field, or within any of the four text
/// fields for `FieldScope::All`.
pub fn term_condition(term: &str, scope: FieldScope) -> Predicate {
    match scope {
        FieldScope::Only(field) => Predicate::contains(field, term),
        FieldScope::All => Predicate::Or(
            TextField::ALL
                .iter()
                .map(|field| Predicate::contains(*field, term))
                .collect(),
        ),
    }
}

/// The predicate of a single free-text query, or `None` when it is empty.
pub fn simple_condition(query: &str) -> Option<Predicate> {
    if query.is_empty() {
        return None;
    }
    Some(term_condition(query, FieldScope::All))
}

impl AdvancedQuery {
    /// Folds the terms into a list of required clauses.
    ///
    /// AND appends the term's condition, NOT appends its negation, and OR
    /// replaces only the last clause with `(last OR term)`. Terms with
    /// empty text are skipped.
    pub fn clauses(&self) -> Vec<Predicate> {
        let first = term_condition(&self.first, self.first_scope);
        self.rest
            .iter()
            .filter(|term| !term.text.is_empty())
            .fold(vec![first], |mut clauses, term| {
                let condition = term_condition(&term.text, term.scope);
                match term.combinator {
                    Combinator::And => clauses.push(condition),
                    Combinator::Not => clauses.push(Predicate::not(condition)),
                    Combinator::Or => match clauses.pop() {
                        Some(last) => clauses.push(Predicate::Or(vec![last, condition])),
                        None => clauses.push(condition),
                    },
                }
                clauses
            })
    }

    pub fn condition(&self) -> Predicate {
        Predicate::And(self.clauses())
    }
}

/// An inclusive publication-year window. Either bound may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearRange {
    /// Parses both bounds, silently dropping values that are not integers
    /// or lie outside `MIN_YEAR..=current_year`.
    pub fn parse(start: Option<&str>, end: Option<&str>, current_year: i32) -> Self {
        Self {
            start: parse_year(start, current_year),
            end: parse_year(end, current_year),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Appends the year clause to `clauses` when at least one bound is set.
    pub fn push_onto(&self, clauses: &mut Vec<Predicate>) {
        if !self.is_unbounded() {
            clauses.push(Predicate::YearRange {
                start: self.start,
                end: self.end,
            });
        }
    }
}

fn parse_year(raw: Option<&str>, current_year: i32) -> Option<i32> {
    let year = raw?.trim().parse::<i32>().ok()?;
    (MIN_YEAR..=current_year).contains(&year).then_some(year)
}

/// The facet values a user has selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FacetSelection {
    pub types: Vec<ResourceType>,
    pub languages: Vec<String>,
    pub categories: Vec<i64>,
}

impl FacetSelection {
    /// Builds a selection from raw request values. Unknown type labels and
    /// non-numeric category ids are dropped.
    pub fn parse<'a>(
        types: impl IntoIterator<Item = &'a str>,
        languages: impl IntoIterator<Item = &'a str>,
        categories: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            types: types.into_iter().filter_map(ResourceType::from_label).collect(),
            languages: languages.into_iter().map(str::to_string).collect(),
            categories: categories
                .into_iter()
                .filter_map(|c| c.trim().parse::<i64>().ok())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.languages.is_empty() && self.categories.is_empty()
    }

    /// Narrows `base` by every non-empty selection dimension.
    pub fn apply(&self, base: &Predicate) -> Predicate {
        if self.is_empty() {
            return base.clone();
        }
        let mut clauses = vec![base.clone()];
        if !self.types.is_empty() {
            clauses.push(Predicate::TypeIn(self.types.clone()));
        }
        if !self.languages.is_empty() {
            clauses.push(Predicate::LanguageIn(self.languages.clone()));
        }
        if !self.categories.is_empty() {
            clauses.push(Predicate::CategoryIn(self.categories.clone()));
        }
        Predicate::And(clauses)
    }
}

/// The text part of a search: one free-text query or an advanced query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextQuery {
    Simple(String),
    Advanced(AdvancedQuery),
}

impl TextQuery {
    /// The base predicate: text criteria plus the year range, before any
    /// facet selection. `None` when the text query is empty.
    pub fn base_predicate(&self, years: &YearRange) -> Option<Predicate> {
        let mut clauses = match self {
            TextQuery::Simple(query) => vec![simple_condition(query)?],
            TextQuery::Advanced(advanced) => {
                if advanced.first.is_empty() {
                    return None;
                }
                advanced.clauses()
            }
        };
        years.push_onto(&mut clauses);
        Some(Predicate::And(clauses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn or_of_all(term: &str) -> Predicate {
        term_condition(term, FieldScope::All)
    }

    fn title(term: &str) -> Predicate {
        Predicate::contains(TextField::Title, term)
    }

    #[test]
    fn empty_simple_query_has_no_condition() {
        assert_eq!(simple_condition(""), None);
        assert!(TextQuery::Simple(String::new())
            .base_predicate(&YearRange::default())
            .is_none());
    }

    #[test]
    fn all_scope_spans_four_fields() {
        match or_of_all("rust") {
            Predicate::Or(parts) => assert_eq!(parts.len(), 4),
            other => panic!("expected disjunction, got {:?}", other),
        }
    }

    #[test]
    fn unknown_scope_and_combinator_fall_back() {
        assert_eq!(FieldScope::parse("publisher"), FieldScope::All);
        assert_eq!(FieldScope::parse("creator"), FieldScope::Only(TextField::Creator));
        assert_eq!(Combinator::parse("xor"), Combinator::And);
        assert_eq!(Combinator::parse("or"), Combinator::Or);
    }

    #[test]
    fn or_binds_to_the_immediately_preceding_clause() {
        let query = AdvancedQuery {
            first: "a".to_string(),
            first_scope: FieldScope::Only(TextField::Title),
            rest: vec![
                AdvancedTerm {
                    combinator: Combinator::Or,
                    text: "b".to_string(),
                    scope: FieldScope::Only(TextField::Title),
                },
                AdvancedTerm {
                    combinator: Combinator::And,
                    text: "c".to_string(),
                    scope: FieldScope::Only(TextField::Title),
                },
            ],
        };

        assert_eq!(
            query.clauses(),
            vec![Predicate::Or(vec![title("a"), title("b")]), title("c")]
        );
    }

    #[test]
    fn trailing_or_only_merges_with_last_clause() {
        let query = AdvancedQuery {
            first: "a".to_string(),
            first_scope: FieldScope::Only(TextField::Title),
            rest: vec![
                AdvancedTerm {
                    combinator: Combinator::And,
                    text: "b".to_string(),
                    scope: FieldScope::Only(TextField::Title),
                },
                AdvancedTerm {
                    combinator: Combinator::Or,
                    text: "c".to_string(),
                    scope: FieldScope::Only(TextField::Title),
                },
            ],
        };

        assert_eq!(
            query.clauses(),
            vec![title("a"), Predicate::Or(vec![title("b"), title("c")])]
        );
    }

    #[test]
    fn not_appends_negation_and_empty_terms_are_skipped() {
        let query = AdvancedQuery {
            first: "a".to_string(),
            first_scope: FieldScope::Only(TextField::Title),
            rest: vec![
                AdvancedTerm {
                    combinator: Combinator::Or,
                    text: String::new(),
                    scope: FieldScope::All,
                },
                AdvancedTerm {
                    combinator: Combinator::Not,
                    text: "c".to_string(),
                    scope: FieldScope::Only(TextField::Title),
                },
            ],
        };

        assert_eq!(query.clauses(), vec![title("a"), Predicate::not(title("c"))]);
    }

    #[test]
    fn year_bounds_outside_range_are_ignored() {
        let years = YearRange::parse(Some("999"), Some("2031"), 2030);
        assert!(years.is_unbounded());

        let years = YearRange::parse(Some("abc"), Some("2030"), 2030);
        assert_eq!(years, YearRange { start: None, end: Some(2030) });

        let years = YearRange::parse(Some("1000"), None, 2030);
        assert_eq!(years.start, Some(1000));
    }

    #[test]
    fn year_range_joins_the_base_predicate() {
        let years = YearRange::parse(Some("2019"), Some("2021"), 2030);
        let base = TextQuery::Simple("rust".to_string())
            .base_predicate(&years)
            .unwrap();

        assert_eq!(
            base,
            Predicate::And(vec![
                or_of_all("rust"),
                Predicate::YearRange { start: Some(2019), end: Some(2021) },
            ])
        );
    }

    #[test]
    fn facet_selection_drops_invalid_values() {
        let selection = FacetSelection::parse(
            ["E-book", "Pamphlet"],
            ["English"],
            ["3", "x", " 7 "],
        );
        assert_eq!(selection.types, vec![ResourceType::Ebook]);
        assert_eq!(selection.languages, vec!["English".to_string()]);
        assert_eq!(selection.categories, vec![3, 7]);
    }

    #[test]
    fn empty_selection_leaves_base_untouched() {
        let base = or_of_all("rust");
        assert_eq!(FacetSelection::default().apply(&base), base);
    }
}
