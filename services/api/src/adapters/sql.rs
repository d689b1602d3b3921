//! services/api/src/adapters/sql.rs
//!
//! Renders core `Predicate` trees and sort keys into Postgres SQL through
//! `sqlx::QueryBuilder`. Every user-supplied value is bound, never spliced
//! into the statement text. Queries alias the resources table as `r`.

use library_core::search::{Predicate, SortKey, TextField};
use sqlx::{Postgres, QueryBuilder};

/// Column list selected for a full `ResourceRecord`.
pub const RESOURCE_COLUMNS: &str = "r.id, r.filename, r.upload_date, r.title, r.creator, \
     r.subject, r.description, r.publisher, r.publication_date, r.resource_type, r.format, \
     r.language, r.rights, r.preview_image";

/// Escapes LIKE wildcards so user text matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

/// Nullable text columns read as '' so negation stays two-valued.
fn text_column(field: TextField) -> &'static str {
    match field {
        TextField::Title => "r.title",
        TextField::Creator => "r.creator",
        TextField::Subject => "COALESCE(r.subject, '')",
        TextField::Description => "COALESCE(r.description, '')",
    }
}

pub fn push_predicate<'args>(builder: &mut QueryBuilder<'args, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Contains { field, needle } => {
            builder
                .push(text_column(*field))
                .push(" ILIKE ")
                .push_bind(contains_pattern(needle));
        }
        Predicate::TypeIn(types) => {
            let labels: Vec<String> = types.iter().map(|t| t.label().to_string()).collect();
            builder
                .push("r.resource_type = ANY(")
                .push_bind(labels)
                .push(")");
        }
        Predicate::LanguageIn(languages) => {
            builder
                .push("r.language = ANY(")
                .push_bind(languages.clone())
                .push(")");
        }
        Predicate::CategoryIn(ids) => {
            builder
                .push(
                    "EXISTS (SELECT 1 FROM resource_categories rc \
                     WHERE rc.resource_id = r.id AND rc.category_id = ANY(",
                )
                .push_bind(ids.clone())
                .push("))");
        }
        Predicate::YearRange { start, end } => {
            if start.is_none() && end.is_none() {
                builder.push("TRUE");
                return;
            }
            builder.push("(r.publication_date IS NOT NULL");
            if let Some(start) = start {
                builder
                    .push(" AND EXTRACT(YEAR FROM r.publication_date) >= ")
                    .push_bind(*start);
            }
            if let Some(end) = end {
                builder
                    .push(" AND EXTRACT(YEAR FROM r.publication_date) <= ")
                    .push_bind(*end);
            }
            builder.push(")");
        }
        Predicate::And(clauses) => push_joined(builder, clauses, " AND ", "TRUE"),
        Predicate::Or(clauses) => push_joined(builder, clauses, " OR ", "FALSE"),
        Predicate::Not(inner) => {
            builder.push("NOT (");
            push_predicate(builder, inner);
            builder.push(")");
        }
    }
}

fn push_joined<'args>(
    builder: &mut QueryBuilder<'args, Postgres>,
    clauses: &[Predicate],
    separator: &str,
    when_empty: &str,
) {
    if clauses.is_empty() {
        builder.push(when_empty);
        return;
    }
    builder.push("(");
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            builder.push(separator);
        }
        push_predicate(builder, clause);
    }
    builder.push(")");
}

/// ORDER BY body for a sort key. Titles compare bytewise.
pub fn order_by(sort: SortKey) -> &'static str {
    match sort {
        SortKey::DateDesc => "r.publication_date DESC NULLS LAST, r.id ASC",
        SortKey::DateAsc => "r.publication_date ASC NULLS LAST, r.id ASC",
        SortKey::TitleAsc => "r.title COLLATE \"C\" ASC, r.id ASC",
        SortKey::TitleDesc => "r.title COLLATE \"C\" DESC, r.id ASC",
        SortKey::Newest => "r.upload_date DESC, r.id ASC",
    }
}

/// `SELECT <select> FROM resources r WHERE <predicate>`
pub fn select_where<'args>(select: &str, predicate: &Predicate) -> QueryBuilder<'args, Postgres> {
    let mut builder = QueryBuilder::new("SELECT ");
    builder.push(select).push(" FROM resources r WHERE ");
    push_predicate(&mut builder, predicate);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_core::search::{FieldScope, YearRange};
    use library_core::search::query::term_condition;
    use library_core::ResourceType;

    fn render(predicate: &Predicate) -> String {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("");
        push_predicate(&mut builder, predicate);
        builder.sql().to_string()
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
        assert_eq!(contains_pattern("rust"), "%rust%");
    }

    #[test]
    fn all_scope_renders_four_bound_ilikes() {
        let sql = render(&term_condition("rust", FieldScope::All));
        assert_eq!(
            sql,
            "(r.title ILIKE $1 OR COALESCE(r.description, '') ILIKE $2 \
             OR r.creator ILIKE $3 OR COALESCE(r.subject, '') ILIKE $4)"
        );
    }

    #[test]
    fn negation_and_facets_render() {
        let predicate = Predicate::And(vec![
            Predicate::not(Predicate::contains(TextField::Title, "draft")),
            Predicate::TypeIn(vec![ResourceType::Ebook]),
            Predicate::CategoryIn(vec![1, 2]),
        ]);
        assert_eq!(
            render(&predicate),
            "(NOT (r.title ILIKE $1) AND r.resource_type = ANY($2) AND EXISTS (SELECT 1 \
             FROM resource_categories rc WHERE rc.resource_id = r.id AND rc.category_id = ANY($3)))"
        );
    }

    #[test]
    fn year_range_requires_a_date() {
        let years = YearRange::parse(Some("2019"), None, 2030);
        let predicate = Predicate::YearRange {
            start: years.start,
            end: years.end,
        };
        assert_eq!(
            render(&predicate),
            "(r.publication_date IS NOT NULL AND EXTRACT(YEAR FROM r.publication_date) >= $1)"
        );
    }

    #[test]
    fn empty_groups_render_constants() {
        assert_eq!(render(&Predicate::everything()), "TRUE");
        assert_eq!(render(&Predicate::Or(Vec::new())), "FALSE");
    }

    #[test]
    fn undated_rows_sort_last() {
        assert!(order_by(SortKey::DateDesc).contains("NULLS LAST"));
        assert!(order_by(SortKey::DateAsc).contains("NULLS LAST"));
    }
}
