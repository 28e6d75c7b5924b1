//! Structured WHERE-clause assembly for the post listing.
//!
//! Every user-supplied value is carried as a bound parameter; only fixed SQL
//! fragments are concatenated.

use chrono::NaiveDate;
use rusqlite::types::Value;

use postboard_types::SortBy;

/// Conjunction of SQL predicates with their positional parameters
#[derive(Debug, Default, Clone)]
pub struct WhereClause {
    predicates: Vec<&'static str>,
    params: Vec<Value>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; `params` must match its `?` placeholders in order
    pub fn and<I>(&mut self, predicate: &'static str, params: I) -> &mut Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.predicates.push(predicate);
        self.params.extend(params);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Renders ` WHERE a AND b`, or an empty string when unfiltered
    pub fn to_sql(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!(" WHERE {}", self.predicates.join(" AND "))
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Filters accepted by the post listing
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PostFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

const SEARCH_PREDICATE: &str = "(p.text LIKE ? ESCAPE '\\' \
     OR a.first_name LIKE ? ESCAPE '\\' \
     OR a.last_name LIKE ? ESCAPE '\\' \
     OR (a.first_name || ' ' || a.last_name) LIKE ? ESCAPE '\\')";

impl PostFilter {
    /// Build a filter from raw query values; blank values are ignored
    pub fn new(
        search: Option<&str>,
        category: Option<&str>,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> Self {
        fn non_blank(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            search: non_blank(search),
            category: non_blank(category),
            date_from: non_blank(date_from),
            date_to: non_blank(date_to),
        }
    }

    pub fn where_clause(&self) -> WhereClause {
        let mut clause = WhereClause::new();

        if let Some(search) = &self.search {
            let pattern = Value::Text(like_pattern(search));
            clause.and(SEARCH_PREDICATE, std::iter::repeat(pattern).take(4));
        }
        if let Some(category) = &self.category {
            clause.and("p.category = ?", [Value::Text(category.clone())]);
        }
        if let Some(date_from) = &self.date_from {
            clause.and("p.date >= ?", [Value::Text(date_from.clone())]);
        }
        if let Some(date_to) = &self.date_to {
            clause.and("p.date <= ?", [Value::Text(end_of_day(date_to))]);
        }

        clause
    }
}

/// ORDER BY fragment; ties fall back to storage order (post id)
pub fn order_clause(sort: SortBy) -> &'static str {
    match sort {
        SortBy::Newest => " ORDER BY p.date DESC, p.id ASC",
        SortBy::Oldest => " ORDER BY p.date ASC, p.id ASC",
        SortBy::MostLiked => " ORDER BY p.likes DESC, p.id ASC",
        SortBy::MostCommented => " ORDER BY p.comments DESC, p.id ASC",
    }
}

/// Substring pattern with LIKE wildcards in the user text escaped
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// A bare date upper bound covers the whole day
fn end_of_day(date_to: &str) -> String {
    match NaiveDate::parse_from_str(date_to, "%Y-%m-%d") {
        Ok(date) => format!("{} 23:59:59", date.format("%Y-%m-%d")),
        Err(_) => date_to.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_has_no_where() {
        let clause = PostFilter::default().where_clause();
        assert!(clause.is_empty());
        assert_eq!(clause.to_sql(), "");
        assert!(clause.params().is_empty());
    }

    #[test]
    fn test_blank_values_ignored() {
        let filter = PostFilter::new(Some("  "), Some(""), None, Some(" "));
        assert_eq!(filter, PostFilter::default());
    }

    #[test]
    fn test_search_binds_four_patterns() {
        let filter = PostFilter::new(Some("rust"), None, None, None);
        let clause = filter.where_clause();

        assert_eq!(clause.params().len(), 4);
        assert_eq!(clause.to_sql().matches('?').count(), 4);
        for param in clause.params() {
            assert_eq!(param, &Value::Text("%rust%".to_string()));
        }
    }

    #[test]
    fn test_predicates_joined_in_order() {
        let filter = PostFilter::new(None, Some("Tech"), Some("2024-01-01"), Some("2024-01-31"));
        let clause = filter.where_clause();

        assert_eq!(
            clause.to_sql(),
            " WHERE p.category = ? AND p.date >= ? AND p.date <= ?"
        );
        assert_eq!(
            clause.params(),
            &[
                Value::Text("Tech".to_string()),
                Value::Text("2024-01-01".to_string()),
                Value::Text("2024-01-31 23:59:59".to_string()),
            ]
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("40%"), "%40\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }

    #[test]
    fn test_end_of_day() {
        assert_eq!(end_of_day("2024-07-28"), "2024-07-28 23:59:59");
        assert_eq!(end_of_day("2024-07-28 10:00:00"), "2024-07-28 10:00:00");
    }

    #[test]
    fn test_order_clause_breaks_ties_by_id() {
        for sort in [
            SortBy::Newest,
            SortBy::Oldest,
            SortBy::MostLiked,
            SortBy::MostCommented,
        ] {
            assert!(order_clause(sort).ends_with("p.id ASC"));
        }
    }
}
