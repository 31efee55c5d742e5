//! Parameterised item queries
//!
//! Filters become `?`-placeholders only; sort columns come from a fixed
//! whitelist so no caller-provided text reaches the SQL string.

use rusqlite::types::Value;

/// Column an item search is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    UpdatedAt,
    CreatedAt,
    Year,
    Rating,
    Title,
    Id,
}

impl SortColumn {
    pub fn column(&self) -> &'static str {
        match self {
            Self::UpdatedAt => "updated_at",
            Self::CreatedAt => "created_at",
            Self::Year => "year",
            Self::Rating => "rating_value",
            Self::Title => "title",
            Self::Id => "id",
        }
    }

    /// Parses a user-facing sort key; unknown keys yield None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "updated_at" => Some(Self::UpdatedAt),
            "created_at" => Some(Self::CreatedAt),
            "year" => Some(Self::Year),
            "rating" => Some(Self::Rating),
            "title" => Some(Self::Title),
            "id" => Some(Self::Id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

/// Filters for searching stored items
///
/// Text filters are substring matches. `kind = "movie"` matches every movie
/// bucket (`movie`, `movie_cn`, ...); other kinds match exactly.
#[derive(Debug, Clone)]
pub struct ItemQuery {
    pub title: Option<String>,
    /// Matched against title, original title, alternate titles, description,
    /// actors and country
    pub keyword: Option<String>,
    pub kind: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub rating_source: Option<String>,
    pub rating_min: Option<f64>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    /// Every tag must appear in the item's tag text
    pub tags: Vec<String>,
    pub limit: usize,
    pub offset: usize,
    pub sort: SortColumn,
    pub direction: SortDirection,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            title: None,
            keyword: None,
            kind: None,
            country: None,
            language: None,
            director: None,
            actors: None,
            rating_source: None,
            rating_min: None,
            year_from: None,
            year_to: None,
            tags: Vec::new(),
            limit: 50,
            offset: 0,
            sort: SortColumn::default(),
            direction: SortDirection::default(),
        }
    }
}

impl ItemQuery {
    /// Builds the WHERE clause and its bound values
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(" WHERE 1=1");
        let mut params: Vec<Value> = Vec::new();

        if let Some(title) = non_empty(&self.title) {
            sql.push_str(" AND title LIKE ?");
            params.push(like(title));
        }

        if let Some(keyword) = non_empty(&self.keyword) {
            sql.push_str(
                " AND (title LIKE ? OR original_title LIKE ? OR alt_titles_text LIKE ? \
                 OR description LIKE ? OR actors LIKE ? OR country LIKE ?)",
            );
            for _ in 0..6 {
                params.push(like(keyword));
            }
        }

        if let Some(kind) = non_empty(&self.kind) {
            if kind == "movie" {
                sql.push_str(" AND kind LIKE ?");
                params.push(Value::Text("movie%".to_string()));
            } else {
                sql.push_str(" AND kind = ?");
                params.push(Value::Text(kind.to_string()));
            }
        }

        for (column, value) in [
            ("country", &self.country),
            ("language", &self.language),
            ("director", &self.director),
            ("actors", &self.actors),
        ] {
            if let Some(value) = non_empty(value) {
                sql.push_str(&format!(" AND {} LIKE ?", column));
                params.push(like(value));
            }
        }

        if let Some(source) = non_empty(&self.rating_source) {
            sql.push_str(" AND rating_source = ? COLLATE NOCASE");
            params.push(Value::Text(source.to_string()));
        }

        if let Some(min) = self.rating_min {
            sql.push_str(" AND rating_value >= ?");
            params.push(Value::Real(min));
        }

        if let Some(from) = self.year_from {
            sql.push_str(" AND year >= ?");
            params.push(Value::Integer(from as i64));
        }

        if let Some(to) = self.year_to {
            sql.push_str(" AND year <= ?");
            params.push(Value::Integer(to as i64));
        }

        for tag in self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            sql.push_str(" AND tags_text LIKE ?");
            params.push(like(tag));
        }

        (sql, params)
    }

    /// ORDER BY / LIMIT / OFFSET suffix; limit and offset are appended to `params`
    pub(crate) fn order_clause(&self, params: &mut Vec<Value>) -> String {
        params.push(Value::Integer(self.limit as i64));
        params.push(Value::Integer(self.offset as i64));
        format!(
            " ORDER BY {} {}, id DESC LIMIT ? OFFSET ?",
            self.sort.column(),
            self.direction.keyword()
        )
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn like(value: &str) -> Value {
    Value::Text(format!("%{}%", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_has_no_filters() {
        let (sql, params) = ItemQuery::default().where_clause();
        assert_eq!(sql, " WHERE 1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_movie_kind_matches_buckets() {
        let query = ItemQuery {
            kind: Some("movie".to_string()),
            ..Default::default()
        };
        let (sql, params) = query.where_clause();
        assert!(sql.contains("kind LIKE ?"));
        assert_eq!(params, vec![Value::Text("movie%".to_string())]);

        let query = ItemQuery {
            kind: Some("tv".to_string()),
            ..Default::default()
        };
        let (sql, _) = query.where_clause();
        assert!(sql.contains("kind = ?"));
    }

    #[test]
    fn test_keyword_binds_six_values() {
        let query = ItemQuery {
            keyword: Some("地球".to_string()),
            ..Default::default()
        };
        let (_, params) = query.where_clause();
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn test_blank_filters_ignored() {
        let query = ItemQuery {
            title: Some("  ".to_string()),
            tags: vec!["".to_string()],
            ..Default::default()
        };
        let (_, params) = query.where_clause();
        assert!(params.is_empty());
    }

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(SortColumn::parse("rating"), Some(SortColumn::Rating));
        assert_eq!(SortColumn::parse("YEAR"), Some(SortColumn::Year));
        assert_eq!(SortColumn::parse("title; DROP TABLE movies"), None);
        assert_eq!(SortDirection::parse("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("sideways"), SortDirection::Desc);

        let query = ItemQuery {
            sort: SortColumn::Rating,
            direction: SortDirection::Asc,
            ..Default::default()
        };
        let mut params = Vec::new();
        let clause = query.order_clause(&mut params);
        assert!(clause.starts_with(" ORDER BY rating_value ASC"));
        assert_eq!(params, vec![Value::Integer(50), Value::Integer(0)]);
    }
}
