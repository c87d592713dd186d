//! Typed listing query builder for the order view
//!
//! Sortable/searchable columns are pre-declared in [`OrderColumn`]; a name
//! outside the enum never reaches SQL construction. Filter values are always
//! bound parameters, never interpolated.

use shared::error::AppError;
use std::fmt::Write as _;
use std::str::FromStr;

/// Logical columns of the combined order view that may be searched or sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderColumn {
    Id,
    Reference,
    PublicId,
    StudentId,
    FirstName,
    LastName,
    Email,
    ProductName,
    Quantity,
    PaymentMode,
    Status,
    CreatedAt,
}

impl OrderColumn {
    /// Column name inside the order view
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Reference => "reference",
            Self::PublicId => "public_id",
            Self::StudentId => "student_id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::ProductName => "product_name",
            Self::Quantity => "quantity",
            Self::PaymentMode => "mode_of_payment",
            Self::Status => "status",
            Self::CreatedAt => "created_at",
        }
    }

    /// Whether the column is matched exactly (keys and enumerations) or via
    /// a case-insensitive substring search (free text)
    fn exact(&self) -> bool {
        matches!(
            self,
            Self::Id
                | Self::Reference
                | Self::PublicId
                | Self::StudentId
                | Self::Quantity
                | Self::PaymentMode
                | Self::Status
        )
    }

    fn predicate(&self, placeholder: usize) -> String {
        if self.exact() {
            format!("{}::text = ${placeholder}", self.sql())
        } else {
            format!("{}::text ILIKE ${placeholder}", self.sql())
        }
    }

    fn bind_value(&self, value: &str) -> String {
        if self.exact() {
            value.to_string()
        } else {
            format!("%{value}%")
        }
    }
}

impl FromStr for OrderColumn {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "reference" => Ok(Self::Reference),
            "public_id" => Ok(Self::PublicId),
            "student_id" => Ok(Self::StudentId),
            "first_name" => Ok(Self::FirstName),
            "last_name" => Ok(Self::LastName),
            "email" => Ok(Self::Email),
            "product_name" => Ok(Self::ProductName),
            "quantity" => Ok(Self::Quantity),
            "mode_of_payment" => Ok(Self::PaymentMode),
            "status" => Ok(Self::Status),
            "created_at" => Ok(Self::CreatedAt),
            other => Err(AppError::key_not_allowed(other)),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDir {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(AppError::invalid_request(format!(
                "Invalid sort direction: {other}"
            ))),
        }
    }
}

/// One column/value filter
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: OrderColumn,
    pub value: String,
}

/// Largest page a single listing request may return
pub const MAX_PAGE_LIMIT: i64 = 200;

/// Page request; page numbers start at 1
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

/// Parsed, validated listing request
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<(OrderColumn, SortDir)>,
    pub page: Option<Page>,
}

/// The listing query and its companion count query, sharing bind values
#[derive(Debug)]
pub struct BuiltQuery {
    pub query: String,
    pub count_query: String,
    pub binds: Vec<String>,
}

impl ListQuery {
    /// Render over `base` (a subquery producing the order view columns)
    pub fn build(&self, base: &str) -> BuiltQuery {
        let mut where_clause = String::new();
        let mut binds = Vec::with_capacity(self.filters.len());

        for filter in &self.filters {
            if where_clause.is_empty() {
                where_clause.push_str(" WHERE ");
            } else {
                where_clause.push_str(" AND ");
            }
            where_clause.push_str(&filter.column.predicate(binds.len() + 1));
            binds.push(filter.column.bind_value(&filter.value));
        }

        let count_query = format!("SELECT COUNT(*) FROM ({base}) o{where_clause}");

        let mut query = format!("SELECT * FROM ({base}) o{where_clause}");
        match self.sort {
            Some((column, dir)) => {
                let _ = write!(query, " ORDER BY {} {}", column.sql(), dir.sql());
            }
            None => query.push_str(" ORDER BY created_at DESC"),
        }
        if let Some(page) = self.page {
            let limit = page.limit.clamp(1, MAX_PAGE_LIMIT);
            let offset = (page.page.max(1) - 1) * limit;
            let _ = write!(query, " LIMIT {limit} OFFSET {offset}");
        }

        BuiltQuery {
            query,
            count_query,
            binds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_column_is_rejected() {
        let err = "password".parse::<OrderColumn>().unwrap_err();
        assert_eq!(err.code, shared::error::ErrorCode::KeyNotAllowed);
        assert!("; DROP TABLE orders".parse::<OrderColumn>().is_err());
    }

    #[test]
    fn test_build_plain() {
        let built = ListQuery::default().build("SELECT 1 AS id");
        assert_eq!(
            built.query,
            "SELECT * FROM (SELECT 1 AS id) o ORDER BY created_at DESC"
        );
        assert_eq!(built.count_query, "SELECT COUNT(*) FROM (SELECT 1 AS id) o");
        assert!(built.binds.is_empty());
    }

    #[test]
    fn test_build_with_filters() {
        let query = ListQuery {
            filters: vec![
                Filter {
                    column: OrderColumn::Status,
                    value: "1".into(),
                },
                Filter {
                    column: OrderColumn::LastName,
                    value: "cruz".into(),
                },
            ],
            ..Default::default()
        };
        let built = query.build("BASE");
        assert!(built.query.contains("WHERE status::text = $1"));
        assert!(built.query.contains("AND last_name::text ILIKE $2"));
        assert_eq!(built.binds, vec!["1".to_string(), "%cruz%".to_string()]);
        assert!(built.count_query.contains("WHERE status::text = $1"));
        assert!(!built.count_query.contains("ORDER BY"));
    }

    #[test]
    fn test_build_with_sort_and_page() {
        let query = ListQuery {
            filters: vec![],
            sort: Some((OrderColumn::Reference, SortDir::Desc)),
            page: Some(Page { page: 3, limit: 20 }),
        };
        let built = query.build("BASE");
        assert!(built.query.ends_with("ORDER BY reference DESC LIMIT 20 OFFSET 40"));
    }

    #[test]
    fn test_page_clamps_to_first() {
        let query = ListQuery {
            page: Some(Page { page: 0, limit: 10 }),
            ..Default::default()
        };
        let built = query.build("BASE");
        assert!(built.query.ends_with("LIMIT 10 OFFSET 0"));
    }

    #[test]
    fn test_limit_is_capped() {
        let query = ListQuery {
            page: Some(Page {
                page: 1,
                limit: 1_000_000_000,
            }),
            ..Default::default()
        };
        let built = query.build("BASE");
        assert!(built.query.ends_with(&format!("LIMIT {MAX_PAGE_LIMIT} OFFSET 0")));
    }
}
