use crate::error::PeachySqlError;
use crate::types::SqlParams;

use super::filter::Filter;
use super::{QueryBuilder, validate_table};

/// Ordered `ORDER BY` items as `(column, direction token)`.
///
/// Direction tokens are checked when the query is built (`asc`/`desc`, any case).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy {
    items: Vec<(String, String)>,
}

impl OrderBy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn asc(self, column: impl Into<String>) -> Self {
        self.by(column, "asc")
    }

    #[must_use]
    pub fn desc(self, column: impl Into<String>) -> Self {
        self.by(column, "desc")
    }

    #[must_use]
    pub fn by(mut self, column: impl Into<String>, direction: impl Into<String>) -> Self {
        self.items.push((column.into(), direction.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Row window for paginated selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    limit: u64,
    offset: u64,
}

impl Page {
    /// # Errors
    /// Returns `PeachySqlError::InvalidArgument` if `limit` is zero.
    pub fn new(limit: u64, offset: u64) -> Result<Self, PeachySqlError> {
        if limit == 0 {
            return Err(PeachySqlError::InvalidArgument(
                "Limit must be greater than zero".into(),
            ));
        }
        Ok(Self { limit, offset })
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Table { table: String, columns: Vec<String> },
    Query(String),
}

/// Description of a `SELECT`, rendered by [`QueryBuilder::build_select`].
///
/// ```rust
/// use peachy_sql::prelude::*;
///
/// let select = SelectQuery::table("Users")
///     .columns(["id", "name"])
///     .filter(Filter::new().eq("active", true))
///     .order_by(OrderBy::new().asc("name"))
///     .page(Page::new(25, 50)?);
/// # let _ = select;
/// # Ok::<(), PeachySqlError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    source: Source,
    filter: Filter,
    order_by: OrderBy,
    page: Option<Page>,
}

impl SelectQuery {
    /// Select from one table; no columns means `*`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self::with_source(Source::Table {
            table: table.into(),
            columns: Vec::new(),
        })
    }

    /// Wrap a caller-written `SELECT ... FROM ...` (joins, expressions) with the
    /// filter/sort/page tail.
    #[must_use]
    pub fn from_query(base: impl Into<String>) -> Self {
        Self::with_source(Source::Query(base.into()))
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            filter: Filter::new(),
            order_by: OrderBy::new(),
            page: None,
        }
    }

    /// Output columns; ignored for [`SelectQuery::from_query`].
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Source::Table { columns: cols, .. } = &mut self.source {
            *cols = columns.into_iter().map(Into::into).collect();
        }
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    #[must_use]
    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }
}

impl QueryBuilder<'_> {
    /// Render a `SELECT` with its bound parameters.
    ///
    /// # Errors
    /// Fails on a blank table, disallowed columns, bad sort directions, or pagination
    /// without an `ORDER BY`.
    pub fn build_select(&self, select: &SelectQuery) -> Result<SqlParams, PeachySqlError> {
        let mut sql = match &select.source {
            Source::Table { table, columns } => {
                validate_table(table)?;
                let cols = if columns.is_empty() {
                    "*".to_string()
                } else {
                    self.escape_columns(columns)?.join(", ")
                };
                format!("SELECT {cols} FROM {table}")
            }
            Source::Query(base) => {
                if base.trim().is_empty() {
                    return Err(PeachySqlError::InvalidArgument(
                        "Select query cannot be blank".into(),
                    ));
                }
                base.clone()
            }
        };

        let where_clause = self.build_where(&select.filter)?;
        if !where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.sql);
        }

        let order = self.build_order_by(&select.order_by)?;
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        if let Some(page) = select.page {
            if order.is_empty() {
                return Err(PeachySqlError::InvalidArgument(
                    "Results must be sorted to use an offset".into(),
                ));
            }
            sql.push(' ');
            sql.push_str(&self.dialect.paginate(page));
        }

        Ok(SqlParams::new(sql, where_clause.params))
    }

    /// Filter a caller-written base query, as [`SelectQuery::from_query`] does.
    ///
    /// # Errors
    /// Fails on a blank base query or an invalid filter.
    pub fn build_select_from(
        &self,
        base_query: &str,
        filter: &Filter,
    ) -> Result<SqlParams, PeachySqlError> {
        self.build_select(&SelectQuery::from_query(base_query).filter(filter.clone()))
    }

    /// Render an `ORDER BY` body (without the keyword); empty when `order_by` is empty.
    ///
    /// # Errors
    /// Returns `InvalidColumn` for disallowed columns and `InvalidArgument` for directions
    /// other than `asc`/`desc`.
    pub fn build_order_by(&self, order_by: &OrderBy) -> Result<String, PeachySqlError> {
        let mut parts = Vec::with_capacity(order_by.items.len());
        for (column, direction) in &order_by.items {
            self.options().validate_column(column)?;
            let dir = match direction.to_ascii_lowercase().as_str() {
                "asc" => "ASC",
                "desc" => "DESC",
                _ => {
                    return Err(PeachySqlError::InvalidArgument(format!(
                        "{direction} is not a valid sort direction for column {column}. Use asc or desc."
                    )));
                }
            };
            parts.push(format!("{} {dir}", self.escape(column)?));
        }
        Ok(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Generic, Mysql, SqlServer};
    use crate::options::OptionsBuilder;
    use crate::types::SqlValue;

    #[test]
    fn select_star_without_filter() -> Result<(), PeachySqlError> {
        let dialect = Generic::default();
        let q = QueryBuilder::new(&dialect).build_select(&SelectQuery::table("Users"))?;
        assert_eq!(q.sql, "SELECT * FROM Users");
        assert!(q.params.is_empty());
        Ok(())
    }

    #[test]
    fn mysql_select_with_limit_offset() -> Result<(), PeachySqlError> {
        let dialect = Mysql::default();
        let select = SelectQuery::table("Users")
            .columns(["id", "name"])
            .filter(Filter::new().eq("name", "Bob"))
            .order_by(OrderBy::new().desc("id").by("name", "ASC"))
            .page(Page::new(10, 20)?);
        let q = QueryBuilder::new(&dialect).build_select(&select)?;
        assert_eq!(
            q.sql,
            "SELECT `id`, `name` FROM Users WHERE `name` = ? ORDER BY `id` DESC, `name` ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(q.params, vec![SqlValue::from("Bob")]);
        Ok(())
    }

    #[test]
    fn sql_server_select_with_offset_fetch() -> Result<(), PeachySqlError> {
        let dialect = SqlServer::default();
        let select = SelectQuery::from_query("SELECT u.name, p.title FROM Users u JOIN Posts p ON p.user_id = u.id")
            .order_by(OrderBy::new().asc("u.name"))
            .page(Page::new(5, 0)?);
        let q = QueryBuilder::new(&dialect).build_select(&select)?;
        assert_eq!(
            q.sql,
            "SELECT u.name, p.title FROM Users u JOIN Posts p ON p.user_id = u.id ORDER BY [u].[name] ASC OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
        Ok(())
    }

    #[test]
    fn pagination_requires_order_by() -> Result<(), PeachySqlError> {
        let dialect = Generic::default();
        let select = SelectQuery::table("Users").page(Page::new(1, 0)?);
        assert!(matches!(
            QueryBuilder::new(&dialect).build_select(&select),
            Err(PeachySqlError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn bad_direction_names_column_and_direction() {
        let dialect = Generic::default();
        let select = SelectQuery::table("Users").order_by(OrderBy::new().by("name", "sideways"));
        let err = QueryBuilder::new(&dialect).build_select(&select).unwrap_err();
        assert!(
            matches!(&err, PeachySqlError::InvalidArgument(m) if m.contains("sideways") && m.contains("name"))
        );
    }

    #[test]
    fn rejects_blank_table_and_disallowed_columns() -> Result<(), PeachySqlError> {
        let dialect = Generic::new(OptionsBuilder::generic().columns(["id"])?.build());
        let builder = QueryBuilder::new(&dialect);
        assert!(matches!(
            builder.build_select(&SelectQuery::table(" ")),
            Err(PeachySqlError::InvalidArgument(_))
        ));
        assert!(matches!(
            builder.build_select(&SelectQuery::table("Users").columns(["secret"])),
            Err(PeachySqlError::InvalidColumn(_))
        ));
        assert!(matches!(
            builder.build_select(&SelectQuery::table("Users").order_by(OrderBy::new().asc("secret"))),
            Err(PeachySqlError::InvalidColumn(_))
        ));
        Ok(())
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(Page::new(0, 10), Err(PeachySqlError::InvalidArgument(_))));
    }
}
