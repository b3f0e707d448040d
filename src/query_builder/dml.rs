use crate::error::PeachySqlError;
use crate::types::{ColumnValues, SqlParams};

use super::filter::Filter;
use super::{QueryBuilder, validate_table};

impl QueryBuilder<'_> {
    /// Render `UPDATE <table> SET ... WHERE ...`. Params are the set values followed by the
    /// filter values.
    ///
    /// # Errors
    /// Returns `InvalidArgument` when `set` or `filter` is empty (no full-table updates) and
    /// `InvalidColumn` for disallowed columns.
    pub fn build_update(
        &self,
        table: &str,
        set: &ColumnValues,
        filter: &Filter,
    ) -> Result<SqlParams, PeachySqlError> {
        validate_table(table)?;
        if set.is_empty() {
            return Err(PeachySqlError::InvalidArgument(
                "Set values cannot be empty".into(),
            ));
        }
        if filter.is_empty() {
            return Err(PeachySqlError::InvalidArgument(
                "Where conditions cannot be empty".into(),
            ));
        }

        let mut assignments = Vec::with_capacity(set.len());
        let mut params = Vec::with_capacity(set.len());
        for (column, value) in set {
            self.options().validate_column(column)?;
            assignments.push(format!("{} = ?", self.escape(column)?));
            params.push(value.clone());
        }

        let where_clause = self.build_where(filter)?;
        params.extend(where_clause.params);

        Ok(SqlParams::new(
            format!(
                "UPDATE {table} SET {} WHERE {}",
                assignments.join(", "),
                where_clause.sql
            ),
            params,
        ))
    }

    /// Render `DELETE FROM <table>` with an optional `WHERE`.
    ///
    /// # Errors
    /// Fails on a blank table or an invalid filter.
    pub fn build_delete(&self, table: &str, filter: &Filter) -> Result<SqlParams, PeachySqlError> {
        validate_table(table)?;
        let where_clause = self.build_where(filter)?;

        let mut sql = format!("DELETE FROM {table}");
        if !where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.sql);
        }
        Ok(SqlParams::new(sql, where_clause.params))
    }
}
