use crate::dialect::Dialect;
use crate::error::PeachySqlError;
use crate::options::Options;
use crate::types::SqlParams;

mod dml;
mod escape;
mod filter;
mod insert;
mod select;

pub use escape::Escaper;
pub use filter::{Condition, Filter, Operand, Operator};
pub use insert::{InsertBatch, InsertPlan, partition, plan_batch_size, reconstruct_ids};
pub use select::{OrderBy, Page, SelectQuery};

/// Renders statements for one dialect.
///
/// Table names are emitted as given (escape them with
/// [`QueryBuilder::escape`] first if they need quoting); column names are always checked
/// against the allow-list and quoted.
#[derive(Clone, Copy)]
pub struct QueryBuilder<'d> {
    pub(crate) dialect: &'d dyn Dialect,
}

impl std::fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

impl<'d> QueryBuilder<'d> {
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    #[must_use]
    pub fn options(&self) -> &'d Options {
        self.dialect.options()
    }

    /// # Errors
    /// Returns `PeachySqlError::InvalidArgument` for blank identifiers.
    pub fn escape(&self, identifier: &str) -> Result<String, PeachySqlError> {
        self.dialect.escape_identifier(identifier)
    }

    /// Render a filter as a `WHERE` body (no keyword). An empty filter gives empty SQL.
    ///
    /// # Errors
    /// Fails on disallowed columns, empty lists or operator maps, and invalid operator use.
    pub fn build_where(&self, filter: &filter::Filter) -> Result<SqlParams, PeachySqlError> {
        filter::build_where(filter, self)
    }

    fn escape_columns(&self, columns: &[String]) -> Result<Vec<String>, PeachySqlError> {
        columns
            .iter()
            .map(|column| {
                self.options().validate_column(column)?;
                self.escape(column)
            })
            .collect()
    }
}

fn validate_table(table: &str) -> Result<(), PeachySqlError> {
    if table.trim().is_empty() {
        return Err(PeachySqlError::InvalidArgument(
            "Table name cannot be blank".into(),
        ));
    }
    Ok(())
}
