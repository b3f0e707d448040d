use tracing::debug;

use crate::dialect::{Dialect, IdRetrieval};
use crate::driver::Driver;
use crate::error::{NativeErrors, PeachySqlError, SqlException};
use crate::options::Options;
use crate::query_builder::{Filter, InsertPlan, QueryBuilder, SelectQuery, reconstruct_ids};
use crate::results::{BulkInsertResult, InsertResult};
use crate::statement::Statement;
use crate::types::{ColumnValues, SqlParams, SqlValue};

/// A driver paired with the dialect that renders SQL for it.
///
/// ```rust,no_run
/// # #[cfg(feature = "sqlite")]
/// # fn demo() -> Result<(), peachy_sql::PeachySqlError> {
/// use peachy_sql::prelude::*;
///
/// let driver = SqliteDriver::open_in_memory()?;
/// let mut db = PeachySql::new(driver, Generic::default())?;
/// let inserted = db.insert_rows(
///     "Users",
///     &[vec![("name".to_string(), SqlValue::from("Ann"))]],
/// )?;
/// let users = db
///     .select(&SelectQuery::table("Users").filter(Filter::new().eq("name", "Ann")))?
///     .all()?;
/// # let _ = (inserted, users);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PeachySql<D: Driver, L: Dialect> {
    driver: D,
    dialect: L,
}

impl<D: Driver, L: Dialect> PeachySql<D, L> {
    /// # Errors
    /// Returns `PeachySqlError::Config` if the dialect's options are invalid.
    pub fn new(mut driver: D, dialect: L) -> Result<Self, PeachySqlError> {
        dialect.options().validate()?;
        driver.configure(dialect.options());
        Ok(Self { driver, dialect })
    }

    #[must_use]
    pub fn dialect(&self) -> &L {
        &self.dialect
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        self.dialect.options()
    }

    #[must_use]
    pub fn builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.dialect)
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    #[must_use]
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// # Errors
    /// Returns `PeachySqlError::InvalidArgument` for blank identifiers.
    pub fn escape_identifier(&self, identifier: &str) -> Result<String, PeachySqlError> {
        self.dialect.escape_identifier(identifier)
    }

    /// Run arbitrary SQL with `?` placeholders.
    ///
    /// # Errors
    /// Returns `PeachySqlError::Sql` if the driver rejects the statement.
    pub fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Statement<'_, D>, PeachySqlError> {
        self.run(SqlParams::new(sql, params.to_vec()))
    }

    /// Run a statement produced by one of the builders.
    ///
    /// # Errors
    /// Returns `PeachySqlError::Sql` if the driver rejects the statement.
    pub fn run(&mut self, query: SqlParams) -> Result<Statement<'_, D>, PeachySqlError> {
        Statement::execute(&mut self.driver, query, self.dialect.options())
    }

    /// # Errors
    /// Fails if the select cannot be built or executed.
    pub fn select(&mut self, select: &SelectQuery) -> Result<Statement<'_, D>, PeachySqlError> {
        let query = self.builder().build_select(select)?;
        self.run(query)
    }

    /// Filter a caller-written `SELECT ... FROM ...` (joins, computed columns).
    ///
    /// # Errors
    /// Fails if the filter is invalid or execution fails.
    pub fn select_from(
        &mut self,
        base_query: &str,
        filter: &Filter,
    ) -> Result<Statement<'_, D>, PeachySqlError> {
        let query = self.builder().build_select_from(base_query, filter)?;
        self.run(query)
    }

    /// Insert `rows` in as many statements as the configured limits require.
    ///
    /// Batches run one after another; a failure stops the remaining batches and leaves the
    /// earlier ones in place.
    ///
    /// # Errors
    /// Fails if the rows are invalid for the table or any batch fails to execute.
    pub fn insert_rows(
        &mut self,
        table: &str,
        rows: &[ColumnValues],
    ) -> Result<BulkInsertResult, PeachySqlError> {
        let InsertPlan {
            batches,
            id_retrieval,
        } = self.builder().build_insert_batches(table, rows)?;
        let query_count = batches.len();

        let mut ids = Vec::with_capacity(rows.len());
        let mut affected = 0;
        for (i, batch) in batches.into_iter().enumerate() {
            debug!(
                batch = i + 1,
                of = query_count,
                rows = batch.row_count,
                "inserting batch"
            );
            let mut statement =
                Statement::execute(&mut self.driver, batch.query, self.dialect.options())?;

            match &id_retrieval {
                IdRetrieval::OutputTable { .. } | IdRetrieval::Returning { .. } => {
                    let returned = statement
                        .all()?
                        .iter()
                        .map(|row| returned_id(row.get_by_index(0)))
                        .collect::<Result<Vec<_>, _>>()?;
                    affected += i64::try_from(returned.len()).unwrap_or(i64::MAX);
                    ids.extend(returned);
                }
                retrieval => {
                    affected += statement.affected();
                    ids.extend(reconstruct_ids(
                        retrieval,
                        statement.insert_id(),
                        batch.row_count,
                    )?);
                }
            }
            statement.close()?;
        }

        Ok(BulkInsertResult::new(ids, affected, query_count))
    }

    /// Insert one row.
    ///
    /// # Errors
    /// Fails like [`PeachySql::insert_rows`].
    pub fn insert_row(
        &mut self,
        table: &str,
        row: ColumnValues,
    ) -> Result<InsertResult, PeachySqlError> {
        self.insert_rows(table, &[row]).map(InsertResult::from)
    }

    /// Update matching rows and return how many were affected.
    ///
    /// # Errors
    /// Fails if `set` or `filter` is empty, columns are disallowed, or execution fails.
    pub fn update_rows(
        &mut self,
        table: &str,
        set: &ColumnValues,
        filter: &Filter,
    ) -> Result<i64, PeachySqlError> {
        let query = self.builder().build_update(table, set, filter)?;
        Ok(self.run(query)?.affected())
    }

    /// Delete matching rows and return how many were affected.
    ///
    /// # Errors
    /// Fails if the filter is invalid or execution fails.
    pub fn delete_from(&mut self, table: &str, filter: &Filter) -> Result<i64, PeachySqlError> {
        let query = self.builder().build_delete(table, filter)?;
        Ok(self.run(query)?.affected())
    }

    /// # Errors
    /// Returns `PeachySqlError::Sql` if the driver fails.
    pub fn begin_transaction(&mut self) -> Result<(), PeachySqlError> {
        self.driver
            .begin_transaction()
            .map_err(|e| transaction_error("Failed to begin transaction", &e))
    }

    /// # Errors
    /// Returns `PeachySqlError::Sql` if the driver fails.
    pub fn commit(&mut self) -> Result<(), PeachySqlError> {
        self.driver
            .commit()
            .map_err(|e| transaction_error("Failed to commit transaction", &e))
    }

    /// # Errors
    /// Returns `PeachySqlError::Sql` if the driver fails.
    pub fn rollback(&mut self) -> Result<(), PeachySqlError> {
        self.driver
            .rollback()
            .map_err(|e| transaction_error("Failed to roll back transaction", &e))
    }
}

fn returned_id(value: Option<&SqlValue>) -> Result<i64, PeachySqlError> {
    match value {
        Some(SqlValue::Int(id)) => Ok(*id),
        Some(SqlValue::Text(text)) => text.trim().parse().map_err(|_| {
            PeachySqlError::UnexpectedResult(format!("Inserted id {text} is not an integer"))
        }),
        other => Err(PeachySqlError::UnexpectedResult(format!(
            "Expected an inserted id, got {other:?}"
        ))),
    }
}

fn transaction_error(context: &str, errors: &NativeErrors) -> PeachySqlError {
    PeachySqlError::Sql(SqlException::from_native(context, errors, "", Vec::new()))
}
