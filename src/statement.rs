use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::driver::Driver;
use crate::error::{NativeErrors, PeachySqlError, SqlException};
use crate::options::Options;
use crate::types::{DbRow, SqlParams, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseState {
    Open,
    /// Closed by the statement itself: no result set, exhausted, or after `first()`.
    AutoClosed,
    /// Closed by the caller.
    Closed,
}

/// An executed statement and, while open, its backend cursor.
///
/// The statement borrows the driver exclusively, so the connection cannot start another
/// statement until this one is dropped. Rows can be consumed once, through [`first`],
/// [`all`] or [`rows`].
///
/// [`first`]: Statement::first
/// [`all`]: Statement::all
/// [`rows`]: Statement::rows
pub struct Statement<'c, D: Driver> {
    driver: &'c mut D,
    handle: Option<D::Handle>,
    query: SqlParams,
    columns: Option<Arc<Vec<String>>>,
    affected: i64,
    insert_id: Option<i64>,
    state: CloseState,
    consumed: bool,
}

impl<D: Driver> std::fmt::Debug for Statement<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("query", &self.query.sql)
            .field("affected", &self.affected)
            .field("insert_id", &self.insert_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'c, D: Driver> Statement<'c, D> {
    /// Prepare, bind and run `query` on `driver`.
    ///
    /// Statements without a result set are closed before this returns. Without
    /// `affected_is_row_count`, result-set statements report `-1` as their affected count.
    /// Without `native_bool_type`, booleans are bound as `0`/`1`.
    ///
    /// # Errors
    /// Returns `PeachySqlError::Sql` if preparing, executing or closing fails.
    pub fn execute(
        driver: &'c mut D,
        query: SqlParams,
        options: &Options,
    ) -> Result<Self, PeachySqlError> {
        debug!(sql = %query.sql, params = query.params.len(), "executing statement");

        let mut handle = match driver.prepare(&query.sql) {
            Ok(handle) => handle,
            Err(errors) => return Err(exception("Failed to prepare statement", &errors, &query)),
        };
        let bound = bound_values(&query.params, options.native_bool_type());
        if let Err(errors) = driver.bind_and_execute(&mut handle, &bound) {
            if let Err(close_errors) = driver.close_statement(handle) {
                warn!(error = %close_errors, "failed to close statement after execute error");
            }
            return Err(exception(
                "Failed to execute prepared statement",
                &errors,
                &query,
            ));
        }
        drop(bound);

        let columns = driver.column_names(&handle);
        let affected = if columns.is_some() && !options.affected_is_row_count() {
            -1
        } else {
            driver.rows_affected(&handle)
        };
        let insert_id = driver.last_insert_id(&handle);

        let mut statement = Self {
            driver,
            handle: Some(handle),
            query,
            columns,
            affected,
            insert_id,
            state: CloseState::Open,
            consumed: false,
        };
        if statement.columns.is_none() {
            statement.auto_close()?;
        }
        Ok(statement)
    }

    /// Rows affected, or `-1` for result sets on backends that do not count them.
    #[must_use]
    pub fn affected(&self) -> i64 {
        self.affected
    }

    /// First id generated by this statement, if the backend reported one.
    #[must_use]
    pub fn insert_id(&self) -> Option<i64> {
        self.insert_id.filter(|id| *id != 0)
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query.sql
    }

    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.query.params
    }

    #[must_use]
    pub fn column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.columns.as_ref()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state != CloseState::Open
    }

    /// Single-pass iterator over the remaining rows; the statement closes itself once the
    /// rows run out.
    ///
    /// # Errors
    /// Returns `PeachySqlError::StatementClosed` if the rows were already consumed or the
    /// statement was closed by the caller.
    pub fn rows(&mut self) -> Result<Rows<'_, 'c, D>, PeachySqlError> {
        self.begin_consuming()?;
        Ok(Rows { statement: self })
    }

    /// Read every row and close the statement.
    ///
    /// # Errors
    /// Fails like [`Statement::rows`], or with `PeachySqlError::Sql` if a fetch fails.
    pub fn all(&mut self) -> Result<Vec<DbRow>, PeachySqlError> {
        self.rows()?.collect()
    }

    /// Read the first row, if any, and close the statement.
    ///
    /// # Errors
    /// Fails like [`Statement::rows`], or with `PeachySqlError::Sql` if the fetch or the
    /// close fails.
    pub fn first(&mut self) -> Result<Option<DbRow>, PeachySqlError> {
        self.begin_consuming()?;
        let row = self.fetch()?;
        self.auto_close()?;
        Ok(row)
    }

    /// Close the statement and release the backend cursor.
    ///
    /// Closing a statement that already closed itself is a no-op; closing it a second time
    /// after an explicit close is an error.
    ///
    /// # Errors
    /// Returns `PeachySqlError::StatementClosed` on a repeated explicit close, or
    /// `PeachySqlError::Sql` if the driver fails to close.
    pub fn close(&mut self) -> Result<(), PeachySqlError> {
        match self.state {
            CloseState::Closed => Err(PeachySqlError::StatementClosed(
                "Statement has already been closed".into(),
            )),
            CloseState::AutoClosed => Ok(()),
            CloseState::Open => {
                self.state = CloseState::Closed;
                self.release()
            }
        }
    }

    fn begin_consuming(&mut self) -> Result<(), PeachySqlError> {
        if self.state == CloseState::Closed {
            return Err(PeachySqlError::StatementClosed(
                "Cannot read rows from a closed statement".into(),
            ));
        }
        if self.consumed {
            return Err(PeachySqlError::StatementClosed(
                "Statement rows can only be iterated once".into(),
            ));
        }
        self.consumed = true;
        Ok(())
    }

    fn fetch(&mut self) -> Result<Option<DbRow>, PeachySqlError> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(None);
        };
        match self.driver.fetch_row(handle) {
            Ok(Some(values)) => Ok(Some(DbRow::new(
                self.columns.clone().unwrap_or_default(),
                values,
            ))),
            Ok(None) => {
                self.auto_close()?;
                Ok(None)
            }
            Err(errors) => {
                let err = exception("Failed to fetch row", &errors, &self.query);
                if let Err(close_err) = self.auto_close() {
                    warn!(error = %close_err, "failed to close statement after fetch error");
                }
                Err(err)
            }
        }
    }

    fn auto_close(&mut self) -> Result<(), PeachySqlError> {
        if self.state == CloseState::Open {
            self.state = CloseState::AutoClosed;
        }
        self.release()
    }

    fn release(&mut self) -> Result<(), PeachySqlError> {
        match self.handle.take() {
            Some(handle) => self
                .driver
                .close_statement(handle)
                .map_err(|errors| exception("Failed to close statement", &errors, &self.query)),
            None => Ok(()),
        }
    }
}

impl<D: Driver> Drop for Statement<'_, D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take()
            && let Err(errors) = self.driver.close_statement(handle)
        {
            warn!(sql = %self.query.sql, error = %errors, "failed to close dropped statement");
        }
    }
}

/// Iterator returned by [`Statement::rows`].
pub struct Rows<'s, 'c, D: Driver> {
    statement: &'s mut Statement<'c, D>,
}

impl<D: Driver> Iterator for Rows<'_, '_, D> {
    type Item = Result<DbRow, PeachySqlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.statement.is_closed() {
            return None;
        }
        self.statement.fetch().transpose()
    }
}

/// `params` as the driver receives them: booleans become `0`/`1` for backends without a
/// native boolean type.
fn bound_values(params: &[SqlValue], native_bool: bool) -> Cow<'_, [SqlValue]> {
    if native_bool || !params.iter().any(|v| matches!(v, SqlValue::Bool(_))) {
        return Cow::Borrowed(params);
    }
    Cow::Owned(
        params
            .iter()
            .map(|v| match v {
                SqlValue::Bool(b) => SqlValue::Int(i64::from(*b)),
                other => other.clone(),
            })
            .collect(),
    )
}

fn exception(context: &str, errors: &NativeErrors, query: &SqlParams) -> PeachySqlError {
    PeachySqlError::Sql(SqlException::from_native(
        context,
        errors,
        query.sql.clone(),
        query.params.clone(),
    ))
}
