//! The native driver capability the execution layer runs on.
//!
//! - `sqlite`: `SqliteDriver` over rusqlite (feature `sqlite`)
//! - `mssql`: `MssqlDriver` over tiberius (feature `mssql`)
//!
//! Any other driver plugs in by implementing [`Driver`].

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use crate::error::NativeErrors;
use crate::options::Options;
use crate::types::SqlValue;

/// Result of a native driver call; failures carry the driver's error records.
pub type NativeResult<T> = Result<T, NativeErrors>;

/// Synchronous prepare/bind/execute/fetch primitives of one connection.
///
/// A driver serves one open statement at a time; the execution layer never prepares a new
/// statement before closing the previous one.
pub trait Driver {
    /// Per-statement state owned by the caller between calls.
    type Handle;

    /// Take the backend options that change how results are read. Called once, when the
    /// driver is paired with a dialect.
    fn configure(&mut self, _options: &Options) {}

    fn prepare(&mut self, sql: &str) -> NativeResult<Self::Handle>;

    /// Bind `params` positionally and run the statement. [`SqlValue::Binary`] must go
    /// through the driver's binary binding.
    fn bind_and_execute(&mut self, handle: &mut Self::Handle, params: &[SqlValue])
    -> NativeResult<()>;

    /// Column names of the statement's result set, or `None` if it produced none.
    fn column_names(&self, handle: &Self::Handle) -> Option<Arc<Vec<String>>>;

    fn rows_affected(&self, handle: &Self::Handle) -> i64;

    /// Id the backend reported for the last insert: the first row's id on MySQL, the last
    /// row's on SQLite.
    fn last_insert_id(&self, handle: &Self::Handle) -> Option<i64>;

    /// Next row, or `None` once the result set is exhausted.
    fn fetch_row(&mut self, handle: &mut Self::Handle) -> NativeResult<Option<Vec<SqlValue>>>;

    fn close_statement(&mut self, handle: Self::Handle) -> NativeResult<()>;

    fn begin_transaction(&mut self) -> NativeResult<()>;

    fn commit(&mut self) -> NativeResult<()>;

    fn rollback(&mut self) -> NativeResult<()>;
}
