//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::dialect::{Dialect, Generic, IdRetrieval, Mysql, SqlServer};
pub use crate::driver::Driver;
pub use crate::error::{NativeError, NativeErrors, PeachySqlError, SqlException};
pub use crate::options::{Options, OptionsBuilder, QuoteStyle};
pub use crate::peachy::PeachySql;
pub use crate::query_builder::{
    Condition, Escaper, Filter, Operand, Operator, OrderBy, Page, QueryBuilder, SelectQuery,
};
pub use crate::results::{BulkInsertResult, InsertResult};
pub use crate::statement::{Rows, Statement};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::{ColumnValues, DbRow, SqlParams, SqlValue, make_binary_param};

#[cfg(feature = "sqlite")]
pub use crate::driver::sqlite::SqliteDriver;

#[cfg(feature = "mssql")]
pub use crate::driver::mssql::{MssqlConnectOptions, MssqlDriver};
