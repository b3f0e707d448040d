//! Multi-backend SQL query building and bulk-insert batching.
//!
//! Builders render SQL with `?` placeholders for a [`Dialect`](dialect::Dialect); the
//! [`PeachySql`] facade runs them on any [`Driver`](driver::Driver) and splits large inserts
//! into statements that respect the backend's parameter and row limits.
//!
//! ```rust
//! use peachy_sql::prelude::*;
//!
//! let dialect = Mysql::new(OptionsBuilder::mysql().columns(["id", "name"])?.build());
//! let builder = QueryBuilder::new(&dialect);
//! let update = builder.build_update(
//!     "Users",
//!     &vec![("name".to_string(), SqlValue::from("Bob"))],
//!     &Filter::new().eq("id", 5),
//! )?;
//! assert_eq!(update.sql, "UPDATE Users SET `name` = ? WHERE `id` = ?");
//! # Ok::<(), PeachySqlError>(())
//! ```

pub mod dialect;
pub mod driver;
pub mod error;
pub mod options;
pub mod peachy;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod statement;
pub mod translation;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{NativeError, NativeErrors, PeachySqlError, SqlException};
pub use peachy::PeachySql;
pub use statement::{Rows, Statement};
pub use types::{ColumnValues, DbRow, SqlParams, SqlValue, make_binary_param};
