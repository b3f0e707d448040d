//! Per-backend SQL dialects.
//!
//! Builders and the insert planner only see the [`Dialect`] trait:
//! - `Mysql`: backtick quoting, `LIMIT/OFFSET`, ids rebuilt from the first generated id
//! - `SqlServer`: bracket quoting, `OFFSET/FETCH`, ids read back through an `OUTPUT` table
//! - `Generic`: ANSI quoting, `LIMIT/OFFSET`, id retrieval chosen by the caller

mod generic;
mod mysql;
mod sql_server;

pub use generic::Generic;
pub use mysql::Mysql;
pub use sql_server::SqlServer;

use crate::error::PeachySqlError;
use crate::options::Options;
use crate::query_builder::{Escaper, Page};

/// How generated identifiers are recovered after a multi-row insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRetrieval {
    /// No identifiers are collected.
    None,
    /// The driver reports the first id of the batch; the rest follow at `stride`.
    FirstIdStride { stride: u64 },
    /// The driver reports the last id of the batch; earlier rows precede it at `stride`.
    LastIdStride { stride: u64 },
    /// Ids are captured with `OUTPUT inserted.<column>` into a table variable and selected.
    OutputTable { column: String },
    /// Ids are read from a `RETURNING <column>` clause.
    Returning { column: String },
}

pub trait Dialect {
    fn name(&self) -> &'static str;

    fn options(&self) -> &Options;

    /// Quote a table or column name for this backend.
    ///
    /// # Errors
    /// Returns `PeachySqlError::InvalidArgument` for blank identifiers or empty segments.
    fn escape_identifier(&self, identifier: &str) -> Result<String, PeachySqlError> {
        Escaper::new(self.options().quote_style()).escape(identifier)
    }

    /// Pagination tail appended after `ORDER BY`.
    fn paginate(&self, page: Page) -> String {
        format!("LIMIT {} OFFSET {}", page.limit(), page.offset())
    }

    /// # Errors
    /// Returns `PeachySqlError::Config` when the backend needs settings that are missing.
    fn id_retrieval(&self) -> Result<IdRetrieval, PeachySqlError>;
}
