//! Helper utilities for testing and development.

use std::sync::Arc;

use crate::types::{ColumnValues, DbRow, SqlValue};

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<SqlValue>) -> DbRow {
    DbRow::new(Arc::new(column_names), values)
}

/// Build insert/update column values from `(name, value)` pairs.
#[must_use]
pub fn row_of<V: Into<SqlValue>>(pairs: Vec<(&str, V)>) -> ColumnValues {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.into()))
        .collect()
}
