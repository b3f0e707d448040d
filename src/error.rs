use std::fmt;

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::types::SqlValue;

/// One error record as reported by a native driver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeError {
    pub code: Option<i64>,
    pub sql_state: Option<String>,
    pub message: String,
}

impl NativeError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    /// Read a driver error record in either of the shapes drivers hand back.
    ///
    /// MySQL records use `errno`/`sqlstate`/`error`; SQL Server records use
    /// `code`/`SQLSTATE`/`message`. Missing keys stay `None`.
    #[must_use]
    pub fn from_record(record: &Map<String, JsonValue>) -> Self {
        let code = ["errno", "code"]
            .iter()
            .find_map(|key| record.get(*key))
            .and_then(|value| match value {
                JsonValue::Number(n) => n.as_i64(),
                JsonValue::String(s) => s.parse().ok(),
                _ => None,
            });
        let sql_state = ["sqlstate", "SQLSTATE"]
            .iter()
            .find_map(|key| record.get(*key))
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        let message = ["error", "message"]
            .iter()
            .find_map(|key| record.get(*key))
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            code,
            sql_state,
            message,
        }
    }
}

/// The error records accompanying one failed driver call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeErrors(pub Vec<NativeError>);

impl From<NativeError> for NativeErrors {
    fn from(err: NativeError) -> Self {
        NativeErrors(vec![err])
    }
}

impl fmt::Display for NativeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// A failed backend call, normalized across drivers.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SqlException {
    message: String,
    sql_state: String,
    code: i64,
    query: String,
    params: Vec<SqlValue>,
}

impl SqlException {
    /// Build the exception for a failed call. `context` prefixes the native messages; the
    /// first record supplies the SQLSTATE and numeric code.
    #[must_use]
    pub fn from_native(
        context: &str,
        errors: &NativeErrors,
        query: impl Into<String>,
        params: Vec<SqlValue>,
    ) -> Self {
        let first = errors.0.first();
        Self {
            message: format!("{context}: {errors}"),
            sql_state: first
                .and_then(|e| e.sql_state.clone())
                .unwrap_or_default(),
            code: first.and_then(|e| e.code).unwrap_or(0),
            query: query.into(),
            params,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn sql_state(&self) -> &str {
        &self.sql_state
    }

    #[must_use]
    pub fn code(&self) -> i64 {
        self.code
    }

    /// The SQL text of the failed statement (empty for transaction calls).
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

#[derive(Debug, Error)]
pub enum PeachySqlError {
    #[error(transparent)]
    Sql(#[from] SqlException),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Statement error: {0}")]
    StatementClosed(String),

    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),
}

impl PeachySqlError {
    /// The normalized backend exception, if this error came from the driver.
    #[must_use]
    pub fn as_sql_exception(&self) -> Option<&SqlException> {
        if let PeachySqlError::Sql(ex) = self {
            Some(ex)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn reads_mysql_shaped_record() {
        let err = NativeError::from_record(&record(json!({
            "errno": 1062,
            "sqlstate": "23000",
            "error": "Duplicate entry '1' for key 'PRIMARY'",
        })));
        assert_eq!(err.code, Some(1062));
        assert_eq!(err.sql_state.as_deref(), Some("23000"));
        assert!(err.message.starts_with("Duplicate entry"));
    }

    #[test]
    fn reads_sql_server_shaped_record() {
        let err = NativeError::from_record(&record(json!({
            "SQLSTATE": "42S02",
            "code": 208,
            "message": "Invalid object name 'Nope'.",
        })));
        assert_eq!(err.code, Some(208));
        assert_eq!(err.sql_state.as_deref(), Some("42S02"));
    }

    #[test]
    fn exception_defaults_when_record_is_sparse() {
        let errors = NativeErrors(vec![NativeError::new("boom"), NativeError::new("again")]);
        let ex = SqlException::from_native(
            "Failed to execute prepared statement",
            &errors,
            "SELECT 1",
            vec![SqlValue::Int(1)],
        );
        assert_eq!(ex.message(), "Failed to execute prepared statement: boom; again");
        assert_eq!(ex.sql_state(), "");
        assert_eq!(ex.code(), 0);
        assert_eq!(ex.query(), "SELECT 1");
        assert_eq!(ex.params(), &[SqlValue::Int(1)]);
    }
}
