use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// Values that can be bound as query parameters or read back from a row.
///
/// Every backend receives the same enum so builders never branch on driver types:
/// ```rust
/// use peachy_sql::prelude::*;
///
/// let params = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("alice".into()),
///     make_binary_param(vec![0xde, 0xad]),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// JSON value, bound as its serialized text
    Json(JsonValue),
    /// Binary parameter; drivers bind it through their native binary path
    Binary(Vec<u8>),
    /// NULL value
    Null,
}

impl SqlValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let SqlValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let SqlValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        if let SqlValue::Binary(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }
}

/// Wrap raw bytes so they are bound as binary rather than text (e.g. 16-byte UUIDs).
#[must_use]
pub fn make_binary_param(bytes: impl Into<Vec<u8>>) -> SqlValue {
    SqlValue::Binary(bytes.into())
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// JSON scalars map to the matching variant; arrays and objects stay JSON.
impl From<JsonValue> for SqlValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => n.as_f64().map_or(SqlValue::Json(JsonValue::Number(n)), SqlValue::Float),
            },
            JsonValue::String(s) => SqlValue::Text(s),
            other => SqlValue::Json(other),
        }
    }
}

/// A SQL string with positional `?` placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlParams {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlParams {
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Count `?` placeholders outside quoted identifiers and string literals.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        let mut count = 0;
        let mut closing: Option<char> = None;
        for ch in self.sql.chars() {
            match closing {
                Some(end) if ch == end => closing = None,
                Some(_) => {}
                None => match ch {
                    '?' => count += 1,
                    '\'' | '"' | '`' => closing = Some(ch),
                    '[' => closing = Some(']'),
                    _ => {}
                },
            }
        }
        count
    }
}

/// Ordered column/value pairs: one insert row, or the `SET` list of an update.
pub type ColumnValues = Vec<(String, SqlValue)>;

/// A row fetched from a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DbRow {
    /// Column names, shared by every row of one statement
    pub column_names: Arc<Vec<String>>,
    pub values: Vec<SqlValue>,
}

impl DbRow {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Collect the row into a name → value map.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, SqlValue> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_count_skips_quoted_text() {
        let q = SqlParams::new(r#"SELECT "a?" FROM t WHERE b = ? AND c = '?' AND [d?] = ?"#, vec![]);
        assert_eq!(q.placeholder_count(), 2);
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[test]
    fn row_lookup_by_name() {
        let row = DbRow::new(
            Arc::new(vec!["id".into(), "name".into()]),
            vec![SqlValue::Int(3), SqlValue::from("Bob")],
        );
        assert_eq!(row.get("name").and_then(SqlValue::as_text), Some("Bob"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.to_map().get("id"), Some(&SqlValue::Int(3)));
    }
}
