use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use super::{Driver, NativeResult};
use crate::error::{NativeError, NativeErrors, PeachySqlError, SqlException};
use crate::translation::words::{main_verb, statement_words};
use crate::types::SqlValue;

/// [`Driver`] over a rusqlite connection.
///
/// rusqlite statements borrow their connection, so results are read to completion during
/// execution and served from the handle afterwards. `last_insert_id` is the rowid of the
/// *last* inserted row; pair it with `IdRetrieval::LastIdStride` or use
/// `IdRetrieval::Returning`.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Connection,
}

#[derive(Debug)]
pub struct SqliteHandle {
    sql: String,
    columns: Option<Arc<Vec<String>>>,
    rows: VecDeque<Vec<SqlValue>>,
    affected: i64,
    last_insert_id: Option<i64>,
}

impl SqliteDriver {
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// # Errors
    /// Returns `PeachySqlError::Sql` if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PeachySqlError> {
        Connection::open(path)
            .map(Self::new)
            .map_err(|e| open_error(&e.into()))
    }

    /// # Errors
    /// Returns `PeachySqlError::Sql` if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, PeachySqlError> {
        Connection::open_in_memory()
            .map(Self::new)
            .map_err(|e| open_error(&e.into()))
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run parameterless SQL (DDL, multiple statements).
    ///
    /// # Errors
    /// Returns `PeachySqlError::Sql` if any statement fails.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), PeachySqlError> {
        self.conn.execute_batch(sql).map_err(|e| {
            PeachySqlError::Sql(SqlException::from_native(
                "Failed to execute batch",
                &e.into(),
                sql,
                Vec::new(),
            ))
        })
    }
}

fn open_error(errors: &NativeErrors) -> PeachySqlError {
    PeachySqlError::Sql(SqlException::from_native(
        "Failed to open database",
        errors,
        "",
        Vec::new(),
    ))
}

impl From<rusqlite::Error> for NativeErrors {
    fn from(err: rusqlite::Error) -> Self {
        let native = match &err {
            rusqlite::Error::SqliteFailure(failure, message) => NativeError::new(
                message.clone().unwrap_or_else(|| failure.to_string()),
            )
            .with_code(i64::from(failure.extended_code)),
            other => NativeError::new(other.to_string()),
        };
        NativeErrors(vec![native])
    }
}

/// Convert one value into the rusqlite value it binds as.
#[must_use]
pub fn to_sqlite_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Int(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        SqlValue::Json(json) => Value::Text(json.to_string()),
        SqlValue::Binary(bytes) => Value::Blob(bytes.clone()),
        SqlValue::Null => Value::Null,
    }
}

fn inserts_rows(sql: &str) -> bool {
    statement_words(sql)
        .first()
        .and_then(|words| main_verb(words))
        .is_some_and(|verb| matches!(verb, "INSERT" | "REPLACE"))
}

fn from_sqlite_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Binary(b),
    }
}

impl Driver for SqliteDriver {
    type Handle = SqliteHandle;

    fn prepare(&mut self, sql: &str) -> NativeResult<SqliteHandle> {
        // Compiles now so syntax errors surface at prepare; execution reuses the cache entry.
        self.conn.prepare_cached(sql)?;
        Ok(SqliteHandle {
            sql: sql.to_string(),
            columns: None,
            rows: VecDeque::new(),
            affected: 0,
            last_insert_id: None,
        })
    }

    fn bind_and_execute(
        &mut self,
        handle: &mut SqliteHandle,
        params: &[SqlValue],
    ) -> NativeResult<()> {
        let values: Vec<Value> = params.iter().map(to_sqlite_value).collect();
        let mut stmt = self.conn.prepare_cached(&handle.sql)?;

        if stmt.column_count() == 0 {
            let changed = stmt.execute(params_from_iter(values.iter()))?;
            handle.columns = None;
            handle.affected = i64::try_from(changed).unwrap_or(i64::MAX);
        } else {
            let names: Vec<String> = stmt
                .column_names()
                .iter()
                .map(std::string::ToString::to_string)
                .collect();
            let column_count = names.len();
            let readonly = stmt.readonly();

            let mut rows = stmt.query(params_from_iter(values.iter()))?;
            let mut fetched = VecDeque::new();
            while let Some(row) = rows.next()? {
                let mut row_values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    row_values.push(from_sqlite_value(row.get::<_, Value>(i)?));
                }
                fetched.push_back(row_values);
            }
            drop(rows);

            handle.affected = if readonly {
                i64::try_from(fetched.len()).unwrap_or(i64::MAX)
            } else {
                i64::try_from(self.conn.changes()).unwrap_or(i64::MAX)
            };
            handle.columns = Some(Arc::new(names));
            handle.rows = fetched;
        }

        // last_insert_rowid() keeps its value across UPDATE and DELETE
        handle.last_insert_id = if handle.affected > 0 && inserts_rows(&handle.sql) {
            Some(self.conn.last_insert_rowid())
        } else {
            None
        };
        Ok(())
    }

    fn column_names(&self, handle: &SqliteHandle) -> Option<Arc<Vec<String>>> {
        handle.columns.clone()
    }

    fn rows_affected(&self, handle: &SqliteHandle) -> i64 {
        handle.affected
    }

    fn last_insert_id(&self, handle: &SqliteHandle) -> Option<i64> {
        handle.last_insert_id
    }

    fn fetch_row(&mut self, handle: &mut SqliteHandle) -> NativeResult<Option<Vec<SqlValue>>> {
        Ok(handle.rows.pop_front())
    }

    fn close_statement(&mut self, handle: SqliteHandle) -> NativeResult<()> {
        drop(handle);
        Ok(())
    }

    fn begin_transaction(&mut self) -> NativeResult<()> {
        Ok(self.conn.execute_batch("BEGIN")?)
    }

    fn commit(&mut self) -> NativeResult<()> {
        Ok(self.conn.execute_batch("COMMIT")?)
    }

    fn rollback(&mut self) -> NativeResult<()> {
        Ok(self.conn.execute_batch("ROLLBACK")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_native_error_codes() {
        let mut driver = match SqliteDriver::open_in_memory() {
            Ok(driver) => driver,
            Err(e) => panic!("open failed: {e}"),
        };
        let err = driver.prepare("SELECT * FROM missing_table").unwrap_err();
        assert_eq!(err.0.len(), 1);
        assert!(err.0[0].message.contains("missing_table"));
        assert_eq!(err.0[0].code, Some(1));
    }

    #[test]
    fn binary_values_round_trip_as_blobs() -> Result<(), PeachySqlError> {
        let mut driver = SqliteDriver::open_in_memory()?;
        driver.execute_batch("CREATE TABLE b (v BLOB)")?;
        let uuid = vec![0x12_u8; 16];
        let mut insert = driver.prepare("INSERT INTO b (v) VALUES (?)").unwrap();
        driver
            .bind_and_execute(&mut insert, &[SqlValue::Binary(uuid.clone())])
            .unwrap();
        assert_eq!(driver.rows_affected(&insert), 1);
        assert_eq!(driver.last_insert_id(&insert), Some(1));

        let mut select = driver.prepare("SELECT v, typeof(v) FROM b").unwrap();
        driver.bind_and_execute(&mut select, &[]).unwrap();
        let row = driver.fetch_row(&mut select).unwrap();
        assert_eq!(
            row,
            Some(vec![SqlValue::Binary(uuid), SqlValue::Text("blob".into())])
        );
        Ok(())
    }

    #[test]
    fn only_inserts_report_an_insert_id() -> Result<(), PeachySqlError> {
        let mut driver = SqliteDriver::open_in_memory()?;
        driver.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)")?;

        let mut insert = driver.prepare("-- seed\nINSERT INTO t (v) VALUES (?), (?)").unwrap();
        driver
            .bind_and_execute(&mut insert, &[SqlValue::from("a"), SqlValue::from("b")])
            .unwrap();
        assert_eq!(driver.last_insert_id(&insert), Some(2));

        let mut update = driver.prepare("UPDATE t SET v = ? WHERE id = 1").unwrap();
        driver
            .bind_and_execute(&mut update, &[SqlValue::from("c")])
            .unwrap();
        assert_eq!(driver.rows_affected(&update), 1);
        assert_eq!(driver.last_insert_id(&update), None);

        let mut delete = driver.prepare("DELETE FROM t WHERE id = 2").unwrap();
        driver.bind_and_execute(&mut delete, &[]).unwrap();
        assert_eq!(driver.rows_affected(&delete), 1);
        assert_eq!(driver.last_insert_id(&delete), None);
        Ok(())
    }
}
