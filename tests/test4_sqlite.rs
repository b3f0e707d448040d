#![cfg(feature = "sqlite")]

use peachy_sql::prelude::*;
use peachy_sql::test_utils::row_of;
use tempfile::tempdir;

const SCHEMA: &str = "CREATE TABLE Users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    age INTEGER,
    token BLOB
);";

fn users(count: i64) -> Vec<ColumnValues> {
    (1..=count)
        .map(|i| {
            row_of(vec![
                ("name", SqlValue::Text(format!("user{i}"))),
                ("age", SqlValue::Int(10 * i)),
            ])
        })
        .collect()
}

fn open(dialect: Generic) -> Result<PeachySql<SqliteDriver, Generic>, PeachySqlError> {
    let mut driver = SqliteDriver::open_in_memory()?;
    driver.execute_batch(SCHEMA)?;
    PeachySql::new(driver, dialect)
}

fn count(db: &mut PeachySql<SqliteDriver, Generic>) -> Result<i64, PeachySqlError> {
    let row = db.query("SELECT COUNT(*) AS cnt FROM Users", &[])?.first()?;
    Ok(row
        .and_then(|r| r.get("cnt").and_then(SqlValue::as_int))
        .unwrap_or_default())
}

#[test]
fn batched_insert_rebuilds_ids_from_the_last_rowid() -> Result<(), PeachySqlError> {
    let dialect = Generic::new(OptionsBuilder::generic().max_bound_params(4).build())
        .with_id_retrieval(IdRetrieval::LastIdStride { stride: 1 });
    let mut db = open(dialect)?;

    let result = db.insert_rows("Users", &users(5))?;

    assert_eq!(result.query_count(), 3);
    assert_eq!(result.affected(), 5);
    assert_eq!(result.ids(), &[1, 2, 3, 4, 5]);
    assert_eq!(count(&mut db)?, 5);
    Ok(())
}

#[test]
fn returning_clause_reads_back_ids() -> Result<(), PeachySqlError> {
    let dialect = Generic::new(Options::generic())
        .with_id_retrieval(IdRetrieval::Returning { column: "id".into() });
    let mut db = open(dialect)?;

    let result = db.insert_rows("Users", &users(3))?;
    assert_eq!(result.ids(), &[1, 2, 3]);
    assert_eq!(result.affected(), 3);

    let single = db.insert_row("Users", row_of(vec![("name", "solo")]))?;
    assert_eq!(single.id(), 4);
    Ok(())
}

#[test]
fn select_update_delete_round_trip() -> Result<(), PeachySqlError> {
    let mut db = open(Generic::default())?;
    db.insert_rows("Users", &users(6))?;

    let select = SelectQuery::table("Users")
        .columns(["name", "age"])
        .filter(Filter::from_json(&serde_json::json!({"age": {"ge": 20, "lt": 60}}))?)
        .order_by(OrderBy::new().desc("age"))
        .page(Page::new(2, 1)?);
    let names: Vec<String> = db
        .select(&select)?
        .all()?
        .iter()
        .filter_map(|row| row.get("name").and_then(SqlValue::as_text).map(str::to_string))
        .collect();
    assert_eq!(names, vec!["user4", "user3"]);

    let updated = db.update_rows(
        "Users",
        &row_of(vec![("age", SqlValue::Null)]),
        &Filter::new().op("name", Operator::Lk, Operand::value("user1%")),
    )?;
    assert_eq!(updated, 1);

    let deleted = db.delete_from("Users", &Filter::new().eq("age", SqlValue::Null))?;
    assert_eq!(deleted, 1);
    assert_eq!(count(&mut db)?, 5);
    Ok(())
}

#[test]
fn binary_params_are_stored_byte_for_byte() -> Result<(), PeachySqlError> {
    let mut db = open(Generic::default())?;
    let uuid: Vec<u8> = (0..16).collect();
    db.insert_row(
        "Users",
        row_of(vec![
            ("name", SqlValue::from("bin")),
            ("token", make_binary_param(uuid.clone())),
        ]),
    )?;

    let row = db
        .query(
            "SELECT token, length(token) AS len FROM Users WHERE name = ?",
            &[SqlValue::from("bin")],
        )?
        .first()?
        .expect("row");
    assert_eq!(row.get("token").and_then(SqlValue::as_binary), Some(uuid.as_slice()));
    assert_eq!(row.get("len"), Some(&SqlValue::Int(16)));
    Ok(())
}

#[test]
fn constraint_failures_carry_the_native_code() -> Result<(), PeachySqlError> {
    let mut db = open(Generic::default())?;
    db.insert_row("Users", row_of(vec![("name", "dup")]))?;

    let err = db
        .insert_row("Users", row_of(vec![("name", "dup")]))
        .unwrap_err();
    let ex = err.as_sql_exception().expect("sql exception");
    assert!(ex.message().starts_with("Failed to execute prepared statement: UNIQUE constraint failed"));
    // SQLITE_CONSTRAINT_UNIQUE
    assert_eq!(ex.code(), 2067);
    assert_eq!(ex.query(), r#"INSERT INTO Users ("name") VALUES (?)"#);
    assert_eq!(ex.params(), &[SqlValue::from("dup")]);

    let err = db.query("SELECT * FROM Missing", &[]).unwrap_err();
    let ex = err.as_sql_exception().expect("sql exception");
    assert!(ex.message().starts_with("Failed to prepare statement: no such table"));
    assert_eq!(ex.code(), 1);
    Ok(())
}

#[test]
fn rollback_discards_inserts() -> Result<(), PeachySqlError> {
    let mut db = open(Generic::default())?;

    db.begin_transaction()?;
    db.insert_rows("Users", &users(3))?;
    db.rollback()?;
    assert_eq!(count(&mut db)?, 0);

    db.begin_transaction()?;
    db.insert_rows("Users", &users(2))?;
    db.commit()?;
    assert_eq!(count(&mut db)?, 2);
    Ok(())
}

#[test]
fn file_backed_database_persists_between_connections() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("peachy.db");

    {
        let mut driver = SqliteDriver::open(&path)?;
        driver.execute_batch(SCHEMA)?;
        let mut db = PeachySql::new(driver, Generic::default())?;
        db.insert_rows("Users", &users(4))?;
    }

    let mut db = PeachySql::new(SqliteDriver::open(&path)?, Generic::default())?;
    assert_eq!(count(&mut db)?, 4);
    Ok(())
}
