use peachy_sql::prelude::*;
use peachy_sql::test_utils::{MockDriver, MockOutcome, MockResult, row_of};

fn people(count: i64) -> Vec<ColumnValues> {
    (1..=count)
        .map(|i| row_of(vec![("name", SqlValue::Text(format!("p{i}"))), ("age", SqlValue::Int(20 + i))]))
        .collect()
}

#[test]
fn mysql_ids_continue_across_batches() -> Result<(), PeachySqlError> {
    let mut driver = MockDriver::new();
    driver
        .push_result(MockResult::inserted(2, 10))
        .push_result(MockResult::inserted(2, 12))
        .push_result(MockResult::inserted(1, 14));
    let dialect = Mysql::new(OptionsBuilder::mysql().max_insert_rows(2).build());
    let mut db = PeachySql::new(driver, dialect)?;

    let result = db.insert_rows("People", &people(5))?;

    assert_eq!(result.ids(), &[10, 11, 12, 13, 14]);
    assert_eq!(result.affected(), 5);
    assert_eq!(result.query_count(), 3);

    let driver = db.driver();
    assert_eq!(driver.executed().len(), 3);
    assert_eq!(
        driver.executed()[2].sql,
        "INSERT INTO People (`name`, `age`) VALUES (?,?)"
    );
    assert_eq!(driver.max_open(), 1);
    assert_eq!(driver.open_statements(), 0);
    Ok(())
}

#[test]
fn mysql_stride_spaces_ids() -> Result<(), PeachySqlError> {
    let mut driver = MockDriver::new();
    driver.push_result(MockResult::inserted(3, 5));
    let dialect = Mysql::new(
        OptionsBuilder::mysql()
            .auto_increment_increment(2)?
            .build(),
    );
    let mut db = PeachySql::new(driver, dialect)?;

    let result = db.insert_rows("People", &people(3))?;
    assert_eq!(result.ids(), &[5, 7, 9]);
    Ok(())
}

#[test]
fn empty_insert_makes_no_driver_calls() -> Result<(), PeachySqlError> {
    let mut db = PeachySql::new(MockDriver::new(), SqlServer::default())?;

    let result = db.insert_rows("People", &[])?;

    assert!(result.ids().is_empty());
    assert_eq!(result.affected(), 0);
    assert_eq!(result.query_count(), 0);
    assert_eq!(db.driver().calls(), 0);
    Ok(())
}

#[test]
fn insert_without_generated_id_has_no_ids() -> Result<(), PeachySqlError> {
    let mut driver = MockDriver::new();
    driver.push_result(MockResult::affected(1));
    let mut db = PeachySql::new(driver, Mysql::default())?;

    let result = db.insert_row("Settings", row_of(vec![("key", "theme")]))?;
    assert_eq!(result.id(), 0);
    assert_eq!(result.affected(), 1);
    Ok(())
}

#[test]
fn sql_server_reads_ids_from_the_output_table() -> Result<(), PeachySqlError> {
    let mut driver = MockDriver::new();
    driver.push_result(MockResult::rows(
        &["RowID"],
        vec![vec![SqlValue::Int(7)], vec![SqlValue::Int(9)]],
    ));
    let dialect = SqlServer::new(OptionsBuilder::sql_server().id_column("UserID")?.build());
    let mut db = PeachySql::new(driver, dialect)?;

    let result = db.insert_rows("Users", &people(2))?;

    assert_eq!(result.ids(), &[7, 9]);
    assert_eq!(result.affected(), 2);
    assert_eq!(result.query_count(), 1);
    assert!(db.driver().executed()[0].sql.starts_with("DECLARE @ids TABLE(RowID int); INSERT INTO Users ([name], [age]) OUTPUT inserted.[UserID]"));
    assert_eq!(db.driver().open_statements(), 0);
    Ok(())
}

#[test]
fn sql_server_output_ids_accumulate_across_batches() -> Result<(), PeachySqlError> {
    let mut driver = MockDriver::new();
    driver
        .push_result(MockResult::rows(&["RowID"], vec![vec![SqlValue::Int(7)]]))
        .push_result(MockResult::rows(&["RowID"], vec![vec![SqlValue::Int(9)]]));
    let dialect = SqlServer::new(
        OptionsBuilder::sql_server()
            .id_column("UserID")?
            .max_insert_rows(1)
            .build(),
    );
    let mut db = PeachySql::new(driver, dialect)?;

    let result = db.insert_rows("Users", &people(2))?;

    assert_eq!(result.ids(), &[7, 9]);
    assert_eq!(result.affected(), 2);
    assert_eq!(result.query_count(), 2);
    let executed = db.driver().executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[1].params, vec![SqlValue::from("p2"), SqlValue::Int(22)]);
    assert_eq!(db.driver().max_open(), 1);
    assert_eq!(db.driver().open_statements(), 0);
    Ok(())
}

#[test]
fn returning_mode_collects_each_id() -> Result<(), PeachySqlError> {
    let mut driver = MockDriver::new();
    driver.push_result(MockResult::rows(
        &["id"],
        vec![vec![SqlValue::Int(3)], vec![SqlValue::Text("4".into())]],
    ));
    let dialect = Generic::new(Options::generic())
        .with_id_retrieval(IdRetrieval::Returning { column: "id".into() });
    let mut db = PeachySql::new(driver, dialect)?;

    let result = db.insert_rows("t", &people(2))?;
    assert_eq!(result.into_ids(), vec![3, 4]);
    Ok(())
}

#[test]
fn echoed_params_match_the_inserted_rows() -> Result<(), PeachySqlError> {
    let mut db = PeachySql::new(MockDriver::new().echo_params(), Generic::default())?;
    let rows = vec![
        row_of(vec![("a", SqlValue::Int(1)), ("b", make_binary_param(vec![0xde, 0xad]))]),
        row_of(vec![("a", SqlValue::Int(2)), ("b", SqlValue::Null)]),
    ];

    let plan = db.builder().build_insert_batches("t", &rows)?;
    let query = plan.batches[0].query.clone();
    let echoed = db.run(query)?.first()?.map(|row| row.values).unwrap_or_default();

    let expected: Vec<SqlValue> = rows
        .iter()
        .flat_map(|row| row.iter().map(|(_, v)| v.clone()))
        .collect();
    assert_eq!(echoed, expected);
    Ok(())
}

#[test]
fn failed_batch_stops_the_insert_and_keeps_earlier_batches() {
    let mut driver = MockDriver::new();
    driver
        .push_result(MockResult::inserted(1, 1))
        .push(MockOutcome::FailExecute(
            NativeError::new("Duplicate entry 'p2' for key 'name'")
                .with_code(1062)
                .with_sql_state("23000")
                .into(),
        ));
    let dialect = Mysql::new(OptionsBuilder::mysql().max_insert_rows(1).build());
    let mut db = match PeachySql::new(driver, dialect) {
        Ok(db) => db,
        Err(e) => panic!("options rejected: {e}"),
    };

    let err = db.insert_rows("People", &people(3)).unwrap_err();
    let ex = err.as_sql_exception().expect("sql exception");
    assert_eq!(
        ex.message(),
        "Failed to execute prepared statement: Duplicate entry 'p2' for key 'name'"
    );
    assert_eq!(ex.code(), 1062);
    assert_eq!(ex.sql_state(), "23000");
    assert_eq!(ex.query(), "INSERT INTO People (`name`, `age`) VALUES (?,?)");
    assert_eq!(ex.params(), &[SqlValue::Text("p2".into()), SqlValue::Int(22)]);

    assert_eq!(db.driver().executed().len(), 2);
    assert_eq!(db.driver().open_statements(), 0);
}

#[test]
fn disallowed_column_fails_before_any_call() {
    let dialect = Mysql::new(
        OptionsBuilder::mysql()
            .columns(["name"])
            .expect("columns")
            .build(),
    );
    let mut db = PeachySql::new(MockDriver::new(), dialect).expect("options");

    let err = db.insert_rows("People", &people(1)).unwrap_err();
    assert!(matches!(err, PeachySqlError::InvalidColumn(ref msg) if msg == "age is not a valid column"));
    assert_eq!(db.driver().calls(), 0);
}
