//! Splitting bulk inserts into backend-safe statements.
//!
//! A batch holds as many rows as both the bound-parameter limit and the row limit allow;
//! rows are never split across batches and keep their original order.

use crate::dialect::IdRetrieval;
use crate::error::PeachySqlError;
use crate::types::{ColumnValues, SqlParams, SqlValue};

use super::{QueryBuilder, validate_table};

/// The statements for one bulk insert, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub batches: Vec<InsertBatch>,
    pub id_retrieval: IdRetrieval,
}

impl InsertPlan {
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.batches.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertBatch {
    pub query: SqlParams,
    pub row_count: usize,
}

/// Rows per statement for the given limits (`0` means unbounded).
///
/// # Errors
/// Returns `PeachySqlError::InvalidArgument` when rows have no columns or a single row
/// needs more parameters than `max_bound_params`.
pub fn plan_batch_size(
    columns_per_row: usize,
    row_count: usize,
    max_bound_params: usize,
    max_insert_rows: usize,
) -> Result<usize, PeachySqlError> {
    if columns_per_row == 0 {
        return Err(PeachySqlError::InvalidArgument(
            "Cannot insert rows without columns".into(),
        ));
    }

    let by_params = if max_bound_params > 0 {
        max_bound_params / columns_per_row
    } else {
        usize::MAX
    };
    if by_params == 0 {
        return Err(PeachySqlError::InvalidArgument(format!(
            "A row with {columns_per_row} columns exceeds the limit of {max_bound_params} bound parameters"
        )));
    }

    let by_rows = if max_insert_rows > 0 {
        max_insert_rows
    } else {
        usize::MAX
    };

    Ok(by_params.min(by_rows).min(row_count.max(1)))
}

/// Split `rows` into contiguous groups of at most `per_batch`, the last possibly shorter.
#[must_use]
pub fn partition<T>(rows: &[T], per_batch: usize) -> Vec<&[T]> {
    rows.chunks(per_batch.max(1)).collect()
}

/// Rebuild the ids of one batch from the single id a driver reports.
///
/// A missing or zero id means the table generated none, giving an empty list.
///
/// # Errors
/// Returns `PeachySqlError::Config` if the stride does not fit an `i64`.
pub fn reconstruct_ids(
    retrieval: &IdRetrieval,
    reported_id: Option<i64>,
    row_count: usize,
) -> Result<Vec<i64>, PeachySqlError> {
    let (stride, from_last) = match retrieval {
        IdRetrieval::FirstIdStride { stride } => (*stride, false),
        IdRetrieval::LastIdStride { stride } => (*stride, true),
        _ => return Ok(Vec::new()),
    };
    let Some(reported) = reported_id.filter(|id| *id != 0) else {
        return Ok(Vec::new());
    };

    let stride = i64::try_from(stride)
        .map_err(|_| PeachySqlError::Config(format!("Id stride {stride} is out of range")))?;
    let steps = i64::try_from(row_count.saturating_sub(1))
        .map_err(|_| PeachySqlError::Config("Too many rows for id reconstruction".into()))?;
    let overflow = || {
        PeachySqlError::UnexpectedResult(format!(
            "Ids for {row_count} rows from {reported} with stride {stride} overflow"
        ))
    };
    let span = steps.checked_mul(stride).ok_or_else(overflow)?;
    let first = if from_last {
        reported.checked_sub(span).ok_or_else(overflow)?
    } else {
        reported.checked_add(span).ok_or_else(overflow)?;
        reported
    };

    // first + span fits, so every step in between does too
    Ok((0..=steps).map(|i| first + i * stride).collect())
}

impl QueryBuilder<'_> {
    /// Plan the statements that insert `rows` into `table`.
    ///
    /// Every row must carry the same column set as the first; values are emitted in the
    /// first row's column order.
    ///
    /// # Errors
    /// Fails on a blank table, mismatched or empty column sets, disallowed columns,
    /// limits too small for one row, or a dialect missing id retrieval settings.
    pub fn build_insert_batches(
        &self,
        table: &str,
        rows: &[ColumnValues],
    ) -> Result<InsertPlan, PeachySqlError> {
        let Some(first) = rows.first() else {
            return Ok(InsertPlan {
                batches: Vec::new(),
                id_retrieval: IdRetrieval::None,
            });
        };
        validate_table(table)?;
        let id_retrieval = self.dialect.id_retrieval()?;

        let columns: Vec<&str> = first.iter().map(|(c, _)| c.as_str()).collect();
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(PeachySqlError::InvalidArgument(format!(
                    "Column {column} appears more than once"
                )));
            }
        }
        let ordered = rows
            .iter()
            .enumerate()
            .map(|(i, row)| align_row(&columns, row, i))
            .collect::<Result<Vec<_>, _>>()?;

        let escaped = columns
            .iter()
            .map(|c| {
                self.options().validate_column(c)?;
                self.escape(c)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let per_batch = plan_batch_size(
            columns.len(),
            rows.len(),
            self.options().max_bound_params(),
            self.options().max_insert_rows(),
        )?;

        let batches = partition(&ordered, per_batch)
            .into_iter()
            .map(|chunk| {
                Ok(InsertBatch {
                    query: self.build_insert_query(table, &escaped, chunk, &id_retrieval)?,
                    row_count: chunk.len(),
                })
            })
            .collect::<Result<Vec<_>, PeachySqlError>>()?;

        Ok(InsertPlan {
            batches,
            id_retrieval,
        })
    }

    /// Render one multi-row `INSERT` from already-escaped columns.
    ///
    /// # Errors
    /// Fails if the id column named by `id_retrieval` cannot be escaped.
    pub fn build_insert_query(
        &self,
        table: &str,
        escaped_columns: &[String],
        rows: &[Vec<&SqlValue>],
        id_retrieval: &IdRetrieval,
    ) -> Result<SqlParams, PeachySqlError> {
        let row_placeholders = format!("({})", vec!["?"; escaped_columns.len()].join(","));
        let values = vec![row_placeholders.as_str(); rows.len()].join(",");
        let params: Vec<SqlValue> = rows
            .iter()
            .flat_map(|row| row.iter().map(|v| (*v).clone()))
            .collect();
        let cols = escaped_columns.join(", ");

        let sql = match id_retrieval {
            IdRetrieval::OutputTable { column } => format!(
                "DECLARE @ids TABLE(RowID int); INSERT INTO {table} ({cols}) OUTPUT inserted.{} INTO @ids(RowID) VALUES {values}; SELECT * FROM @ids;",
                self.escape(column)?
            ),
            IdRetrieval::Returning { column } => format!(
                "INSERT INTO {table} ({cols}) VALUES {values} RETURNING {}",
                self.escape(column)?
            ),
            IdRetrieval::None
            | IdRetrieval::FirstIdStride { .. }
            | IdRetrieval::LastIdStride { .. } => {
                format!("INSERT INTO {table} ({cols}) VALUES {values}")
            }
        };

        Ok(SqlParams::new(sql, params))
    }
}

fn align_row<'r>(
    columns: &[&str],
    row: &'r ColumnValues,
    index: usize,
) -> Result<Vec<&'r SqlValue>, PeachySqlError> {
    let mismatch = || {
        PeachySqlError::InvalidArgument(format!(
            "Row {index} does not have the same columns as the first row"
        ))
    };
    if row.len() != columns.len() {
        return Err(mismatch());
    }
    columns
        .iter()
        .map(|col| {
            row.iter()
                .find(|(c, _)| c == col)
                .map(|(_, v)| v)
                .ok_or_else(mismatch)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Generic, Mysql, SqlServer};
    use crate::options::OptionsBuilder;

    fn row(id: i64) -> ColumnValues {
        vec![
            ("name".to_string(), SqlValue::Text(format!("user{id}"))),
            ("age".to_string(), SqlValue::Int(id)),
            ("dept".to_string(), SqlValue::Null),
        ]
    }

    #[test]
    fn batch_size_follows_the_tighter_limit() -> Result<(), PeachySqlError> {
        assert_eq!(plan_batch_size(3, 10, 4, 0)?, 1);
        assert_eq!(plan_batch_size(2, 10, 9, 3)?, 3);
        assert_eq!(plan_batch_size(2, 10, 0, 0)?, 10);
        assert_eq!(plan_batch_size(2, 10, 2_099, 1_000)?, 10);
        assert_eq!(plan_batch_size(10, 5_000, 2_099, 1_000)?, 209);
        Ok(())
    }

    #[test]
    fn batch_size_rejects_impossible_rows() {
        assert!(matches!(
            plan_batch_size(0, 1, 0, 0),
            Err(PeachySqlError::InvalidArgument(_))
        ));
        assert!(matches!(
            plan_batch_size(5, 1, 4, 0),
            Err(PeachySqlError::InvalidArgument(_))
        ));
    }

    #[test]
    fn ten_rows_with_four_params_take_ten_statements() -> Result<(), PeachySqlError> {
        let dialect = Generic::new(OptionsBuilder::generic().max_bound_params(4).build());
        let rows: Vec<_> = (1..=10).map(row).collect();
        let plan = QueryBuilder::new(&dialect).build_insert_batches("People", &rows)?;
        assert_eq!(plan.query_count(), 10);
        assert!(plan.batches.iter().all(|b| b.row_count == 1));
        assert_eq!(
            plan.batches[0].query.sql,
            r#"INSERT INTO People ("name", "age", "dept") VALUES (?,?,?)"#
        );
        assert_eq!(plan.batches[9].query.params[1], SqlValue::Int(10));
        Ok(())
    }

    #[test]
    fn last_batch_holds_the_remainder() -> Result<(), PeachySqlError> {
        let dialect = Mysql::new(OptionsBuilder::mysql().max_insert_rows(4).build());
        let rows: Vec<_> = (1..=10).map(row).collect();
        let plan = QueryBuilder::new(&dialect).build_insert_batches("People", &rows)?;
        let sizes: Vec<_> = plan.batches.iter().map(|b| b.row_count).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(
            plan.batches[2].query.sql,
            "INSERT INTO People (`name`, `age`, `dept`) VALUES (?,?,?),(?,?,?)"
        );
        for batch in &plan.batches {
            assert_eq!(batch.query.placeholder_count(), batch.query.params.len());
        }
        Ok(())
    }

    #[test]
    fn sql_server_wraps_insert_with_output_table() -> Result<(), PeachySqlError> {
        let dialect = SqlServer::new(OptionsBuilder::sql_server().id_column("UserID")?.build());
        let rows = vec![row(1), row(2)];
        let plan = QueryBuilder::new(&dialect).build_insert_batches("Users", &rows)?;
        assert_eq!(plan.query_count(), 1);
        assert_eq!(
            plan.batches[0].query.sql,
            "DECLARE @ids TABLE(RowID int); INSERT INTO Users ([name], [age], [dept]) OUTPUT inserted.[UserID] INTO @ids(RowID) VALUES (?,?,?),(?,?,?); SELECT * FROM @ids;"
        );
        Ok(())
    }

    #[test]
    fn sql_server_without_id_column_is_a_config_error() {
        let dialect = SqlServer::default();
        assert!(matches!(
            QueryBuilder::new(&dialect).build_insert_batches("Users", &[row(1)]),
            Err(PeachySqlError::Config(_))
        ));
    }

    #[test]
    fn rows_are_aligned_to_first_row_order() -> Result<(), PeachySqlError> {
        let dialect = Generic::default();
        let rows = vec![
            vec![
                ("a".to_string(), SqlValue::Int(1)),
                ("b".to_string(), SqlValue::Int(2)),
            ],
            vec![
                ("b".to_string(), SqlValue::Int(4)),
                ("a".to_string(), SqlValue::Int(3)),
            ],
        ];
        let plan = QueryBuilder::new(&dialect).build_insert_batches("t", &rows)?;
        assert_eq!(
            plan.batches[0].query.params,
            vec![
                SqlValue::Int(1),
                SqlValue::Int(2),
                SqlValue::Int(3),
                SqlValue::Int(4)
            ]
        );
        Ok(())
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let dialect = Generic::default();
        let rows = vec![
            vec![("a".to_string(), SqlValue::Int(1))],
            vec![("b".to_string(), SqlValue::Int(2))],
        ];
        assert!(matches!(
            QueryBuilder::new(&dialect).build_insert_batches("t", &rows),
            Err(PeachySqlError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_rows_plan_nothing() -> Result<(), PeachySqlError> {
        let dialect = Mysql::default();
        let plan = QueryBuilder::new(&dialect).build_insert_batches("t", &[])?;
        assert_eq!(plan.query_count(), 0);
        Ok(())
    }

    #[test]
    fn ids_follow_the_stride() -> Result<(), PeachySqlError> {
        let first = IdRetrieval::FirstIdStride { stride: 1 };
        assert_eq!(reconstruct_ids(&first, Some(50), 5)?, vec![50, 51, 52, 53, 54]);

        let multi_master = IdRetrieval::FirstIdStride { stride: 10 };
        assert_eq!(reconstruct_ids(&multi_master, Some(3), 3)?, vec![3, 13, 23]);

        let last = IdRetrieval::LastIdStride { stride: 1 };
        assert_eq!(reconstruct_ids(&last, Some(7), 3)?, vec![5, 6, 7]);

        assert!(reconstruct_ids(&first, Some(0), 1)?.is_empty());
        assert!(reconstruct_ids(&first, None, 4)?.is_empty());
        assert!(reconstruct_ids(&IdRetrieval::None, Some(9), 1)?.is_empty());
        Ok(())
    }

    #[test]
    fn ids_past_i64_range_are_an_error() {
        let huge = IdRetrieval::FirstIdStride { stride: 1 << 62 };
        assert!(matches!(
            reconstruct_ids(&huge, Some(5), 3),
            Err(PeachySqlError::UnexpectedResult(_))
        ));

        let near_max = IdRetrieval::FirstIdStride { stride: 1 };
        assert!(matches!(
            reconstruct_ids(&near_max, Some(i64::MAX), 2),
            Err(PeachySqlError::UnexpectedResult(_))
        ));

        let from_last = IdRetrieval::LastIdStride { stride: u64::MAX >> 1 };
        assert!(matches!(
            reconstruct_ids(&from_last, Some(-5), 2),
            Err(PeachySqlError::UnexpectedResult(_))
        ));
        assert_eq!(reconstruct_ids(&near_max, Some(i64::MAX), 1).ok(), Some(vec![i64::MAX]));
    }
}
