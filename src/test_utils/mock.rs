use std::collections::VecDeque;
use std::sync::Arc;

use crate::driver::{Driver, NativeResult};
use crate::error::NativeErrors;
use crate::options::Options;
use crate::types::{SqlParams, SqlValue};

/// What one executed statement reports back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockResult {
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<SqlValue>>,
    pub affected: i64,
    pub insert_id: Option<i64>,
}

impl MockResult {
    /// A DML outcome without a result set.
    #[must_use]
    pub fn affected(affected: i64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    /// An insert outcome reporting `insert_id` as the first generated id.
    #[must_use]
    pub fn inserted(affected: i64, insert_id: i64) -> Self {
        Self {
            affected,
            insert_id: Some(insert_id),
            ..Self::default()
        }
    }

    /// A result set; `affected` is the row count.
    #[must_use]
    pub fn rows(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: Some(columns.iter().map(|c| (*c).to_string()).collect()),
            affected: i64::try_from(rows.len()).unwrap_or(i64::MAX),
            rows,
            insert_id: None,
        }
    }
}

/// Scripted response for the next statement.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    Succeed(MockResult),
    FailPrepare(NativeErrors),
    FailExecute(NativeErrors),
}

#[derive(Debug)]
pub struct MockHandle {
    sql: String,
    outcome: Option<MockOutcome>,
    result: MockResult,
    cursor: VecDeque<Vec<SqlValue>>,
}

/// In-memory [`Driver`] that records every call and replays scripted outcomes.
///
/// Unscripted statements succeed with no result set and zero affected rows, or, with
/// [`MockDriver::echo_params`], return one row holding the bound parameters.
#[derive(Debug, Default)]
pub struct MockDriver {
    outcomes: VecDeque<MockOutcome>,
    echo: bool,
    executed: Vec<SqlParams>,
    calls: usize,
    open: usize,
    max_open: usize,
    closes: usize,
    transactions: Vec<&'static str>,
    fail_transactions: Option<NativeErrors>,
    configured: Option<Options>,
}

impl MockDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn echo_params(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Queue the outcome for the next prepared statement.
    pub fn push(&mut self, outcome: MockOutcome) -> &mut Self {
        self.outcomes.push_back(outcome);
        self
    }

    pub fn push_result(&mut self, result: MockResult) -> &mut Self {
        self.push(MockOutcome::Succeed(result))
    }

    /// Make begin/commit/rollback fail with `errors`.
    pub fn fail_transactions(&mut self, errors: NativeErrors) -> &mut Self {
        self.fail_transactions = Some(errors);
        self
    }

    /// Every statement that reached execution, with its bound parameters.
    #[must_use]
    pub fn executed(&self) -> &[SqlParams] {
        &self.executed
    }

    /// Total number of driver calls of any kind.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Most statements ever open at the same time.
    #[must_use]
    pub fn max_open(&self) -> usize {
        self.max_open
    }

    #[must_use]
    pub fn open_statements(&self) -> usize {
        self.open
    }

    #[must_use]
    pub fn closes(&self) -> usize {
        self.closes
    }

    #[must_use]
    pub fn transactions(&self) -> &[&'static str] {
        &self.transactions
    }

    /// Options handed over by [`Driver::configure`].
    #[must_use]
    pub fn configured(&self) -> Option<&Options> {
        self.configured.as_ref()
    }

    fn transaction(&mut self, name: &'static str) -> NativeResult<()> {
        self.calls += 1;
        if let Some(errors) = &self.fail_transactions {
            return Err(errors.clone());
        }
        self.transactions.push(name);
        Ok(())
    }
}

impl Driver for MockDriver {
    type Handle = MockHandle;

    fn configure(&mut self, options: &Options) {
        self.configured = Some(options.clone());
    }

    fn prepare(&mut self, sql: &str) -> NativeResult<MockHandle> {
        self.calls += 1;
        let outcome = self.outcomes.pop_front();
        if let Some(MockOutcome::FailPrepare(errors)) = outcome {
            return Err(errors);
        }
        self.open += 1;
        self.max_open = self.max_open.max(self.open);
        Ok(MockHandle {
            sql: sql.to_string(),
            outcome,
            result: MockResult::default(),
            cursor: VecDeque::new(),
        })
    }

    fn bind_and_execute(&mut self, handle: &mut MockHandle, params: &[SqlValue]) -> NativeResult<()> {
        self.calls += 1;
        self.executed
            .push(SqlParams::new(handle.sql.clone(), params.to_vec()));
        let result = match handle.outcome.take() {
            Some(MockOutcome::FailExecute(errors)) => return Err(errors),
            Some(MockOutcome::Succeed(result)) => result,
            Some(MockOutcome::FailPrepare(_)) | None if self.echo => {
                let columns: Vec<String> = (1..=params.len()).map(|i| format!("p{i}")).collect();
                MockResult {
                    columns: Some(columns),
                    rows: vec![params.to_vec()],
                    affected: 1,
                    insert_id: None,
                }
            }
            Some(MockOutcome::FailPrepare(_)) | None => MockResult::default(),
        };
        handle.cursor = result.rows.iter().cloned().collect();
        handle.result = result;
        Ok(())
    }

    fn column_names(&self, handle: &MockHandle) -> Option<Arc<Vec<String>>> {
        handle.result.columns.clone().map(Arc::new)
    }

    fn rows_affected(&self, handle: &MockHandle) -> i64 {
        handle.result.affected
    }

    fn last_insert_id(&self, handle: &MockHandle) -> Option<i64> {
        handle.result.insert_id
    }

    fn fetch_row(&mut self, handle: &mut MockHandle) -> NativeResult<Option<Vec<SqlValue>>> {
        self.calls += 1;
        Ok(handle.cursor.pop_front())
    }

    fn close_statement(&mut self, _handle: MockHandle) -> NativeResult<()> {
        self.calls += 1;
        self.open = self.open.saturating_sub(1);
        self.closes += 1;
        Ok(())
    }

    fn begin_transaction(&mut self) -> NativeResult<()> {
        self.transaction("begin")
    }

    fn commit(&mut self) -> NativeResult<()> {
        self.transaction("commit")
    }

    fn rollback(&mut self) -> NativeResult<()> {
        self.transaction("rollback")
    }
}
