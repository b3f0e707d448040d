use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::PeachySqlError;

/// How identifiers are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// ANSI double quotes: `"name"`
    Ansi,
    /// MySQL backticks: `` `name` ``
    Backtick,
    /// SQL Server brackets: `[name]`
    Bracket,
}

/// Backend configuration. Build it with [`OptionsBuilder`]; it is immutable afterwards.
///
/// Limits of `0` mean unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    pub(crate) table: Option<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) quote_style: QuoteStyle,
    pub(crate) max_bound_params: usize,
    pub(crate) max_insert_rows: usize,
    pub(crate) auto_increment_increment: u64,
    pub(crate) id_column: Option<String>,
    pub(crate) affected_is_row_count: bool,
    pub(crate) native_bool_type: bool,
    pub(crate) multiple_row_sets: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            table: None,
            columns: Vec::new(),
            quote_style: QuoteStyle::Ansi,
            max_bound_params: 0,
            max_insert_rows: 0,
            auto_increment_increment: 1,
            id_column: None,
            affected_is_row_count: true,
            native_bool_type: false,
            multiple_row_sets: false,
        }
    }
}

impl Options {
    /// Defaults for MySQL (placeholder limit is 65 535).
    #[must_use]
    pub fn mysql() -> Self {
        Self {
            quote_style: QuoteStyle::Backtick,
            max_bound_params: 65_535,
            ..Self::default()
        }
    }

    /// Defaults for SQL Server (2 100 parameters less one, 1 000 rows per `VALUES`).
    #[must_use]
    pub fn sql_server() -> Self {
        Self {
            quote_style: QuoteStyle::Bracket,
            max_bound_params: 2_099,
            max_insert_rows: 1_000,
            affected_is_row_count: false,
            native_bool_type: false,
            multiple_row_sets: true,
            ..Self::default()
        }
    }

    /// Defaults for generic drivers: ANSI quoting, no limits.
    #[must_use]
    pub fn generic() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// The column allow-list. Empty means every column is accepted.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn quote_style(&self) -> QuoteStyle {
        self.quote_style
    }

    #[must_use]
    pub fn max_bound_params(&self) -> usize {
        self.max_bound_params
    }

    #[must_use]
    pub fn max_insert_rows(&self) -> usize {
        self.max_insert_rows
    }

    #[must_use]
    pub fn auto_increment_increment(&self) -> u64 {
        self.auto_increment_increment
    }

    #[must_use]
    pub fn id_column(&self) -> Option<&str> {
        self.id_column.as_deref()
    }

    /// Whether the affected count of a result-set statement is its row count (`true`) or
    /// the `-1` sentinel (`false`).
    #[must_use]
    pub fn affected_is_row_count(&self) -> bool {
        self.affected_is_row_count
    }

    #[must_use]
    pub fn native_bool_type(&self) -> bool {
        self.native_bool_type
    }

    #[must_use]
    pub fn multiple_row_sets(&self) -> bool {
        self.multiple_row_sets
    }

    /// Re-run the setter checks, for options that did not come through [`OptionsBuilder`]
    /// (e.g. deserialized ones).
    ///
    /// # Errors
    /// Returns `PeachySqlError::Config` naming the first invalid setting.
    pub fn validate(&self) -> Result<(), PeachySqlError> {
        if self.table.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(PeachySqlError::Config("Table name cannot be blank".into()));
        }
        if self.columns.iter().any(|c| c.trim().is_empty()) {
            return Err(PeachySqlError::Config("Column names cannot be blank".into()));
        }
        if self.auto_increment_increment == 0 {
            return Err(PeachySqlError::Config(
                "Auto increment increment must be at least 1".into(),
            ));
        }
        if self.id_column.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(PeachySqlError::Config("ID column cannot be blank".into()));
        }
        Ok(())
    }

    /// Check a column name against the allow-list.
    ///
    /// # Errors
    /// Returns `PeachySqlError::InvalidColumn` if the allow-list is non-empty and lacks `column`.
    pub fn validate_column(&self, column: &str) -> Result<(), PeachySqlError> {
        if self.columns.is_empty() || self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(PeachySqlError::InvalidColumn(format!(
                "{column} is not a valid column"
            )))
        }
    }
}

/// Fluent builder for [`Options`]; every setter validates its input.
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    opts: Options,
}

impl OptionsBuilder {
    #[must_use]
    pub fn new(base: Options) -> Self {
        Self { opts: base }
    }

    #[must_use]
    pub fn mysql() -> Self {
        Self::new(Options::mysql())
    }

    #[must_use]
    pub fn sql_server() -> Self {
        Self::new(Options::sql_server())
    }

    #[must_use]
    pub fn generic() -> Self {
        Self::new(Options::generic())
    }

    /// # Errors
    /// Returns `PeachySqlError::Config` if `table` is blank.
    pub fn table(mut self, table: impl Into<String>) -> Result<Self, PeachySqlError> {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(PeachySqlError::Config("Table name cannot be blank".into()));
        }
        self.opts.table = Some(table);
        Ok(self)
    }

    /// # Errors
    /// Returns `PeachySqlError::Config` if any column name is blank.
    pub fn columns<I, S>(mut self, columns: I) -> Result<Self, PeachySqlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.iter().any(|c| c.trim().is_empty()) {
            return Err(PeachySqlError::Config("Column names cannot be blank".into()));
        }
        self.opts.columns = columns;
        Ok(self)
    }

    #[must_use]
    pub fn quote_style(mut self, quote_style: QuoteStyle) -> Self {
        self.opts.quote_style = quote_style;
        self
    }

    #[must_use]
    pub fn max_bound_params(mut self, max: usize) -> Self {
        self.opts.max_bound_params = max;
        self
    }

    #[must_use]
    pub fn max_insert_rows(mut self, max: usize) -> Self {
        self.opts.max_insert_rows = max;
        self
    }

    /// # Errors
    /// Returns `PeachySqlError::Config` if `increment` is zero.
    pub fn auto_increment_increment(mut self, increment: u64) -> Result<Self, PeachySqlError> {
        if increment == 0 {
            return Err(PeachySqlError::Config(
                "Auto increment increment must be at least 1".into(),
            ));
        }
        self.opts.auto_increment_increment = increment;
        Ok(self)
    }

    /// # Errors
    /// Returns `PeachySqlError::Config` if `column` is blank.
    pub fn id_column(mut self, column: impl Into<String>) -> Result<Self, PeachySqlError> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(PeachySqlError::Config("ID column cannot be blank".into()));
        }
        self.opts.id_column = Some(column);
        Ok(self)
    }

    #[must_use]
    pub fn affected_is_row_count(mut self, value: bool) -> Self {
        self.opts.affected_is_row_count = value;
        self
    }

    #[must_use]
    pub fn native_bool_type(mut self, value: bool) -> Self {
        self.opts.native_bool_type = value;
        self
    }

    #[must_use]
    pub fn multiple_row_sets(mut self, value: bool) -> Self {
        self.opts.multiple_row_sets = value;
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        self.opts
    }
}
