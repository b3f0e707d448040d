use crate::error::PeachySqlError;
use crate::options::Options;
use crate::query_builder::Page;

use super::{Dialect, IdRetrieval};

/// Microsoft SQL Server.
#[derive(Debug, Clone)]
pub struct SqlServer {
    options: Options,
}

impl SqlServer {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

impl Default for SqlServer {
    fn default() -> Self {
        Self::new(Options::sql_server())
    }
}

impl Dialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn paginate(&self, page: Page) -> String {
        format!(
            "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            page.offset(),
            page.limit()
        )
    }

    fn id_retrieval(&self) -> Result<IdRetrieval, PeachySqlError> {
        let column = self.options.id_column().ok_or_else(|| {
            PeachySqlError::Config("SQL Server inserts require an ID column to be set".into())
        })?;
        Ok(IdRetrieval::OutputTable {
            column: column.to_string(),
        })
    }
}
