use crate::error::PeachySqlError;
use crate::options::Options;

use super::{Dialect, IdRetrieval};

/// Any driver speaking ANSI-quoted SQL with `LIMIT/OFFSET` (SQLite, PostgreSQL, ...).
///
/// Inserted ids are not collected unless a retrieval mode is configured:
/// ```rust
/// use peachy_sql::prelude::*;
///
/// let dialect = Generic::new(Options::generic())
///     .with_id_retrieval(IdRetrieval::Returning { column: "id".into() });
/// # let _ = dialect;
/// ```
#[derive(Debug, Clone)]
pub struct Generic {
    options: Options,
    id_retrieval: IdRetrieval,
}

impl Generic {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            options,
            id_retrieval: IdRetrieval::None,
        }
    }

    #[must_use]
    pub fn with_id_retrieval(mut self, id_retrieval: IdRetrieval) -> Self {
        self.id_retrieval = id_retrieval;
        self
    }
}

impl Default for Generic {
    fn default() -> Self {
        Self::new(Options::generic())
    }
}

impl Dialect for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn id_retrieval(&self) -> Result<IdRetrieval, PeachySqlError> {
        match &self.id_retrieval {
            IdRetrieval::FirstIdStride { stride: 0 } | IdRetrieval::LastIdStride { stride: 0 } => {
                Err(PeachySqlError::Config("Id stride must be at least 1".into()))
            }
            other => Ok(other.clone()),
        }
    }
}
