use crate::error::PeachySqlError;
use crate::options::Options;

use super::{Dialect, IdRetrieval};

/// MySQL / MariaDB.
#[derive(Debug, Clone)]
pub struct Mysql {
    options: Options,
}

impl Mysql {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

impl Default for Mysql {
    fn default() -> Self {
        Self::new(Options::mysql())
    }
}

impl Dialect for Mysql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn id_retrieval(&self) -> Result<IdRetrieval, PeachySqlError> {
        Ok(IdRetrieval::FirstIdStride {
            stride: self.options.auto_increment_increment(),
        })
    }
}
