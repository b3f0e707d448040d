/// Outcome of a (possibly multi-statement) bulk insert.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkInsertResult {
    ids: Vec<i64>,
    affected: i64,
    query_count: usize,
}

impl BulkInsertResult {
    #[must_use]
    pub fn new(ids: Vec<i64>, affected: i64, query_count: usize) -> Self {
        Self {
            ids,
            affected,
            query_count,
        }
    }

    /// Generated ids in row order; empty when the table generates none.
    #[must_use]
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Total affected rows across every batch.
    #[must_use]
    pub fn affected(&self) -> i64 {
        self.affected
    }

    /// Number of statements issued.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.query_count
    }

    #[must_use]
    pub fn into_ids(self) -> Vec<i64> {
        self.ids
    }
}

/// Outcome of a single-row insert. `id` is `0` when no identifier was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertResult {
    id: i64,
    affected: i64,
}

impl InsertResult {
    #[must_use]
    pub fn new(id: i64, affected: i64) -> Self {
        Self { id, affected }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub fn affected(&self) -> i64 {
        self.affected
    }
}

impl From<BulkInsertResult> for InsertResult {
    fn from(bulk: BulkInsertResult) -> Self {
        Self {
            id: bulk.ids.first().copied().unwrap_or(0),
            affected: bulk.affected,
        }
    }
}
