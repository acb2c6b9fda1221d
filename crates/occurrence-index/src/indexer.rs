//! Rebuild and persist the index of one record.

use crate::builder::IndexBuilder;
use crate::error::Result;

pub struct Indexer {
    builder: IndexBuilder,
}

impl Indexer {
    pub fn new(builder: IndexBuilder) -> Self {
        Self { builder }
    }

    pub fn builder(&self) -> &IndexBuilder {
        &self.builder
    }

    /// Rebuild the rows of `(table, uid)` and replace the persisted ones.
    ///
    /// Returns the identifiers of the stored rows. A record that no longer
    /// exists ends up with no rows. Rebuilds of records whose slugs share a
    /// prefix must not run concurrently.
    pub fn reindex(&self, configuration_key: &str, table: &str, uid: u64) -> Result<Vec<u64>> {
        let rows = self.builder.prepare_index(configuration_key, table, uid)?;
        let count = rows.len();
        let stored = self.builder.index_store().replace_rows(table, uid, rows)?;
        tracing::debug!(configuration_key, table, uid, rows = count, "reindexed record");
        Ok(stored)
    }
}
