//! Builds the index rows of one parent record.
//!
//! `prepare_index` fetches the record, resolves its configuration ids (from the
//! original-language record for translations), expands them into occurrences,
//! slugs every occurrence and finally propagates visibility and localization
//! metadata. Each call rebuilds the full row set of the record from scratch;
//! persisting it is left to the caller (see [`crate::indexer::Indexer`]).

use std::sync::Arc;

use crate::config::IndexConfig;
use crate::error::Result;
use crate::expander::RecurrenceExpander;
use crate::model::{utc_midnight, IndexRow, OccurrenceDraft, SourceRecord};
use crate::propagate::{apply_localization, apply_visibility};
use crate::slug::{default_slug, SlugAssigner, SlugContext, SlugHook, SlugHooks};
use crate::store::{IndexRowStore, SourceRecordStore};

pub struct IndexBuilder {
    config: IndexConfig,
    records: Arc<dyn SourceRecordStore>,
    index: Arc<dyn IndexRowStore>,
    expander: Arc<dyn RecurrenceExpander>,
    hooks: SlugHooks,
}

impl IndexBuilder {
    pub fn new(
        config: IndexConfig,
        records: Arc<dyn SourceRecordStore>,
        index: Arc<dyn IndexRowStore>,
        expander: Arc<dyn RecurrenceExpander>,
    ) -> Self {
        Self {
            config,
            records,
            index,
            expander,
            hooks: SlugHooks::new(),
        }
    }

    /// Append a slug hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: impl SlugHook + 'static) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn index_store(&self) -> &dyn IndexRowStore {
        self.index.as_ref()
    }

    /// Build the index rows for record `(table, uid)` under `configuration_key`.
    ///
    /// A missing record or an empty configuration list yields an empty list.
    /// Expander and store failures are returned as they are.
    pub fn prepare_index(
        &self,
        configuration_key: &str,
        table: &str,
        uid: u64,
    ) -> Result<Vec<IndexRow>> {
        let Some(record) = self.records.get(table, uid)? else {
            tracing::debug!(table, uid, "record not found, nothing to index");
            return Ok(Vec::new());
        };

        let configuration_ids = self.configuration_ids(configuration_key, &record)?;
        if configuration_ids.is_empty() {
            tracing::debug!(table, uid, "record has no recurrence configuration");
            return Ok(Vec::new());
        }

        let drafts = self.expander.expand(&configuration_ids)?;
        tracing::debug!(
            table,
            uid,
            ?configuration_ids,
            occurrences = drafts.len(),
            "expanded recurrence configuration"
        );

        let assigner = SlugAssigner::new(self.index.as_ref());
        let mut rows = drafts
            .iter()
            .map(|draft| self.build_row(&assigner, configuration_key, table, uid, draft))
            .collect::<Result<Vec<_>>>()?;

        let schema = self.config.table(table);
        apply_visibility(&mut rows, &schema, &record);
        apply_localization(&mut rows, &schema, &record, self.index.as_ref())?;

        Ok(rows)
    }

    /// Configuration ids driving `record`. Translations use the ids of their
    /// original-language record.
    fn configuration_ids(
        &self,
        configuration_key: &str,
        record: &SourceRecord,
    ) -> Result<Vec<u64>> {
        let field = self.config.configuration_field(configuration_key);
        let schema = self.config.table(&record.table);

        let original_uid = schema
            .translation_pointer_field
            .as_deref()
            .map_or(0, |pointer| record.int_field(pointer));
        if original_uid <= 0 {
            return Ok(record.configuration_ids(field));
        }

        let original = self.records.get(&record.table, original_uid as u64)?;
        Ok(original
            .map(|original| original.configuration_ids(field))
            .unwrap_or_default())
    }

    fn build_row(
        &self,
        assigner: &SlugAssigner<'_>,
        configuration_key: &str,
        table: &str,
        uid: u64,
        draft: &OccurrenceDraft,
    ) -> Result<IndexRow> {
        let mut row = IndexRow {
            uid: None,
            unique_register_key: configuration_key.to_string(),
            foreign_table: table.to_string(),
            foreign_uid: uid,
            start_date: utc_midnight(&draft.start_date),
            end_date: utc_midnight(&draft.end_date),
            start_time: draft.start_time,
            end_time: draft.end_time,
            all_day: draft.all_day,
            state: draft.state.clone(),
            slug: String::new(),
            hidden: 0,
            starttime: 0,
            endtime: 0,
            fe_group: String::new(),
            sys_language_uid: 0,
            l10n_parent: 0,
        };

        let context = SlugContext {
            uid,
            start_date: row.start_date,
            start_time: row.start_time,
            end_date: row.end_date,
            end_time: row.end_time,
            slug: String::new(),
        };
        let candidate = match self.hooks.resolve(configuration_key, &context)? {
            Some(slug) => slug,
            None => default_slug(configuration_key, uid, &row.start_date),
        };

        row.slug = assigner.uniquify(&candidate, &row.identity())?;
        tracing::debug!(table, uid, slug = %row.slug, "assigned slug");
        Ok(row)
    }
}
