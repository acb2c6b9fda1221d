//! Copy visibility and localization metadata from a parent record onto its rows.

use crate::config::TableSchema;
use crate::error::Result;
use crate::model::{IndexRow, SourceRecord, StorageRow, StorageValue};
use crate::store::IndexRowStore;

/// Columns used to find a row's counterpart in another language.
const IDENTITY_COLUMNS: [&str; 5] = [
    "unique_register_key",
    "foreign_table",
    "foreign_uid",
    "start_date",
    "start_time",
];

/// Stamp the record's visibility window onto every row.
///
/// Only columns configured in the table's `enable_columns` are touched; all
/// rows end up with the same values.
pub fn apply_visibility(rows: &mut [IndexRow], schema: &TableSchema, record: &SourceRecord) {
    let columns = &schema.enable_columns;
    if columns.is_empty() {
        return;
    }

    let hidden = columns.disabled.as_deref().map(|f| record.int_field(f));
    let starttime = columns.starttime.as_deref().map(|f| record.int_field(f));
    let endtime = columns.endtime.as_deref().map(|f| record.int_field(f));
    let fe_group = columns.fe_group.as_deref().map(|f| record.text_field(f));

    for row in rows.iter_mut() {
        if let Some(v) = hidden {
            row.hidden = v;
        }
        if let Some(v) = starttime {
            row.starttime = v;
        }
        if let Some(v) = endtime {
            row.endtime = v;
        }
        if let Some(v) = &fe_group {
            row.fe_group = v.clone();
        }
    }
}

/// Link translated rows to their original-language rows and stamp the language.
///
/// When `record` is a translation, each row's `l10n_parent` is set to the
/// persisted row with the same identity but the original record's uid, if
/// there is one. Rows built in the same call are not consulted. A non-zero
/// language id is copied to `sys_language_uid` on every row.
pub fn apply_localization(
    rows: &mut [IndexRow],
    schema: &TableSchema,
    record: &SourceRecord,
    store: &dyn IndexRowStore,
) -> Result<()> {
    if let Some(pointer) = schema.translation_pointer_field.as_deref() {
        let original_uid = record.int_field(pointer);
        if original_uid > 0 {
            for row in rows.iter_mut() {
                let filter = counterpart_filter(row, original_uid);
                if let Some(parent_uid) = store.find_by_fields(&filter)?.and_then(|p| p.uid) {
                    row.l10n_parent = parent_uid;
                }
            }
        }
    }

    if let Some(field) = schema.language_field.as_deref() {
        let language = record.int_field(field);
        if language != 0 {
            for row in rows.iter_mut() {
                row.sys_language_uid = language;
            }
        }
    }

    Ok(())
}

fn counterpart_filter(row: &IndexRow, original_uid: i64) -> StorageRow {
    let mut filter: StorageRow = row
        .to_storage()
        .into_iter()
        .filter(|(name, _)| IDENTITY_COLUMNS.contains(&name.as_str()))
        .collect();
    filter.insert("foreign_uid".to_string(), StorageValue::Int(original_uid));
    filter
}
