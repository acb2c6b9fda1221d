//! Tests for the in-memory stores, the schema descriptor, record field access,
//! storage normalization and metadata propagation.

mod common;

use chrono::{FixedOffset, TimeZone};
use common::*;
use occurrence_index::config::DEFAULT_CONFIGURATION_FIELD;
use occurrence_index::model::{normalize_field, utc_midnight, FieldValue};
use occurrence_index::propagate::{apply_localization, apply_visibility};
use occurrence_index::{
    IndexConfig, IndexError, IndexRowStore, MemoryIndexStore, MemoryRecordStore, SourceRecord,
    SourceRecordStore, StorageRow, StorageValue, TableSchema,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// MemoryIndexStore
// ---------------------------------------------------------------------------

#[test]
fn identifiers_are_never_reused_after_delete() {
    let store = MemoryIndexStore::new();
    let first = store.insert(row("a", 1, utc_date(2024, 1, 1), 0)).unwrap();
    assert!(store.remove(first).unwrap());
    assert!(!store.remove(first).unwrap());

    let second = store.insert(row("b", 1, utc_date(2024, 1, 1), 0)).unwrap();

    assert_eq!((first, second), (1, 2));
}

#[test]
fn prefix_lookup_is_in_identifier_order() {
    let store = MemoryIndexStore::new();
    for slug in ["events-7-b", "news-7-a", "events-7-a"] {
        store.insert(row(slug, 7, utc_date(2024, 1, 1), 0)).unwrap();
    }

    let found = store.find_by_slug_prefix("events-7").unwrap();

    assert_eq!(slugs(&found), ["events-7-b", "events-7-a"]);
    assert_eq!(found[0].uid, Some(1));
}

#[test]
fn replace_rows_only_touches_the_owning_record() {
    let store = MemoryIndexStore::new();
    store.insert(row("keep", 8, utc_date(2024, 1, 1), 0)).unwrap();
    store.insert(row("old", 7, utc_date(2024, 1, 1), 0)).unwrap();

    let ids = store
        .replace_rows(TABLE, 7, vec![row("new", 7, utc_date(2024, 1, 2), 0)])
        .unwrap();

    assert_eq!(ids, [3]);
    assert_eq!(slugs(&store.rows().unwrap()), ["keep", "new"]);
}

#[test]
fn field_lookup_matches_normalized_columns() {
    let store = MemoryIndexStore::new();
    store.insert(row("a", 7, utc_date(2024, 1, 1), 0)).unwrap();
    store.insert(row("b", 7, utc_date(2024, 1, 2), 0)).unwrap();

    let mut filter = StorageRow::new();
    filter.insert("foreign_uid".to_string(), StorageValue::Int(7));
    filter.insert("start_date".to_string(), StorageValue::from("2024-01-02"));
    let found = store.find_by_fields(&filter).unwrap();
    assert_eq!(found.and_then(|r| r.uid), Some(2));

    filter.insert("start_time".to_string(), StorageValue::Int(60));
    assert_eq!(store.find_by_fields(&filter).unwrap(), None);
}

#[test]
fn record_store_overwrites_by_table_and_uid() {
    let store = MemoryRecordStore::new();
    store.insert(event(7, "1")).unwrap();
    store.insert(event(7, "2")).unwrap();

    let record = store.get(TABLE, 7).unwrap().unwrap();

    assert_eq!(record.configuration_ids("dates"), [2]);
    assert_eq!(store.get("other", 7).unwrap(), None);
}

// ---------------------------------------------------------------------------
// IndexConfig
// ---------------------------------------------------------------------------

#[test]
fn config_loads_from_json() {
    let config = IndexConfig::from_json_str(
        r#"{
            "configurations": {
                "events": { "table_name": "tx_events", "field_name": "dates" },
                "news": { "table_name": "tx_news" }
            },
            "tables": {
                "tx_events": {
                    "translation_pointer_field": "l10n_parent",
                    "enable_columns": { "disabled": "hidden" }
                }
            }
        }"#,
    )
    .unwrap();

    assert_eq!(config.configuration_field("events"), "dates");
    assert_eq!(config.configuration_field("news"), DEFAULT_CONFIGURATION_FIELD);
    assert_eq!(config.configuration_field("unknown"), DEFAULT_CONFIGURATION_FIELD);

    let schema = config.table(TABLE);
    assert_eq!(schema.translation_pointer_field.as_deref(), Some("l10n_parent"));
    assert_eq!(schema.language_field, None);
    assert_eq!(schema.enable_columns.disabled.as_deref(), Some("hidden"));
    assert_eq!(config.table("tx_missing"), TableSchema::default());
}

#[test]
fn config_built_in_code_matches_json() {
    let from_json = IndexConfig::from_json_value(json!({
        "configurations": { "events": { "table_name": "tx_events", "field_name": "dates" } }
    }))
    .unwrap();
    let built = IndexConfig::default().with_configuration(KEY, TABLE, Some("dates"));

    assert_eq!(from_json, built);
}

#[test]
fn malformed_config_is_a_config_error() {
    let err = IndexConfig::from_json_str(r#"{"configurations": []}"#).unwrap_err();
    assert!(matches!(err, IndexError::Config(_)));
}

// ---------------------------------------------------------------------------
// SourceRecord fields
// ---------------------------------------------------------------------------

#[test]
fn configuration_ids_accept_strings_numbers_and_arrays() {
    let record = SourceRecord::new(TABLE, 1)
        .with_field("csv", " 3, 1 ,0,,-2,4x")
        .with_field("number", 5)
        .with_field("array", json!([6, "7", 0]))
        .with_field("null", json!(null));

    assert_eq!(record.configuration_ids("csv"), [3, 1, 4]);
    assert_eq!(record.configuration_ids("number"), [5]);
    assert_eq!(record.configuration_ids("array"), [6, 7]);
    assert!(record.configuration_ids("null").is_empty());
    assert!(record.configuration_ids("absent").is_empty());
}

#[test]
fn int_and_text_views_of_fields() {
    let record = SourceRecord::new(TABLE, 1)
        .with_field("flag", true)
        .with_field("numeric", "12abc")
        .with_field("group", 3)
        .with_field("null", json!(null));

    assert_eq!(record.int_field("flag"), 1);
    assert_eq!(record.int_field("numeric"), 12);
    assert_eq!(record.int_field("absent"), 0);
    assert_eq!(record.text_field("group"), "3");
    assert_eq!(record.text_field("null"), "");
    assert_eq!(record.text_field("absent"), "");
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn utc_midnight_keeps_local_calendar_date() {
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let early = tokyo.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();

    assert_eq!(utc_midnight(&early), utc_date(2024, 6, 1));
}

#[test]
fn normalize_field_rules() {
    assert_eq!(
        normalize_field("start_date", FieldValue::Date(utc_date(2024, 2, 29))),
        StorageValue::from("2024-02-29")
    );
    assert_eq!(normalize_field("all_day", FieldValue::Bool(true)), StorageValue::Int(1));
    assert_eq!(
        normalize_field("start_time", FieldValue::Text("3600".to_string())),
        StorageValue::Int(3600)
    );
    assert_eq!(normalize_field("end_time", FieldValue::Null), StorageValue::Int(0));
    assert_eq!(normalize_field("state", FieldValue::Null), StorageValue::from(""));
    assert_eq!(normalize_field("hidden", FieldValue::Int(1)), StorageValue::Int(1));
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

#[test]
fn visibility_without_columns_leaves_rows_untouched() {
    let mut rows = vec![row("a", 7, utc_date(2024, 1, 1), 0)];
    let record = event(7, "1").with_field("hidden", 1);

    apply_visibility(&mut rows, &TableSchema::default(), &record);

    assert_eq!(rows[0].hidden, 0);
}

#[test]
fn visibility_copies_only_configured_columns() {
    let mut schema = TableSchema::default();
    schema.enable_columns.fe_group = Some("groups".to_string());
    let mut rows = vec![row("a", 7, utc_date(2024, 1, 1), 0)];
    let record = event(7, "1").with_field("hidden", 1).with_field("groups", "-2");

    apply_visibility(&mut rows, &schema, &record);

    assert_eq!(rows[0].hidden, 0);
    assert_eq!(rows[0].fe_group, "-2");
}

#[test]
fn localization_ignores_zero_language_and_missing_pointer() {
    let store = MemoryIndexStore::new();
    let mut rows = vec![row("a", 8, utc_date(2024, 1, 1), 0)];
    let record = event(8, "1").with_field("sys_language_uid", 0);

    apply_localization(&mut rows, &events_schema(), &record, &store).unwrap();

    assert_eq!(rows[0].sys_language_uid, 0);
    assert_eq!(rows[0].l10n_parent, 0);
}

#[test]
fn localization_consults_persisted_rows_only() {
    let store = MemoryIndexStore::new();
    let parent = store.insert(row("orig", 7, utc_date(2024, 1, 1), 0)).unwrap();
    // The original has no persisted row on the second day.
    let mut rows = vec![
        row("t1", 8, utc_date(2024, 1, 1), 0),
        row("t2", 8, utc_date(2024, 1, 2), 0),
    ];
    let record = event(8, "")
        .with_field("l10n_parent", 7)
        .with_field("sys_language_uid", 3);

    apply_localization(&mut rows, &events_schema(), &record, &store).unwrap();

    assert_eq!(rows[0].l10n_parent, parent);
    assert_eq!(rows[1].l10n_parent, 0);
    assert!(rows.iter().all(|r| r.sys_language_uid == 3));
}
