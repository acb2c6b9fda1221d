//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use occurrence_index::{
    EnableColumns, IndexBuilder, IndexConfig, IndexRow, MemoryIndexStore, MemoryRecordStore,
    RecurrenceConfiguration, RruleExpander, SourceRecord, TableSchema,
};

pub const TABLE: &str = "tx_events";
pub const KEY: &str = "events";

/// Events table with translation, language and all four visibility columns.
pub fn events_schema() -> TableSchema {
    TableSchema {
        translation_pointer_field: Some("l10n_parent".to_string()),
        language_field: Some("sys_language_uid".to_string()),
        enable_columns: EnableColumns {
            disabled: Some("hidden".to_string()),
            starttime: Some("starttime".to_string()),
            endtime: Some("endtime".to_string()),
            fe_group: Some("fe_group".to_string()),
        },
    }
}

pub fn events_config() -> IndexConfig {
    IndexConfig::default()
        .with_configuration(KEY, TABLE, Some("dates"))
        .with_table(TABLE, events_schema())
}

/// `count` daily occurrences starting at `start` (UTC).
pub fn daily(id: u64, start: &str, count: u32) -> RecurrenceConfiguration {
    let mut configuration = RecurrenceConfiguration::single(id, start, 60);
    configuration.rrule = Some("FREQ=DAILY".to_string());
    configuration.count = Some(count);
    configuration
}

pub fn event(uid: u64, dates: &str) -> SourceRecord {
    SourceRecord::new(TABLE, uid)
        .with_field("title", format!("Event {}", uid))
        .with_field("dates", dates)
}

pub fn utc_date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// A persisted-looking row with the given identity and slug.
pub fn row(slug: &str, foreign_uid: u64, start_date: DateTime<Utc>, start_time: i64) -> IndexRow {
    IndexRow {
        uid: None,
        unique_register_key: KEY.to_string(),
        foreign_table: TABLE.to_string(),
        foreign_uid,
        start_date,
        end_date: start_date,
        start_time,
        end_time: start_time + 3600,
        all_day: false,
        state: None,
        slug: slug.to_string(),
        hidden: 0,
        starttime: 0,
        endtime: 0,
        fe_group: String::new(),
        sys_language_uid: 0,
        l10n_parent: 0,
    }
}

pub fn slugs(rows: &[IndexRow]) -> Vec<String> {
    rows.iter().map(|r| r.slug.clone()).collect()
}

/// Stores plus an RRULE expander over `configurations`.
pub struct Fixture {
    pub records: Arc<MemoryRecordStore>,
    pub index: Arc<MemoryIndexStore>,
    pub expander: Arc<RruleExpander>,
}

impl Fixture {
    pub fn new(configurations: Vec<RecurrenceConfiguration>) -> Self {
        Self {
            records: Arc::new(MemoryRecordStore::new()),
            index: Arc::new(MemoryIndexStore::new()),
            expander: Arc::new(RruleExpander::new(configurations)),
        }
    }

    pub fn with_record(self, record: SourceRecord) -> Self {
        self.records.insert(record).unwrap();
        self
    }

    pub fn builder(&self) -> IndexBuilder {
        IndexBuilder::new(
            events_config(),
            self.records.clone(),
            self.index.clone(),
            self.expander.clone(),
        )
    }
}
