//! Records, occurrence drafts, index rows and their storage form.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A parent record whose recurrence configuration is indexed.
///
/// Field names are resolved at runtime through [`crate::config::IndexConfig`],
/// so the record is kept as a loose field map keyed by column name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceRecord {
    pub table: String,
    pub uid: u64,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl SourceRecord {
    pub fn new(table: impl Into<String>, uid: u64) -> Self {
        Self {
            table: table.into(),
            uid,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Integer view of a field. Absent, null and non-numeric values read as 0.
    pub fn int_field(&self, name: &str) -> i64 {
        self.fields.get(name).map_or(0, value_as_int)
    }

    /// Text view of a field. Absent and null values read as "".
    pub fn text_field(&self, name: &str) -> String {
        match self.fields.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(true)) => "1".to_string(),
            _ => String::new(),
        }
    }

    /// Positive configuration ids stored in `field`.
    ///
    /// Accepts a comma-separated string, a single number, or an array.
    /// Empty, zero and negative entries are dropped.
    pub fn configuration_ids(&self, field: &str) -> Vec<u64> {
        let raw: Vec<i64> = match self.fields.get(field) {
            Some(Value::String(s)) => s.split(',').map(leading_int).collect(),
            Some(Value::Array(items)) => items.iter().map(value_as_int).collect(),
            Some(v @ Value::Number(_)) => vec![value_as_int(v)],
            _ => Vec::new(),
        };
        raw.into_iter()
            .filter(|id| *id > 0)
            .map(|id| id as u64)
            .collect()
    }
}

fn value_as_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => leading_int(s),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

/// Parse the leading (optionally signed) decimal integer of `s`.
///
/// Surrounding whitespace is skipped; anything after the digits is ignored and
/// a string without leading digits yields 0.
pub(crate) fn leading_int(s: &str) -> i64 {
    let s = s.trim();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

/// One concrete occurrence as produced by a [`crate::expander::RecurrenceExpander`].
///
/// Only the calendar date of `start_date`/`end_date` is meaningful; the
/// time of day lives in `start_time`/`end_time` (seconds since midnight).
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceDraft {
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub start_time: i64,
    pub end_time: i64,
    pub all_day: bool,
    pub state: Option<String>,
}

/// Midnight UTC on the calendar date `dt` has in its own zone.
pub fn utc_midnight<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt.date_naive().and_time(NaiveTime::MIN))
}

/// A persisted (or about to be persisted) occurrence row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    /// Row identifier assigned by the store; `None` until persisted.
    #[serde(default)]
    pub uid: Option<u64>,
    pub unique_register_key: String,
    pub foreign_table: String,
    pub foreign_uid: u64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub start_time: i64,
    pub end_time: i64,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub state: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub hidden: i64,
    #[serde(default)]
    pub starttime: i64,
    #[serde(default)]
    pub endtime: i64,
    #[serde(default)]
    pub fe_group: String,
    #[serde(default)]
    pub sys_language_uid: i64,
    #[serde(default)]
    pub l10n_parent: u64,
}

impl IndexRow {
    pub fn identity(&self) -> Identity {
        Identity {
            configuration_key: self.unique_register_key.clone(),
            table: self.foreign_table.clone(),
            uid: self.foreign_uid,
            start_date: self.start_date.timestamp(),
            start_time: self.start_time,
        }
    }

    /// Raw field values in column order, before normalization.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("unique_register_key", FieldValue::Text(self.unique_register_key.clone())),
            ("foreign_table", FieldValue::Text(self.foreign_table.clone())),
            ("foreign_uid", FieldValue::Int(self.foreign_uid as i64)),
            ("start_date", FieldValue::Date(self.start_date)),
            ("end_date", FieldValue::Date(self.end_date)),
            ("start_time", FieldValue::Int(self.start_time)),
            ("end_time", FieldValue::Int(self.end_time)),
            ("all_day", FieldValue::Bool(self.all_day)),
            (
                "state",
                self.state.clone().map_or(FieldValue::Null, FieldValue::Text),
            ),
            ("slug", FieldValue::Text(self.slug.clone())),
            ("hidden", FieldValue::Int(self.hidden)),
            ("starttime", FieldValue::Int(self.starttime)),
            ("endtime", FieldValue::Int(self.endtime)),
            ("fe_group", FieldValue::Text(self.fe_group.clone())),
            ("sys_language_uid", FieldValue::Int(self.sys_language_uid)),
            ("l10n_parent", FieldValue::Int(self.l10n_parent as i64)),
        ]
    }

    /// The row as it is written to storage. The store-assigned `uid` is not part of it.
    pub fn to_storage(&self) -> StorageRow {
        self.fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), normalize_field(name, value)))
            .collect()
    }
}

/// The logical key of an occurrence: (configuration key, table, uid, start date, start time).
///
/// `start_date` is the UTC-midnight timestamp of the occurrence's start date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub configuration_key: String,
    pub table: String,
    pub uid: u64,
    pub start_date: i64,
    pub start_time: i64,
}

impl Identity {
    /// True when all five components equal those of `row`.
    pub fn matches(&self, row: &IndexRow) -> bool {
        row.unique_register_key == self.configuration_key
            && row.foreign_table == self.table
            && row.foreign_uid == self.uid
            && row.start_date.timestamp() == self.start_date
            && row.start_time == self.start_time
    }
}

/// A field value before storage normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Date(DateTime<Utc>),
}

/// A field value as stored: integer or text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StorageValue {
    Int(i64),
    Text(String),
}

impl From<i64> for StorageValue {
    fn from(v: i64) -> Self {
        StorageValue::Int(v)
    }
}

impl From<&str> for StorageValue {
    fn from(v: &str) -> Self {
        StorageValue::Text(v.to_string())
    }
}

impl From<String> for StorageValue {
    fn from(v: String) -> Self {
        StorageValue::Text(v)
    }
}

/// Normalized column map of one row.
pub type StorageRow = BTreeMap<String, StorageValue>;

const TIME_FIELDS: [&str; 2] = ["start_time", "end_time"];

/// Normalize one field for storage.
///
/// Dates become `YYYY-MM-DD`, booleans and the time-of-day columns become
/// integers, null becomes the empty string. Other values pass through.
pub fn normalize_field(name: &str, value: FieldValue) -> StorageValue {
    match value {
        FieldValue::Date(d) => StorageValue::Text(d.format("%Y-%m-%d").to_string()),
        v if TIME_FIELDS.contains(&name) => StorageValue::Int(match v {
            FieldValue::Int(i) => i,
            FieldValue::Bool(b) => i64::from(b),
            FieldValue::Text(t) => leading_int(&t),
            _ => 0,
        }),
        FieldValue::Bool(b) => StorageValue::Int(i64::from(b)),
        FieldValue::Null => StorageValue::Text(String::new()),
        FieldValue::Int(i) => StorageValue::Int(i),
        FieldValue::Text(t) => StorageValue::Text(t),
    }
}
