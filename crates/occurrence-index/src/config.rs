//! Schema descriptor: which field holds the configuration ids per configuration
//! key, and which translation, language and visibility columns each table has.
//!
//! The descriptor is plain data, loaded from JSON or assembled in code, and
//! handed to the builder at construction time.
//!
//! ```rust
//! use occurrence_index::config::IndexConfig;
//!
//! let config = IndexConfig::from_json_str(r#"{
//!     "configurations": { "events": { "table_name": "tx_events", "field_name": "dates" } },
//!     "tables": { "tx_events": { "language_field": "sys_language_uid" } }
//! }"#).unwrap();
//! assert_eq!(config.configuration_field("events"), "dates");
//! assert_eq!(config.configuration_field("other"), "recurrence");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Field consulted for configuration ids when a key has no registered field name.
pub const DEFAULT_CONFIGURATION_FIELD: &str = "recurrence";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Registered configuration keys.
    #[serde(default)]
    pub configurations: BTreeMap<String, RegisterEntry>,
    /// Per-table schema.
    #[serde(default)]
    pub tables: BTreeMap<String, TableSchema>,
}

/// One registered configuration key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterEntry {
    pub table_name: String,
    #[serde(default)]
    pub field_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Column pointing from a translation to its original-language record.
    #[serde(default)]
    pub translation_pointer_field: Option<String>,
    #[serde(default)]
    pub language_field: Option<String>,
    #[serde(default)]
    pub enable_columns: EnableColumns,
}

/// Visibility columns of a table. A `None` column is not propagated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnableColumns {
    #[serde(default)]
    pub disabled: Option<String>,
    #[serde(default)]
    pub starttime: Option<String>,
    #[serde(default)]
    pub endtime: Option<String>,
    #[serde(default)]
    pub fe_group: Option<String>,
}

impl EnableColumns {
    pub fn is_empty(&self) -> bool {
        self.disabled.is_none()
            && self.starttime.is_none()
            && self.endtime.is_none()
            && self.fe_group.is_none()
    }
}

impl IndexConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Register `key` for records of `table_name`, reading ids from `field_name`.
    pub fn with_configuration(
        mut self,
        key: &str,
        table_name: &str,
        field_name: Option<&str>,
    ) -> Self {
        self.configurations.insert(
            key.to_string(),
            RegisterEntry {
                table_name: table_name.to_string(),
                field_name: field_name.map(str::to_string),
            },
        );
        self
    }

    pub fn with_table(mut self, table: &str, schema: TableSchema) -> Self {
        self.tables.insert(table.to_string(), schema);
        self
    }

    /// Field holding the configuration ids for `key`.
    pub fn configuration_field(&self, key: &str) -> &str {
        self.configurations
            .get(key)
            .and_then(|entry| entry.field_name.as_deref())
            .unwrap_or(DEFAULT_CONFIGURATION_FIELD)
    }

    /// Schema of `table`; tables without an entry have no translation,
    /// language or visibility columns.
    pub fn table(&self, table: &str) -> TableSchema {
        self.tables.get(table).cloned().unwrap_or_default()
    }
}
