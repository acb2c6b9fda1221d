//! # occurrence-index
//!
//! Expands a parent record's recurrence configuration into one index row per
//! concrete occurrence, each with a stable, human-readable, unique slug and the
//! parent's visibility and localization metadata.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use occurrence_index::{
//!     IndexBuilder, IndexConfig, MemoryIndexStore, MemoryRecordStore,
//!     RecurrenceConfiguration, RruleExpander, SourceRecord,
//! };
//!
//! let records = Arc::new(MemoryRecordStore::from_records([
//!     SourceRecord::new("tx_events", 7).with_field("recurrence", "1"),
//! ]));
//! let mut daily = RecurrenceConfiguration::single(1, "2024-01-01T10:00:00", 60);
//! daily.rrule = Some("FREQ=DAILY".to_string());
//! daily.count = Some(2);
//!
//! let builder = IndexBuilder::new(
//!     IndexConfig::default(),
//!     records,
//!     Arc::new(MemoryIndexStore::new()),
//!     Arc::new(RruleExpander::new([daily])),
//! );
//! let rows = builder.prepare_index("events", "tx_events", 7).unwrap();
//! let slugs: Vec<&str> = rows.iter().map(|r| r.slug.as_str()).collect();
//! assert_eq!(slugs, ["events-7-2024-01-01", "events-7-2024-01-02"]);
//! ```
//!
//! ## Modules
//!
//! - [`builder`]: record → slugged index rows
//! - [`slug`]: slug hooks, default format, deduplication against persisted rows
//! - [`propagate`]: visibility and localization metadata
//! - [`expander`]: recurrence expansion (trait + RRULE implementation)
//! - [`store`]: record and index row storage seams, in-memory stores
//! - [`config`]: schema descriptor
//! - [`indexer`]: rebuild and persist one record's rows
//! - [`model`]: records, drafts, rows, storage normalization
//! - [`error`]: Error types

pub mod builder;
pub mod config;
pub mod error;
pub mod expander;
pub mod indexer;
pub mod model;
pub mod propagate;
pub mod slug;
pub mod store;

pub use builder::IndexBuilder;
pub use config::{EnableColumns, IndexConfig, TableSchema};
pub use error::IndexError;
pub use expander::{RecurrenceConfiguration, RecurrenceExpander, RruleExpander};
pub use indexer::Indexer;
pub use model::{Identity, IndexRow, OccurrenceDraft, SourceRecord, StorageRow, StorageValue};
pub use slug::{slugify, SlugAssigner, SlugContext, SlugHook, SlugHooks, TitleSlugHook};
pub use store::{IndexRowStore, MemoryIndexStore, MemoryRecordStore, SourceRecordStore};
