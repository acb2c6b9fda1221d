//! Slugs for index rows: the pluggable hook chain that may propose one, the
//! default format, and the assigner that deduplicates candidates against
//! persisted rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{leading_int, Identity};
use crate::store::{IndexRowStore, SourceRecordStore};

/// Lowercase `input` and reduce it to `[a-z0-9-]`.
///
/// Every run of other characters becomes one `-`, then a single pass turns
/// `--` into `-`. Because that pass does not repeat, three or more dashes
/// in a row can survive as two. Non-ASCII letters are not transliterated.
pub fn slugify(input: &str) -> String {
    let mut replaced = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            replaced.push(c);
            in_run = false;
        } else if !in_run {
            replaced.push('-');
            in_run = true;
        }
    }
    replaced.replace("--", "-")
}

/// `lowercase(key)-uid-YYYY-MM-DD`.
pub fn default_slug(configuration_key: &str, uid: u64, start_date: &DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}",
        configuration_key.to_lowercase(),
        uid,
        start_date.format("%Y-%m-%d")
    )
}

/// What a hook sees of the occurrence being slugged.
#[derive(Debug, Clone, PartialEq)]
pub struct SlugContext {
    /// Uid of the owning record.
    pub uid: u64,
    pub start_date: DateTime<Utc>,
    pub start_time: i64,
    pub end_date: DateTime<Utc>,
    pub end_time: i64,
    /// Slug supplied upstream, empty if none.
    pub slug: String,
}

/// A custom slug source, consulted before the default format.
pub trait SlugHook: Send + Sync {
    /// A candidate slug for the occurrence, or `None` to pass.
    fn make_slug(&self, configuration_key: &str, context: &SlugContext) -> Result<Option<String>>;
}

/// Ordered hook chain; the first non-empty answer wins.
#[derive(Default)]
pub struct SlugHooks {
    hooks: Vec<Box<dyn SlugHook>>,
}

impl SlugHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: impl SlugHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn resolve(&self, configuration_key: &str, context: &SlugContext) -> Result<Option<String>> {
        for hook in &self.hooks {
            if let Some(slug) = hook.make_slug(configuration_key, context)? {
                if !slug.is_empty() {
                    return Ok(Some(slug));
                }
            }
        }
        Ok(None)
    }
}

/// Slugs occurrences after a title column of their owning record:
/// `slugify(title + "-" + YYYY-MM-DD)`.
pub struct TitleSlugHook {
    register_key: String,
    table: String,
    title_field: String,
    records: Arc<dyn SourceRecordStore>,
}

impl TitleSlugHook {
    pub fn new(
        register_key: &str,
        table: &str,
        title_field: &str,
        records: Arc<dyn SourceRecordStore>,
    ) -> Self {
        Self {
            register_key: register_key.to_string(),
            table: table.to_string(),
            title_field: title_field.to_string(),
            records,
        }
    }
}

impl SlugHook for TitleSlugHook {
    fn make_slug(&self, configuration_key: &str, context: &SlugContext) -> Result<Option<String>> {
        if self.register_key != configuration_key || !context.slug.is_empty() {
            return Ok(None);
        }

        let Some(record) = self.records.get(&self.table, context.uid)? else {
            tracing::warn!(
                table = %self.table,
                uid = context.uid,
                "title record missing, falling back to default slug"
            );
            return Ok(None);
        };
        let title = record.text_field(&self.title_field);
        if title.is_empty() {
            return Ok(None);
        }

        Ok(Some(slugify(&format!(
            "{}-{}",
            title,
            context.start_date.format("%Y-%m-%d")
        ))))
    }
}

/// Makes candidate slugs unique against the persisted rows.
pub struct SlugAssigner<'a> {
    store: &'a dyn IndexRowStore,
}

impl<'a> SlugAssigner<'a> {
    pub fn new(store: &'a dyn IndexRowStore) -> Self {
        Self { store }
    }

    /// The slug to store for `identity`, starting from `candidate`.
    ///
    /// Rows whose slug starts with `candidate` are scanned in store order. A row
    /// with the same identity hands back its existing slug. Otherwise the result
    /// is `candidate-N` where N is the highest numeric suffix seen on the way
    /// (a remainder of the form `<part>-<N>`), or `candidate` itself if there was none.
    ///
    /// N is not incremented, so the result can equal the slug of the row that
    /// carried N. The check-then-use sequence is not atomic; concurrent rebuilds
    /// sharing a prefix must be serialized by the caller.
    pub fn uniquify(&self, candidate: &str, identity: &Identity) -> Result<String> {
        let mut max_suffix: i64 = 0;

        for row in self.store.find_by_slug_prefix(candidate)? {
            if let Some(suffix) = numeric_suffix(&row.slug, candidate) {
                max_suffix = max_suffix.max(suffix);
            }
            if identity.matches(&row) {
                return Ok(row.slug);
            }
        }

        if max_suffix > 0 {
            Ok(format!("{}-{}", candidate, max_suffix))
        } else {
            Ok(candidate.to_string())
        }
    }
}

/// Suffix number of `slug` relative to `candidate`: the part after
/// `candidate` and one separator must split into exactly two dash-delimited
/// parts, the second of which is read as an integer.
fn numeric_suffix(slug: &str, candidate: &str) -> Option<i64> {
    let remainder = slug.get(candidate.len() + 1..)?;
    if remainder.is_empty() {
        return None;
    }
    let parts: Vec<&str> = remainder.split('-').collect();
    match parts.as_slice() {
        [_, number] => Some(leading_int(number)),
        _ => None,
    }
}
