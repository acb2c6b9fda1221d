//! Recurrence expansion -- turns configuration ids into concrete occurrence drafts.
//!
//! The index builder only sees the [`RecurrenceExpander`] trait. [`RruleExpander`]
//! is the bundled implementation: it wraps the `rrule` crate and `chrono-tz` to
//! expand RFC 5545 rules with correct DST handling, then splits every instance
//! into a local calendar date and a seconds-since-midnight time.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Timelike};
use chrono_tz::Tz;
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::model::OccurrenceDraft;

/// Upper bound on instances expanded from a rule without COUNT.
pub const MAX_INSTANCES: u16 = 500;

/// Produces occurrence drafts for a list of configuration ids.
pub trait RecurrenceExpander: Send + Sync {
    fn expand(&self, configuration_ids: &[u64]) -> Result<Vec<OccurrenceDraft>>;
}

impl<F> RecurrenceExpander for F
where
    F: Fn(&[u64]) -> Result<Vec<OccurrenceDraft>> + Send + Sync,
{
    fn expand(&self, configuration_ids: &[u64]) -> Result<Vec<OccurrenceDraft>> {
        self(configuration_ids)
    }
}

/// One recurrence configuration.
///
/// `start` is a local datetime (`2026-02-17T14:00:00`) in `timezone`. Without
/// an `rrule` the configuration describes a single occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceConfiguration {
    pub id: u64,
    pub start: String,
    pub duration_minutes: u32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// RFC 5545 RRULE body, e.g. `FREQ=WEEKLY;BYDAY=TU,TH`.
    #[serde(default)]
    pub rrule: Option<String>,
    /// Local datetime bounding the expansion.
    #[serde(default)]
    pub until: Option<String>,
    /// Maximum number of instances (ignored when the rule has its own COUNT).
    #[serde(default)]
    pub count: Option<u32>,
    /// Local datetimes removed from the recurrence set.
    #[serde(default)]
    pub exdates: Vec<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub state: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl RecurrenceConfiguration {
    /// A single occurrence starting at `start` (UTC) and lasting `duration_minutes`.
    pub fn single(id: u64, start: &str, duration_minutes: u32) -> Self {
        Self {
            id,
            start: start.to_string(),
            duration_minutes,
            timezone: default_timezone(),
            rrule: None,
            until: None,
            count: None,
            exdates: Vec::new(),
            all_day: false,
            state: None,
        }
    }
}

/// Expands configurations held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct RruleExpander {
    configurations: BTreeMap<u64, RecurrenceConfiguration>,
}

impl RruleExpander {
    pub fn new(configurations: impl IntoIterator<Item = RecurrenceConfiguration>) -> Self {
        Self {
            configurations: configurations.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn insert(&mut self, configuration: RecurrenceConfiguration) {
        self.configurations.insert(configuration.id, configuration);
    }
}

impl RecurrenceExpander for RruleExpander {
    /// Unknown ids are skipped. Drafts come back ordered by start date and
    /// time with exact duplicates removed.
    fn expand(&self, configuration_ids: &[u64]) -> Result<Vec<OccurrenceDraft>> {
        let mut drafts = Vec::new();
        for id in configuration_ids {
            match self.configurations.get(id) {
                Some(configuration) => drafts.extend(expand_configuration(configuration)?),
                None => {
                    tracing::warn!(configuration_id = *id, "unknown recurrence configuration")
                }
            }
        }

        drafts.sort_by_key(|d| {
            (
                d.start_date.date_naive(),
                d.start_time,
                d.end_date.date_naive(),
                d.end_time,
            )
        });
        drafts.dedup();
        Ok(drafts)
    }
}

/// Expand one configuration into drafts, in chronological order.
///
/// # Errors
/// Returns `IndexError::InvalidRule` if the RRULE string is empty or unparseable,
/// `IndexError::InvalidTimezone` for an unknown IANA identifier, and
/// `IndexError::Expansion` if `start` is malformed or does not exist locally.
pub fn expand_configuration(
    configuration: &RecurrenceConfiguration,
) -> Result<Vec<OccurrenceDraft>> {
    let tz: Tz = configuration
        .timezone
        .parse()
        .map_err(|_| IndexError::InvalidTimezone(configuration.timezone.clone()))?;
    let duration = Duration::minutes(i64::from(configuration.duration_minutes));

    let starts = match configuration.rrule.as_deref() {
        None => vec![local_start(&configuration.start, &tz)?],
        Some(rule) => expand_rule(rule, configuration, &tz)?,
    };

    Ok(starts
        .into_iter()
        .map(|start| draft(start, start + duration, configuration))
        .collect())
}

fn local_start(start: &str, tz: &Tz) -> Result<DateTime<Tz>> {
    let naive = NaiveDateTime::parse_from_str(start, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| IndexError::Expansion(format!("invalid start '{}': {}", start, e)))?;
    tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
        IndexError::Expansion(format!("start '{}' does not exist in {}", start, tz))
    })
}

fn expand_rule(
    rule: &str,
    configuration: &RecurrenceConfiguration,
    tz: &Tz,
) -> Result<Vec<DateTime<Tz>>> {
    if rule.is_empty() {
        return Err(IndexError::InvalidRule("empty RRULE string".to_string()));
    }

    // Caller explicitly wants zero instances.
    if configuration.count == Some(0) {
        return Ok(Vec::new());
    }

    let dtstart_ical = configuration.start.replace(['-', ':'], "");
    let mut rule_str = rule.to_string();

    if let Some(c) = configuration.count {
        if !rule_str.to_uppercase().contains("COUNT=") {
            rule_str = format!("{};COUNT={}", rule_str, c);
        }
    }

    // UNTIL must share DTSTART's zone: a trailing "Z" for UTC, bare local time otherwise.
    if let Some(until) = configuration.until.as_deref() {
        if !rule_str.to_uppercase().contains("UNTIL=") {
            let mut until_ical = until.replace(['-', ':'], "");
            if configuration.timezone == "UTC" {
                until_ical.push('Z');
            }
            rule_str = format!("{};UNTIL={}", rule_str, until_ical);
        }
    }

    let mut rule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        configuration.timezone, dtstart_ical, rule_str
    );

    if !configuration.exdates.is_empty() {
        let exdate_icals: Vec<String> = configuration
            .exdates
            .iter()
            .map(|d| d.replace(['-', ':'], ""))
            .collect();
        rule_text.push_str(&format!(
            "\nEXDATE;TZID={}:{}",
            configuration.timezone,
            exdate_icals.join(",")
        ));
    }

    let rule_set: RRuleSet = rule_text
        .parse()
        .map_err(|e| IndexError::InvalidRule(format!("{}", e)))?;

    // `.all(limit)` counts before EXDATE filtering, so leave room for the exclusions.
    let exdate_buffer = configuration.exdates.len() as u16;
    let max_count: u16 = configuration
        .count
        .map(|c| (c as u16).saturating_add(exdate_buffer))
        .unwrap_or(MAX_INSTANCES);

    let mut starts: Vec<DateTime<Tz>> = rule_set
        .all(max_count)
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(tz))
        .collect();

    if let Some(c) = configuration.count {
        starts.truncate(c as usize);
    }

    Ok(starts)
}

fn fixed(dt: DateTime<Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&dt.offset().fix())
}

fn draft(
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    configuration: &RecurrenceConfiguration,
) -> OccurrenceDraft {
    let (start_time, end_time) = if configuration.all_day {
        (0, 0)
    } else {
        (
            i64::from(start.num_seconds_from_midnight()),
            i64::from(end.num_seconds_from_midnight()),
        )
    };
    OccurrenceDraft {
        start_date: fixed(start),
        end_date: fixed(end),
        start_time,
        end_time,
        all_day: configuration.all_day,
        state: configuration.state.clone(),
    }
}
