//! Error types for occurrence-index operations.

use thiserror::Error;

/// Failures surfaced by index building.
///
/// Absent records and empty configuration lists are not errors; they produce
/// an empty row list. Everything here comes from a collaborator (expander,
/// store, configuration) and is passed through to the caller untouched.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Expansion error: {0}")]
    Expansion(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
