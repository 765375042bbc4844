use thiserror::Error;

/// Errors produced by the reminder core.
///
/// Only `Validation` is meant to reach the user as an actionable message;
/// everything else is recovered locally (logged and skipped) or surfaced at
/// startup by the binaries.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected user input (empty title, past date, no days selected).
    #[error("{0}")]
    Validation(String),

    /// A stored datetime or time-of-day string that cannot be parsed.
    /// Reminders carrying one are skipped by the scheduler and sweeper.
    #[error("unparseable datetime '{value}'")]
    MalformedDatetime { value: String },

    #[error("no record with id '{0}'")]
    NotFound(String),

    #[error("storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
