//! Unified error types for the growth pipeline.
//!
//! Two tiers: fatal errors (store reads/writes, validation) abort the
//! current task and surface in its result envelope; best-effort rollup
//! failures are logged and swallowed at the call site and never reach here.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the growth pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Event, aggregate, cohort, or insight store failure. Fatal for the
    /// current task; safe to retry because every write is a keyed upsert.
    #[error("store error: {0}")]
    Store(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_task(msg: impl Into<String>) -> Self {
        Self::InvalidTask(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code the api layer maps this error to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Store(_) => 500,
            Self::Validation(_) => 400,
            Self::Serialization(_) => 400,
            Self::InvalidTask(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}
