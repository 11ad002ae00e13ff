//! Crate error type.

use thiserror::Error;

/// Errors surfaced by configuration and report persistence.
///
/// Per-observation problems never show up here; they are reported as
/// [`Rejection`](crate::tracker::Rejection)s in the frame outcome.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
