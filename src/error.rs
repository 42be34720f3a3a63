//! Error types for the upload pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the volley error type.
pub type Result<T> = std::result::Result<T, VolleyError>;

/// Main error type for the upload pipeline.
///
/// `SourceUnavailable` and `MalformedInput` are fatal and abort the run before
/// any dispatch begins. `MalformedRecord` is scoped to a single feed row and
/// only escalates under [`MalformedPolicy::Abort`](crate::config::MalformedPolicy::Abort).
/// Failures inside the dispatcher are contained as per-task
/// [`FailureReason`](crate::upload::FailureReason)s and never surface here.
#[derive(Error, Debug)]
pub enum VolleyError {
    /// Feed file could not be opened
    #[error("feed source unavailable: {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Feed file is structurally unparseable
    #[error("malformed feed input: {0}")]
    MalformedInput(#[from] csv::Error),

    /// A single feed row is missing required fields
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
