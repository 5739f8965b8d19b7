//! Application error types.
//!
//! Store and search errors live in `consultant_index_core::error`; this
//! module covers configuration, CRM calls, orchestration and per-record
//! outcomes.

use consultant_index_core::error::StoreError;

/// Fatal startup problem. Reported before any network or store operation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a single CRM call.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// A sync run that could not be started or logged.
///
/// Per-record failures never surface here; they are counted on the run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("a sync run is already in progress")]
    AlreadyRunning,

    #[error("sync run log unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Why one consultant record was counted as failed.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("persist failed: {0}")]
    Persist(#[from] StoreError),
}
