//! Error types for the analysis pipeline.

use thiserror::Error;

/// Pipeline operation result type.
pub type Result<T> = std::result::Result<T, CoderevError>;

/// Pipeline errors.
///
/// `NotFound` and `PermissionDenied` at the root level abort a run before
/// any store mutation. Per-file read and reviewer failures are recovered
/// inside the run (the file stays unseen and is reported); only store-level
/// failures, including constraint violations, unwind the run.
#[derive(Error, Debug)]
pub enum CoderevError {
    /// Path or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path exists but is not readable
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid inclusion pattern
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Review ledger failure. `DbError::Constraint` inside this variant
    /// means the dedup gate was bypassed; never recover from it.
    #[error(transparent)]
    Db(#[from] coderev_db::DbError),

    /// External reviewer failure
    #[error("Reviewer error: {0}")]
    Reviewer(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),
}

impl CoderevError {
    /// Classify an IO error against a path into the pipeline taxonomy.
    pub(crate) fn from_io(err: std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(path.display().to_string())
            }
            _ => Self::Io(err),
        }
    }
}
