//! Error types shared by the store, the registry and the command handlers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the key-value persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The record could not be read from or written to its backing file.
    #[error("failed to access record '{key}' at {}: {source}", path.display())]
    Io {
        key: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stored record is not valid JSON for the expected shape.
    #[error("record '{key}' is malformed: {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory snapshot could not be serialised.
    #[error("failed to serialise record '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A required task field was missing or blank.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a name")]
    NoAssignees,

    #[error("Please enter a task description")]
    EmptyDescription,
}

/// Errors returned by task store operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for task store operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
