//! Error types for the dialog engine
//!
//! Configuration mistakes (unknown or duplicate dialog ids) are surfaced as
//! errors and always propagate to the host. Missing optional hooks,
//! recognition failures and malformed turn results are not errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level dialog engine error
#[derive(Debug, Error)]
pub enum DialogError {
    /// A dialog id was not registered in the dialog set
    #[error("Dialog '{0}' is not registered in this dialog set")]
    UnknownDialog(String),

    /// A dialog id was registered twice in the same dialog set
    #[error("Dialog id '{0}' is already registered")]
    DuplicateId(String),

    /// Begin arguments could not be interpreted by the dialog
    #[error("Invalid dialog options: {0}")]
    InvalidOptions(String),

    /// Frame state could not be serialized or deserialized
    #[error("Dialog state error: {0}")]
    State(#[from] serde_json::Error),

    /// State store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The outbound activity sender failed
    #[error("Transport error: {0}")]
    Transport(String),
}

/// State store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Atomic write failed
    #[error("Atomic write failed for {path}: {detail}")]
    AtomicWriteFailed {
        /// Path where write failed
        path: PathBuf,
        /// Error details
        detail: String,
    },

    /// Persisted state uses a format this build does not understand
    #[error("Unsupported state format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found on disk
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type using DialogError
pub type Result<T> = std::result::Result<T, DialogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_converts_into_dialog_error() {
        let err: DialogError = StorageError::PathNotFound(PathBuf::from("missing.json")).into();
        assert!(matches!(err, DialogError::Storage(StorageError::PathNotFound(_))));
        assert_eq!(err.to_string(), "Storage error: Path not found: missing.json");
    }

    #[test]
    fn test_configuration_error_messages_name_the_dialog() {
        let unknown = DialogError::UnknownDialog("profile".to_string());
        let duplicate = DialogError::DuplicateId("profile".to_string());

        assert!(unknown.to_string().contains("'profile'"));
        assert!(duplicate.to_string().contains("'profile'"));
    }
}
