//! Storage error handling
//!
//! Provides typed errors for record store operations with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::record::RecordKind;

/// Errors that can occur during record store operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The underlying database could not be opened or migrated
    #[error("Failed to initialise store at '{location}': {details}")]
    StoreInitFailed { location: String, details: String },

    /// A record with the same primary key (or unique index value) exists
    #[error("Duplicate key in {kind}: {key}")]
    DuplicateKey { kind: RecordKind, key: String },

    /// `add` on a kind without auto-assigned keys was given no key
    #[error("Record for {0} has no key and the kind does not assign one")]
    MissingKey(RecordKind),

    /// The transaction was not opened over this kind
    #[error("Record kind {kind} is not part of this transaction (scope: {scope})")]
    KindNotInScope { kind: RecordKind, scope: String },

    /// A write was attempted inside a readonly transaction
    #[error("Cannot write to {0} inside a readonly transaction")]
    ReadOnlyTransaction(RecordKind),

    /// `get_by_index` on a kind without a secondary index
    #[error("Record kind {0} has no secondary index")]
    NoIndex(RecordKind),

    /// The store was closed while a transaction was being opened
    #[error("Store is closed")]
    Closed,

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record could not be encoded or decoded
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::CreateDirectory {
                path,
                source: error,
            },
        }
    }

    /// Stable taxonomy code for this error
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::StoreInitFailed { .. } => "STORE_INIT_FAILED",
            StorageError::DuplicateKey { .. } => "DUPLICATE_KEY",
            _ => "STORAGE_ERROR",
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::DuplicateKey { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::StoreInitFailed { .. } => {
                Some("The database file may be corrupted. Move it aside and let pagemark recreate it.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::DuplicateKey { .. } => {
                Some("A record with this key already exists. Choose a different key.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
