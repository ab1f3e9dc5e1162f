//! Error types for rewind_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for rewind_core operations.
#[derive(Error, Debug)]
pub enum RewindError {
    /// A previously recorded content id can no longer be resolved.
    ///
    /// Raised when the blob behind a snapshot was garbage-collected. Callers
    /// are expected to clear the affected scope and tell the user that its
    /// undo history expired.
    #[error("stale content: {0} is no longer in the content store")]
    StaleContent(String),

    /// Object with the given ID was not found in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Hash verification failed during object read.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// The expected object ID
        expected: String,
        /// The actual computed hash
        actual: String,
    },

    /// The object file is corrupted or has invalid format.
    #[error("corrupted object at {}: {}", path.display(), reason)]
    CorruptedObject {
        /// Path to the corrupted object
        path: PathBuf,
        /// Description of the corruption
        reason: String,
    },

    /// Invalid hex string for ObjectId parsing.
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Serialization error while encoding history.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error while decoding history.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// Blob exceeds maximum allowed size.
    #[error("blob too large: {size} bytes exceeds limit of {limit} bytes")]
    BlobTooLarge {
        /// Actual size of the blob
        size: usize,
        /// Maximum allowed size
        limit: usize,
    },

    /// Invalid pointer key or pointer file content.
    #[error("invalid pointer {key}: {reason}")]
    InvalidPointer {
        /// Pointer key
        key: String,
        /// Description of what's invalid
        reason: String,
    },

    /// Pop or commit on a scope without history.
    #[error("no discard history for {0}")]
    NoHistory(String),

    /// The scope's last entry is not the one that was prepared for undo.
    #[error("discard history for {0} changed since the undo was prepared")]
    HistoryChanged(String),

    /// Malformed request (wrong number of paths, unknown path in group, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The caller's destructive action failed.
    #[error("discard action failed: {0}")]
    ActionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Repository is locked by another process.
    #[error("repository locked by another process")]
    RepositoryLocked,

    /// Lock file is held by a live process.
    #[error("repository lock held by another process (PID: {pid})")]
    LockHeld {
        /// Process ID holding the lock
        pid: u32,
    },

    /// Not a rewind repository.
    #[error("not a rewind repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Garbage collection error.
    #[error("gc error: {0}")]
    GcError(String),
}

impl RewindError {
    /// Wraps a caller error raised by a destructive action.
    pub fn action(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::ActionFailed(err.into())
    }

    /// Returns true if this error means recorded history points at content
    /// that no longer exists.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleContent(_))
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::StaleContent(_) => {
                Some("The discard history for this scope expired. Run 'rewind clear' for it, or 'rewind verify --prune'.")
            }
            Self::CorruptedObject { .. } | Self::HashMismatch { .. } => {
                Some("Run 'rewind verify' to find affected history, then 'rewind gc' to clean up.")
            }
            Self::NotARepository(_) => Some("Run 'rewind init' in the working directory first."),
            Self::LockHeld { .. } => {
                Some("Another rewind process is running. Wait for it to finish.")
            }
            Self::RepositoryLocked => {
                Some("Wait for the other process to finish, or remove .rewind/LOCK if the process is dead.")
            }
            Self::HistoryChanged(_) => Some("Run the undo again to prepare it against the current history."),
            Self::InvalidPointer { .. } => {
                Some("The history pointer is unreadable. 'rewind clear' resets it.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for rewind_core operations.
pub type Result<T> = std::result::Result<T, RewindError>;
