//! The capabilities the history needs from its host content store.

use crate::error::Result;
use crate::snapshot::ContentId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Inputs of a three-way merge.
///
/// `base` and `other` are materialized scratch files; `None` means that
/// side of the snapshot was an absent file.
#[derive(Debug, Clone, Copy)]
pub struct MergeRequest<'a> {
    /// Working-copy path (relative to the gateway's working directory).
    pub current: &'a str,
    /// Common ancestor: the content right after the discard.
    pub base: Option<&'a Path>,
    /// The side to reintroduce: the content right before the discard.
    pub other: Option<&'a Path>,
    /// Where the merged content is written.
    pub result: &'a Path,
}

/// Result of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// File holding the merged content, `None` when the outcome is a deletion.
    pub result_path: Option<PathBuf>,
    /// Whether the merge produced conflicts.
    pub conflict: bool,
    /// Whether applying the outcome removes the working file.
    pub deleted: bool,
}

/// Content store, merge utility and pointer store of the host backend.
///
/// Every method is an await point; implementations may be backed by a
/// version-control process, a database or plain files.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    /// Stores literal content and returns its id.
    async fn create_blob(&self, content: &[u8]) -> Result<ContentId>;

    /// Stores the current on-disk content of a working-copy path.
    ///
    /// Returns `None` if the file does not exist.
    async fn create_blob_from_path(&self, path: &str) -> Result<Option<ContentId>>;

    /// Reads a blob back.
    ///
    /// An id the store cannot resolve is `RewindError::StaleContent`.
    async fn blob_contents(&self, id: &ContentId) -> Result<Vec<u8>>;

    /// Returns true if the id can still be resolved.
    async fn has_blob(&self, id: &ContentId) -> Result<bool>;

    /// Writes a blob to `destination` (creating parent directories) and
    /// returns the written path.
    ///
    /// An id the store cannot resolve is `RewindError::StaleContent`.
    async fn materialize(&self, destination: &Path, id: &ContentId) -> Result<PathBuf>;

    /// Merges `other` into the working copy relative to `base`.
    async fn merge_three_way(&self, request: MergeRequest<'_>) -> Result<MergeOutcome>;

    /// Reads a repository configuration value.
    async fn config_value(&self, key: &str) -> Result<Option<String>>;

    /// Writes a repository configuration value.
    async fn set_config_value(&self, key: &str, value: &str) -> Result<()>;
}
