//! Snapshot types recorded around a discard.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scope key used for whole-file history (the repository root).
pub const WHOLE_FILE_SCOPE_KEY: &str = ".";

/// Opaque identifier of a content-addressed blob.
///
/// The coordinator never interprets it; only the gateway that produced it
/// can resolve it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wraps a backend identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.0.chars().take(12).collect();
        write!(f, "ContentId({})", short)
    }
}

/// File content immediately before and after a destructive action.
///
/// Either side is `None` when the file did not exist at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Content captured before the action ran.
    #[serde(default)]
    pub before_id: Option<ContentId>,
    /// Content captured after the action completed.
    #[serde(default)]
    pub after_id: Option<ContentId>,
}

/// Snapshots of every file touched by one whole-file discard, keyed by path.
///
/// The group is undone as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotGroup(BTreeMap<String, Snapshot>);

impl SnapshotGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group holding a single path.
    pub fn single(path: impl Into<String>, snapshot: Snapshot) -> Self {
        let mut group = Self::new();
        group.insert(path, snapshot);
        group
    }

    /// Adds or replaces the snapshot for a path.
    pub fn insert(&mut self, path: impl Into<String>, snapshot: Snapshot) {
        self.0.insert(path.into(), snapshot);
    }

    /// Removes a path from the group.
    pub fn remove(&mut self, path: &str) -> Option<Snapshot> {
        self.0.remove(path)
    }

    /// Returns the snapshot recorded for a path.
    pub fn get(&self, path: &str) -> Option<&Snapshot> {
        self.0.get(path)
    }

    /// Iterates over (path, snapshot) pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Snapshot)> {
        self.0.iter()
    }

    /// Paths covered by this group, in order.
    pub fn paths(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Number of paths in the group.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the group has no paths.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every content id referenced by the group.
    pub fn content_ids(&self) -> impl Iterator<Item = &ContentId> {
        self.0
            .values()
            .flat_map(|s| s.before_id.iter().chain(s.after_id.iter()))
    }
}

impl FromIterator<(String, Snapshot)> for SnapshotGroup {
    fn from_iter<I: IntoIterator<Item = (String, Snapshot)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which history a request addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Whole-file discards, possibly spanning several paths per entry.
    WholeFile,
    /// Line/hunk discards within a single file.
    Partial(String),
}

impl Scope {
    /// Scope for partial discards of `path`.
    pub fn partial(path: impl Into<String>) -> Self {
        Self::Partial(path.into())
    }

    /// The key this scope is stored under.
    pub fn key(&self) -> &str {
        match self {
            Self::WholeFile => WHOLE_FILE_SCOPE_KEY,
            Self::Partial(path) => path,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WholeFile => f.write_str("whole-file history"),
            Self::Partial(path) => write!(f, "partial history of {}", path),
        }
    }
}

/// Everything that gets persisted: both histories, oldest entries first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    /// Whole-file history.
    #[serde(default)]
    pub whole_file_history: Vec<SnapshotGroup>,
    /// Partial history per file path.
    #[serde(default)]
    pub partial_history_by_path: BTreeMap<String, Vec<Snapshot>>,
}

impl HistoryState {
    /// Returns true if neither history has entries.
    pub fn is_empty(&self) -> bool {
        self.whole_file_history.is_empty()
            && self.partial_history_by_path.values().all(Vec::is_empty)
    }

    /// Every content id referenced anywhere in the state.
    pub fn content_ids(&self) -> Vec<&ContentId> {
        let whole = self.whole_file_history.iter().flat_map(|g| g.content_ids());
        let partial = self
            .partial_history_by_path
            .values()
            .flatten()
            .flat_map(|s| s.before_id.iter().chain(s.after_id.iter()));
        whole.chain(partial).collect()
    }
}
