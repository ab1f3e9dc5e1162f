//! Bounded, per-scope snapshot stacks.

use crate::config::DEFAULT_MAX_HISTORY_LENGTH;
use crate::error::{Result, RewindError};
use std::collections::BTreeMap;

/// Ordered history sequences keyed by scope (oldest entry first).
///
/// The same type backs whole-file history (one fixed key, entries are
/// [`SnapshotGroup`](crate::SnapshotGroup)s) and partial history (one key per
/// file, entries are [`Snapshot`](crate::Snapshot)s).
///
/// Each sequence has a soft cap. When an append brings a sequence to the
/// cap, it is cut down to its most recent `cap / 2` entries in one go, so
/// trimming happens once per `cap / 2` appends rather than on every push.
///
/// # Examples
///
/// ```
/// use rewind_core::SnapshotHistory;
///
/// let mut history = SnapshotHistory::with_max_length(4);
/// for i in 0..4 {
///     history.append("a.txt", i);
/// }
/// assert_eq!(history.entries("a.txt"), &[2, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHistory<E> {
    max_length: usize,
    sequences: BTreeMap<String, Vec<E>>,
}

impl<E> Default for SnapshotHistory<E> {
    fn default() -> Self {
        Self::with_max_length(DEFAULT_MAX_HISTORY_LENGTH)
    }
}

impl<E> SnapshotHistory<E> {
    /// Creates an empty history with the given soft cap per scope.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(2),
            sequences: BTreeMap::new(),
        }
    }

    /// Soft cap per scope.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Pushes an entry onto the scope's sequence, trimming if the cap is hit.
    pub fn append(&mut self, key: &str, entry: E) {
        let max_length = self.max_length;
        let sequence = self.sequences.entry(key.to_string()).or_default();
        sequence.push(entry);

        if sequence.len() >= max_length {
            let keep = max_length / 2;
            let drop = sequence.len() - keep;
            sequence.drain(..drop);
        }
    }

    /// Most recent entry of the scope, if any.
    pub fn peek_last(&self, key: &str) -> Option<&E> {
        self.sequences.get(key).and_then(|s| s.last())
    }

    /// Mutable access to the most recent entry of the scope.
    pub(crate) fn peek_last_mut(&mut self, key: &str) -> Option<&mut E> {
        self.sequences.get_mut(key).and_then(|s| s.last_mut())
    }

    /// Removes and returns the most recent entry.
    ///
    /// # Errors
    ///
    /// Returns `NoHistory` if the scope is empty.
    pub fn pop(&mut self, key: &str) -> Result<E> {
        let sequence = self
            .sequences
            .get_mut(key)
            .ok_or_else(|| RewindError::NoHistory(key.to_string()))?;
        let entry = sequence
            .pop()
            .ok_or_else(|| RewindError::NoHistory(key.to_string()))?;

        if sequence.is_empty() {
            self.sequences.remove(key);
        }
        Ok(entry)
    }

    /// Returns true if the scope has at least one entry.
    pub fn has_history(&self, key: &str) -> bool {
        self.len(key) > 0
    }

    /// Number of entries in the scope.
    pub fn len(&self, key: &str) -> usize {
        self.sequences.get(key).map_or(0, Vec::len)
    }

    /// Entries of the scope, oldest first.
    pub fn entries(&self, key: &str) -> &[E] {
        self.sequences.get(key).map_or(&[], Vec::as_slice)
    }

    /// Empties the scope.
    pub fn clear(&mut self, key: &str) {
        self.sequences.remove(key);
    }

    /// Keys of all non-empty scopes.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }
}

impl<E: Clone> SnapshotHistory<E> {
    /// Copies out every scope.
    pub fn export_all(&self) -> BTreeMap<String, Vec<E>> {
        self.sequences.clone()
    }

    /// Replaces every scope with the given sequences.
    ///
    /// Imported sequences are taken as-is; the cap applies on the next append.
    pub fn import_all(&mut self, sequences: BTreeMap<String, Vec<E>>) {
        self.sequences = sequences
            .into_iter()
            .filter(|(_, entries)| !entries.is_empty())
            .collect();
    }
}
