//! Line-based three-way merge of file contents.

/// Result of merging one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergedContent {
    /// Merged without overlapping changes.
    Clean(Vec<u8>),
    /// Merged content with conflict markers, or the current content when
    /// the conflict cannot be expressed with markers.
    Conflicted(Vec<u8>),
    /// The file should not exist after the merge.
    Deleted,
}

impl MergedContent {
    /// Returns true for [`MergedContent::Conflicted`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflicted(_))
    }
}

/// Merges `other` into `current` relative to their common ancestor `base`.
///
/// `None` stands for an absent file. Absent inputs merge as empty content,
/// except an absent `other`: then the file is deleted if `current` is absent
/// or still equal to `base`, and otherwise reported as a conflict that keeps
/// `current` untouched.
///
/// # Examples
///
/// ```
/// use rewind_core::{merge_contents, MergedContent};
///
/// let base = b"1\n2\n3\n4\n5\n";
/// let current = b"1\n2\n3\n4\n5\n6\n";
/// let other = b"one\n2\n3\n4\n5\n";
///
/// assert_eq!(
///     merge_contents(Some(current), Some(base), Some(other)),
///     MergedContent::Clean(b"one\n2\n3\n4\n5\n6\n".to_vec())
/// );
/// ```
pub fn merge_contents(
    current: Option<&[u8]>,
    base: Option<&[u8]>,
    other: Option<&[u8]>,
) -> MergedContent {
    let Some(other) = other else {
        return match current {
            None => MergedContent::Deleted,
            Some(current) if Some(current) == base => MergedContent::Deleted,
            Some(current) => MergedContent::Conflicted(current.to_vec()),
        };
    };

    let current = current.unwrap_or_default();
    let base = base.unwrap_or_default();

    match diffy::merge_bytes(base, current, other) {
        Ok(merged) => MergedContent::Clean(merged),
        Err(conflicted) => MergedContent::Conflicted(conflicted),
    }
}
