//! CLI commands.

pub mod clear;
pub mod discard;
pub mod gc;
pub mod history;
pub mod init;
pub mod undo;
pub mod verify;

use rewind_core::{ContentId, Scope};
use std::path::{Path, PathBuf};

/// Whole-file scope, or the partial scope of `path`.
pub(crate) fn scope(partial: Option<String>) -> Scope {
    partial.map_or(Scope::WholeFile, Scope::Partial)
}

/// Editor swap and lock files sitting next to any of `paths`.
/// Discards and undos refuse to run while any exist.
pub(crate) fn editor_locks(root: &Path, paths: &[String]) -> Vec<PathBuf> {
    let mut locks = Vec::new();
    for path in paths {
        let path = root.join(path);
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            continue;
        };
        let name = name.to_string_lossy();

        for candidate in [format!(".{}.swp", name), format!(".#{}", name)] {
            let candidate = dir.join(candidate);
            // emacs lock files are dangling symlinks
            if candidate.symlink_metadata().is_ok() {
                locks.push(candidate);
            }
        }
    }
    locks
}

/// Abbreviated content id, `-` for an absent file.
pub(crate) fn short_id(id: Option<&ContentId>) -> String {
    match id {
        Some(id) => id.as_str().chars().take(12).collect(),
        None => "-".to_string(),
    }
}
