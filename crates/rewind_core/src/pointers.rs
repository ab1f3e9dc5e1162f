//! Repository-scoped key/value store for small pointer values.
//!
//! This is the configuration store the history uses for its pointer
//! indirection: one key per history, holding the content id of the
//! serialized payload.

use crate::error::{Result, RewindError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Manages pointer values under `.rewind/pointers/`.
///
/// Each key is a single-line text file. Writes are atomic (temp file +
/// rename), so a crash never leaves a half-written pointer behind.
#[derive(Debug, Clone)]
pub struct PointerStore {
    root: PathBuf,
}

impl PointerStore {
    /// Creates a pointer store rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Reads a pointer value. Returns `None` if the key is unset.
    pub fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RewindError::Io(e)),
        };

        let value = content.trim();
        if value.is_empty() || value.contains('\n') {
            return Err(RewindError::InvalidPointer {
                key: key.to_string(),
                reason: "expected a single non-empty line".to_string(),
            });
        }

        Ok(Some(value.to_string()))
    }

    /// Writes a pointer value atomically.
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;

        if value.is_empty() || value.contains('\n') {
            return Err(RewindError::InvalidPointer {
                key: key.to_string(),
                reason: "value must be a single non-empty line".to_string(),
            });
        }

        fs::create_dir_all(&self.root)?;

        let tmp_path = self.root.join(format!("{}.tmp", key));
        {
            let mut file = File::create(&tmp_path)?;
            writeln!(file, "{}", value)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        #[cfg(unix)]
        {
            if let Ok(dir_file) = File::open(&self.root) {
                let _ = dir_file.sync_all();
            }
        }

        Ok(())
    }

    /// Deletes a pointer. Does nothing if the key is unset.
    pub fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RewindError::Io(e)),
        }
    }

    /// Lists all pointers as sorted (key, value) pairs.
    ///
    /// Unreadable entries are skipped.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut pointers = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) == Some("tmp") {
                continue;
            }

            let Some(key) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Ok(Some(value)) = self.read(key) {
                pointers.push((key.to_string(), value));
            }
        }

        pointers.sort();
        Ok(pointers)
    }

    /// Maps a key to its file, rejecting anything that could escape the root.
    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.ends_with(".tmp")
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

        if !valid {
            return Err(RewindError::InvalidPointer {
                key: key.to_string(),
                reason: "keys may only contain [A-Za-z0-9._-]".to_string(),
            });
        }

        Ok(self.root.join(key))
    }
}
