//! Content-addressed blob storage with integrity verification.

use crate::error::{Result, RewindError};
use crate::object_id::{canonical_bytes, ObjectId, BLOB_KIND, HEADER_LEN, MAGIC};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Maximum size for a single blob object (100 MB).
const MAX_BLOB_SIZE: usize = 100 * 1024 * 1024;

/// Default zstd compression level for object storage.
pub(crate) const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Content-addressed blob storage.
///
/// Blobs are stored as zstd-compressed files named after the BLAKE3 hash of
/// their canonical envelope. Reads re-hash the payload, so a truncated or
/// tampered object is reported instead of being handed back as history.
///
/// # Examples
///
/// ```
/// use rewind_core::ObjectStore;
/// use tempfile::TempDir;
///
/// let tmp = TempDir::new().unwrap();
/// let store = ObjectStore::new(tmp.path().join("objects"));
///
/// let id = store.put_blob(b"hello world").unwrap();
/// assert_eq!(store.get_blob(id).unwrap(), b"hello world");
/// ```
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    compression_level: i32,
}

impl ObjectStore {
    /// Creates a new ObjectStore at the given root directory.
    ///
    /// The directory is created lazily on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Overrides the zstd level used for new objects.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Returns the root directory of this object store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores raw bytes and returns their content-addressed ID.
    ///
    /// Storing content that is already present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `BlobTooLarge` above the size limit, or an I/O error if the
    /// write fails.
    pub fn put_blob(&self, data: &[u8]) -> Result<ObjectId> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(RewindError::BlobTooLarge {
                size: data.len(),
                limit: MAX_BLOB_SIZE,
            });
        }

        let id = ObjectId::hash_blob(data);
        if self.exists(id) {
            return Ok(id);
        }

        self.write_object(id, &canonical_bytes(data))?;
        Ok(id)
    }

    /// Stores the current content of a file.
    ///
    /// Returns `Ok(None)` when the file does not exist, which is how a
    /// snapshot records "this file was absent".
    pub fn put_file(&self, path: &Path) -> Result<Option<ObjectId>> {
        match fs::read(path) {
            Ok(data) => self.put_blob(&data).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RewindError::Io(e)),
        }
    }

    /// Retrieves raw bytes by their content ID.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if the object doesn't exist and `HashMismatch`
    /// or `CorruptedObject` if verification fails.
    pub fn get_blob(&self, id: ObjectId) -> Result<Vec<u8>> {
        self.read_object(id)
    }

    /// Checks if an object exists in the store.
    pub fn exists(&self, id: ObjectId) -> bool {
        self.object_path(id).exists()
    }

    /// Lists all objects with their on-disk size and modification time.
    ///
    /// Used by garbage collection.
    pub fn list_all_objects(&self) -> Result<Vec<(ObjectId, u64, SystemTime)>> {
        let mut objects = Vec::new();

        if !self.root.exists() {
            return Ok(objects);
        }

        for shard_entry in fs::read_dir(&self.root)? {
            let shard_path = shard_entry?.path();
            if !shard_path.is_dir() {
                continue;
            }

            for obj_entry in fs::read_dir(&shard_path)? {
                let obj_path = obj_entry?.path();

                // Skip non-files and temp files
                if !obj_path.is_file() || obj_path.extension().is_some() {
                    continue;
                }

                let filename = obj_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| {
                        RewindError::GcError(format!("invalid object filename: {:?}", obj_path))
                    })?;

                let id = ObjectId::from_hex(filename).map_err(|e| {
                    RewindError::GcError(format!("failed to parse object ID {}: {}", filename, e))
                })?;

                let metadata = fs::metadata(&obj_path)?;
                let mtime = metadata.modified().unwrap_or_else(|_| SystemTime::now());
                objects.push((id, metadata.len(), mtime));
            }
        }

        Ok(objects)
    }

    /// Deletes an object from the store.
    ///
    /// Only garbage collection should call this: deleting a blob that a
    /// snapshot still names turns that scope's history stale.
    pub fn delete(&mut self, id: ObjectId) -> Result<()> {
        let path = self.object_path(id);

        if !path.exists() {
            return Err(RewindError::ObjectNotFound(id.as_hex()));
        }

        fs::remove_file(&path).map_err(|e| {
            RewindError::GcError(format!("failed to delete object {}: {}", id.as_hex(), e))
        })
    }

    /// Computes the filesystem path for an object.
    pub(crate) fn object_path(&self, id: ObjectId) -> PathBuf {
        self.root.join(id.shard()).join(id.as_hex())
    }

    /// Writes compressed canonical bytes to disk atomically.
    fn write_object(&self, id: ObjectId, canonical: &[u8]) -> Result<()> {
        let path = self.object_path(id);
        let dir = path
            .parent()
            .ok_or_else(|| RewindError::CorruptedObject {
                path: path.clone(),
                reason: "object path has no parent".to_string(),
            })?;

        fs::create_dir_all(dir)?;

        let compressed = zstd::encode_all(canonical, self.compression_level)
            .map_err(|e| RewindError::Compression(e.to_string()))?;

        // Atomic write: temp file + fsync + rename
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        #[cfg(unix)]
        {
            if let Ok(dir_file) = File::open(dir) {
                let _ = dir_file.sync_all();
            }
        }

        Ok(())
    }

    /// Reads and verifies an object from disk.
    fn read_object(&self, id: ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);

        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RewindError::ObjectNotFound(id.as_hex()));
            }
            Err(e) => return Err(RewindError::Io(e)),
        };

        let canonical = zstd::decode_all(compressed.as_slice())
            .map_err(|e| RewindError::Compression(e.to_string()))?;

        if canonical.len() < HEADER_LEN {
            return Err(RewindError::CorruptedObject {
                path,
                reason: "object too small".to_string(),
            });
        }

        if &canonical[..5] != MAGIC {
            return Err(RewindError::CorruptedObject {
                path,
                reason: "invalid magic bytes".to_string(),
            });
        }

        if canonical[5] != BLOB_KIND {
            return Err(RewindError::CorruptedObject {
                path,
                reason: format!("unknown kind: {}", canonical[5]),
            });
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&canonical[6..HEADER_LEN]);
        let len = u64::from_le_bytes(len_bytes) as usize;
        let payload = &canonical[HEADER_LEN..];

        if payload.len() != len {
            return Err(RewindError::CorruptedObject {
                path,
                reason: format!(
                    "length mismatch: header says {}, got {}",
                    len,
                    payload.len()
                ),
            });
        }

        let actual = ObjectId::hash_blob(payload);
        if actual != id {
            return Err(RewindError::HashMismatch {
                expected: id.as_hex(),
                actual: actual.as_hex(),
            });
        }

        Ok(payload.to_vec())
    }
}
