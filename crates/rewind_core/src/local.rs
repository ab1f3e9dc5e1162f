//! [`ContentGateway`] backed by the on-disk object and pointer stores.

use crate::error::{Result, RewindError};
use crate::gateway::{ContentGateway, MergeOutcome, MergeRequest};
use crate::merge::{merge_contents, MergedContent};
use crate::object_id::ObjectId;
use crate::object_store::ObjectStore;
use crate::pointers::PointerStore;
use crate::snapshot::ContentId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Gateway over a working directory, an [`ObjectStore`] and a [`PointerStore`].
///
/// Content ids are the hex form of [`ObjectId`]s.
#[derive(Debug, Clone)]
pub struct LocalGateway {
    workdir: PathBuf,
    objects: ObjectStore,
    pointers: PointerStore,
}

impl LocalGateway {
    /// Creates a gateway. Working-copy paths are resolved against `workdir`.
    pub fn new(workdir: impl AsRef<Path>, objects: ObjectStore, pointers: PointerStore) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
            objects,
            pointers,
        }
    }

    /// The working directory.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn object_id(id: &ContentId) -> Result<ObjectId> {
        // an id this store never produced cannot be resolved either
        ObjectId::from_hex(id.as_str()).map_err(|_| RewindError::StaleContent(id.to_string()))
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RewindError::Io(e)),
    }
}

async fn read_side(path: Option<&Path>) -> Result<Option<Vec<u8>>> {
    match path {
        Some(path) => read_optional(path).await,
        None => Ok(None),
    }
}

#[async_trait]
impl ContentGateway for LocalGateway {
    async fn create_blob(&self, content: &[u8]) -> Result<ContentId> {
        let id = self.objects.put_blob(content)?;
        Ok(ContentId::new(id.as_hex()))
    }

    async fn create_blob_from_path(&self, path: &str) -> Result<Option<ContentId>> {
        let id = self.objects.put_file(&self.workdir.join(path))?;
        Ok(id.map(|id| ContentId::new(id.as_hex())))
    }

    async fn blob_contents(&self, id: &ContentId) -> Result<Vec<u8>> {
        let object_id = Self::object_id(id)?;
        match self.objects.get_blob(object_id) {
            Err(RewindError::ObjectNotFound(_)) => Err(RewindError::StaleContent(id.to_string())),
            other => other,
        }
    }

    async fn has_blob(&self, id: &ContentId) -> Result<bool> {
        match ObjectId::from_hex(id.as_str()) {
            Ok(object_id) => Ok(self.objects.exists(object_id)),
            Err(_) => Ok(false),
        }
    }

    async fn materialize(&self, destination: &Path, id: &ContentId) -> Result<PathBuf> {
        let content = self.blob_contents(id).await?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(destination, &content).await?;
        Ok(destination.to_path_buf())
    }

    async fn merge_three_way(&self, request: MergeRequest<'_>) -> Result<MergeOutcome> {
        let current = read_optional(&self.workdir.join(request.current)).await?;
        let base = read_side(request.base).await?;
        let other = read_side(request.other).await?;

        let merged = merge_contents(current.as_deref(), base.as_deref(), other.as_deref());
        debug!(path = request.current, conflict = merged.is_conflict(), "merged");

        let conflict = merged.is_conflict();
        match merged {
            MergedContent::Deleted => Ok(MergeOutcome {
                result_path: None,
                conflict: false,
                deleted: true,
            }),
            MergedContent::Clean(content) | MergedContent::Conflicted(content) => {
                if let Some(parent) = request.result.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(request.result, &content).await?;
                Ok(MergeOutcome {
                    result_path: Some(request.result.to_path_buf()),
                    conflict,
                    deleted: false,
                })
            }
        }
    }

    async fn config_value(&self, key: &str) -> Result<Option<String>> {
        self.pointers.read(key)
    }

    async fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        self.pointers.write(key, value)
    }
}
