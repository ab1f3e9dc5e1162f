use anyhow::{Context, Result};
use rewind_core::RewindRepo;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Manages isolated test environments with tempfile
pub struct TestWorkspace {
    dir: TempDir,
    scratch: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        let scratch = TempDir::new().context("Failed to create scratch directory")?;
        Ok(Self { dir, scratch })
    }

    /// Create workspace with initial files
    pub fn with_files(files: HashMap<String, Vec<u8>>) -> Result<Self> {
        let workspace = Self::empty()?;
        for (path, content) in files {
            workspace.write_file(&path, &content)?;
        }
        Ok(workspace)
    }

    /// Get workspace path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory receiving undo scratch folders
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Initialize a rewind repository whose undo scratch space stays inside
    /// this workspace's temp dirs
    pub fn init_repo(&self) -> Result<RewindRepo> {
        let repo = RewindRepo::init(self.path())?;

        let mut config = repo.config().clone();
        config.undo.scratch_dir = Some(self.scratch_path().to_path_buf());
        config.save(&repo.rewind_dir())?;

        self.open_repo()
    }

    /// Open existing rewind repository
    pub fn open_repo(&self) -> Result<RewindRepo> {
        Ok(RewindRepo::open(self.path())?)
    }

    /// Write file to workspace
    pub fn write_file(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.path().join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {}", path))?;
        }

        fs::write(&full_path, content)
            .with_context(|| format!("Failed to write file: {}", path))?;

        Ok(())
    }

    /// Remove file from workspace
    pub fn remove_file(&self, path: &str) -> Result<()> {
        fs::remove_file(self.path().join(path))
            .with_context(|| format!("Failed to remove file: {}", path))
    }

    /// Read file from workspace
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.path().join(path);
        fs::read(&full_path).with_context(|| format!("Failed to read file: {}", path))
    }

    /// Check if file exists
    pub fn file_exists(&self, path: &str) -> bool {
        self.path().join(path).exists()
    }

    /// Number of undo scratch folders left behind
    pub fn scratch_dirs(&self) -> Result<usize> {
        Ok(fs::read_dir(self.scratch_path())?.count())
    }
}
