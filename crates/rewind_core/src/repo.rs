//! Repository handle tying the stores, configuration and lock together.

use crate::config::Config;
use crate::discard::DiscardHistory;
use crate::error::{Result, RewindError};
use crate::gc::{GcConfig, GcProgressCallback, GcReport};
use crate::local::LocalGateway;
use crate::pointers::PointerStore;
use crate::ObjectStore;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the repository metadata directory.
pub const REWIND_DIR: &str = ".rewind";

/// Rewind repository handle.
///
/// A repository is a working directory with a `.rewind/` directory holding
/// the object store, the pointer store and `config.toml`.
#[derive(Debug)]
pub struct RewindRepo {
    /// Working directory (parent of `.rewind`).
    root: PathBuf,
    config: Config,
    object_store: ObjectStore,
    pointers: PointerStore,
}

impl RewindRepo {
    /// Opens an existing repository.
    ///
    /// # Errors
    ///
    /// Returns `NotARepository` if `.rewind` doesn't exist, or a
    /// configuration error if `config.toml` is invalid.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rewind_core::RewindRepo;
    ///
    /// let repo = RewindRepo::open(".").unwrap();
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let rewind_dir = root.join(REWIND_DIR);

        if !rewind_dir.is_dir() {
            return Err(RewindError::NotARepository(root));
        }

        let config = Config::load(&rewind_dir)?;
        Ok(Self::from_parts(root, config))
    }

    /// Creates `.rewind/` in `path` with a default configuration.
    ///
    /// # Errors
    ///
    /// Fails if the repository already exists.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rewind_core::RewindRepo;
    ///
    /// let repo = RewindRepo::init(".").unwrap();
    /// ```
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let rewind_dir = root.join(REWIND_DIR);

        if rewind_dir.exists() {
            return Err(RewindError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "rewind repository already exists in this directory",
            )));
        }

        fs::create_dir_all(rewind_dir.join("objects"))?;
        fs::create_dir_all(rewind_dir.join("pointers"))?;

        let config = Config::default();
        config.save(&rewind_dir)?;

        let gitignore = "# rewind metadata is local to this working copy\n*\n";
        fs::write(rewind_dir.join(".gitignore"), gitignore)?;

        debug!(root = %root.display(), "initialized rewind repository");
        Ok(Self::from_parts(root, config))
    }

    fn from_parts(root: PathBuf, config: Config) -> Self {
        let rewind_dir = root.join(REWIND_DIR);
        let object_store = ObjectStore::new(rewind_dir.join("objects"))
            .with_compression_level(config.storage.compression_level);
        let pointers = PointerStore::new(rewind_dir.join("pointers"));

        Self {
            root,
            config,
            object_store,
            pointers,
        }
    }

    /// Returns the working directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `.rewind` directory.
    pub fn rewind_dir(&self) -> PathBuf {
        self.root.join(REWIND_DIR)
    }

    /// Loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Object store.
    pub fn object_store(&self) -> &ObjectStore {
        &self.object_store
    }

    /// Pointer store.
    pub fn pointers(&self) -> &PointerStore {
        &self.pointers
    }

    /// Gateway over this repository's working directory and stores.
    pub fn gateway(&self) -> LocalGateway {
        LocalGateway::new(
            &self.root,
            self.object_store.clone(),
            self.pointers.clone(),
        )
    }

    /// Builds a coordinator and loads the persisted history into it.
    pub async fn discard_history(&self) -> Result<DiscardHistory<LocalGateway>> {
        let mut history = DiscardHistory::with_config(Arc::new(self.gateway()), &self.config);
        history.update_history().await?;
        Ok(history)
    }

    /// Acquires the exclusive repository lock.
    ///
    /// The lock file contains the PID of the owning process. If the lock is
    /// held by a dead process (stale lock), it is cleaned up automatically.
    pub fn lock(&self) -> Result<LockGuard> {
        let lock_path = self.rewind_dir().join("LOCK");
        acquire_lock_with_retry(&lock_path, 0)
    }

    /// Run garbage collection on the repository.
    ///
    /// See [`crate::gc::gc`] for details.
    pub fn gc(&mut self, config: GcConfig) -> Result<GcReport> {
        crate::gc::gc(&self.pointers, &mut self.object_store, config, None)
    }

    /// Run garbage collection with progress reporting.
    pub fn gc_with_progress(
        &mut self,
        config: GcConfig,
        progress: &GcProgressCallback<'_>,
    ) -> Result<GcReport> {
        crate::gc::gc(&self.pointers, &mut self.object_store, config, Some(progress))
    }
}

fn acquire_lock_with_retry(lock_path: &Path, retry_count: u32) -> Result<LockGuard> {
    if retry_count > 2 {
        return Err(RewindError::RepositoryLocked);
    }

    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
    {
        Ok(mut file) => {
            writeln!(file, "{}", std::process::id())?;
            file.flush()?;

            file.try_lock_exclusive()
                .map_err(|_| RewindError::RepositoryLocked)?;

            Ok(LockGuard {
                file: Some(file),
                path: lock_path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            handle_existing_lock(lock_path, retry_count)
        }
        Err(e) => Err(RewindError::Io(e)),
    }
}

fn handle_existing_lock(lock_path: &Path, retry_count: u32) -> Result<LockGuard> {
    match fs::read_to_string(lock_path) {
        Ok(content) => {
            if let Ok(pid) = content.trim().parse::<u32>() {
                if is_process_alive(pid) {
                    return Err(RewindError::LockHeld { pid });
                }

                warn!(pid = pid, "Detected stale lock from dead process, cleaning up");
                if let Err(e) = fs::remove_file(lock_path) {
                    // another process may have cleaned it up already
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(RewindError::Io(e));
                    }
                }
                return acquire_lock_with_retry(lock_path, retry_count + 1);
            }

            warn!("Lock file has invalid content, attempting cleanup");
            let _ = fs::remove_file(lock_path);
            acquire_lock_with_retry(lock_path, retry_count + 1)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            acquire_lock_with_retry(lock_path, retry_count + 1)
        }
        Err(_) => Err(RewindError::RepositoryLocked),
    }
}

/// RAII guard for the repository lock.
///
/// The lock is released and the lock file removed when dropped.
#[derive(Debug)]
pub struct LockGuard {
    /// Wrapped in Option to allow taking ownership in Drop.
    file: Option<File>,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
        }
        let _ = fs::remove_file(&self.path);
    }
}

/// Check if a process with the given PID is still alive.
#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    // zombies keep /proc/{pid} but lose a readable stat
    std::path::Path::new(&format!("/proc/{}/stat", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    // stale locks are never reclaimed here; delete LOCK by hand
    true
}
