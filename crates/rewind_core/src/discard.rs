//! Discard/undo coordination.
//!
//! [`DiscardHistory`] wraps a destructive action with before/after snapshots
//! and later reverses it with a three-way merge, so edits made after the
//! discard survive the undo.
//!
//! A discard records, per path, the content immediately before and after the
//! action. An undo merges `before` back into the working copy using `after`
//! as the common ancestor. Undo is two-phase: [`DiscardHistory::prepare_undo`]
//! only computes merge results in a scratch directory; the caller applies
//! them and then calls [`DiscardHistory::commit_undo`].
//!
//! Callers must not run two operations on the same scope concurrently.

use crate::config::Config;
use crate::error::{Result, RewindError};
use crate::gateway::{ContentGateway, MergeRequest};
use crate::history::SnapshotHistory;
use crate::serializer::HistorySerializer;
use crate::snapshot::{
    ContentId, HistoryState, Scope, Snapshot, SnapshotGroup, WHOLE_FILE_SCOPE_KEY,
};
use futures::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Prefix of the per-undo scratch directories.
const SCRATCH_PREFIX: &str = "rewind-discard-history-";

/// How a discard is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardMode {
    /// Every path at once, undone as one group.
    WholeFile,
    /// Selected lines of exactly one file.
    Partial,
}

/// Result of [`DiscardHistory::record_discard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardOutcome {
    /// The safety check refused; the action never ran.
    Vetoed,
    /// The action ran and these snapshots were recorded.
    Recorded(SnapshotGroup),
}

/// Result of [`DiscardHistory::prepare_undo`].
#[derive(Debug)]
pub enum UndoOutcome {
    /// The scope has nothing to undo.
    NoHistory,
    /// The safety check refused; nothing was merged.
    Vetoed,
    /// Merge results are ready to be applied.
    Prepared(PreparedUndo),
}

/// Merge result for one path of a prepared undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoFile {
    /// Working-copy path.
    pub path: String,
    /// Scratch file with the merged content; `None` when the file is deleted.
    pub result_path: Option<PathBuf>,
    /// Whether the merge conflicted.
    pub conflict: bool,
    /// Whether applying removes the working file.
    pub deleted: bool,
    /// Content before the discard.
    pub before_id: Option<ContentId>,
    /// Content after the discard.
    pub after_id: Option<ContentId>,
}

/// An undo whose merges are computed but not yet committed.
///
/// Dropping it without calling [`commit_undo`](DiscardHistory::commit_undo)
/// leaves history untouched and only leaves the scratch directory behind.
#[derive(Debug)]
pub struct PreparedUndo {
    scope: Scope,
    only_path: Option<String>,
    entry: SnapshotGroup,
    files: Vec<UndoFile>,
    scratch_dir: PathBuf,
}

impl PreparedUndo {
    /// Scope this undo belongs to.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Per-path merge results, in path order.
    pub fn files(&self) -> &[UndoFile] {
        &self.files
    }

    /// Returns true if any path merged with conflicts.
    pub fn has_conflicts(&self) -> bool {
        self.files.iter().any(|f| f.conflict)
    }

    /// Directory holding the materialized snapshots and merge results.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Writes every merge result over its working file, removing files whose
    /// result is a deletion. Conflicted results are written with markers.
    pub async fn apply(&self, workdir: &Path) -> Result<()> {
        for file in &self.files {
            let target = workdir.join(&file.path);

            if file.deleted {
                match fs::remove_file(&target).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(RewindError::Io(e)),
                }
                continue;
            }

            let Some(result) = &file.result_path else {
                continue;
            };
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(result, &target).await?;
        }

        debug!(scope = %self.scope, files = self.files.len(), "applied undo");
        Ok(())
    }

    /// Abandons the undo and removes its scratch directory.
    pub async fn discard(self) -> Result<()> {
        remove_scratch(&self.scratch_dir).await
    }
}

/// A scope whose most recent entry references content that is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleScope {
    /// The affected scope.
    pub scope: Scope,
    /// Ids that could not be resolved.
    pub missing: Vec<ContentId>,
}

/// Records discards and undoes them.
///
/// Holds the in-memory whole-file and partial histories and persists both
/// through the gateway after every mutation.
pub struct DiscardHistory<G: ContentGateway + ?Sized> {
    gateway: Arc<G>,
    whole_file: SnapshotHistory<SnapshotGroup>,
    partial: SnapshotHistory<Snapshot>,
    serializer: HistorySerializer,
    scratch_root: PathBuf,
}

impl<G: ContentGateway + ?Sized> DiscardHistory<G> {
    /// Creates an empty coordinator with default settings.
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_config(gateway, &Config::default())
    }

    /// Creates an empty coordinator using the repository configuration.
    pub fn with_config(gateway: Arc<G>, config: &Config) -> Self {
        Self {
            gateway,
            whole_file: SnapshotHistory::with_max_length(config.history.max_length),
            partial: SnapshotHistory::with_max_length(config.history.max_length),
            serializer: HistorySerializer::new(config.history.pointer_key.clone()),
            scratch_root: config.undo.scratch_root(),
        }
    }

    /// The gateway this coordinator talks to.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Reloads both histories from the persisted payload.
    ///
    /// A missing pointer, a vanished payload or an unreadable payload all
    /// leave both histories empty.
    pub async fn update_history(&mut self) -> Result<()> {
        let state = self.serializer.load(self.gateway.as_ref()).await?;
        self.import(state);
        Ok(())
    }

    /// Runs `destructive_action` between two snapshots of `paths` and records
    /// them.
    ///
    /// `is_safe` is asked after the "before" capture; when it answers false
    /// the action never runs and history is untouched. An action error is
    /// returned as [`RewindError::ActionFailed`] and nothing is recorded.
    pub async fn record_discard<S, SF, A, AF, E>(
        &mut self,
        paths: &[String],
        mode: DiscardMode,
        is_safe: S,
        destructive_action: A,
    ) -> Result<DiscardOutcome>
    where
        S: Fn() -> SF,
        SF: Future<Output = bool>,
        A: FnOnce() -> AF,
        AF: Future<Output = std::result::Result<(), E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let paths = normalize_paths(paths, mode)?;

        let before = self.capture(&paths).await?;
        debug!(paths = paths.len(), "captured content before discard");

        if !is_safe().await {
            debug!("discard vetoed by safety check");
            return Ok(DiscardOutcome::Vetoed);
        }

        destructive_action().await.map_err(RewindError::action)?;

        let after = self.capture(&paths).await?;
        let group: SnapshotGroup = paths
            .into_iter()
            .zip(before.into_iter().zip(after))
            .map(|(path, (before_id, after_id))| (path, Snapshot { before_id, after_id }))
            .collect();

        match mode {
            DiscardMode::Partial => {
                for (path, snapshot) in group.iter() {
                    self.partial.append(path, snapshot.clone());
                }
            }
            DiscardMode::WholeFile => self.whole_file.append(WHOLE_FILE_SCOPE_KEY, group.clone()),
        }
        info!(mode = ?mode, paths = group.len(), "recorded discard");

        self.persist().await?;
        Ok(DiscardOutcome::Recorded(group))
    }

    /// Computes the merges that would undo the scope's most recent discard.
    ///
    /// With `only_path`, only that path of the last entry is considered.
    /// History is never modified here.
    ///
    /// # Errors
    ///
    /// [`RewindError::StaleContent`] if a recorded blob is gone; the caller
    /// should [`clear_history`](Self::clear_history) for the scope.
    pub async fn prepare_undo<S, SF>(
        &self,
        scope: &Scope,
        only_path: Option<&str>,
        is_safe: S,
    ) -> Result<UndoOutcome>
    where
        S: Fn() -> SF,
        SF: Future<Output = bool>,
    {
        let Some(mut entry) = self.last_snapshots(scope) else {
            return Ok(UndoOutcome::NoHistory);
        };

        if let Some(path) = only_path {
            let snapshot = entry.get(path).cloned().ok_or_else(|| {
                RewindError::InvalidRequest(format!(
                    "{} is not part of the last discard in the {}",
                    path, scope
                ))
            })?;
            entry = SnapshotGroup::single(path, snapshot);
        }
        for path in entry.paths() {
            check_path(&path)?;
        }

        let scratch_dir = create_scratch_dir(&self.scratch_root)?;
        debug!(scope = %scope, dir = %scratch_dir.display(), "preparing undo");

        match self.merge_entry(&entry, &scratch_dir, is_safe).await {
            Ok(Some(files)) => Ok(UndoOutcome::Prepared(PreparedUndo {
                scope: scope.clone(),
                only_path: only_path.map(str::to_string),
                entry,
                files,
                scratch_dir,
            })),
            Ok(None) => {
                debug!(scope = %scope, "undo vetoed by safety check");
                cleanup_scratch(&scratch_dir).await;
                Ok(UndoOutcome::Vetoed)
            }
            Err(e) => {
                cleanup_scratch(&scratch_dir).await;
                Err(e)
            }
        }
    }

    /// Drops the entry a prepared undo was computed from.
    ///
    /// # Errors
    ///
    /// [`RewindError::HistoryChanged`] if the scope's last entry is no longer
    /// the one that was prepared.
    pub async fn commit_undo(&mut self, prepared: PreparedUndo) -> Result<()> {
        let changed = || RewindError::HistoryChanged(prepared.scope.to_string());

        match &prepared.scope {
            Scope::Partial(path) => {
                let last = self
                    .partial
                    .peek_last(path)
                    .ok_or_else(|| RewindError::NoHistory(prepared.scope.to_string()))?;
                if prepared.entry.get(path) != Some(last) {
                    return Err(changed());
                }
                self.partial.pop(path)?;
            }
            Scope::WholeFile => {
                let emptied = {
                    let last = self
                        .whole_file
                        .peek_last_mut(WHOLE_FILE_SCOPE_KEY)
                        .ok_or_else(|| RewindError::NoHistory(prepared.scope.to_string()))?;

                    match &prepared.only_path {
                        None if *last == prepared.entry => true,
                        Some(path)
                            if last.get(path).is_some()
                                && last.get(path) == prepared.entry.get(path) =>
                        {
                            last.remove(path);
                            last.is_empty()
                        }
                        _ => return Err(changed()),
                    }
                };
                if emptied {
                    self.whole_file.pop(WHOLE_FILE_SCOPE_KEY)?;
                }
            }
        }
        info!(scope = %prepared.scope, files = prepared.files.len(), "committed undo");

        self.persist().await?;
        cleanup_scratch(&prepared.scratch_dir).await;
        Ok(())
    }

    /// Empties a scope and persists.
    pub async fn clear_history(&mut self, scope: &Scope) -> Result<()> {
        match scope {
            Scope::WholeFile => self.whole_file.clear(WHOLE_FILE_SCOPE_KEY),
            Scope::Partial(path) => self.partial.clear(path),
        }
        info!(scope = %scope, "cleared discard history");
        self.persist().await?;
        Ok(())
    }

    /// Returns true if the scope has something to undo.
    pub fn has_history(&self, scope: &Scope) -> bool {
        match scope {
            Scope::WholeFile => self.whole_file.has_history(WHOLE_FILE_SCOPE_KEY),
            Scope::Partial(path) => self.partial.has_history(path),
        }
    }

    /// Entries of the scope, oldest first. Partial entries come back as
    /// single-path groups.
    pub fn history(&self, scope: &Scope) -> Vec<SnapshotGroup> {
        match scope {
            Scope::WholeFile => self.whole_file.entries(WHOLE_FILE_SCOPE_KEY).to_vec(),
            Scope::Partial(path) => self
                .partial
                .entries(path)
                .iter()
                .map(|s| SnapshotGroup::single(path.clone(), s.clone()))
                .collect(),
        }
    }

    /// The scope's most recent entry.
    pub fn last_snapshots(&self, scope: &Scope) -> Option<SnapshotGroup> {
        match scope {
            Scope::WholeFile => self.whole_file.peek_last(WHOLE_FILE_SCOPE_KEY).cloned(),
            Scope::Partial(path) => self
                .partial
                .peek_last(path)
                .map(|s| SnapshotGroup::single(path.clone(), s.clone())),
        }
    }

    /// Every non-empty scope: whole-file first, then partial scopes by path.
    pub fn scopes(&self) -> Vec<Scope> {
        let whole = self
            .has_history(&Scope::WholeFile)
            .then_some(Scope::WholeFile);
        whole
            .into_iter()
            .chain(self.partial.keys().map(Scope::partial))
            .collect()
    }

    /// Snapshot of both histories in persisted form.
    pub fn state(&self) -> HistoryState {
        HistoryState {
            whole_file_history: self.whole_file.entries(WHOLE_FILE_SCOPE_KEY).to_vec(),
            partial_history_by_path: self.partial.export_all(),
        }
    }

    /// Finds scopes whose most recent entry can no longer be undone because
    /// its content was collected.
    pub async fn stale_scopes(&self) -> Result<Vec<StaleScope>> {
        let mut stale = Vec::new();

        for scope in self.scopes() {
            let Some(entry) = self.last_snapshots(&scope) else {
                continue;
            };
            let ids: BTreeSet<&ContentId> = entry.content_ids().collect();
            let gateway = self.gateway.as_ref();
            let present = try_join_all(ids.iter().map(|id| gateway.has_blob(id))).await?;

            let missing: Vec<ContentId> = ids
                .into_iter()
                .zip(present)
                .filter(|(_, present)| !present)
                .map(|(id, _)| id.clone())
                .collect();
            if !missing.is_empty() {
                warn!(scope = %scope, missing = missing.len(), "discard history references missing content");
                stale.push(StaleScope { scope, missing });
            }
        }

        Ok(stale)
    }

    /// Writes both histories through the gateway.
    pub async fn persist(&self) -> Result<ContentId> {
        let state = self.state();
        self.serializer
            .persist(self.gateway.as_ref(), &state)
            .await
            .inspect_err(|e| {
                warn!(error = %e, "failed to persist discard history; in-memory history is ahead")
            })
    }

    fn import(&mut self, state: HistoryState) {
        let mut whole = BTreeMap::new();
        whole.insert(WHOLE_FILE_SCOPE_KEY.to_string(), state.whole_file_history);
        self.whole_file.import_all(whole);
        self.partial.import_all(state.partial_history_by_path);
    }

    async fn capture(&self, paths: &[String]) -> Result<Vec<Option<ContentId>>> {
        let gateway = self.gateway.as_ref();
        try_join_all(paths.iter().map(|path| gateway.create_blob_from_path(path))).await
    }

    /// Materializes, checks safety, then merges. `None` means vetoed.
    async fn merge_entry<S, SF>(
        &self,
        entry: &SnapshotGroup,
        scratch_dir: &Path,
        is_safe: S,
    ) -> Result<Option<Vec<UndoFile>>>
    where
        S: Fn() -> SF,
        SF: Future<Output = bool>,
    {
        let gateway = self.gateway.as_ref();

        let staged = try_join_all(entry.iter().map(|(path, snapshot)| async move {
            let other = match &snapshot.before_id {
                Some(id) => {
                    let dest = scratch_dir.join(format!("{}-before-discard", path));
                    Some(gateway.materialize(&dest, id).await?)
                }
                None => None,
            };
            let base = match &snapshot.after_id {
                Some(id) => {
                    let dest = scratch_dir.join(format!("{}-after-discard", path));
                    Some(gateway.materialize(&dest, id).await?)
                }
                None => None,
            };
            Ok::<_, RewindError>((path, snapshot, base, other))
        }))
        .await?;

        if !is_safe().await {
            return Ok(None);
        }

        let files = try_join_all(staged.iter().map(|(path, snapshot, base, other)| async move {
            let result = scratch_dir.join(format!("{}-merge-result", path));
            let outcome = gateway
                .merge_three_way(MergeRequest {
                    current: path.as_str(),
                    base: base.as_deref(),
                    other: other.as_deref(),
                    result: &result,
                })
                .await?;

            Ok::<_, RewindError>(UndoFile {
                path: path.to_string(),
                result_path: outcome.result_path,
                conflict: outcome.conflict,
                deleted: outcome.deleted,
                before_id: snapshot.before_id.clone(),
                after_id: snapshot.after_id.clone(),
            })
        }))
        .await?;

        Ok(Some(files))
    }
}

fn normalize_paths(paths: &[String], mode: DiscardMode) -> Result<Vec<String>> {
    let unique: BTreeSet<&String> = paths.iter().collect();
    if unique.is_empty() {
        return Err(RewindError::InvalidRequest("no paths to discard".to_string()));
    }
    if mode == DiscardMode::Partial && unique.len() != 1 {
        return Err(RewindError::InvalidRequest(format!(
            "a partial discard covers exactly one file, got {}",
            unique.len()
        )));
    }
    for path in &unique {
        check_path(path)?;
    }
    Ok(unique.into_iter().cloned().collect())
}

/// Only plain relative paths may be recorded or materialized.
fn check_path(path: &str) -> Result<()> {
    let relative = !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if relative {
        Ok(())
    } else {
        Err(RewindError::InvalidRequest(format!(
            "{:?} is not a relative working-copy path",
            path
        )))
    }
}

fn create_scratch_dir(root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    let dir = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(root)?;
    Ok(dir.keep())
}

async fn remove_scratch(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RewindError::Io(e)),
    }
}

/// Removes a scratch directory, logging instead of failing.
async fn cleanup_scratch(dir: &Path) {
    if let Err(e) = remove_scratch(dir).await {
        warn!(
            dir = %dir.display(),
            error = %e,
            "failed to remove undo scratch directory"
        );
    }
}
