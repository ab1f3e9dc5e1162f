use super::assertions::Assertion;
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, bail, ensure, Context, Result};
use rewind_core::{
    DiscardHistory, DiscardMode, DiscardOutcome, GcConfig, LocalGateway, PreparedUndo,
    RewindError, RewindRepo, Scope, UndoFile, UndoOutcome,
};
use std::collections::{HashMap, VecDeque};

/// What the most recent undo step ended with
#[derive(Debug)]
enum LastUndo {
    Applied(Vec<UndoFile>),
    Expired,
    NothingToUndo,
}

/// Executes scenarios against a real repository on disk
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    repo: RewindRepo,
    history: DiscardHistory<LocalGateway>,
    pending: VecDeque<PreparedUndo>,
    last_undo: Option<LastUndo>,
    last_discard_vetoed: bool,
    last_discard_failed: bool,
    commit_rejected: bool,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a new runner with initial files
    pub async fn new(
        initial_files: HashMap<String, Vec<u8>>,
        max_length: Option<usize>,
    ) -> Result<Self> {
        let workspace = TestWorkspace::with_files(initial_files)?;
        let mut repo = workspace.init_repo()?;

        if let Some(max_length) = max_length {
            let mut config = repo.config().clone();
            config.history.max_length = max_length;
            config.save(&repo.rewind_dir())?;
            repo = workspace.open_repo()?;
        }
        let history = repo.discard_history().await?;

        Ok(Self {
            workspace,
            repo,
            history,
            pending: VecDeque::new(),
            last_undo: None,
            last_discard_vetoed: false,
            last_discard_failed: false,
            commit_rejected: false,
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub async fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .await
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        Ok(())
    }

    async fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::Write { path, content } => self.workspace.write_file(path, content),
            ScenarioStep::Remove { path } => self.workspace.remove_file(path),

            ScenarioStep::Discard { mode, changes } => self.handle_discard(*mode, changes).await,
            ScenarioStep::DiscardVetoed { paths } => self.handle_discard_vetoed(paths).await,
            ScenarioStep::DiscardFails { paths } => self.handle_discard_fails(paths).await,

            ScenarioStep::Undo { scope, only_path } => {
                self.handle_undo(scope, only_path.as_deref()).await
            }
            ScenarioStep::PrepareUndo { scope } => self.handle_prepare(scope).await,
            ScenarioStep::CommitPending => self.handle_commit_pending().await,

            ScenarioStep::ClearHistory { scope } => Ok(self.history.clear_history(scope).await?),
            ScenarioStep::Gc { expire_snapshots } => self.handle_gc(*expire_snapshots),
            ScenarioStep::PruneStale => self.handle_prune().await,
            ScenarioStep::Reopen => self.handle_reopen().await,

            ScenarioStep::Assert { assertion } => self.check(assertion).await,
        }
    }

    // ===== Discard handlers =====

    async fn handle_discard(
        &mut self,
        mode: DiscardMode,
        changes: &[(String, Option<Vec<u8>>)],
    ) -> Result<()> {
        let paths: Vec<String> = changes.iter().map(|(p, _)| p.clone()).collect();
        let workspace = &self.workspace;

        let outcome = self
            .history
            .record_discard(&paths, mode, || async { true }, || async move {
                for (path, content) in changes {
                    match content {
                        Some(content) => workspace.write_file(path, content)?,
                        None => workspace.remove_file(path)?,
                    }
                }
                Ok::<(), anyhow::Error>(())
            })
            .await?;

        ensure!(
            matches!(outcome, DiscardOutcome::Recorded(_)),
            "discard was not recorded: {:?}",
            outcome
        );
        self.last_discard_vetoed = false;
        self.last_discard_failed = false;
        Ok(())
    }

    async fn handle_discard_vetoed(&mut self, paths: &[String]) -> Result<()> {
        let outcome = self
            .history
            .record_discard(paths, DiscardMode::WholeFile, || async { false }, || async {
                Err::<(), _>(anyhow!("destructive action must not run"))
            })
            .await?;

        self.last_discard_vetoed = outcome == DiscardOutcome::Vetoed;
        Ok(())
    }

    async fn handle_discard_fails(&mut self, paths: &[String]) -> Result<()> {
        let result = self
            .history
            .record_discard(paths, DiscardMode::WholeFile, || async { true }, || async {
                Err::<(), _>(anyhow!("checkout failed"))
            })
            .await;

        self.last_discard_failed = matches!(result, Err(RewindError::ActionFailed(_)));
        Ok(())
    }

    // ===== Undo handlers =====

    /// Mirrors the CLI: stale history is cleared and reported as expired.
    async fn prepare(
        &mut self,
        scope: &Scope,
        only_path: Option<&str>,
    ) -> Result<Option<PreparedUndo>> {
        let outcome = self
            .history
            .prepare_undo(scope, only_path, || async { true })
            .await;

        match outcome {
            Ok(UndoOutcome::Prepared(prepared)) => Ok(Some(prepared)),
            Ok(UndoOutcome::NoHistory) => {
                self.last_undo = Some(LastUndo::NothingToUndo);
                Ok(None)
            }
            Ok(UndoOutcome::Vetoed) => bail!("undo vetoed"),
            Err(e) if e.is_stale() => {
                self.history.clear_history(scope).await?;
                self.last_undo = Some(LastUndo::Expired);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn handle_undo(&mut self, scope: &Scope, only_path: Option<&str>) -> Result<()> {
        let Some(prepared) = self.prepare(scope, only_path).await? else {
            return Ok(());
        };

        prepared.apply(self.workspace.path()).await?;
        let files = prepared.files().to_vec();
        self.history.commit_undo(prepared).await?;

        self.last_undo = Some(LastUndo::Applied(files));
        Ok(())
    }

    async fn handle_prepare(&mut self, scope: &Scope) -> Result<()> {
        let prepared = self
            .prepare(scope, None)
            .await?
            .ok_or_else(|| anyhow!("nothing was prepared"))?;
        self.pending.push_back(prepared);
        Ok(())
    }

    async fn handle_commit_pending(&mut self) -> Result<()> {
        let prepared = self
            .pending
            .pop_front()
            .ok_or_else(|| anyhow!("no pending undo"))?;
        let files = prepared.files().to_vec();

        match self.history.commit_undo(prepared).await {
            Ok(()) => {
                self.commit_rejected = false;
                self.last_undo = Some(LastUndo::Applied(files));
                Ok(())
            }
            Err(RewindError::HistoryChanged(_)) => {
                self.commit_rejected = true;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ===== Maintenance handlers =====

    fn handle_gc(&mut self, expire_snapshots: bool) -> Result<()> {
        let report = self.repo.gc(GcConfig {
            aggressive: true,
            expire_snapshots,
            ..GcConfig::default()
        })?;
        ensure!(report.errors.is_empty(), "gc errors: {:?}", report.errors);
        Ok(())
    }

    async fn handle_prune(&mut self) -> Result<()> {
        for stale in self.history.stale_scopes().await? {
            self.history.clear_history(&stale.scope).await?;
        }
        Ok(())
    }

    async fn handle_reopen(&mut self) -> Result<()> {
        self.pending.clear();
        self.repo = self.workspace.open_repo()?;
        self.history = self.repo.discard_history().await?;
        Ok(())
    }

    // ===== Assertions =====

    async fn check(&self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::FileContent { path, content } => {
                let actual = self.workspace.read_file(path)?;
                ensure!(
                    &actual == content,
                    "{} is {:?}, expected {:?}",
                    path,
                    String::from_utf8_lossy(&actual),
                    String::from_utf8_lossy(content)
                );
            }
            Assertion::FileContains { path, text } => {
                let actual = String::from_utf8(self.workspace.read_file(path)?)?;
                ensure!(actual.contains(text.as_str()), "{} is {:?}", path, actual);
            }
            Assertion::FileAbsent { path } => {
                ensure!(!self.workspace.file_exists(path), "{} exists", path);
            }
            Assertion::HistoryLen { scope, len } => {
                let actual = self.history.history(scope).len();
                ensure!(actual == *len, "{} has {} entries", scope, actual);
            }
            Assertion::LastEntryPaths { scope, paths } => {
                let actual = self
                    .history
                    .last_snapshots(scope)
                    .map(|g| g.paths())
                    .unwrap_or_default();
                ensure!(&actual == paths, "last entry of {} covers {:?}", scope, actual);
            }
            Assertion::StaleScopes(n) => {
                let stale = self.history.stale_scopes().await?;
                ensure!(stale.len() == *n, "stale scopes: {:?}", stale);
            }
            Assertion::LastDiscardVetoed => {
                ensure!(self.last_discard_vetoed, "discard was not vetoed")
            }
            Assertion::LastDiscardFailed => {
                ensure!(self.last_discard_failed, "discard action did not fail")
            }
            Assertion::LastUndoPaths(paths) => {
                let files = self.applied_undo()?;
                let actual: Vec<&String> = files.iter().map(|f| &f.path).collect();
                ensure!(
                    actual.iter().copied().eq(paths.iter()),
                    "undo touched {:?}",
                    actual
                );
            }
            Assertion::LastUndoConflicted(conflicted) => {
                let actual = self.applied_undo()?.iter().any(|f| f.conflict);
                ensure!(actual == *conflicted, "undo conflicted: {}", actual);
            }
            Assertion::LastUndoExpired => ensure!(
                matches!(self.last_undo, Some(LastUndo::Expired)),
                "last undo: {:?}",
                self.last_undo
            ),
            Assertion::NothingToUndo => ensure!(
                matches!(self.last_undo, Some(LastUndo::NothingToUndo)),
                "last undo: {:?}",
                self.last_undo
            ),
            Assertion::PendingCommitRejected => {
                ensure!(self.commit_rejected, "pending commit was accepted")
            }
            Assertion::NoScratchLeft => {
                let left = self.workspace.scratch_dirs()?;
                ensure!(left == 0, "{} scratch folder(s) left behind", left);
            }
            Assertion::Custom(f) => f(&self.history)?,
        }
        Ok(())
    }

    fn applied_undo(&self) -> Result<&[UndoFile]> {
        match &self.last_undo {
            Some(LastUndo::Applied(files)) => Ok(files),
            other => bail!("no undo was applied (last: {:?})", other),
        }
    }
}
