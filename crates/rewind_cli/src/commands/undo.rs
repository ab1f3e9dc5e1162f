//! Undo the most recent discard.

use anyhow::{Context, Result};
use console::style;
use rewind_core::{PreparedUndo, RewindRepo, UndoOutcome};

/// Merge the last discard of a scope back into the working copy.
pub async fn run(partial: Option<String>, only_path: Option<&str>, force: bool) -> Result<()> {
    let repo = RewindRepo::open(".")?;
    let _lock = repo.lock()?;
    let mut history = repo
        .discard_history()
        .await
        .context("Failed to load discard history")?;

    let scope = super::scope(partial);
    let root = repo.root();
    let paths = match (history.last_snapshots(&scope), only_path) {
        (_, Some(path)) => vec![path.to_string()],
        (Some(group), None) => group.paths(),
        (None, None) => Vec::new(),
    };
    let paths = paths.as_slice();

    let outcome = history
        .prepare_undo(&scope, only_path, move || async move {
            super::editor_locks(root, paths).is_empty()
        })
        .await;

    let prepared = match outcome {
        Ok(UndoOutcome::Prepared(prepared)) => prepared,
        Ok(UndoOutcome::NoHistory) => {
            println!("Nothing to undo in the {}.", scope);
            return Ok(());
        }
        Ok(UndoOutcome::Vetoed) => {
            println!(
                "{} Refusing to undo: files are open in an editor",
                style("✗").red()
            );
            for lock in super::editor_locks(root, paths) {
                println!("  {}", lock.display());
            }
            anyhow::bail!("undo vetoed");
        }
        Err(e) if e.is_stale() => {
            history.clear_history(&scope).await?;
            println!("{} Discard history has expired.", style("!").yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if prepared.has_conflicts() && !force {
        report_conflicts(&prepared);
        anyhow::bail!("undo would conflict; re-run with --force to apply with conflict markers");
    }

    prepared
        .apply(root)
        .await
        .context("Failed to write merge results")?;

    for file in prepared.files() {
        let (mark, note) = if file.deleted {
            (style("-").red(), "removed")
        } else if file.conflict {
            (style("!").yellow(), "restored with conflicts")
        } else {
            (style("✓").green(), "restored")
        };
        println!("  {} {} {}", mark, file.path, style(note).dim());
    }

    let conflicts = prepared.has_conflicts();
    history.commit_undo(prepared).await?;

    if conflicts {
        println!();
        println!("Resolve the conflict markers in the files above.");
    }
    Ok(())
}

fn report_conflicts(prepared: &PreparedUndo) {
    println!("{} Undo conflicts with later changes:", style("!").yellow());
    for file in prepared.files().iter().filter(|f| f.conflict) {
        match &file.result_path {
            Some(result) => println!("  {}  (merge result: {})", file.path, result.display()),
            None => println!("  {}", file.path),
        }
    }
}
