//! Run a destructive command with recorded snapshots.

use anyhow::{Context, Result};
use console::style;
use rewind_core::{DiscardMode, DiscardOutcome, RewindRepo};
use std::path::Path;
use tokio::process::Command;

/// Snapshot `paths`, run `command`, and record the discard.
pub async fn run(paths: &[String], command: &[String], partial: bool) -> Result<()> {
    let repo = RewindRepo::open(".")?;
    let _lock = repo.lock()?;
    let mut history = repo
        .discard_history()
        .await
        .context("Failed to load discard history")?;

    let (program, args) = command.split_first().context("No command given")?;
    let mode = if partial {
        DiscardMode::Partial
    } else {
        DiscardMode::WholeFile
    };
    let root = repo.root();

    let outcome = history
        .record_discard(
            paths,
            mode,
            move || async move { super::editor_locks(root, paths).is_empty() },
            move || run_command(root, program, args),
        )
        .await?;

    let group = match outcome {
        DiscardOutcome::Vetoed => {
            println!(
                "{} Refusing to discard: files are open in an editor",
                style("✗").red()
            );
            for lock in super::editor_locks(root, paths) {
                println!("  {}", lock.display());
            }
            anyhow::bail!("discard vetoed");
        }
        DiscardOutcome::Recorded(group) => group,
    };

    println!(
        "{} Discarded {} file(s) with `{}`",
        style("✓").green(),
        group.len(),
        command.join(" ")
    );
    for (path, snapshot) in group.iter() {
        let note = match (&snapshot.before_id, &snapshot.after_id) {
            (None, Some(_)) => " (restored)",
            (Some(_), None) => " (removed)",
            (None, None) => " (absent)",
            (Some(before), Some(after)) if before == after => " (unchanged)",
            _ => "",
        };
        println!("  {}{}", path, style(note).dim());
    }

    let undo = if partial {
        format!("rewind undo --partial {}", paths[0])
    } else {
        "rewind undo".to_string()
    };
    println!();
    println!("Run {} to bring the changes back.", style(undo).cyan());

    Ok(())
}

async fn run_command(root: &Path, program: &str, args: &[String]) -> std::io::Result<()> {
    let status = Command::new(program)
        .args(args)
        .current_dir(root)
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "`{}` exited with {}",
            program, status
        )))
    }
}
