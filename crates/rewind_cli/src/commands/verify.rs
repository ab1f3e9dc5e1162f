//! History verification command.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rewind_core::RewindRepo;

/// Check every scope's last discard can still be undone.
pub async fn run(prune: bool) -> Result<()> {
    let repo = RewindRepo::open(".")?;
    let _lock = repo.lock()?;
    let mut history = repo
        .discard_history()
        .await
        .context("Failed to load discard history")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message("Verifying discard history...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let scopes = history.scopes();
    let stale = history.stale_scopes().await;
    spinner.finish_and_clear();
    let stale = stale?;

    if stale.is_empty() {
        println!(
            "{} All {} scope(s) can be undone",
            style("✓").green(),
            scopes.len()
        );
        return Ok(());
    }

    println!("{}", style("Stale discard history:").yellow().bold());
    for entry in &stale {
        println!(
            "  {} {} ({} missing object(s))",
            style("×").red(),
            entry.scope,
            entry.missing.len()
        );
    }

    if !prune {
        println!();
        println!("Run {} to clear it.", style("rewind verify --prune").cyan());
        anyhow::bail!("{} scope(s) reference missing content", stale.len());
    }

    for entry in &stale {
        history.clear_history(&entry.scope).await?;
    }
    println!();
    println!("{} Cleared {} stale scope(s)", style("✓").green(), stale.len());
    Ok(())
}
