//! Forget recorded discards.

use anyhow::{Context, Result};
use console::style;
use rewind_core::RewindRepo;

/// Clear the whole-file history or one file's partial history.
pub async fn run(partial: Option<String>) -> Result<()> {
    let repo = RewindRepo::open(".")?;
    let _lock = repo.lock()?;
    let mut history = repo
        .discard_history()
        .await
        .context("Failed to load discard history")?;

    let scope = super::scope(partial);
    let entries = history.history(&scope).len();
    history.clear_history(&scope).await?;

    println!(
        "{} Cleared {} entr{} from the {}",
        style("✓").green(),
        entries,
        if entries == 1 { "y" } else { "ies" },
        scope
    );
    Ok(())
}
