//! List recorded discards.

use anyhow::{Context, Result};
use console::style;
use rewind_core::RewindRepo;

/// Print the scope's entries, newest first.
pub async fn run(partial: Option<String>) -> Result<()> {
    let repo = RewindRepo::open(".")?;
    let history = repo
        .discard_history()
        .await
        .context("Failed to load discard history")?;

    let scope = super::scope(partial);
    let entries = history.history(&scope);
    if entries.is_empty() {
        println!("No discards recorded in the {}.", scope);
        return Ok(());
    }

    println!("{}", style(format!("Discards in the {}:", scope)).bold());
    for (age, group) in entries.iter().rev().enumerate() {
        println!();
        println!("  {} {} file(s)", style(format!("#{}", age)).cyan(), group.len());
        for (path, snapshot) in group.iter() {
            println!(
                "      {}  {} -> {}",
                path,
                style(super::short_id(snapshot.before_id.as_ref())).dim(),
                style(super::short_id(snapshot.after_id.as_ref())).dim()
            );
        }
    }

    let others: Vec<_> = history.scopes().into_iter().filter(|s| *s != scope).collect();
    if !others.is_empty() {
        println!();
        println!("Also recorded:");
        for other in others {
            println!("  {}", other);
        }
    }
    Ok(())
}
