//! Initialize a new rewind repository.

use anyhow::{Context, Result};
use rewind_core::RewindRepo;

/// Initialize a new rewind repository in the current directory.
pub fn run() -> Result<()> {
    let repo = RewindRepo::init(".").context("Failed to initialize rewind repository")?;
    let config = repo.config();

    println!("Initialized rewind repository in .rewind/");
    println!();
    println!("Directory structure:");
    println!("  .rewind/objects/   - Content-addressed snapshots");
    println!("  .rewind/pointers/  - History pointer");
    println!();
    println!("Configuration written to .rewind/config.toml");
    println!("  History length: {} entries per scope", config.history.max_length);
    println!("  Pointer key:    {}", config.history.pointer_key);

    Ok(())
}
