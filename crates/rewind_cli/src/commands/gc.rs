//! Garbage collection command.

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rewind_core::{GcConfig, RewindRepo};
use std::io::{self, Write};

/// Run garbage collection.
pub fn run(dry_run: bool, aggressive: bool, expire_snapshots: bool, yes: bool) -> Result<()> {
    let mut repo = RewindRepo::open(".")?;
    let _lock = repo.lock()?;

    let config = GcConfig {
        dry_run,
        aggressive,
        grace_period_days: repo.config().gc.grace_period_days,
        expire_snapshots,
    };

    if dry_run {
        println!(
            "{} Running GC in dry-run mode (no objects will be deleted)...",
            style("→").cyan()
        );
    } else {
        println!();
        println!(
            "{} {}",
            style("⚠").yellow().bold(),
            style("WARNING:").yellow().bold()
        );
        println!("  Garbage collection will permanently delete unreferenced objects.");
        if aggressive {
            println!(
                "  {} mode: No grace period - deletes all unreachable objects immediately.",
                style("Aggressive").red()
            );
        } else {
            println!("  Grace period: {} days", config.grace_period_days);
        }
        if expire_snapshots {
            println!(
                "  {} Snapshot content is collected too; recorded discards can no longer be undone.",
                style("Expiring snapshots:").red()
            );
        }
        println!();

        if !yes && !confirm("Continue with garbage collection? [y/N]: ")? {
            println!("{} Garbage collection cancelled.", style("✓").green());
            return Ok(());
        }
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:20} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("█▓▒░  "),
    );

    let pb_clone = pb.clone();
    let report = repo.gc_with_progress(config, &move |current, total, phase| {
        pb_clone.set_length(total as u64);
        pb_clone.set_position(current as u64);
        pb_clone.set_message(format!("Phase: {}", phase));
    })?;

    pb.finish_and_clear();

    println!();
    println!("{}", style("Garbage Collection Report:").bold());
    println!("  Objects scanned:   {}", style(report.objects_scanned).cyan());
    println!("  Objects reachable: {}", style(report.objects_reachable).green());
    println!(
        "  Objects deleted:   {}",
        if report.objects_deleted > 0 {
            style(report.objects_deleted).yellow()
        } else {
            style(report.objects_deleted).green()
        }
    );
    println!(
        "  Bytes freed:       {} ({:.2} MB)",
        style(report.bytes_freed).cyan(),
        report.bytes_freed as f64 / 1_048_576.0
    );

    if !report.errors.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").red().bold());
        for error in &report.errors {
            println!("  {} {}", style("×").red(), error);
        }
    }

    if dry_run && report.objects_deleted > 0 {
        println!();
        println!("This was a dry run. To actually delete objects, run:");
        println!("  {}", style("rewind gc").cyan());
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
