//! Rewind CLI - undoable discards for a working copy.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use rewind_core::RewindError;

mod commands;

#[derive(Parser)]
#[command(name = "rewind")]
#[command(about = "Discard changes without losing them", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a rewind repository in the current directory
    Init,
    /// Run a command that throws away changes, recording them first
    Discard {
        /// Record a line-level discard of a single file
        #[arg(long)]
        partial: bool,
        /// Files the command touches
        #[arg(required = true)]
        paths: Vec<String>,
        /// The destructive command, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Undo the most recent discard
    Undo {
        /// Undo the last partial discard of this file
        #[arg(long, value_name = "PATH", conflicts_with = "path")]
        partial: Option<String>,
        /// Only undo this file of the last whole-file discard
        #[arg(long, value_name = "PATH")]
        path: Option<String>,
        /// Apply even when the merge conflicts (writes conflict markers)
        #[arg(long)]
        force: bool,
    },
    /// List recorded discards, newest first
    History {
        /// Show the partial history of this file
        #[arg(long, value_name = "PATH")]
        partial: Option<String>,
    },
    /// Forget recorded discards
    Clear {
        /// Clear the partial history of this file
        #[arg(long, value_name = "PATH")]
        partial: Option<String>,
    },
    /// Garbage collect unreferenced objects
    Gc {
        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
        /// Skip grace period, delete immediately
        #[arg(long)]
        aggressive: bool,
        /// Also collect snapshot content (recorded history becomes stale)
        #[arg(long)]
        expire_snapshots: bool,
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Check that recorded history can still be undone
    Verify {
        /// Clear history that references missing content
        #[arg(long)]
        prune: bool,
    },
}

#[tokio::main]
async fn main() {
    // Respects RUST_LOG (e.g., RUST_LOG=rewind_core=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli.command).await {
        eprintln!("{} {:#}", style("error:").red().bold(), err);
        if let Some(hint) = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<RewindError>())
            .and_then(RewindError::recovery_suggestion)
        {
            eprintln!("{} {}", style("hint:").cyan(), hint);
        }
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Init => commands::init::run(),
        Commands::Discard {
            partial,
            paths,
            command,
        } => commands::discard::run(&paths, &command, partial).await,
        Commands::Undo {
            partial,
            path,
            force,
        } => commands::undo::run(partial, path.as_deref(), force).await,
        Commands::History { partial } => commands::history::run(partial).await,
        Commands::Clear { partial } => commands::clear::run(partial).await,
        Commands::Gc {
            dry_run,
            aggressive,
            expire_snapshots,
            yes,
        } => commands::gc::run(dry_run, aggressive, expire_snapshots, yes),
        Commands::Verify { prune } => commands::verify::run(prune).await,
    }
}
