use rewind_core::{DiscardMode, Scope};

use super::assertions::Assertion;

/// All possible actions in a test scenario
#[derive(Debug)]
pub enum ScenarioStep {
    // User edits
    Write {
        path: String,
        content: Vec<u8>,
    },
    Remove {
        path: String,
    },

    // Discards
    /// Record a discard whose action applies `changes` (`None` removes the file)
    Discard {
        mode: DiscardMode,
        changes: Vec<(String, Option<Vec<u8>>)>,
    },
    /// Attempt a discard whose safety check refuses
    DiscardVetoed {
        paths: Vec<String>,
    },
    /// Attempt a discard whose action fails
    DiscardFails {
        paths: Vec<String>,
    },

    // Undo
    /// Prepare, apply and commit (conflicted results are applied with markers)
    Undo {
        scope: Scope,
        only_path: Option<String>,
    },
    /// Prepare without applying; queued for a later commit
    PrepareUndo {
        scope: Scope,
    },
    /// Commit the oldest queued undo without applying it
    CommitPending,

    // Maintenance
    ClearHistory {
        scope: Scope,
    },
    Gc {
        expire_snapshots: bool,
    },
    PruneStale,

    /// Drop every in-memory handle and reopen the repository
    Reopen,

    Assert {
        assertion: Assertion,
    },
}
