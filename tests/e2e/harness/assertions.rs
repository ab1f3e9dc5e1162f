use anyhow::Result;
use rewind_core::{DiscardHistory, LocalGateway, Scope};

/// Declarative assertions on working copy and history state
pub enum Assertion {
    // Files
    FileContent {
        path: String,
        content: Vec<u8>,
    },
    FileContains {
        path: String,
        text: String,
    },
    FileAbsent {
        path: String,
    },

    // History
    HistoryLen {
        scope: Scope,
        len: usize,
    },
    LastEntryPaths {
        scope: Scope,
        paths: Vec<String>,
    },
    StaleScopes(usize),

    // Outcomes of the latest steps
    LastDiscardVetoed,
    LastDiscardFailed,
    LastUndoPaths(Vec<String>),
    LastUndoConflicted(bool),
    LastUndoExpired,
    NothingToUndo,
    PendingCommitRejected,

    // Resources
    NoScratchLeft,

    Custom(Box<dyn Fn(&DiscardHistory<LocalGateway>) -> Result<()> + Send + Sync>),
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileContent { path, content } => write!(
                f,
                "FileContent {{ path: {:?}, content: {:?} }}",
                path,
                String::from_utf8_lossy(content)
            ),
            Self::FileContains { path, text } => {
                write!(f, "FileContains {{ path: {:?}, text: {:?} }}", path, text)
            }
            Self::FileAbsent { path } => write!(f, "FileAbsent {{ path: {:?} }}", path),
            Self::HistoryLen { scope, len } => {
                write!(f, "HistoryLen {{ scope: {}, len: {} }}", scope, len)
            }
            Self::LastEntryPaths { scope, paths } => {
                write!(f, "LastEntryPaths {{ scope: {}, paths: {:?} }}", scope, paths)
            }
            Self::StaleScopes(n) => write!(f, "StaleScopes({})", n),
            Self::LastDiscardVetoed => write!(f, "LastDiscardVetoed"),
            Self::LastDiscardFailed => write!(f, "LastDiscardFailed"),
            Self::LastUndoPaths(paths) => write!(f, "LastUndoPaths({:?})", paths),
            Self::LastUndoConflicted(c) => write!(f, "LastUndoConflicted({})", c),
            Self::LastUndoExpired => write!(f, "LastUndoExpired"),
            Self::NothingToUndo => write!(f, "NothingToUndo"),
            Self::PendingCommitRejected => write!(f, "PendingCommitRejected"),
            Self::NoScratchLeft => write!(f, "NoScratchLeft"),
            Self::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}
