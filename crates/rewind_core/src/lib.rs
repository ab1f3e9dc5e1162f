//! Rewind core library
//!
//! An undoable discard history for working copies:
//! - Content-addressed object storage for file snapshots
//! - Per-scope snapshot stacks with a soft length cap
//! - Three-way merge based undo that keeps later edits
//! - Durable history behind a single pointer value
//!
//! # Quick Start
//!
//! ```
//! use rewind_core::{DiscardMode, DiscardOutcome, RewindRepo, Scope, UndoOutcome};
//! use tempfile::TempDir;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let tmp = TempDir::new().unwrap();
//! let file = tmp.path().join("a.txt");
//! std::fs::write(&file, "foo\nbar\n").unwrap();
//!
//! let repo = RewindRepo::init(tmp.path()).unwrap();
//! let mut history = repo.discard_history().await.unwrap();
//!
//! // Throw away the edit, recording what was there before.
//! let outcome = history
//!     .record_discard(
//!         &["a.txt".to_string()],
//!         DiscardMode::WholeFile,
//!         || async { true },
//!         || async { tokio::fs::write(&file, "foo\n").await },
//!     )
//!     .await
//!     .unwrap();
//! assert!(matches!(outcome, DiscardOutcome::Recorded(_)));
//!
//! // Bring it back.
//! let UndoOutcome::Prepared(prepared) = history
//!     .prepare_undo(&Scope::WholeFile, None, || async { true })
//!     .await
//!     .unwrap()
//! else {
//!     unreachable!()
//! };
//! prepared.apply(repo.root()).await.unwrap();
//! history.commit_undo(prepared).await.unwrap();
//!
//! assert_eq!(std::fs::read_to_string(&file).unwrap(), "foo\nbar\n");
//! # });
//! ```
//!
//! # Content-Addressed Storage
//!
//! Snapshots are stored using BLAKE3 content hashing with zstd compression:
//!
//! ```
//! use rewind_core::ObjectStore;
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let store = ObjectStore::new(tmp.path().join("objects"));
//!
//! // Same content = same ID (deduplication)
//! let id1 = store.put_blob(b"content").unwrap();
//! let id2 = store.put_blob(b"content").unwrap();
//! assert_eq!(id1, id2);
//! assert_eq!(store.get_blob(id1).unwrap(), b"content");
//! ```
//!
//! # Custom Backends
//!
//! [`DiscardHistory`] only talks to its host through [`ContentGateway`]. The
//! bundled [`LocalGateway`] keeps everything under `.rewind/`; a
//! version-control integration implements the trait over its own object
//! database and configuration.

mod config;
mod discard;
mod error;
mod gateway;
mod gc;
mod history;
mod local;
mod merge;
mod object_id;
mod object_store;
mod pointers;
mod repo;
mod serializer;
mod snapshot;

pub use config::{
    Config, GcSettings, HistoryConfig, StorageConfig, UndoConfig, DEFAULT_MAX_HISTORY_LENGTH,
    DEFAULT_POINTER_KEY,
};
pub use discard::{
    DiscardHistory, DiscardMode, DiscardOutcome, PreparedUndo, StaleScope, UndoFile, UndoOutcome,
};
pub use error::{Result, RewindError};
pub use gateway::{ContentGateway, MergeOutcome, MergeRequest};
pub use gc::{gc, GcConfig, GcProgressCallback, GcReport};
pub use history::SnapshotHistory;
pub use local::LocalGateway;
pub use merge::{merge_contents, MergedContent};
pub use object_id::ObjectId;
pub use object_store::ObjectStore;
pub use pointers::PointerStore;
pub use repo::{LockGuard, RewindRepo, REWIND_DIR};
pub use serializer::HistorySerializer;
pub use snapshot::{ContentId, HistoryState, Scope, Snapshot, SnapshotGroup, WHOLE_FILE_SCOPE_KEY};
