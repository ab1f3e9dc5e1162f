//! Garbage collection for unreferenced objects.
//!
//! Mark-and-sweep over the object store. Roots are the pointer values and,
//! unless snapshots are allowed to expire, every content id referenced by the
//! history payloads those pointers name.

use crate::error::Result;
use crate::object_id::ObjectId;
use crate::object_store::ObjectStore;
use crate::pointers::PointerStore;
use crate::serializer::HistorySerializer;
use std::collections::HashSet;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Progress callback for GC operations.
/// Called with (current, total, phase) where phase is "roots", "mark", "sweep" or "done".
pub type GcProgressCallback<'a> = dyn Fn(usize, usize, &str) + 'a;

/// Configuration for garbage collection.
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Don't actually delete objects, just report what would be deleted.
    pub dry_run: bool,

    /// Grace period in days - keep objects newer than this even if unreachable.
    pub grace_period_days: u32,

    /// Skip grace period and delete unreachable objects immediately.
    pub aggressive: bool,

    /// Only keep the history payloads themselves; the snapshot blobs they
    /// reference become collectable and the affected history goes stale.
    pub expire_snapshots: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            grace_period_days: 7,
            aggressive: false,
            expire_snapshots: false,
        }
    }
}

/// Report from garbage collection operation.
#[derive(Debug, Default)]
pub struct GcReport {
    /// Total number of objects scanned.
    pub objects_scanned: usize,

    /// Number of objects that are reachable (kept).
    pub objects_reachable: usize,

    /// Number of objects deleted (or that would be, in a dry run).
    pub objects_deleted: usize,

    /// Bytes freed from deletion.
    pub bytes_freed: u64,

    /// Errors encountered during GC (non-fatal).
    pub errors: Vec<String>,
}

/// Run garbage collection over `object_store`.
///
/// 1. **Roots**: every pointer value that parses as an object id
/// 2. **Mark**: roots plus the snapshot ids inside each history payload
/// 3. **Sweep**: delete unmarked objects older than the grace period
///
/// # Examples
///
/// ```no_run
/// use rewind_core::{GcConfig, RewindRepo};
///
/// let mut repo = RewindRepo::open(".").unwrap();
/// let report = repo.gc(GcConfig::default()).unwrap();
///
/// println!("Freed {} bytes", report.bytes_freed);
/// ```
pub fn gc(
    pointers: &PointerStore,
    object_store: &mut ObjectStore,
    config: GcConfig,
    progress: Option<&GcProgressCallback<'_>>,
) -> Result<GcReport> {
    let mut report = GcReport::default();

    if let Some(cb) = progress {
        cb(0, 3, "roots");
    }
    let roots = collect_roots(pointers)?;

    if let Some(cb) = progress {
        cb(1, 3, "mark");
    }
    let reachable = mark_reachable(object_store, &roots, &config, &mut report);

    if let Some(cb) = progress {
        cb(2, 3, "sweep");
    }
    let (deleted, bytes_freed) =
        sweep_unreachable(object_store, &reachable, &config, &mut report, progress)?;

    report.objects_deleted = deleted;
    report.bytes_freed = bytes_freed;

    if let Some(cb) = progress {
        cb(3, 3, "done");
    }

    debug!(
        scanned = report.objects_scanned,
        reachable = report.objects_reachable,
        deleted = report.objects_deleted,
        dry_run = config.dry_run,
        "gc finished"
    );
    Ok(report)
}

/// Pointer values that name objects. Other values are ignored.
fn collect_roots(pointers: &PointerStore) -> Result<Vec<ObjectId>> {
    let mut roots = Vec::new();

    for (key, value) in pointers.list()? {
        match ObjectId::from_hex(&value) {
            Ok(id) => roots.push(id),
            Err(_) => debug!(key = %key, "pointer does not name an object, skipping"),
        }
    }

    Ok(roots)
}

/// Marks the roots and everything their history payloads reference.
fn mark_reachable(
    store: &ObjectStore,
    roots: &[ObjectId],
    config: &GcConfig,
    report: &mut GcReport,
) -> HashSet<ObjectId> {
    let mut reachable = HashSet::new();

    for &root in roots {
        if !reachable.insert(root) || config.expire_snapshots {
            continue;
        }

        let state = match store
            .get_blob(root)
            .and_then(|payload| HistorySerializer::decode(&payload))
        {
            Ok(state) => state,
            Err(e) => {
                warn!(id = %root, error = %e, "pointer target is not a readable history payload");
                report
                    .errors
                    .push(format!("Failed to read history {}: {}", root.as_hex(), e));
                continue;
            }
        };

        for id in state.content_ids() {
            if let Ok(id) = ObjectId::from_hex(id.as_str()) {
                reachable.insert(id);
            }
        }
    }

    report.objects_reachable = reachable.len();
    reachable
}

/// Sweep unreachable objects that are older than grace period.
fn sweep_unreachable(
    store: &mut ObjectStore,
    reachable: &HashSet<ObjectId>,
    config: &GcConfig,
    report: &mut GcReport,
    progress: Option<&GcProgressCallback<'_>>,
) -> Result<(usize, u64)> {
    let mut deleted = 0;
    let mut bytes_freed = 0u64;

    let grace_period = if config.aggressive {
        Duration::from_secs(0)
    } else {
        Duration::from_secs(config.grace_period_days as u64 * 24 * 60 * 60)
    };
    let cutoff_time = SystemTime::now()
        .checked_sub(grace_period)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let all_objects = store.list_all_objects()?;
    report.objects_scanned = all_objects.len();
    let total = all_objects.len();

    for (idx, (id, size, mtime)) in all_objects.into_iter().enumerate() {
        if let Some(cb) = progress {
            if idx % 100 == 0 || idx == total - 1 {
                cb(idx + 1, total, "sweep");
            }
        }
        if reachable.contains(&id) {
            continue;
        }
        if mtime > cutoff_time {
            continue;
        }

        if config.dry_run {
            deleted += 1;
            bytes_freed += size;
            continue;
        }

        match store.delete(id) {
            Ok(()) => {
                deleted += 1;
                bytes_freed += size;
            }
            Err(e) => {
                report
                    .errors
                    .push(format!("Failed to delete {}: {}", id.as_hex(), e));
            }
        }
    }

    Ok((deleted, bytes_freed))
}
