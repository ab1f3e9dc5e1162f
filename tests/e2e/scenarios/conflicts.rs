use crate::harness::{Assertion, Scenario};
use rewind_core::Scope;

const EDITED: &[u8] = b"1\nTWO\n3\n4\n5\n6\n7\n8\n9\n";
const CLEAN_TEXT: &str = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
const CLEAN: &[u8] = CLEAN_TEXT.as_bytes();

#[test]
fn test_later_edit_is_kept() {
    Scenario::new("later_edit_is_kept")
        .with_file("a.txt", EDITED)
        .discards(&[("a.txt", Some(CLEAN_TEXT))])
        .user_writes("a.txt", b"1\n2\n3\n4\n5\n6\n7\n8\nNINE\n")
        .undoes()
        .assert_conflicted(false)
        .assert_file("a.txt", b"1\nTWO\n3\n4\n5\n6\n7\n8\nNINE\n")
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_overlapping_edit_conflicts() {
    Scenario::new("overlapping_edit_conflicts")
        .with_file("a.txt", EDITED)
        .discards_lines("a.txt", CLEAN)
        .user_writes("a.txt", b"1\nzwei\n3\n4\n5\n6\n7\n8\n9\n")
        .undoes_lines("a.txt")
        .assert_conflicted(true)
        .assert_file_contains("a.txt", "<<<<<<<")
        .assert_file_contains("a.txt", "TWO")
        .assert_file_contains("a.txt", "zwei")
        .assert_history_len(Scope::partial("a.txt"), 0)
        .run()
        .unwrap();
}

#[test]
fn test_recreated_file_conflicts() {
    Scenario::new("recreated_file_conflicts")
        .discards(&[("a.txt", Some("restored\n"))])
        .user_writes("a.txt", b"rewritten\n")
        .undoes()
        .assert_conflicted(true)
        .assert_file("a.txt", b"rewritten\n")
        .run()
        .unwrap();
}

#[test]
fn test_conflict_keeps_snapshot_ids() {
    Scenario::new("conflict_keeps_snapshot_ids")
        .with_file("a.txt", EDITED)
        .discards(&[("a.txt", Some(CLEAN_TEXT))])
        .assert(Assertion::Custom(Box::new(|history| {
            let entry = history
                .last_snapshots(&Scope::WholeFile)
                .ok_or_else(|| anyhow::anyhow!("no entry"))?;
            let snapshot = entry
                .get("a.txt")
                .ok_or_else(|| anyhow::anyhow!("a.txt missing"))?;
            anyhow::ensure!(snapshot.before_id.is_some(), "before not captured");
            anyhow::ensure!(snapshot.after_id.is_some(), "after not captured");
            anyhow::ensure!(snapshot.before_id != snapshot.after_id, "ids should differ");
            Ok(())
        })))
        .run()
        .unwrap();
}
