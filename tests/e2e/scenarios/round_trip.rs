use crate::harness::{Assertion, Scenario};
use rewind_core::Scope;

const EDITED: &[u8] = b"1\nTWO\n3\n4\n5\n6\n7\n8\n9\n";
const CLEAN_TEXT: &str = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
const CLEAN: &[u8] = CLEAN_TEXT.as_bytes();

#[test]
fn test_whole_file_round_trip() {
    Scenario::new("whole_file_round_trip")
        .with_file("a.txt", EDITED)
        .discards(&[("a.txt", Some(CLEAN_TEXT))])
        .assert_file("a.txt", CLEAN)
        .assert_history_len(Scope::WholeFile, 1)
        .undoes()
        .assert_file("a.txt", EDITED)
        .assert_undid(&["a.txt"])
        .assert_conflicted(false)
        .assert_history_len(Scope::WholeFile, 0)
        .assert(Assertion::NoScratchLeft)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_partial_round_trip() {
    Scenario::new("partial_round_trip")
        .with_file("a.txt", EDITED)
        .discards_lines("a.txt", CLEAN)
        .assert_history_len(Scope::partial("a.txt"), 1)
        .assert_history_len(Scope::WholeFile, 0)
        .undoes_lines("a.txt")
        .assert_file("a.txt", EDITED)
        .assert_history_len(Scope::partial("a.txt"), 0)
        .assert(Assertion::NoScratchLeft)
        .run()
        .unwrap();
}

#[test]
fn test_partial_scopes_are_independent() {
    Scenario::new("partial_scopes_are_independent")
        .with_file("a.txt", EDITED)
        .with_file("b.txt", EDITED)
        .discards_lines("a.txt", CLEAN)
        .discards_lines("b.txt", CLEAN)
        .undoes_lines("a.txt")
        .assert_file("a.txt", EDITED)
        .assert_file("b.txt", CLEAN)
        .assert_history_len(Scope::partial("b.txt"), 1)
        .run()
        .unwrap();
}

#[test]
fn test_untracked_file_is_restored() {
    Scenario::new("untracked_file_is_restored")
        .with_file("new.txt", b"scratch notes\n")
        .discards(&[("new.txt", None)])
        .assert_file_absent("new.txt")
        .undoes()
        .assert_file("new.txt", b"scratch notes\n")
        .run()
        .unwrap();
}

#[test]
fn test_restored_deletion_is_deleted_again() {
    Scenario::new("restored_deletion_is_deleted_again")
        .discards(&[("gone.txt", Some("restored\n"))])
        .assert_file("gone.txt", b"restored\n")
        .undoes()
        .assert_file_absent("gone.txt")
        .assert_undid(&["gone.txt"])
        .run()
        .unwrap();
}

#[test]
fn test_vetoed_discard_records_nothing() {
    Scenario::new("vetoed_discard_records_nothing")
        .with_file("a.txt", EDITED)
        .discard_vetoed(&["a.txt"])
        .assert(Assertion::LastDiscardVetoed)
        .assert_file("a.txt", EDITED)
        .assert_history_len(Scope::WholeFile, 0)
        .run()
        .unwrap();
}

#[test]
fn test_failed_discard_records_nothing() {
    Scenario::new("failed_discard_records_nothing")
        .with_file("a.txt", EDITED)
        .discard_fails(&["a.txt"])
        .assert(Assertion::LastDiscardFailed)
        .assert_history_len(Scope::WholeFile, 0)
        .undoes()
        .assert(Assertion::NothingToUndo)
        .run()
        .unwrap();
}

#[test]
fn test_undo_walks_back_in_order() {
    Scenario::new("undo_walks_back_in_order")
        .with_file("a.txt", b"first\n")
        .discards(&[("a.txt", Some("second\n"))])
        .discards(&[("a.txt", Some("third\n"))])
        .undoes()
        .assert_file("a.txt", b"second\n")
        .undoes()
        .assert_file("a.txt", b"first\n")
        .undoes()
        .assert(Assertion::NothingToUndo)
        .run()
        .unwrap();
}
