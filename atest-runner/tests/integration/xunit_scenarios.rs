// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests from JUnit XML to aggregated trees.

use crate::fixtures::{ADVANCED, SINGLE_FAILED, SINGLE_PASSED, ingest_report};
use atest_runner::{
    ingest::PathStrategy,
    reporter::{SummaryStyle, TreeDisplayer, TreeView, write_failure_summaries},
    tree::{NodeKind, ResultTree},
};
use pretty_assertions::assert_eq;

fn kind_at(tree: &ResultTree, dotted: &str) -> NodeKind {
    let id = tree
        .get_by_dotted_path(tree.root(), dotted)
        .unwrap_or_else(|| panic!("{dotted} exists"));
    tree[id].kind()
}

fn assert_in_replace_file(tree: &ResultTree, dotted: &str) {
    let id = tree
        .get_by_dotted_path(tree.root(), dotted)
        .unwrap_or_else(|| panic!("{dotted} exists"));
    let location = tree[id]
        .file_location()
        .unwrap_or_else(|| panic!("{dotted} has a location"));
    assert!(
        location.path().ends_with("test_stringutils/test_replace.py"),
        "unexpected location for {dotted}: {}",
        location.path()
    );
}

#[test]
fn single_passed_test() {
    let tree = ingest_report(SINGLE_PASSED, PathStrategy::CodePath);
    let root = &tree[tree.root()];
    assert_eq!(root.test_count(), 1);
    assert_eq!(root.failed_test_count(), 0);

    assert_eq!(kind_at(&tree, "test_stringutils"), NodeKind::Generic);
    assert_eq!(
        kind_at(&tree, "test_stringutils.TestReplace"),
        NodeKind::TestCase
    );
    assert_in_replace_file(&tree, "test_stringutils.TestReplace");

    let test_ok = tree
        .get_by_dotted_path(tree.root(), "test_stringutils.TestReplace.test_ok")
        .expect("test_ok exists");
    assert_eq!(tree[test_ok].kind(), NodeKind::Test);
    assert_in_replace_file(&tree, "test_stringutils.TestReplace.test_ok");
    let line = tree[test_ok]
        .file_location()
        .and_then(|location| location.line())
        .expect("test_ok has a line");
    assert_eq!(line.value(), 10);
    assert!(tree[test_ok].is_passed_test());
}

#[test]
fn single_failed_test() {
    let tree = ingest_report(SINGLE_FAILED, PathStrategy::CodePath);
    let root = tree.root();
    assert_eq!(tree[root].test_count(), 1);
    assert_eq!(tree[root].failed_test_count(), 1);

    let generic = tree
        .get_failed_by_dotted_path(root, "test_stringutils")
        .expect("failed path to test_stringutils");
    assert_eq!(tree[generic].kind(), NodeKind::Generic);
    let case = tree
        .get_failed_by_dotted_path(root, "test_stringutils.TestReplace")
        .expect("failed path to TestReplace");
    assert_eq!(tree[case].kind(), NodeKind::TestCase);

    let failed = tree
        .get_failed_by_dotted_path(root, "test_stringutils.TestReplace.test_will_fail")
        .expect("failed path to test_will_fail");
    assert_eq!(tree[failed].kind(), NodeKind::Test);
    assert_in_replace_file(&tree, "test_stringutils.TestReplace.test_will_fail");
    assert_eq!(
        tree[failed]
            .file_location()
            .and_then(|location| location.line())
            .map(|line| line.value()),
        Some(10)
    );
    assert_eq!(
        tree[failed].failure_message(),
        Some("The failure message\n\nFailure details")
    );
    assert_eq!(tree.collect_failed_tests(root), vec![failed]);
}

#[test]
fn advanced_report() {
    let tree = ingest_report(ADVANCED, PathStrategy::CodePath);
    let root = tree.root();
    assert_eq!(tree[root].test_count(), 4);
    assert_eq!(tree[root].failed_test_count(), 1);

    for case in [
        "test_other.TestOther",
        "test_stringutils.test_stuff.TestStuff",
        "test_stringutils.test_replace.TestReplace",
    ] {
        assert_eq!(kind_at(&tree, case), NodeKind::TestCase, "kind of {case}");
    }
    for test in [
        "test_other.TestOther.test_other",
        "test_stringutils.test_stuff.TestStuff.test_do_stuff",
        "test_stringutils.test_replace.TestReplace.test_strip_whitespace",
        "test_stringutils.test_replace.TestReplace.test_will_fail",
    ] {
        assert_eq!(kind_at(&tree, test), NodeKind::Test, "kind of {test}");
    }

    assert_eq!(
        tree.get_failed_by_dotted_path(
            root,
            "test_stringutils.test_replace.TestReplace.test_strip_whitespace"
        ),
        None
    );
    assert!(
        tree.get_failed_by_dotted_path(
            root,
            "test_stringutils.test_replace.TestReplace.test_will_fail"
        )
        .is_some()
    );

    let displayer = TreeDisplayer::new(&tree, TreeView::All);
    insta::assert_snapshot!(displayer.render(root), @r"
    pytest_demo:pytest  1 / 4 failed
      test_other.TestOther.test_other  passed
      test_stringutils  1 / 3 failed
        test_stuff.TestStuff.test_do_stuff  passed
        test_replace.TestReplace  1 / 2 failed
          test_strip_whitespace  passed
          test_will_fail  FAILED
    ");

    let mut summary = String::new();
    write_failure_summaries(&mut summary, &tree, root, SummaryStyle::Compact);
    assert_eq!(
        summary,
        "File: /work/pytest_demo/test_stringutils/test_replace.py\n\
         Code path: test_stringutils.test_replace.TestReplace.test_will_fail\n\
         \n\
         The failure message\n\
         \n\
         Failure details\n"
    );
}

#[test]
fn file_path_strategy() {
    let tree = ingest_report(SINGLE_PASSED, PathStrategy::FilePath);
    let root = &tree[tree.root()];
    assert_eq!(root.test_count(), 1);
    assert_eq!(root.failed_test_count(), 0);

    let folder = tree
        .get_by_dotted_path(tree.root(), "test_stringutils")
        .expect("folder exists");
    assert_eq!(tree[folder].kind(), NodeKind::Folder);
    assert_eq!(
        tree[folder].folder_path().map(|path| path.as_str()),
        Some("/work/pytest_demo/test_stringutils")
    );
    assert_eq!(
        kind_at(&tree, "test_stringutils.test_replace"),
        NodeKind::File
    );
    assert_eq!(
        kind_at(&tree, "test_stringutils.test_replace.TestReplace"),
        NodeKind::TestCase
    );
    assert_in_replace_file(&tree, "test_stringutils.test_replace.TestReplace");

    let test_ok = tree
        .get_by_dotted_path(tree.root(), "test_stringutils.test_replace.TestReplace.test_ok")
        .expect("test_ok exists");
    assert_eq!(tree[test_ok].kind(), NodeKind::Test);
    assert_in_replace_file(&tree, "test_stringutils.test_replace.TestReplace.test_ok");
    assert_eq!(
        tree[test_ok]
            .file_location()
            .and_then(|location| location.line())
            .map(|line| line.value()),
        Some(10)
    );
}
