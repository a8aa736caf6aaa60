// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property-based tests for aggregation, flattening and merging.

use crate::fixtures::{WORKSPACE_DIR, key, options};
use atest_runner::{
    ingest::{FailureDetail, PathStrategy, ReportIngestor, ReportRecord},
    tree::{ResultTree, RootKey},
};
use proptest::{collection::btree_map, prelude::*, sample::select};
use std::collections::BTreeSet;
use test_strategy::proptest;

/// Records with unique test paths. Class segments never start with `test_`, so a test name can
/// never collide with a class segment.
fn arb_records() -> impl Strategy<Value = Vec<ReportRecord>> {
    let class_path = proptest::collection::vec(select(vec!["pkg", "mod", "Cls", "Inner"]), 1..4);
    btree_map((class_path, 0..4u8), any::<bool>(), 0..24)
        .prop_map(|records| {
            records
                .into_iter()
                .map(|((class_path, test), failed)| ReportRecord {
                    suite_name: None,
                    class_path: class_path.into_iter().map(str::to_owned).collect(),
                    test_name: Some(format!("test_{test}")),
                    file: Some("pkg/test_mod.py".to_owned()),
                    line: Some(u64::from(test)),
                    invalid_line: None,
                    failures: if failed {
                        vec![FailureDetail {
                            message: Some("assertion failed".to_owned()),
                            detail: None,
                        }]
                    } else {
                        Vec::new()
                    },
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn ingest(records: Vec<ReportRecord>) -> ResultTree {
    let mut tree = ResultTree::new(key(), WORKSPACE_DIR);
    ReportIngestor::new(&options(PathStrategy::CodePath))
        .ingest(&mut tree, records)
        .expect("unique records always ingest");
    tree
}

fn test_paths(tree: &ResultTree) -> BTreeSet<(String, bool)> {
    tree.descendants(tree.root())
        .into_iter()
        .filter(|&id| tree[id].is_test())
        .map(|id| (tree.dotted_path(id), tree[id].is_failed_test()))
        .collect()
}

#[proptest(cases = 128)]
fn counts_match_records(#[strategy(arb_records())] records: Vec<ReportRecord>) {
    let expected_failed = records.iter().filter(|r| !r.failures.is_empty()).count();
    let expected_total = records.len();
    let tree = ingest(records);

    let root = &tree[tree.root()];
    prop_assert_eq!(root.test_count(), expected_total);
    prop_assert_eq!(root.failed_test_count(), expected_failed);

    for id in tree.descendants(tree.root()) {
        let node = &tree[id];
        prop_assert!(node.is_aggregated());
        let mut test_count = usize::from(node.is_test());
        let mut failed_count = usize::from(node.is_failed_test());
        let mut failed_children = Vec::new();
        for (name, child) in node.children() {
            test_count += tree[child].test_count();
            failed_count += tree[child].failed_test_count();
            if tree[child].failed_test_count() > 0 {
                failed_children.push(name);
            }
        }
        prop_assert_eq!(node.test_count(), test_count);
        prop_assert_eq!(node.failed_test_count(), failed_count);
        prop_assert!(node.failed_test_count() <= node.test_count());
        prop_assert_eq!(
            node.failed_children().map(|(name, _)| name).collect::<Vec<_>>(),
            failed_children
        );
    }
}

#[proptest(cases = 64)]
fn aggregation_is_idempotent(#[strategy(arb_records())] records: Vec<ReportRecord>) {
    let mut tree = ingest(records);
    let before = tree.to_json(tree.root()).expect("serialized");
    tree.aggregate();
    let after = tree.to_json(tree.root()).expect("serialized");
    prop_assert_eq!(before, after);
}

#[proptest(cases = 64)]
fn flattening_preserves_counts(#[strategy(arb_records())] records: Vec<ReportRecord>) {
    let tree = ingest(records);
    for id in tree.descendants(tree.root()) {
        let children: Vec<_> = tree[id].children().map(|(_, child)| child).collect();
        let flattened = tree.flattened_children(id);
        prop_assert_eq!(children.len(), flattened.len());
        for (child, flat) in children.into_iter().zip(flattened) {
            prop_assert_eq!(tree[child].test_count(), tree[flat].test_count());
            prop_assert_eq!(
                tree[child].failed_test_count(),
                tree[flat].failed_test_count()
            );
            let label = tree.flattened_label(flat);
            prop_assert!(tree.dotted_path(flat).ends_with(&label));
            prop_assert!(!tree.can_be_flattened(flat));
        }
    }
}

#[proptest(cases = 64)]
fn merging_halves_matches_single_ingest(
    #[strategy(arb_records())] records: Vec<ReportRecord>,
    #[strategy(0..=#records.len())] split: usize,
) {
    let whole = ingest(records.clone());

    let (first, second) = records.split_at(split);
    let mut merged = ingest(first.to_vec());
    let staging = ingest(second.to_vec());
    let summary = staging.merge_into(&mut merged).expect("merge succeeds");
    prop_assert_eq!(summary.added, second.len());
    prop_assert_eq!(summary.replaced, 0);

    prop_assert_eq!(test_paths(&whole), test_paths(&merged));
    let (whole_root, merged_root) = (&whole[whole.root()], &merged[merged.root()]);
    prop_assert_eq!(whole_root.test_count(), merged_root.test_count());
    prop_assert_eq!(
        whole_root.failed_test_count(),
        merged_root.failed_test_count()
    );
}

#[proptest(cases = 32)]
fn clear_results_keeps_key(#[strategy(arb_records())] records: Vec<ReportRecord>) {
    let mut tree = ingest(records);
    tree.clear_results();
    prop_assert!(tree.is_empty());
    prop_assert_eq!(tree.key(), &RootKey::new("pytest_demo", "pytest"));
    prop_assert_eq!(tree[tree.root()].name(), "pytest_demo:pytest");
    prop_assert_eq!(tree[tree.root()].test_count(), 0);
}
