// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use atest_junit::Report;
use atest_runner::{
    ingest::{IngestOptions, PathStrategy, ReportIngestor},
    tree::{LineBase, ResultTree, RootKey},
    xunit::records_from_report,
};
use indoc::indoc;

pub(crate) const WORKSPACE_DIR: &str = "/work/pytest_demo";

pub(crate) static SINGLE_PASSED: &str = indoc! {r#"
    <testsuites>
        <testsuite name="mytestsuite">
            <testcase classname="test_stringutils.TestReplace" file="test_stringutils/test_replace.py" line="10" name="test_ok"/>
        </testsuite>
    </testsuites>
"#};

pub(crate) static SINGLE_FAILED: &str = indoc! {r#"
    <testsuites>
        <testsuite name="mytestsuite">
            <testcase classname="test_stringutils.TestReplace" file="test_stringutils/test_replace.py" line="10" name="test_will_fail">
                <failure message="The failure message">Failure details</failure>
            </testcase>
        </testsuite>
    </testsuites>
"#};

pub(crate) static ADVANCED: &str = indoc! {r#"
    <testsuites>
        <testsuite name="mytestsuite">
            <testcase classname="test_other.TestOther" file="test_stringutils/test_other.py" line="4" name="test_other"/>
            <testcase classname="test_stringutils.test_stuff.TestStuff" file="test_stringutils/test_stuff.py" line="4" name="test_do_stuff"/>
            <testcase classname="test_stringutils.test_replace.TestReplace" file="test_stringutils/test_replace.py" line="7" name="test_strip_whitespace"/>
            <testcase classname="test_stringutils.test_replace.TestReplace" file="test_stringutils/test_replace.py" line="10" name="test_will_fail">
                <failure message="The failure message">Failure details</failure>
            </testcase>
        </testsuite>
    </testsuites>
"#};

pub(crate) fn key() -> RootKey {
    RootKey::new("pytest_demo", "pytest")
}

pub(crate) fn options(path_strategy: PathStrategy) -> IngestOptions {
    let mut options = IngestOptions::new(WORKSPACE_DIR, LineBase::ZeroBased);
    options.path_strategy = path_strategy;
    options
}

/// Parses `xml` and ingests it into a fresh tree, asserting that nothing was skipped.
pub(crate) fn ingest_report(xml: &str, path_strategy: PathStrategy) -> ResultTree {
    let report = Report::parse(xml).expect("report is valid");
    let mut tree = ResultTree::new(key(), WORKSPACE_DIR);
    let summary = ReportIngestor::new(&options(path_strategy))
        .ingest(&mut tree, records_from_report(&report))
        .expect("report ingested");
    assert!(
        summary.skipped.is_empty(),
        "unexpected skipped records: {:?}",
        summary.skipped
    );
    tree
}
