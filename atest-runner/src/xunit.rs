// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of JUnit/XUnit reports into [`ReportRecord`]s.

use crate::ingest::{FailureDetail, ReportRecord};
use atest_junit::{Report, Testcase};
use tracing::debug;

/// Converts every testcase in `report` into a record, in document order.
///
/// `<failure>` and `<error>` elements both mark a test as failed. Skipped tests are recorded as
/// passed. Missing or unparseable attributes are left empty here and reported during ingestion.
pub fn records_from_report(report: &Report) -> Vec<ReportRecord> {
    report
        .testsuites
        .iter()
        .flat_map(|testsuite| {
            testsuite
                .testcases
                .iter()
                .map(move |testcase| record_from_testcase(testsuite.name.as_deref(), testcase))
        })
        .collect()
}

fn record_from_testcase(suite_name: Option<&str>, testcase: &Testcase) -> ReportRecord {
    let class_path = match testcase.classname.as_deref() {
        Some(classname) if !classname.is_empty() => {
            classname.split('.').map(str::to_owned).collect()
        }
        _ => Vec::new(),
    };

    let (line, invalid_line) = match testcase.line.as_deref() {
        Some(line) => match line.trim().parse::<u64>() {
            Ok(line) => (Some(line), None),
            Err(error) => {
                debug!("invalid line `{line}` for testcase {:?}: {error}", testcase.name);
                (None, Some(line.to_owned()))
            }
        },
        None => (None, None),
    };

    let failures = testcase
        .status
        .non_successes()
        .iter()
        .map(|non_success| FailureDetail {
            message: non_success.message.clone(),
            detail: non_success.description.clone(),
        })
        .collect();

    ReportRecord {
        suite_name: suite_name.map(str::to_owned),
        class_path,
        test_name: testcase.name.clone(),
        file: testcase.file.clone(),
        line,
        invalid_line,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn testcases_become_records() {
        let report = Report::parse(indoc! {r#"
            <testsuites>
                <testsuite name="mytestsuite">
                    <testcase classname="test_stringutils.TestReplace" file="test_stringutils/test_replace.py" line="10" name="test_will_fail">
                        <failure message="The failure message">Failure details</failure>
                        <error>Teardown exploded</error>
                    </testcase>
                    <testcase classname="test_stringutils.TestReplace" file="test_stringutils/test_replace.py" line="14" name="test_skipped">
                        <skipped message="later"/>
                    </testcase>
                    <testcase classname="" name="test_bad" line="ten"/>
                </testsuite>
            </testsuites>
        "#})
        .expect("report is valid");

        let records = records_from_report(&report);
        assert_eq!(records.len(), 3);

        let failed = &records[0];
        assert_eq!(failed.suite_name.as_deref(), Some("mytestsuite"));
        assert_eq!(failed.class_path, vec!["test_stringutils", "TestReplace"]);
        assert_eq!(failed.test_name.as_deref(), Some("test_will_fail"));
        assert_eq!(failed.file.as_deref(), Some("test_stringutils/test_replace.py"));
        assert_eq!(failed.line, Some(10));
        assert_eq!(
            failed.failure_message().as_deref(),
            Some(
                "The failure message\n\nFailure details\n\n#####################################\n\nTeardown exploded"
            )
        );

        assert_eq!(records[1].failure_message(), None);

        let bad = &records[2];
        assert!(bad.class_path.is_empty());
        assert_eq!(bad.file, None);
        assert_eq!(bad.line, None);
        assert_eq!(bad.invalid_line.as_deref(), Some("ten"));
        assert_eq!(records[1].invalid_line, None);
    }
}
