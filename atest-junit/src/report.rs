// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ParseError, ReadError},
    parse::parse_report,
};
use camino::Utf8Path;
use indexmap::map::IndexMap;

/// The root element of a JUnit report.
///
/// A bare `<testsuite>` document is read as a report containing a single testsuite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Report {
    /// The name of this report, if the `<testsuites>` element carried one.
    pub name: Option<String>,

    /// The test suites contained in this report, in document order.
    ///
    /// Nested `<testsuite>` elements are flattened into this list, each one following its
    /// parent.
    pub testsuites: Vec<Testsuite>,
}

impl Report {
    /// Parses a report from an XML string.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        parse_report(input)
    }

    /// Reads and parses the report at the given path.
    pub fn from_path(path: &Utf8Path) -> Result<Self, ReadError> {
        let contents = std::fs::read_to_string(path).map_err(|error| ReadError::Read {
            path: path.to_owned(),
            error,
        })?;
        Self::parse(&contents).map_err(|error| ReadError::Parse {
            path: path.to_owned(),
            error,
        })
    }

    /// Iterates over all testcases in this report, in document order.
    pub fn testcases(&self) -> impl Iterator<Item = &Testcase> {
        self.testsuites
            .iter()
            .flat_map(|testsuite| testsuite.testcases.iter())
    }
}

/// Represents a single testsuite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Testsuite {
    /// The name of this testsuite.
    pub name: Option<String>,

    /// The testcases that form this testsuite.
    pub testcases: Vec<Testcase>,

    /// Data written to standard output while the testsuite was executed.
    pub system_out: Option<String>,

    /// Data written to standard error while the testsuite was executed.
    pub system_err: Option<String>,

    /// Other attributes, such as "hostname", "tests" or "timestamp".
    pub extra: IndexMap<String, String>,
}

impl Testsuite {
    pub(crate) fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }
}

/// Represents a single testcase.
///
/// Attributes are kept as they appear in the document. Validating them (for example, requiring a
/// `file` or a numeric `line`) is left to the consumer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Testcase {
    /// The `name` attribute.
    pub name: Option<String>,

    /// The `classname` attribute.
    ///
    /// Typically, this is the dotted path to the class or module containing the test.
    pub classname: Option<String>,

    /// The `file` attribute, usually relative to the directory the runner was invoked from.
    pub file: Option<String>,

    /// The `line` attribute, unparsed.
    pub line: Option<String>,

    /// The `time` attribute, unparsed.
    pub time: Option<String>,

    /// The status of this test.
    pub status: TestcaseStatus,

    /// Data written to standard output while the testcase was executed.
    pub system_out: Option<String>,

    /// Data written to standard error while the testcase was executed.
    pub system_err: Option<String>,

    /// Other attributes.
    pub extra: IndexMap<String, String>,
}

/// Represents the success or failure of a testcase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TestcaseStatus {
    /// This testcase passed.
    #[default]
    Success,

    /// This testcase did not pass.
    ///
    /// A testcase may carry several `<failure>` and `<error>` elements; all of them are kept, in
    /// document order.
    NonSuccess(Vec<NonSuccess>),

    /// This testcase was not run.
    Skipped {
        /// The skip message.
        message: Option<String>,

        /// The text content of the `<skipped>` element.
        description: Option<String>,
    },
}

impl TestcaseStatus {
    /// Returns true if this testcase failed or errored.
    pub fn is_non_success(&self) -> bool {
        matches!(self, TestcaseStatus::NonSuccess(_))
    }

    /// Returns the failure and error elements for this testcase. Empty if the testcase did not
    /// fail.
    pub fn non_successes(&self) -> &[NonSuccess] {
        match self {
            TestcaseStatus::NonSuccess(non_successes) => non_successes,
            TestcaseStatus::Success | TestcaseStatus::Skipped { .. } => &[],
        }
    }
}

/// A single `<failure>` or `<error>` element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonSuccess {
    /// Whether this was a `<failure>` or an `<error>`.
    pub kind: NonSuccessKind,

    /// The `message` attribute.
    pub message: Option<String>,

    /// The `type` attribute.
    pub ty: Option<String>,

    /// The text content of the element.
    pub description: Option<String>,
}

/// Whether a test failure is "expected" or not.
///
/// An expected test failure is generally one that is anticipated by the test or the harness, while
/// an unexpected failure might be something like an external service being down or a failure to
/// execute the binary.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NonSuccessKind {
    /// This is an expected failure, read from a `<failure>` element.
    Failure,

    /// This is an unexpected error, read from an `<error>` element.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;

    #[test]
    fn from_path_reads_report() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let path = dir.path().join("tests.xml");
        std::fs::write(
            &path,
            r#"<testsuite><testcase classname="a.B" name="c" file="a.py" line="1"/></testsuite>"#,
        )
        .expect("wrote report");

        let report = Report::from_path(&path).expect("report is valid");
        let testcase = report.testcases().next().expect("one testcase");
        assert_eq!(testcase.classname.as_deref(), Some("a.B"));
        assert_eq!(testcase.line.as_deref(), Some("1"));
    }

    #[test]
    fn from_path_errors() {
        let dir = Utf8TempDir::new().expect("created temp dir");

        let missing = dir.path().join("missing.xml");
        let error = Report::from_path(&missing).expect_err("file is missing");
        assert!(
            matches!(&error, ReadError::Read { path, .. } if *path == missing),
            "unexpected error: {error:?}"
        );

        let garbage = dir.path().join("garbage.xml");
        std::fs::write(&garbage, "<report/>").expect("wrote report");
        let error = Report::from_path(&garbage).expect_err("root is invalid");
        assert!(
            matches!(
                &error,
                ReadError::Parse {
                    error: ParseError::InvalidRoot { .. },
                    ..
                }
            ),
            "unexpected error: {error:?}"
        );
    }
}
