// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by atest.

use crate::tree::RootKey;
use atest_junit::ParseError;
use camino::Utf8PathBuf;
use std::{fmt, io};
use thiserror::Error;

/// A structural error raised while modifying a [`ResultTree`](crate::tree::ResultTree).
///
/// Structural errors indicate a programming or data-shape problem and are never skipped.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TreeError {
    /// A node with an empty name was inserted.
    #[error("cannot add a node with an empty name under `{parent}`")]
    EmptyName {
        /// The node under which insertion was attempted.
        parent: String,
    },

    /// A node with the same name already exists under the parent.
    #[error("`{parent}` already has a child named `{name}`")]
    DuplicateChild {
        /// The node under which insertion was attempted.
        parent: String,

        /// The name of the existing child.
        name: String,
    },

    /// An intermediate path segment already exists and reuse was not requested.
    #[error("`{parent}` already has a child named `{segment}`, and existing nodes were not to be reused")]
    PathOccupied {
        /// The node under which the segment exists.
        parent: String,

        /// The occupied segment.
        segment: String,
    },

    /// A child was inserted under a test.
    #[error("cannot add `{name}` under test `{parent}`: tests do not have children")]
    ChildOfTest {
        /// The test under which insertion was attempted.
        parent: String,

        /// The name of the rejected child.
        name: String,
    },

    /// A file path with no usable segments was inserted.
    #[error("file path `{path}` has no segments")]
    EmptyFilePath {
        /// The path as provided.
        path: String,
    },
}

/// A required field of a [`ReportRecord`](crate::ingest::ReportRecord).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecordField {
    /// The dotted class path.
    ClassPath,

    /// The test name.
    TestName,

    /// The source file.
    File,

    /// The line number.
    Line,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self {
            RecordField::ClassPath => "class path",
            RecordField::TestName => "test name",
            RecordField::File => "file",
            RecordField::Line => "line",
        };
        f.write_str(field)
    }
}

/// A data-quality problem with a single report record.
///
/// Depending on the [`MalformedRecordPolicy`](crate::ingest::MalformedRecordPolicy), a record with
/// this error is either skipped or aborts ingestion.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("malformed report record #{index} ({test_id}): {kind}")]
pub struct RecordError {
    index: usize,
    test_id: String,
    kind: RecordErrorKind,
}

impl RecordError {
    pub(crate) fn new(index: usize, test_id: impl Into<String>, kind: RecordErrorKind) -> Self {
        Self {
            index,
            test_id: test_id.into(),
            kind,
        }
    }

    /// The index of the record within its input sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    /// A best-effort identifier for the test, for display purposes.
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// The problem with the record.
    pub fn kind(&self) -> &RecordErrorKind {
        &self.kind
    }
}

/// The kind of problem found in a report record.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordErrorKind {
    /// A required field is absent.
    #[error("missing {0}")]
    Missing(RecordField),

    /// The line is present but not a non-negative integer.
    #[error("invalid line `{0}`")]
    InvalidLine(String),

    /// The class path contains an empty segment.
    #[error("class path contains an empty segment")]
    EmptyClassSegment,

    /// The file is not inside the workspace directory.
    #[error("file `{file}` is outside workspace `{workspace}`")]
    OutsideWorkspace {
        /// The file as reported.
        file: Utf8PathBuf,

        /// The workspace directory.
        workspace: Utf8PathBuf,
    },
}

/// An error that aborted ingestion of a report.
///
/// When this is returned, the live tree has not been modified.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// A record was malformed and the policy is to abort.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// A record could not be placed in the tree.
    #[error("failed to place report record #{index} in the result tree")]
    Tree {
        /// The index of the record within its input sequence.
        index: usize,

        /// The underlying error.
        #[source]
        error: TreeError,
    },

    /// The ingested results could not be merged into the live tree.
    #[error("failed to merge results into the tree for `{key}`")]
    Merge {
        /// The tree that was being merged into.
        key: RootKey,

        /// The underlying error.
        #[source]
        error: TreeError,
    },
}

/// Returned when a run is requested for a root that already has a run in progress.
///
/// The existing run is unaffected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("a test run for `{key}` is already in progress")]
pub struct RunRejected {
    key: RootKey,
}

impl RunRejected {
    pub(crate) fn new(key: RootKey) -> Self {
        Self { key }
    }

    /// The root for which the run was rejected.
    pub fn key(&self) -> &RootKey {
        &self.key
    }
}

/// An error that occurred while loading workspace settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings at `{path}`")]
    Read {
        /// The settings file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The settings file could not be parsed.
    #[error("failed to parse settings at `{path}`")]
    Parse {
        /// The settings file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },
}

/// An error that occurred while executing a test command.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The generic runner has no command configured.
    #[error("no command configured for the generic runner (set `generic.command` in `{settings_path}`)")]
    NoCommand {
        /// Where the command should be configured.
        settings_path: Utf8PathBuf,
    },

    /// The configured command could not be split into words.
    #[error("invalid command `{command}`")]
    InvalidCommand {
        /// The command as configured.
        command: String,

        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },

    /// The directory for the report could not be prepared.
    #[error("failed to prepare report location `{path}`")]
    PrepareReport {
        /// The path being prepared.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The test command could not be started.
    #[error("failed to spawn `{command}`")]
    Spawn {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Output from the test command could not be read, or the command could not be waited on.
    #[error("error while running `{command}`")]
    Wait {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The report was not written or could not be read.
    #[error("failed to read report `{path}` written by `{command}`")]
    ReadReport {
        /// The command line.
        command: String,

        /// The report path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The report was read but is not a valid JUnit report.
    #[error("failed to parse report `{path}` written by `{command}`")]
    ParseReport {
        /// The command line.
        command: String,

        /// The report path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: ParseError,
    },
}
