// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion of flat report records into a [`ResultTree`].
//!
//! Each [`ReportRecord`] describes one test by its dotted class path, name, file and line. The
//! [`ReportIngestor`] validates records, places them in the tree and aggregates the tree once all
//! records are in.
//!
//! Problems are split in two classes:
//!
//! * Data problems with a single record, such as a missing `file`, are [`RecordError`]s. Whether
//!   they skip the record or abort ingestion is decided by the [`MalformedRecordPolicy`].
//! * Structural problems, such as two records for the same test, are [`TreeError`]s and always
//!   abort ingestion.

use crate::{
    errors::{IngestError, RecordError, RecordErrorKind, RecordField, TreeError},
    tree::{FileLocation, Line, LineBase, NodeId, NodeKind, ResultNode, ResultTree},
};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use tracing::{debug, warn};

/// The separator placed between multiple failure texts for a single test.
pub const FAILURE_SEPARATOR: &str = "\n\n#####################################\n\n";

/// One test result, as read from a report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportRecord {
    /// The suite the test was reported under. Informational only.
    pub suite_name: Option<String>,

    /// The class path, such as `["pkg", "mod", "Class"]`. Required and non-empty.
    pub class_path: Vec<String>,

    /// The test name. Required.
    pub test_name: Option<String>,

    /// The source file, absolute or relative to the workspace directory. Required.
    pub file: Option<String>,

    /// The line number of the test, in the base given by [`IngestOptions::line_base`]. Required.
    pub line: Option<u64>,

    /// The line as reported, if it was present but not a non-negative integer.
    pub invalid_line: Option<String>,

    /// Failures reported for this test. Empty if the test passed or was skipped.
    pub failures: Vec<FailureDetail>,
}

impl ReportRecord {
    /// Returns a best-effort dotted identifier for this record.
    pub fn test_id(&self) -> String {
        let mut id = self.class_path.join(".");
        if let Some(test_name) = &self.test_name {
            if !id.is_empty() {
                id.push('.');
            }
            id.push_str(test_name);
        }
        if id.is_empty() {
            id.push_str("<unnamed>");
        }
        id
    }

    /// Returns the failure message for this record, or `None` if it passed.
    pub fn failure_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let texts: Vec<_> = self.failures.iter().map(FailureDetail::text).collect();
        Some(texts.join(FAILURE_SEPARATOR))
    }
}

/// A single failure or error reported for a test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureDetail {
    /// A short message, usually a one-line summary.
    pub message: Option<String>,

    /// Additional detail, such as a traceback.
    pub detail: Option<String>,
}

impl FailureDetail {
    /// Returns the combined text: message and detail separated by a blank line if both are
    /// present, otherwise whichever is present, otherwise the empty string.
    pub fn text(&self) -> String {
        match (&self.message, &self.detail) {
            (Some(message), Some(detail)) => format!("{message}\n\n{detail}"),
            (Some(text), None) | (None, Some(text)) => text.clone(),
            (None, None) => String::new(),
        }
    }
}

/// What to do with a record that is missing required data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedRecordPolicy {
    /// Skip the record with a warning and continue.
    #[default]
    Skip,

    /// Stop ingestion with an error.
    Abort,
}

/// How records are placed in the tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathStrategy {
    /// Follow the dotted class path: `pkg.mod.Class.test`.
    #[default]
    CodePath,

    /// Follow the file path, then the class: `pkg/mod.py` → `Class` → `test`.
    FilePath,
}

/// Options controlling a [`ReportIngestor`].
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// The policy for malformed records.
    pub policy: MalformedRecordPolicy,

    /// How records are placed in the tree.
    pub path_strategy: PathStrategy,

    /// The base of reported line numbers.
    pub line_base: LineBase,

    /// The directory relative paths are resolved against.
    pub workspace_dir: Utf8PathBuf,
}

impl IngestOptions {
    /// Creates options with the default policy and path strategy.
    pub fn new(workspace_dir: impl Into<Utf8PathBuf>, line_base: LineBase) -> Self {
        Self {
            policy: MalformedRecordPolicy::default(),
            path_strategy: PathStrategy::default(),
            line_base,
            workspace_dir: workspace_dir.into(),
        }
    }
}

/// The outcome of a successful ingestion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// The number of records placed in the tree.
    pub ingested: usize,

    /// Records that were skipped, with the reason.
    pub skipped: Vec<RecordError>,
}

/// Places report records into a [`ResultTree`].
#[derive(Clone, Debug)]
pub struct ReportIngestor<'a> {
    options: &'a IngestOptions,
}

/// A record that passed validation.
struct ValidRecord<'r> {
    class_path: &'r [String],
    test_name: &'r str,
    // Absolute.
    file: Utf8PathBuf,
    // Relative to the workspace, for the file-path strategy.
    relative_file: Option<String>,
    line: u64,
    failure_message: Option<String>,
}

impl<'a> ReportIngestor<'a> {
    /// Creates a new ingestor.
    pub fn new(options: &'a IngestOptions) -> Self {
        Self { options }
    }

    /// Ingests `records` into `tree`, then aggregates it.
    ///
    /// A record that duplicates a test already in the tree is a structural error. To update
    /// results for existing tests, ingest into a fresh tree and
    /// [merge](ResultTree::merge_into) it.
    ///
    /// On error the tree may contain some of the records. Callers that need atomic updates
    /// should ingest into a staging tree.
    pub fn ingest(
        &self,
        tree: &mut ResultTree,
        records: impl IntoIterator<Item = ReportRecord>,
    ) -> Result<IngestSummary, IngestError> {
        let mut summary = IngestSummary::default();
        for (index, record) in records.into_iter().enumerate() {
            let valid = match self.validate(index, &record) {
                Ok(valid) => valid,
                Err(error) => match self.options.policy {
                    MalformedRecordPolicy::Abort => return Err(error.into()),
                    MalformedRecordPolicy::Skip => {
                        warn!("skipping {error}");
                        summary.skipped.push(error);
                        continue;
                    }
                },
            };

            self.place(tree, valid)
                .map_err(|error| IngestError::Tree { index, error })?;
            summary.ingested += 1;
        }

        tree.aggregate();
        debug!(
            "ingested {} records into `{}` ({} skipped)",
            summary.ingested,
            tree.key(),
            summary.skipped.len()
        );
        Ok(summary)
    }

    fn validate<'r>(
        &self,
        index: usize,
        record: &'r ReportRecord,
    ) -> Result<ValidRecord<'r>, RecordError> {
        let error = |kind| RecordError::new(index, record.test_id(), kind);

        if record.class_path.is_empty() {
            return Err(error(RecordErrorKind::Missing(RecordField::ClassPath)));
        }
        if record.class_path.iter().any(|segment| segment.is_empty()) {
            return Err(error(RecordErrorKind::EmptyClassSegment));
        }
        let test_name = match record.test_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(error(RecordErrorKind::Missing(RecordField::TestName))),
        };
        let file = match record.file.as_deref() {
            Some(file) if !file.is_empty() => Utf8Path::new(file),
            _ => return Err(error(RecordErrorKind::Missing(RecordField::File))),
        };
        let line = match (record.line, &record.invalid_line) {
            (Some(line), _) => line,
            (None, Some(invalid)) => {
                return Err(error(RecordErrorKind::InvalidLine(invalid.clone())));
            }
            (None, None) => return Err(error(RecordErrorKind::Missing(RecordField::Line))),
        };

        let workspace_dir = &self.options.workspace_dir;
        let absolute = workspace_dir.join(file);
        let relative_file = match self.options.path_strategy {
            PathStrategy::CodePath => None,
            PathStrategy::FilePath => {
                let outside = || {
                    error(RecordErrorKind::OutsideWorkspace {
                        file: file.to_owned(),
                        workspace: workspace_dir.clone(),
                    })
                };
                let relative = absolute.strip_prefix(workspace_dir).map_err(|_| outside())?;
                if relative
                    .components()
                    .any(|component| component == Utf8Component::ParentDir)
                {
                    return Err(outside());
                }
                Some(relative.as_str().replace('\\', "/"))
            }
        };

        Ok(ValidRecord {
            class_path: &record.class_path,
            test_name,
            file: absolute,
            relative_file,
            line,
            failure_message: record.failure_message(),
        })
    }

    fn place(&self, tree: &mut ResultTree, record: ValidRecord<'_>) -> Result<NodeId, TreeError> {
        let root = tree.root();
        let parent = match &record.relative_file {
            None => test_case_at(tree, root, record.class_path, &record.file)?,
            Some(relative_file) => {
                let file_node =
                    tree.insert_by_file_path(root, &self.options.workspace_dir, relative_file)?;
                let skip = module_prefix_len(Utf8Path::new(relative_file), record.class_path);
                test_case_at(tree, file_node, &record.class_path[skip..], &record.file)?
            }
        };

        let location = FileLocation::new(
            record.file,
            Some(Line::new(record.line, self.options.line_base)),
        );
        tree.add_child(
            parent,
            ResultNode::test(record.test_name, Some(location), record.failure_message),
        )
    }
}

/// Returns the test case at `classes` under `parent`, creating it and any enclosing classes or
/// namespaces as needed.
///
/// An empty `classes` means module-level tests, which live directly under `parent`.
fn test_case_at(
    tree: &mut ResultTree,
    parent: NodeId,
    classes: &[String],
    file: &Utf8Path,
) -> Result<NodeId, TreeError> {
    let Some((class_name, outer)) = classes.split_last() else {
        return Ok(parent);
    };
    let location = FileLocation::new(file, None);
    match tree.get_by_path(parent, classes) {
        Some(existing) => {
            tree.promote_generic(existing, NodeKind::TestCase, Some(location));
            Ok(existing)
        }
        None => tree.insert_at_path(
            parent,
            outer,
            ResultNode::new(class_name.as_str(), NodeKind::TestCase).with_file_location(location),
            true,
        ),
    }
}

/// Returns how many leading segments of `class_path` name the module defined by `file`, or the
/// package containing it.
///
/// pytest reports the classes in `pkg/test_foo.py` as `pkg.test_foo.TestFoo`, other tools as
/// `pkg.TestFoo`, and module-level tests with the module alone. Only a prefix that lines up with
/// the end of the module path counts.
pub(crate) fn module_prefix_len(file: &Utf8Path, class_path: &[String]) -> usize {
    let module_path = file.with_extension("");
    let module: Vec<&str> = module_path
        .components()
        .map(|component| component.as_str())
        .collect();
    let package = &module[..module.len().saturating_sub(1)];
    aligned_prefix_len(&module, class_path)
        .or_else(|| aligned_prefix_len(package, class_path))
        .unwrap_or(0)
}

fn aligned_prefix_len(module: &[&str], class_path: &[String]) -> Option<usize> {
    (1..=module.len().min(class_path.len())).rev().find(|&len| {
        module[module.len() - len..]
            .iter()
            .zip(class_path)
            .all(|(segment, class)| segment == class)
    })
}
