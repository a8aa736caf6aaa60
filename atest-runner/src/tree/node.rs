// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Identifies a node within a [`ResultTree`](super::ResultTree).
///
/// Identifiers are only meaningful for the tree that produced them. An identifier for a node that
/// has since been replaced or cleared may be reused for a different node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(super) const ROOT: Self = Self(0);

    pub(super) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(super) fn index(self) -> usize {
        self.0
    }
}

/// The kind of a [`ResultNode`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// The root of a tree, one per workspace and runner.
    WorkspaceRoot,

    /// A namespace segment, such as a package or module, inferred from a dotted path.
    Generic,

    /// A directory on disk.
    Folder,

    /// A source file.
    File,

    /// A class or suite that directly contains tests.
    TestCase,

    /// A single test. Tests never have children.
    Test,
}

impl NodeKind {
    /// Returns the kebab-case name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::WorkspaceRoot => "workspace-root",
            NodeKind::Generic => "generic",
            NodeKind::Folder => "folder",
            NodeKind::File => "file",
            NodeKind::TestCase => "test-case",
            NodeKind::Test => "test",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a line number reported by a runner should be interpreted.
///
/// Line numbers are stored as reported. Consumers convert them with [`Line::zero_based`] or
/// [`Line::one_based`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineBase {
    /// The first line of a file is line 0. pytest reports lines this way.
    ZeroBased,

    /// The first line of a file is line 1.
    #[default]
    OneBased,
}

/// A line number along with its base.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Line {
    value: u64,
    base: LineBase,
}

impl Line {
    /// Creates a new line number.
    pub fn new(value: u64, base: LineBase) -> Self {
        Self { value, base }
    }

    /// Returns the line number as reported.
    pub fn value(self) -> u64 {
        self.value
    }

    /// Returns the base of the reported line number.
    pub fn base(self) -> LineBase {
        self.base
    }

    /// Returns the line number counting from 0.
    pub fn zero_based(self) -> u64 {
        match self.base {
            LineBase::ZeroBased => self.value,
            LineBase::OneBased => self.value.saturating_sub(1),
        }
    }

    /// Returns the line number counting from 1.
    pub fn one_based(self) -> u64 {
        match self.base {
            LineBase::ZeroBased => self.value.saturating_add(1),
            LineBase::OneBased => self.value,
        }
    }
}

/// A position in a source file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileLocation {
    path: Utf8PathBuf,
    line: Option<Line>,
}

impl FileLocation {
    /// Creates a new location.
    pub fn new(path: impl Into<Utf8PathBuf>, line: Option<Line>) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// The path to the file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The line within the file, if known.
    pub fn line(&self) -> Option<Line> {
        self.line
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path, line.one_based()),
            None => write!(f, "{}", self.path),
        }
    }
}

/// A node in a [`ResultTree`](super::ResultTree).
///
/// Nodes are created detached with one of the constructors, then handed to the tree, which sets
/// up the parent and child links. The counts and failure index are only meaningful once
/// [`is_aggregated`](Self::is_aggregated) returns true.
#[derive(Clone, Debug)]
pub struct ResultNode {
    pub(super) name: SmolStr,
    pub(super) kind: NodeKind,
    pub(super) parent: Option<NodeId>,
    pub(super) children: IndexMap<SmolStr, NodeId>,
    pub(super) failed_children: IndexMap<SmolStr, NodeId>,
    pub(super) file_location: Option<FileLocation>,
    pub(super) folder_path: Option<Utf8PathBuf>,
    pub(super) failure_message: Option<String>,
    pub(super) test_count: usize,
    pub(super) failed_test_count: usize,
    pub(super) is_aggregated: bool,
}

impl ResultNode {
    /// Creates a new container node of the given kind.
    ///
    /// Use [`ResultNode::test`] to create tests.
    pub fn new(name: impl Into<SmolStr>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: IndexMap::new(),
            failed_children: IndexMap::new(),
            file_location: None,
            folder_path: None,
            failure_message: None,
            test_count: 0,
            failed_test_count: 0,
            is_aggregated: false,
        }
    }

    /// Creates a new test node.
    ///
    /// A test with a failure message is failed, and one without is passed.
    pub fn test(
        name: impl Into<SmolStr>,
        file_location: Option<FileLocation>,
        failure_message: Option<String>,
    ) -> Self {
        Self {
            file_location,
            failure_message,
            ..Self::new(name, NodeKind::Test)
        }
    }

    /// Sets the file location for this node.
    pub fn with_file_location(mut self, file_location: FileLocation) -> Self {
        self.file_location = Some(file_location);
        self
    }

    /// Sets the directory this node corresponds to.
    pub fn with_folder_path(mut self, folder_path: impl Into<Utf8PathBuf>) -> Self {
        self.folder_path = Some(folder_path.into());
        self
    }

    /// Returns a copy of this node's own data, without links or derived data.
    pub(super) fn detached(&self) -> Self {
        Self {
            file_location: self.file_location.clone(),
            folder_path: self.folder_path.clone(),
            failure_message: self.failure_message.clone(),
            ..Self::new(self.name.clone(), self.kind)
        }
    }

    /// The name of this node, unique among its siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of this node.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The parent of this node, or `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Iterates over the children of this node in insertion order.
    pub fn children(&self) -> impl ExactSizeIterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Returns the child with the given name.
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Returns the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Iterates over the children that contain at least one failed test, in insertion order.
    ///
    /// Empty until the tree is aggregated.
    pub fn failed_children(&self) -> impl ExactSizeIterator<Item = (&str, NodeId)> {
        self.failed_children
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
    }

    /// Returns the failed child with the given name.
    pub fn failed_child(&self, name: &str) -> Option<NodeId> {
        self.failed_children.get(name).copied()
    }

    /// The source location of this node, if known.
    pub fn file_location(&self) -> Option<&FileLocation> {
        self.file_location.as_ref()
    }

    /// The directory this node corresponds to, for folders and workspace roots.
    pub fn folder_path(&self) -> Option<&Utf8Path> {
        self.folder_path.as_deref()
    }

    /// The failure message reported for this test, if it failed.
    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }

    /// Returns true if this node is a test.
    pub fn is_test(&self) -> bool {
        self.kind == NodeKind::Test
    }

    /// Returns true if this node is a test that failed.
    pub fn is_failed_test(&self) -> bool {
        self.is_test() && self.failure_message.is_some()
    }

    /// Returns true if this node is a test that passed.
    pub fn is_passed_test(&self) -> bool {
        self.is_test() && self.failure_message.is_none()
    }

    /// The number of tests in this subtree, including this node if it is a test.
    pub fn test_count(&self) -> usize {
        self.test_count
    }

    /// The number of failed tests in this subtree, including this node if it is a failed test.
    pub fn failed_test_count(&self) -> usize {
        self.failed_test_count
    }

    /// Returns true if the derived data on this node is up to date.
    pub fn is_aggregated(&self) -> bool {
        self.is_aggregated
    }

    /// Returns true if this subtree is known to contain a failed test.
    pub fn contains_failures(&self) -> bool {
        self.is_aggregated && self.failed_test_count > 0
    }
}
