// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::node::{FileLocation, NodeId, NodeKind, ResultNode};
use crate::errors::TreeError;
use camino::Utf8PathBuf;
use itertools::Itertools;
use smol_str::SmolStr;
use std::{fmt, ops::Index};
use tracing::debug;

/// Identifies a result tree: one per workspace and runner.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootKey {
    workspace: SmolStr,
    runner: SmolStr,
}

impl RootKey {
    /// Creates a new key.
    pub fn new(workspace: impl Into<SmolStr>, runner: impl Into<SmolStr>) -> Self {
        Self {
            workspace: workspace.into(),
            runner: runner.into(),
        }
    }

    /// The workspace name.
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// The runner name.
    pub fn runner(&self) -> &str {
        &self.runner
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workspace, self.runner)
    }
}

/// The run status of a result tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RunStatus {
    /// No run has completed since the tree was created or cleared.
    #[default]
    WaitingToStart,

    /// A run is in progress.
    Running,

    /// The most recent run has completed.
    Done,
}

/// The result of [`ResultTree::add_or_replace_child`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// No child with the same name existed.
    Added(NodeId),

    /// A child with the same name existed and was replaced along with its subtree.
    Replaced(NodeId),
}

impl Insertion {
    /// The identifier of the inserted node.
    pub fn id(self) -> NodeId {
        match self {
            Insertion::Added(id) | Insertion::Replaced(id) => id,
        }
    }
}

/// A tree of test results for one workspace and runner.
///
/// The tree owns all of its nodes. Parent links are plain identifiers, so dropping or clearing the
/// tree never has to untangle references.
#[derive(Clone, Debug)]
pub struct ResultTree {
    key: RootKey,
    // Slot 0 always holds the root. Vacated slots are `None` and listed in `vacant`.
    nodes: Vec<Option<ResultNode>>,
    vacant: Vec<NodeId>,
    status: RunStatus,
}

impl ResultTree {
    /// Creates a new tree containing only a root for the given workspace directory.
    pub fn new(key: RootKey, workspace_dir: impl Into<Utf8PathBuf>) -> Self {
        let root = ResultNode::new(key.to_string(), NodeKind::WorkspaceRoot)
            .with_folder_path(workspace_dir);
        Self {
            key,
            nodes: vec![Some(root)],
            vacant: Vec::new(),
            status: RunStatus::WaitingToStart,
        }
    }

    /// The key identifying this tree.
    pub fn key(&self) -> &RootKey {
        &self.key
    }

    /// The identifier of the root node.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The run status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns true if a run is in progress.
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub(crate) fn set_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    /// Returns the node with the given identifier, if it is live.
    pub fn get(&self, id: NodeId) -> Option<&ResultNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns the number of live nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.vacant.len()
    }

    /// Returns true if the tree holds nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> &mut ResultNode {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .expect("node ids handed out by this tree are live")
    }

    /// Attaches `node` under `parent`.
    ///
    /// Fails if the name is empty, if `parent` is a test, or if `parent` already has a child with
    /// the same name.
    pub fn add_child(&mut self, parent: NodeId, node: ResultNode) -> Result<NodeId, TreeError> {
        self.check_insert(parent, &node)?;
        if self[parent].children.contains_key(node.name()) {
            return Err(TreeError::DuplicateChild {
                parent: self.describe(parent),
                name: node.name().to_owned(),
            });
        }

        let name = node.name.clone();
        let id = self.alloc(parent, node);
        self.node_mut(parent).children.insert(name, id);
        self.mark_stale(parent);
        Ok(id)
    }

    /// Attaches `node` under `parent`, replacing any existing child with the same name.
    ///
    /// The replaced child's whole subtree is discarded. Its position among its siblings is kept.
    pub fn add_or_replace_child(
        &mut self,
        parent: NodeId,
        node: ResultNode,
    ) -> Result<Insertion, TreeError> {
        self.check_insert(parent, &node)?;
        let name = node.name.clone();
        let previous = self[parent].child(&name);
        if let Some(previous) = previous {
            debug!("replacing `{}` under `{}`", name, self.describe(parent));
            self.release_subtree(previous);
        }

        let id = self.alloc(parent, node);
        // IndexMap keeps the original position when the key already exists.
        self.node_mut(parent).children.insert(name.clone(), id);
        self.node_mut(parent).failed_children.shift_remove(&name);
        self.mark_stale(parent);

        Ok(match previous {
            Some(_) => Insertion::Replaced(id),
            None => Insertion::Added(id),
        })
    }

    /// Follows `segments` from `from` through each node's children.
    ///
    /// An empty sequence resolves to `from` itself.
    pub fn get_by_path<S: AsRef<str>>(
        &self,
        from: NodeId,
        segments: impl IntoIterator<Item = S>,
    ) -> Option<NodeId> {
        segments
            .into_iter()
            .try_fold(from, |id, segment| self.get(id)?.child(segment.as_ref()))
    }

    /// Follows a dotted path such as `pkg.mod.Class.test` from `from`.
    ///
    /// Returns `None` for an empty string.
    pub fn get_by_dotted_path(&self, from: NodeId, dotted: &str) -> Option<NodeId> {
        if dotted.is_empty() {
            return None;
        }
        self.get_by_path(from, dotted.split('.'))
    }

    /// Like [`get_by_path`](Self::get_by_path), but only follows children that contain failures.
    pub fn get_failed_by_path<S: AsRef<str>>(
        &self,
        from: NodeId,
        segments: impl IntoIterator<Item = S>,
    ) -> Option<NodeId> {
        segments
            .into_iter()
            .try_fold(from, |id, segment| self.get(id)?.failed_child(segment.as_ref()))
    }

    /// Like [`get_by_dotted_path`](Self::get_by_dotted_path), but only follows children that
    /// contain failures.
    pub fn get_failed_by_dotted_path(&self, from: NodeId, dotted: &str) -> Option<NodeId> {
        if dotted.is_empty() {
            return None;
        }
        self.get_failed_by_path(from, dotted.split('.'))
    }

    /// Returns the nodes below and including `from` in pre-order, visiting children in insertion
    /// order.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            // Push in reverse so that the first child is visited first.
            stack.extend(self[id].children.values().rev().copied());
        }
        out
    }

    /// Returns every failed test below and including `from`, in pre-order.
    pub fn collect_failed_tests(&self, from: NodeId) -> Vec<NodeId> {
        self.descendants(from)
            .into_iter()
            .filter(|id| self[*id].is_failed_test())
            .collect()
    }

    /// Returns the names from just below the root down to `id`.
    ///
    /// The path of the root itself is empty.
    pub fn code_path(&self, id: NodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self[node_id];
            if node.parent.is_none() {
                break;
            }
            path.push(node.name());
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// Returns the [`code_path`](Self::code_path) joined with dots.
    pub fn dotted_path(&self, id: NodeId) -> String {
        self.code_path(id).into_iter().join(".")
    }

    /// Resets the tree to a bare root in the `WaitingToStart` state.
    pub fn clear_results(&mut self) {
        self.nodes.truncate(1);
        self.vacant.clear();
        let root = self.node_mut(NodeId::ROOT);
        root.children.clear();
        root.failed_children.clear();
        root.test_count = 0;
        root.failed_test_count = 0;
        root.is_aggregated = false;
        self.status = RunStatus::WaitingToStart;
    }

    /// Turns a generic namespace node into a node of a more specific kind.
    ///
    /// Used when a dotted path first seen as a prefix later turns out to name a test case. A
    /// promoted node without a location takes `file_location`.
    pub(crate) fn promote_generic(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        file_location: Option<FileLocation>,
    ) {
        let node = self.node_mut(id);
        if node.kind == NodeKind::Generic {
            node.kind = kind;
            if node.file_location.is_none() {
                node.file_location = file_location;
            }
        }
    }

    /// A human-readable description of `id` for error messages.
    pub(crate) fn describe(&self, id: NodeId) -> String {
        if id == NodeId::ROOT {
            self.key.to_string()
        } else {
            format!("{}.{}", self.key, self.dotted_path(id))
        }
    }

    fn check_insert(&self, parent: NodeId, node: &ResultNode) -> Result<(), TreeError> {
        if node.name().is_empty() {
            return Err(TreeError::EmptyName {
                parent: self.describe(parent),
            });
        }
        if self[parent].is_test() {
            return Err(TreeError::ChildOfTest {
                parent: self.describe(parent),
                name: node.name().to_owned(),
            });
        }
        Ok(())
    }

    fn alloc(&mut self, parent: NodeId, mut node: ResultNode) -> NodeId {
        node.parent = Some(parent);
        match self.vacant.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId::new(self.nodes.len() - 1)
            }
        }
    }

    fn release_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes[id.index()].take() {
                stack.extend(node.children.into_values());
                self.vacant.push(id);
            }
        }
    }

    /// Marks `id` and its ancestors as needing aggregation.
    fn mark_stale(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node_mut(id);
            if !node.is_aggregated {
                // Ancestors of a stale node are already stale.
                break;
            }
            node.is_aggregated = false;
            current = node.parent;
        }
    }
}

impl Index<NodeId> for ResultTree {
    type Output = ResultNode;

    fn index(&self, id: NodeId) -> &ResultNode {
        self.get(id)
            .unwrap_or_else(|| panic!("node {id:?} is not live in tree `{}`", self.key))
    }
}
