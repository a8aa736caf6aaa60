// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collapsing of single-child chains for display.
//!
//! A chain such as `pkg` → `mod1` → `ClassA` with nothing else along the way reads better as a
//! single `pkg.mod1.ClassA` entry. These helpers compute that presentation without changing the
//! tree.

use super::{imp::ResultTree, node::NodeId, node::NodeKind};
use itertools::Itertools;

impl ResultTree {
    /// Returns true if `id` can be collapsed into its only child.
    ///
    /// Only aggregated, non-root nodes with exactly one child qualify.
    pub fn can_be_flattened(&self, id: NodeId) -> bool {
        let node = &self[id];
        node.is_aggregated && node.kind != NodeKind::WorkspaceRoot && node.children.len() == 1
    }

    /// Follows single-child chains down from `id`, returning the last node in the chain.
    pub fn flattened(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while self.can_be_flattened(current) {
            match self[current].children.values().next() {
                Some(&child) => current = child,
                None => break,
            }
        }
        current
    }

    /// The children of `id`, each collapsed with [`flattened`](Self::flattened).
    pub fn flattened_children(&self, id: NodeId) -> Vec<NodeId> {
        self[id]
            .children
            .values()
            .map(|&child| self.flattened(child))
            .collect()
    }

    /// The failed children of `id`, each collapsed with [`flattened`](Self::flattened).
    ///
    /// Empty until the tree is aggregated.
    pub fn flattened_failed_children(&self, id: NodeId) -> Vec<NodeId> {
        self[id]
            .failed_children
            .values()
            .map(|&child| self.flattened(child))
            .collect()
    }

    /// The display label for `id`: its name, prefixed with the names of ancestors that collapse
    /// into it.
    pub fn flattened_label(&self, id: NodeId) -> String {
        let mut names = vec![self[id].name()];
        let mut current = self[id].parent;
        while let Some(parent) = current {
            if !self.can_be_flattened(parent) {
                break;
            }
            names.push(self[parent].name());
            current = self[parent].parent;
        }
        names.into_iter().rev().join(".")
    }
}
