// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    imp::{Insertion, ResultTree},
    node::NodeId,
};
use crate::errors::TreeError;

/// Statistics about a [`ResultTree::merge_into`] operation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Tests that did not previously exist in the target.
    pub added: usize,

    /// Tests that replaced an existing node in the target.
    pub replaced: usize,
}

impl ResultTree {
    /// Merges the results in this tree into `target`, then re-aggregates `target`.
    ///
    /// Container nodes are matched by name and created with the same kind and location if
    /// missing. A generic container in `target` takes the kind and location of its match. Tests
    /// overwrite any node at the same path. Nodes in `target` that do not appear
    /// in this tree are kept as-is.
    ///
    /// On error, `target` may have been partially updated.
    pub fn merge_into(&self, target: &mut ResultTree) -> Result<MergeSummary, TreeError> {
        let mut summary = MergeSummary::default();
        let mut stack: Vec<(NodeId, NodeId)> = vec![(self.root(), target.root())];

        while let Some((source, dest)) = stack.pop() {
            for (name, &child) in &self[source].children {
                let child_node = &self[child];
                let mapped = if child_node.is_test() {
                    match target.add_or_replace_child(dest, child_node.detached())? {
                        Insertion::Added(id) => {
                            summary.added += 1;
                            id
                        }
                        Insertion::Replaced(id) => {
                            summary.replaced += 1;
                            id
                        }
                    }
                } else {
                    match target[dest].child(name) {
                        Some(existing) => {
                            target.promote_generic(
                                existing,
                                child_node.kind,
                                child_node.file_location.clone(),
                            );
                            existing
                        }
                        None => target.add_child(dest, child_node.detached())?,
                    }
                };
                stack.push((child, mapped));
            }
        }

        target.aggregate();
        Ok(summary)
    }
}
