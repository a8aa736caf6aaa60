// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{imp::ResultTree, node::NodeId};
use indexmap::IndexMap;

impl ResultTree {
    /// Recomputes counts and failure indexes for the whole tree.
    pub fn aggregate(&mut self) {
        self.aggregate_subtree(self.root());
    }

    /// Recomputes counts and failure indexes for `from` and everything below it.
    ///
    /// Children are always processed before their parents. Running this again without changes in
    /// between produces the same result.
    pub fn aggregate_subtree(&mut self, from: NodeId) {
        let order = self.descendants(from);
        for &id in order.iter().rev() {
            let node = &self[id];
            let mut test_count = usize::from(node.is_test());
            let mut failed_test_count = 0;
            let mut failed_children = IndexMap::new();
            for (name, child_id) in &node.children {
                let child = &self[*child_id];
                test_count += child.test_count;
                failed_test_count += child.failed_test_count;
                if child.failed_test_count > 0 {
                    failed_children.insert(name.clone(), *child_id);
                }
            }
            if node.is_failed_test() {
                failed_test_count += 1;
            }

            let node = self.node_mut(id);
            node.test_count = test_count;
            node.failed_test_count = failed_test_count;
            node.failed_children = failed_children;
            node.is_aggregated = true;
        }
    }
}
