// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    imp::ResultTree,
    node::{NodeId, NodeKind},
};
use indexmap::IndexMap;
use serde::Serialize;

/// A serializable snapshot of a subtree, used for debugging and machine-readable output.
///
/// `failedTestCount` and `failedChildren` are only present once the subtree is aggregated.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainNode<'a> {
    name: &'a str,
    kind: NodeKind,
    test_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_test_count: Option<usize>,
    children: IndexMap<&'a str, PlainNode<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_children: Option<IndexMap<&'a str, PlainNode<'a>>>,
}

impl ResultTree {
    /// Returns a serializable snapshot of the subtree rooted at `id`.
    pub fn to_plain(&self, id: NodeId) -> PlainNode<'_> {
        let node = &self[id];
        let children = node
            .children
            .iter()
            .map(|(name, &child)| (name.as_str(), self.to_plain(child)))
            .collect();
        let (failed_test_count, failed_children) = if node.is_aggregated {
            let failed_children = node
                .failed_children
                .iter()
                .map(|(name, &child)| (name.as_str(), self.to_plain(child)))
                .collect();
            (Some(node.failed_test_count), Some(failed_children))
        } else {
            (None, None)
        };

        PlainNode {
            name: node.name(),
            kind: node.kind,
            test_count: node.test_count,
            failed_test_count,
            children,
            failed_children,
        }
    }

    /// Serializes the subtree rooted at `id` as pretty-printed JSON.
    pub fn to_json(&self, id: NodeId) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_plain(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ResultNode, RootKey};

    #[test]
    fn plain_json() {
        let mut tree = ResultTree::new(RootKey::new("ws", "pytest"), "/ws");
        let root = tree.root();
        let class = tree
            .insert_at_path(root, ["pkg"], ResultNode::new("Foo", NodeKind::TestCase), true)
            .expect("inserted Foo");
        tree.add_child(class, ResultNode::test("test_ok", None, None))
            .expect("added test_ok");
        tree.add_child(class, ResultNode::test("test_bad", None, Some("boom".to_owned())))
            .expect("added test_bad");

        let pkg = tree.get_by_dotted_path(root, "pkg").expect("pkg exists");
        insta::assert_snapshot!(tree.to_json(pkg).expect("serialized"), @r#"
        {
          "name": "pkg",
          "kind": "generic",
          "testCount": 0,
          "children": {
            "Foo": {
              "name": "Foo",
              "kind": "test-case",
              "testCount": 0,
              "children": {
                "test_ok": {
                  "name": "test_ok",
                  "kind": "test",
                  "testCount": 0,
                  "children": {}
                },
                "test_bad": {
                  "name": "test_bad",
                  "kind": "test",
                  "testCount": 0,
                  "children": {}
                }
              }
            }
          }
        }
        "#);

        tree.aggregate();
        let class_json = tree.to_json(class).expect("serialized");
        insta::assert_snapshot!(class_json, @r#"
        {
          "name": "Foo",
          "kind": "test-case",
          "testCount": 2,
          "failedTestCount": 1,
          "children": {
            "test_ok": {
              "name": "test_ok",
              "kind": "test",
              "testCount": 1,
              "failedTestCount": 0,
              "children": {},
              "failedChildren": {}
            },
            "test_bad": {
              "name": "test_bad",
              "kind": "test",
              "testCount": 1,
              "failedTestCount": 1,
              "children": {},
              "failedChildren": {}
            }
          },
          "failedChildren": {
            "test_bad": {
              "name": "test_bad",
              "kind": "test",
              "testCount": 1,
              "failedTestCount": 1,
              "children": {},
              "failedChildren": {}
            }
          }
        }
        "#);
    }
}
