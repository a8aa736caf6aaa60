// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable rendering of result trees.
//!
//! [`TreeDisplayer`] prints a tree with single-child chains collapsed, and
//! [`write_failure_summaries`] prints the heading and message of each failed test.

use crate::tree::{NodeId, NodeKind, ResultNode, ResultTree};
use owo_colors::{OwoColorize, Style};
use std::fmt;
use swrite::{SWrite, swrite, swriteln};

/// Which nodes of a tree to show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TreeView {
    /// Every node.
    #[default]
    All,

    /// Only nodes that contain a failed test.
    FailedOnly,
}

/// How much surrounding text to print for each failed test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SummaryStyle {
    /// A heading and the message.
    #[default]
    Compact,

    /// A separator line before each test and blank lines after it.
    Verbose,
}

/// Renders a [`ResultTree`] as indented text.
#[derive(Clone, Debug)]
pub struct TreeDisplayer<'a> {
    tree: &'a ResultTree,
    view: TreeView,
    styles: Box<Styles>,
}

impl<'a> TreeDisplayer<'a> {
    /// Creates a new displayer. Output is uncolored until [`colorize`](Self::colorize) is called.
    pub fn new(tree: &'a ResultTree, view: TreeView) -> Self {
        Self {
            tree,
            view,
            styles: Box::default(),
        }
    }

    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Renders the subtree at `from`, one node per line.
    pub fn render(&self, from: NodeId) -> String {
        let mut out = String::new();
        let start = self.tree.flattened(from);
        let label = if start == self.tree.root() {
            self.tree[start].name().to_owned()
        } else {
            self.tree.flattened_label(start)
        };
        self.write_node(&mut out, start, &label, 0);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, label: &str, depth: usize) {
        let node = &self.tree[id];
        let label_style = if node.kind() == NodeKind::Test {
            Style::new()
        } else {
            self.styles.container
        };
        swrite!(out, "{:indent$}{}", "", label.style(label_style), indent = depth * 2);
        if let Some(description) = self.description(node) {
            swrite!(out, "  {description}");
        }
        out.push('\n');

        let children = match self.view {
            TreeView::All => self.tree.flattened_children(id),
            TreeView::FailedOnly => self.tree.flattened_failed_children(id),
        };
        for child in children {
            let label = self.tree.flattened_label(child);
            self.write_node(out, child, &label, depth + 1);
        }
    }

    fn description(&self, node: &ResultNode) -> Option<Description> {
        if node.is_failed_test() {
            Some(Description::Failed(self.styles.failed))
        } else if node.is_passed_test() {
            Some(Description::Passed(self.styles.passed))
        } else if node.is_aggregated() {
            if node.contains_failures() {
                Some(Description::SomeFailed {
                    failed: node.failed_test_count(),
                    total: node.test_count(),
                    style: self.styles.failed,
                })
            } else {
                Some(Description::AllPassed {
                    total: node.test_count(),
                    style: self.styles.passed,
                })
            }
        } else {
            None
        }
    }
}

enum Description {
    Failed(Style),
    Passed(Style),
    SomeFailed {
        failed: usize,
        total: usize,
        style: Style,
    },
    AllPassed {
        total: usize,
        style: Style,
    },
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Failed(style) => write!(f, "{}", "FAILED".style(*style)),
            Description::Passed(style) => write!(f, "{}", "passed".style(*style)),
            Description::SomeFailed {
                failed,
                total,
                style,
            } => write!(f, "{}", format_args!("{failed} / {total} failed").style(*style)),
            Description::AllPassed { total, style } => {
                write!(f, "{}", format_args!("{total} / {total} passed").style(*style))
            }
        }
    }
}

/// Returns the result text for a test: its failure message, or a placeholder.
///
/// Returns the empty string for nodes that aren't tests.
pub fn test_result_message(node: &ResultNode) -> &str {
    if node.is_failed_test() {
        match node.failure_message() {
            Some(message) if !message.is_empty() => message,
            _ => "No failure message",
        }
    } else if node.is_passed_test() {
        "Passed!"
    } else {
        ""
    }
}

/// Appends a summary of `id` to `out`.
///
/// For a test, this is the test's own summary. For anything else, it is the summary of every
/// failed test underneath, in tree order.
pub fn write_failure_summaries(
    out: &mut String,
    tree: &ResultTree,
    id: NodeId,
    style: SummaryStyle,
) {
    let node = &tree[id];
    if node.is_test() {
        write_test_summary(out, tree, id, style);
        return;
    }
    for (_, child) in node.children() {
        if tree[child].failed_test_count() > 0 {
            write_failure_summaries(out, tree, child, style);
        }
    }
}

fn write_test_summary(out: &mut String, tree: &ResultTree, id: NodeId, style: SummaryStyle) {
    let node = &tree[id];
    let file = node
        .file_location()
        .map_or_else(|| "(unknown)".to_owned(), |location| location.path().to_string());
    let heading = format!("File: {file}\nCode path: {}", tree.dotted_path(id));
    let message = test_result_message(node);
    match style {
        SummaryStyle::Compact => swriteln!(out, "{heading}\n\n{message}"),
        SummaryStyle::Verbose => {
            swrite!(out, "\n{}\n{heading}\n\n{message}\n\n\n", "=".repeat(70))
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Styles {
    container: Style,
    failed: Style,
    passed: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.container = Style::new().bold();
        self.failed = Style::new().red().bold();
        self.passed = Style::new().green();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{FileLocation, RootKey};
    use pretty_assertions::assert_eq;

    fn tree() -> ResultTree {
        let mut tree = ResultTree::new(RootKey::new("ws", "pytest"), "/ws");
        let root = tree.root();
        let location = FileLocation::new("/ws/pkg/test_mod.py", None);
        let class = tree
            .insert_at_path(
                root,
                ["pkg", "test_mod"],
                ResultNode::new("TestA", NodeKind::TestCase).with_file_location(location.clone()),
                true,
            )
            .expect("inserted TestA");
        tree.add_child(class, ResultNode::test("test_ok", Some(location.clone()), None))
            .expect("added test_ok");
        tree.add_child(
            class,
            ResultNode::test(
                "test_bad",
                Some(location.clone()),
                Some("assert 1 == 2".to_owned()),
            ),
        )
        .expect("added test_bad");
        tree.insert_at_path(
            root,
            ["other"],
            ResultNode::test("test_lonely", Some(location), None),
            true,
        )
        .expect("inserted test_lonely");
        tree.aggregate();
        tree
    }

    #[test]
    fn render_all() {
        let tree = tree();
        let displayer = TreeDisplayer::new(&tree, TreeView::All);
        insta::assert_snapshot!(displayer.render(tree.root()), @r"
        ws:pytest  1 / 3 failed
          pkg.test_mod.TestA  1 / 2 failed
            test_ok  passed
            test_bad  FAILED
          other.test_lonely  passed
        ");
    }

    #[test]
    fn render_failed_only() {
        let tree = tree();
        let displayer = TreeDisplayer::new(&tree, TreeView::FailedOnly);
        insta::assert_snapshot!(displayer.render(tree.root()), @r"
        ws:pytest  1 / 3 failed
          pkg.test_mod.TestA  1 / 2 failed
            test_bad  FAILED
        ");

        let pkg = tree
            .get_by_dotted_path(tree.root(), "pkg")
            .expect("pkg exists");
        insta::assert_snapshot!(displayer.render(pkg), @r"
        pkg.test_mod.TestA  1 / 2 failed
          test_bad  FAILED
        ");
    }

    #[test]
    fn unaggregated_containers_have_no_description() {
        let mut tree = ResultTree::new(RootKey::new("ws", "pytest"), "/ws");
        let root = tree.root();
        tree.add_child(root, ResultNode::test("test_a", None, None))
            .expect("added test_a");
        let displayer = TreeDisplayer::new(&tree, TreeView::All);
        assert_eq!(displayer.render(root), "ws:pytest\n  test_a  passed\n");
    }

    #[test]
    fn failure_summaries() {
        let tree = tree();
        let root = tree.root();

        let mut compact = String::new();
        write_failure_summaries(&mut compact, &tree, root, SummaryStyle::Compact);
        assert_eq!(
            compact,
            "File: /ws/pkg/test_mod.py\nCode path: pkg.test_mod.TestA.test_bad\n\nassert 1 == 2\n"
        );

        let mut verbose = String::new();
        write_failure_summaries(&mut verbose, &tree, root, SummaryStyle::Verbose);
        assert_eq!(
            verbose,
            format!(
                "\n{}\nFile: /ws/pkg/test_mod.py\nCode path: pkg.test_mod.TestA.test_bad\n\nassert 1 == 2\n\n\n",
                "=".repeat(70)
            )
        );

        let test_ok = tree
            .get_by_dotted_path(root, "pkg.test_mod.TestA.test_ok")
            .expect("test_ok exists");
        let mut passed = String::new();
        write_failure_summaries(&mut passed, &tree, test_ok, SummaryStyle::Compact);
        assert_eq!(
            passed,
            "File: /ws/pkg/test_mod.py\nCode path: pkg.test_mod.TestA.test_ok\n\nPassed!\n"
        );
    }

    #[test]
    fn result_messages() {
        let failed = ResultNode::test("t", None, Some(String::new()));
        assert_eq!(test_result_message(&failed), "No failure message");
        let container = ResultNode::new("c", NodeKind::TestCase);
        assert_eq!(test_result_message(&container), "");
    }
}
