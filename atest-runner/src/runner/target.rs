// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ingest::module_prefix_len,
    tree::{NodeId, NodeKind, ResultNode, ResultTree},
};
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use std::fmt;

/// A subset of a workspace to run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RunTarget {
    /// Everything in a file or directory.
    Path(Utf8PathBuf),

    /// Every test in a test case.
    TestCase {
        /// The file containing the test case.
        file: Utf8PathBuf,

        /// The dotted path of the test case, as reported.
        class_path: Vec<String>,
    },

    /// A single test.
    Test {
        /// The file containing the test.
        file: Utf8PathBuf,

        /// The dotted path of the enclosing test case, as reported.
        class_path: Vec<String>,

        /// The test name.
        name: String,
    },
}

impl RunTarget {
    /// Returns the targets needed to run the tests under `id`.
    ///
    /// Paths are made relative to `workspace_dir` where possible. An empty list means the whole
    /// workspace.
    pub fn for_node(tree: &ResultTree, id: NodeId, workspace_dir: &Utf8Path) -> Vec<RunTarget> {
        let mut targets = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = &tree[id];
            // Nodes without a location of their own run what they contain.
            match node.kind() {
                NodeKind::WorkspaceRoot => return Vec::new(),
                NodeKind::Generic => push_children(&mut stack, node),
                NodeKind::Folder => match node.folder_path() {
                    Some(path) => targets.push(RunTarget::Path(relative_to(path, workspace_dir))),
                    None => push_children(&mut stack, node),
                },
                NodeKind::File => match node.file_location() {
                    Some(location) => {
                        targets.push(RunTarget::Path(relative_to(location.path(), workspace_dir)))
                    }
                    None => push_children(&mut stack, node),
                },
                NodeKind::TestCase => match node.file_location() {
                    Some(location) => targets.push(RunTarget::TestCase {
                        file: relative_to(location.path(), workspace_dir),
                        class_path: owned_path(tree, id),
                    }),
                    None => push_children(&mut stack, node),
                },
                NodeKind::Test => targets.extend(Self::for_test(tree, id, workspace_dir)),
            }
        }
        targets
    }

    /// Returns a target for each failed test under `id`, in tree order.
    pub fn failed_under(tree: &ResultTree, id: NodeId, workspace_dir: &Utf8Path) -> Vec<RunTarget> {
        tree.collect_failed_tests(id)
            .into_iter()
            .filter_map(|test| Self::for_test(tree, test, workspace_dir))
            .collect()
    }

    fn for_test(tree: &ResultTree, id: NodeId, workspace_dir: &Utf8Path) -> Option<RunTarget> {
        let node = &tree[id];
        let location = node.file_location()?;
        let class_path = node.parent().map(|parent| owned_path(tree, parent))?;
        Some(RunTarget::Test {
            file: relative_to(location.path(), workspace_dir),
            class_path,
            name: node.name().to_owned(),
        })
    }

    /// Returns the pytest node id for this target, such as `tests/test_foo.py::TestFoo::test_a`.
    ///
    /// Leading class path segments that repeat the module or package path of the file are
    /// dropped, since reports name classes with their module prefix.
    pub fn pytest_node_id(&self) -> String {
        match self {
            RunTarget::Path(path) => path.as_str().to_owned(),
            RunTarget::TestCase { file, class_path } => {
                let classes = strip_module_prefix(file, class_path);
                std::iter::once(file.as_str()).chain(classes).join("::")
            }
            RunTarget::Test {
                file,
                class_path,
                name,
            } => {
                let classes = strip_module_prefix(file, class_path);
                std::iter::once(file.as_str())
                    .chain(classes)
                    .chain(std::iter::once(name.as_str()))
                    .join("::")
            }
        }
    }
}

impl fmt::Display for RunTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pytest_node_id())
    }
}

fn owned_path(tree: &ResultTree, id: NodeId) -> Vec<String> {
    tree.code_path(id).into_iter().map(str::to_owned).collect()
}

fn relative_to(path: &Utf8Path, workspace_dir: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(workspace_dir)
        .map(Utf8Path::to_owned)
        .unwrap_or_else(|_| path.to_owned())
}

fn push_children(stack: &mut Vec<NodeId>, node: &ResultNode) {
    // Reversed so that the first child is popped first.
    let children: Vec<_> = node.children().map(|(_, child)| child).collect();
    stack.extend(children.into_iter().rev());
}

/// Drops the leading segments of `class_path` that repeat the module or package of `file`.
fn strip_module_prefix<'a>(
    file: &Utf8Path,
    class_path: &'a [String],
) -> impl Iterator<Item = &'a str> + use<'a> {
    let skip = module_prefix_len(file, class_path);
    class_path[skip..].iter().map(String::as_str)
}
