// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Path-based insertion, creating intermediate nodes as needed.

use super::{
    imp::ResultTree,
    node::{FileLocation, NodeId, NodeKind, ResultNode},
};
use crate::errors::TreeError;
use camino::{Utf8Path, Utf8PathBuf};

impl ResultTree {
    /// Inserts `node` at the end of `parent_segments`, starting from `parent`.
    ///
    /// Missing intermediate segments are created as [`NodeKind::Generic`] nodes.
    ///
    /// With `skip_existing`, existing intermediate nodes are reused and an existing node with the
    /// same name as `node` is replaced. Without it, any existing intermediate node is an error,
    /// as is an existing node with the same name as `node`.
    pub fn insert_at_path<S: AsRef<str>>(
        &mut self,
        parent: NodeId,
        parent_segments: impl IntoIterator<Item = S>,
        node: ResultNode,
        skip_existing: bool,
    ) -> Result<NodeId, TreeError> {
        let mut current = parent;
        for segment in parent_segments {
            let segment = segment.as_ref();
            current = match self[current].child(segment) {
                Some(existing) if skip_existing => existing,
                Some(_) => {
                    return Err(TreeError::PathOccupied {
                        parent: self.describe(current),
                        segment: segment.to_owned(),
                    });
                }
                None => self.add_child(current, ResultNode::new(segment, NodeKind::Generic))?,
            };
        }

        if skip_existing {
            Ok(self.add_or_replace_child(current, node)?.id())
        } else {
            self.add_child(current, node)
        }
    }

    /// Resolves a `/`-separated path relative to `root_dir` into folder and file nodes under
    /// `parent`, creating whatever is missing.
    ///
    /// Each directory becomes a [`NodeKind::Folder`] node. The final segment becomes a
    /// [`NodeKind::File`] node named after the file stem, so `pkg/test_foo.py` produces a `pkg`
    /// folder containing a `test_foo` file. Existing nodes are reused.
    ///
    /// Returns the file node.
    pub fn insert_by_file_path(
        &mut self,
        parent: NodeId,
        root_dir: &Utf8Path,
        relative: &str,
    ) -> Result<NodeId, TreeError> {
        let segments: Vec<&str> = relative
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            return Err(TreeError::EmptyFilePath {
                path: relative.to_owned(),
            });
        };

        let mut current = parent;
        let mut dir_path = root_dir.to_owned();
        for dir in dirs {
            dir_path.push(dir);
            current = match self[current].child(dir) {
                Some(existing) => existing,
                None => self.add_child(
                    current,
                    ResultNode::new(*dir, NodeKind::Folder).with_folder_path(dir_path.clone()),
                )?,
            };
        }

        let stem = Utf8Path::new(file_name).file_stem().unwrap_or(file_name);
        if let Some(existing) = self[current].child(stem) {
            return Ok(existing);
        }
        let file_path: Utf8PathBuf = dir_path.join(file_name);
        let location = FileLocation::new(file_path, None);
        self.add_child(
            current,
            ResultNode::new(stem, NodeKind::File).with_file_location(location),
        )
    }
}
