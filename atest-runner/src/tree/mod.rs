// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The hierarchical result tree.
//!
//! A [`ResultTree`] holds the outcome of one or more test runs for a single workspace and runner.
//! Nodes live in an arena owned by the tree and are addressed by [`NodeId`]. Each node knows its
//! parent and keeps its children in a name-keyed map that preserves insertion order.
//!
//! Counts and failure indexes are derived data: they are recomputed by
//! [`ResultTree::aggregate`] after a batch of insertions, and presentation helpers such as
//! [`ResultTree::flattened`] only consult them once aggregation has run.

mod aggregate;
mod flatten;
mod imp;
mod merge;
mod node;
mod path_index;
mod plain;

pub use imp::*;
pub use merge::MergeSummary;
pub use node::*;
pub use plain::PlainNode;
