// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The set of live result trees and their run lifecycle.
//!
//! A run goes through three steps:
//!
//! 1. [`ResultRegistry::begin_run`] marks the tree as running, or rejects the run if one is
//!    already in progress.
//! 2. The caller executes tests and collects report records.
//! 3. [`ResultRegistry::complete_run`] ingests the records into a staging tree. Only once that
//!    succeeds is the live tree replaced or merged into, so a failed ingestion leaves the previous
//!    results visible. [`ResultRegistry::abort_run`] ends a run without results.

use crate::{
    errors::{IngestError, RunRejected},
    ingest::{IngestOptions, IngestSummary, ReportIngestor, ReportRecord},
    tree::{MergeSummary, ResultTree, RootKey, RunStatus},
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use tracing::debug;

/// How a completed run updates the live tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Discard previous results.
    #[default]
    Replace,

    /// Overlay new results on previous ones, for example after re-running failed tests.
    Merge,
}

/// Notified whenever a live tree changes.
pub trait TreeObserver {
    /// Called after `tree` has been updated and aggregated.
    fn tree_changed(&mut self, tree: &ResultTree);
}

impl<F: FnMut(&ResultTree)> TreeObserver for F {
    fn tree_changed(&mut self, tree: &ResultTree) {
        self(tree)
    }
}

/// A run in progress, returned by [`ResultRegistry::begin_run`].
///
/// Must be passed to [`ResultRegistry::complete_run`] or [`ResultRegistry::abort_run`], otherwise
/// the tree stays in the running state.
#[derive(Debug)]
#[must_use = "a run must be completed or aborted"]
pub struct RunHandle {
    key: RootKey,
    mode: RunMode,
    previous_status: RunStatus,
}

impl RunHandle {
    /// The tree this run belongs to.
    pub fn key(&self) -> &RootKey {
        &self.key
    }

    /// How this run will update the live tree.
    pub fn mode(&self) -> RunMode {
        self.mode
    }
}

/// The outcome of [`ResultRegistry::complete_run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// What ingestion did with the records.
    pub ingest: IngestSummary,

    /// How the new results were applied to the live tree.
    pub merge: MergeSummary,
}

/// Owns one [`ResultTree`] per workspace and runner.
#[derive(Clone, Debug, Default)]
pub struct ResultRegistry {
    trees: IndexMap<RootKey, ResultTree>,
}

impl ResultRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tree for `key`, if one has been created.
    pub fn get(&self, key: &RootKey) -> Option<&ResultTree> {
        self.trees.get(key)
    }

    /// Iterates over all trees in creation order.
    pub fn trees(&self) -> impl ExactSizeIterator<Item = &ResultTree> {
        self.trees.values()
    }

    /// Removes the tree for `key`, for example when a workspace goes away.
    ///
    /// Returns `None` without removing anything if a run for `key` is in progress.
    pub fn remove(&mut self, key: &RootKey) -> Option<ResultTree> {
        if self.trees.get(key)?.is_running() {
            return None;
        }
        self.trees.shift_remove(key)
    }

    /// Starts a run for `key`, creating its tree if needed.
    ///
    /// Returns an error if a run for `key` is already in progress. The existing run is not
    /// affected.
    pub fn begin_run(
        &mut self,
        key: RootKey,
        workspace_dir: &Utf8Path,
        mode: RunMode,
    ) -> Result<RunHandle, RunRejected> {
        let tree = self
            .trees
            .entry(key.clone())
            .or_insert_with(|| ResultTree::new(key.clone(), workspace_dir));
        if tree.is_running() {
            return Err(RunRejected::new(key));
        }

        let previous_status = tree.status();
        tree.set_status(RunStatus::Running);
        debug!("began {mode:?} run for `{key}`");
        Ok(RunHandle {
            key,
            mode,
            previous_status,
        })
    }

    /// Completes a run with the records it produced.
    ///
    /// On success, the live tree is updated according to the run mode, aggregated, marked done,
    /// and `observer` is notified. On error, the live tree keeps its previous results and status.
    pub fn complete_run(
        &mut self,
        handle: RunHandle,
        records: impl IntoIterator<Item = ReportRecord>,
        options: &IngestOptions,
        observer: &mut dyn TreeObserver,
    ) -> Result<RunOutcome, IngestError> {
        let tree = self.live_tree(&handle);

        let mut staging = ResultTree::new(handle.key.clone(), workspace_dir_of(tree));
        let ingest = match ReportIngestor::new(options).ingest(&mut staging, records) {
            Ok(summary) => summary,
            Err(error) => {
                tree.set_status(handle.previous_status);
                return Err(error);
            }
        };

        let mut updated = match handle.mode {
            RunMode::Replace => ResultTree::new(handle.key.clone(), workspace_dir_of(tree)),
            RunMode::Merge => tree.clone(),
        };
        let merge = match staging.merge_into(&mut updated) {
            Ok(merge) => merge,
            Err(error) => {
                tree.set_status(handle.previous_status);
                return Err(IngestError::Merge {
                    key: handle.key,
                    error,
                });
            }
        };

        updated.set_status(RunStatus::Done);
        *tree = updated;
        debug!(
            "completed {:?} run for `{}`: {} tests, {} failed",
            handle.mode,
            handle.key,
            tree[tree.root()].test_count(),
            tree[tree.root()].failed_test_count(),
        );
        observer.tree_changed(tree);
        Ok(RunOutcome { ingest, merge })
    }

    /// Ends a run without results, restoring the tree's previous status.
    pub fn abort_run(&mut self, handle: RunHandle) {
        let tree = self.live_tree(&handle);
        tree.set_status(handle.previous_status);
        debug!("aborted {:?} run for `{}`", handle.mode, handle.key);
    }

    fn live_tree(&mut self, handle: &RunHandle) -> &mut ResultTree {
        self.trees
            .get_mut(&handle.key)
            .expect("trees with a run in progress are never removed")
    }
}

fn workspace_dir_of(tree: &ResultTree) -> Utf8PathBuf {
    tree[tree.root()]
        .folder_path()
        .map(Utf8Path::to_owned)
        .unwrap_or_default()
}
