// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [atest](https://crates.io/crates/atest-cli).
//!
//! The basic flow of operations is:
//!
//! 1. A [`runner::TestRunner`] executes a test command for a workspace and produces a JUnit
//!    report.
//! 2. [`xunit`] converts the report into flat [`ingest::ReportRecord`]s.
//! 3. The [`registry::ResultRegistry`] ingests the records into a staging
//!    [`tree::ResultTree`], then replaces or merges the live tree for that workspace and runner.
//! 4. The [`reporter`] renders the aggregated tree, flattening single-child chains.

pub mod config;
pub mod errors;
pub mod ingest;
pub mod registry;
pub mod reporter;
pub mod runner;
pub mod tree;
pub mod xunit;
