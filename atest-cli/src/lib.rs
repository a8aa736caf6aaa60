// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run tests and browse their results as a tree.
//!
//! `atest` runs a workspace's tests through pytest or a configured command, reads the JUnit report
//! they produce, and prints the results as a tree with single-child chains collapsed.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
