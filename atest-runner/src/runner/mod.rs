// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution of test commands.
//!
//! A [`TestRunner`] knows how to build the command line for a workspace, spawn it, stream its
//! output to an [`OutputSink`], and read back the JUnit report it wrote.

mod imp;
mod target;

pub use imp::*;
pub use target::*;
