// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read JUnit/XUnit reports produced by test runners.
//!
//! The reader accepts both a `<testsuites>` root and a bare `<testsuite>` root, which is what
//! pytest and most xUnit-style runners emit. Unknown elements are skipped and unknown attributes
//! are preserved in the `extra` maps.

mod errors;
mod parse;
mod report;

pub use errors::*;
pub use report::*;
