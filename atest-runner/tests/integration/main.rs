// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for atest-runner.

mod fixtures;
mod generic_runner;
mod properties;
mod xunit_scenarios;
