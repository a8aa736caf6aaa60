// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use atest_junit::ReadError;
use atest_runner::errors::{IngestError, RunError, SettingsError};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::{error::Error, io, path::PathBuf};
use thiserror::Error;
use tracing::error;

/// Exit codes used by atest.
pub enum AtestExitCode {}

impl AtestExitCode {
    /// The command succeeded and no tests failed.
    pub const OK: i32 = 0;

    /// One or more tests failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// A user issue happened while setting up the invocation, such as invalid settings.
    pub const SETUP_ERROR: i32 = 96;

    /// A report could not be read, parsed or ingested.
    pub const REPORT_ERROR: i32 = 104;

    /// The test command could not be run.
    pub const RUNNER_ERROR: i32 = 105;

    /// Writing results to stdout failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that is reported to the user without a backtrace.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDir {
        #[source]
        error: io::Error,
    },
    #[error("workspace directory is not valid UTF-8")]
    WorkspaceDirInvalidUtf8 { path: PathBuf },
    #[error("workspace directory `{workspace_dir}` does not exist")]
    WorkspaceDirNotFound { workspace_dir: Utf8PathBuf },
    #[error("failed to load settings")]
    Settings {
        #[from]
        err: SettingsError,
    },
    #[error("failed to build the async runtime")]
    RuntimeBuild {
        #[source]
        error: io::Error,
    },
    #[error("failed to read report")]
    ReadReport {
        #[from]
        err: ReadError,
    },
    #[error("failed to ingest report")]
    Ingest {
        #[from]
        err: IngestError,
    },
    #[error("test run failed to complete")]
    Run {
        #[from]
        err: RunError,
    },
    #[error("failed to serialize results")]
    SerializeJson {
        #[source]
        err: serde_json::Error,
    },
    #[error("failed to write results")]
    WriteOutput {
        #[source]
        error: io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDir { .. }
            | Self::WorkspaceDirInvalidUtf8 { .. }
            | Self::WorkspaceDirNotFound { .. }
            | Self::Settings { .. }
            | Self::RuntimeBuild { .. } => AtestExitCode::SETUP_ERROR,
            Self::ReadReport { .. } | Self::Ingest { .. } => AtestExitCode::REPORT_ERROR,
            Self::Run { err } => match err {
                RunError::ReadReport { .. } | RunError::ParseReport { .. } => {
                    AtestExitCode::REPORT_ERROR
                }
                RunError::NoCommand { .. } | RunError::InvalidCommand { .. } => {
                    AtestExitCode::SETUP_ERROR
                }
                _ => AtestExitCode::RUNNER_ERROR,
            },
            Self::SerializeJson { .. } | Self::WriteOutput { .. } => {
                AtestExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDir { error } => {
                error!("could not determine the current directory");
                Some(error as &dyn Error)
            }
            Self::WorkspaceDirInvalidUtf8 { path } => {
                error!(
                    "workspace directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::WorkspaceDirNotFound { workspace_dir } => {
                error!(
                    "workspace directory `{}` does not exist",
                    workspace_dir.style(styles.bold)
                );
                None
            }
            Self::Settings { err } => {
                error!("{err}");
                err.source()
            }
            Self::RuntimeBuild { error } => {
                error!("failed to build the async runtime");
                Some(error as &dyn Error)
            }
            Self::ReadReport { err } => {
                error!("{err}");
                err.source()
            }
            Self::Ingest { err } => {
                error!("{err}");
                err.source()
            }
            Self::Run { err } => {
                error!("{err}");
                err.source()
            }
            Self::SerializeJson { err } => {
                error!("failed to serialize results as JSON");
                Some(err as &dyn Error)
            }
            Self::WriteOutput { error } => {
                error!("failed to write results to stdout");
                Some(error as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
