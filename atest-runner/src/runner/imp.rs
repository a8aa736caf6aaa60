// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::RunTarget;
use crate::{
    config::{SETTINGS_PATH, WorkspaceSettings},
    errors::RunError,
    tree::LineBase,
};
use atest_junit::Report;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::{collections::BTreeMap, fmt, io, process::Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// The directory, relative to the workspace, where reports are written by runners that don't
/// configure their own location.
pub const REPORT_DIR: &str = ".atest-temp";

/// The kind of test runner used for a workspace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerKind {
    /// `python -m pytest`, with a JUnit report.
    #[default]
    Pytest,

    /// An arbitrary command that writes a JUnit report.
    Generic,
}

impl RunnerKind {
    /// The name of this runner, used in [`RootKey`](crate::tree::RootKey)s.
    pub fn name(self) -> &'static str {
        match self {
            RunnerKind::Pytest => "pytest",
            RunnerKind::Generic => "generic",
        }
    }

    /// The base of line numbers in reports written by this runner.
    pub fn default_line_base(self) -> LineBase {
        match self {
            RunnerKind::Pytest => LineBase::ZeroBased,
            RunnerKind::Generic => LineBase::OneBased,
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully resolved command line for a test run.
#[derive(Clone, Debug)]
pub struct TestCommand {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Utf8PathBuf,
    report_path: Option<Utf8PathBuf>,
}

impl TestCommand {
    /// The program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment variables set in addition to the inherited environment.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// The working directory.
    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Where the JUnit report is expected, if anywhere.
    pub fn report_path(&self) -> Option<&Utf8Path> {
        self.report_path.as_deref()
    }

    /// Returns the command line, quoted for a POSIX shell.
    pub fn display(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(&self.args))
    }
}

/// Which stream a line of output came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,

    /// Standard error.
    Stderr,
}

/// Receives output from a running test command, one line at a time.
pub trait OutputSink {
    /// Called for each line, without its trailing newline.
    fn write_line(&mut self, stream: OutputStream, line: &str);
}

impl<F> OutputSink for F
where
    F: FnMut(OutputStream, &str),
{
    fn write_line(&mut self, stream: OutputStream, line: &str) {
        self(stream, line)
    }
}

/// The result of running a test command to completion.
#[derive(Clone, Debug)]
pub struct RunCompletion {
    /// The command line that was run.
    pub command: String,

    /// The exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,

    /// The report written by the command. `None` if the runner has no report configured.
    pub report: Option<Report>,
}

/// Builds and runs test commands for a workspace.
#[derive(Clone, Debug)]
pub struct TestRunner<'a> {
    settings: &'a WorkspaceSettings,
    workspace_dir: &'a Utf8Path,
}

impl<'a> TestRunner<'a> {
    /// Creates a new runner for the workspace at `workspace_dir`.
    pub fn new(settings: &'a WorkspaceSettings, workspace_dir: &'a Utf8Path) -> Self {
        Self {
            settings,
            workspace_dir,
        }
    }

    /// The kind of runner in use.
    pub fn kind(&self) -> RunnerKind {
        self.settings.runner
    }

    /// Where the report for a run is expected.
    pub fn report_path(&self) -> Option<Utf8PathBuf> {
        match self.settings.runner {
            RunnerKind::Pytest => Some(self.workspace_dir.join(REPORT_DIR).join("tests.xml")),
            RunnerKind::Generic => self
                .settings
                .generic
                .report
                .as_ref()
                .map(|report| self.workspace_dir.join(report)),
        }
    }

    /// Builds the command that runs `targets`. An empty list runs the whole workspace.
    pub fn command(&self, targets: &[RunTarget]) -> Result<TestCommand, RunError> {
        let report_path = self.report_path();
        let (program, args, env) = match self.settings.runner {
            RunnerKind::Pytest => {
                let mut args = vec!["-m".to_owned(), "pytest".to_owned(), "-v".to_owned()];
                if let Some(report_path) = &report_path {
                    args.push(format!("--junit-xml={report_path}"));
                }
                args.extend(targets.iter().map(RunTarget::pytest_node_id));
                (
                    self.settings.pytest.python.clone(),
                    args,
                    BTreeMap::new(),
                )
            }
            RunnerKind::Generic => {
                let generic = &self.settings.generic;
                let no_command = || RunError::NoCommand {
                    settings_path: self.workspace_dir.join(SETTINGS_PATH),
                };
                let command = generic.command.as_deref().ok_or_else(no_command)?;
                let mut words =
                    shell_words::split(command).map_err(|error| RunError::InvalidCommand {
                        command: command.to_owned(),
                        error,
                    })?;
                if words.is_empty() {
                    return Err(no_command());
                }
                let program = words.remove(0);
                words.extend(generic.args.iter().cloned());
                if !targets.is_empty() {
                    warn!(
                        "the generic runner cannot select tests, running everything instead of {} target(s)",
                        targets.len()
                    );
                }
                (program, words, generic.env.clone())
            }
        };

        Ok(TestCommand {
            program,
            args,
            env,
            cwd: self.workspace_dir.to_owned(),
            report_path,
        })
    }

    /// Runs `targets`, forwarding output to `sink`, and reads back the report.
    ///
    /// A non-zero exit code is not an error: test commands exit unsuccessfully when tests fail.
    pub async fn execute(
        &self,
        targets: &[RunTarget],
        sink: &mut dyn OutputSink,
    ) -> Result<RunCompletion, RunError> {
        let command = self.command(targets)?;
        let display_cmd = command.display();
        if let Some(report_path) = command.report_path() {
            prepare_report(report_path).await?;
        }

        debug!("running `{display_cmd}` in {}", command.cwd());
        let mut cmd = tokio::process::Command::new(command.program());
        cmd.args(command.args())
            .envs(command.env())
            .current_dir(command.cwd())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|error| RunError::Spawn {
            command: display_cmd.clone(),
            error,
        })?;
        let stdout = child.stdout.take().expect("stdout was set");
        let stderr = child.stderr.take().expect("stderr was set");

        forward_output(stdout, stderr, sink)
            .await
            .map_err(|error| RunError::Wait {
                command: display_cmd.clone(),
                error,
            })?;
        let status = child.wait().await.map_err(|error| RunError::Wait {
            command: display_cmd.clone(),
            error,
        })?;
        debug!("`{display_cmd}` exited with {status}");

        let report = match command.report_path() {
            Some(path) => Some(read_report(&display_cmd, path).await?),
            None => None,
        };

        Ok(RunCompletion {
            command: display_cmd,
            exit_code: status.code(),
            report,
        })
    }
}

async fn prepare_report(path: &Utf8Path) -> Result<(), RunError> {
    let map_err = |error| RunError::PrepareReport {
        path: path.to_owned(),
        error,
    };
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("removed stale report at {path}"),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(map_err(error)),
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(map_err)?;
    }
    Ok(())
}

async fn forward_output(
    stdout: tokio::process::ChildStdout,
    stderr: tokio::process::ChildStderr,
    sink: &mut dyn OutputSink,
) -> io::Result<()> {
    let mut stdout = BufReader::new(stdout).split(b'\n');
    let mut stderr = BufReader::new(stderr).split(b'\n');
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !(stdout_done && stderr_done) {
        tokio::select! {
            segment = stdout.next_segment(), if !stdout_done => match segment? {
                Some(segment) => write_segment(sink, OutputStream::Stdout, &segment),
                None => stdout_done = true,
            },
            segment = stderr.next_segment(), if !stderr_done => match segment? {
                Some(segment) => write_segment(sink, OutputStream::Stderr, &segment),
                None => stderr_done = true,
            },
        }
    }
    Ok(())
}

fn write_segment(sink: &mut dyn OutputSink, stream: OutputStream, segment: &[u8]) {
    let segment = segment.strip_suffix(b"\r").unwrap_or(segment);
    sink.write_line(stream, &String::from_utf8_lossy(segment));
}

async fn read_report(command: &str, path: &Utf8Path) -> Result<Report, RunError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| RunError::ReadReport {
            command: command.to_owned(),
            path: path.to_owned(),
            error,
        })?;
    Report::parse(&contents).map_err(|error| RunError::ParseReport {
        command: command.to_owned(),
        path: path.to_owned(),
        error,
    })
}
