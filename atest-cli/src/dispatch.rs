// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::AtestExitCode,
    output::{OutputContext, OutputOpts, OutputWriter, StderrForwarder, clap_styles},
};
use atest_junit::Report;
use atest_runner::{
    config::WorkspaceSettings,
    ingest::{IngestOptions, PathStrategy, ReportRecord},
    registry::{ResultRegistry, RunHandle, RunMode},
    reporter::{SummaryStyle, TreeDisplayer, TreeView, write_failure_summaries},
    runner::{RunTarget, RunnerKind, TestRunner},
    tree::{ResultTree, RootKey},
    xunit::records_from_report,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use tracing::{info, warn};

/// Run tests and browse their results as a tree.
#[derive(Debug, Parser)]
#[command(version, name = "atest", styles = clap_styles::style())]
pub struct AtestApp {
    /// Workspace directory [default: current directory]
    #[arg(long, short = 'w', global = true, value_name = "DIR", env = "ATEST_WORKSPACE")]
    workspace: Option<Utf8PathBuf>,

    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl AtestApp {
    /// Initializes logging and color support, returning the resolved output settings.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let workspace_dir = resolve_workspace(self.workspace)?;
        let mut settings = WorkspaceSettings::load(&workspace_dir)?;

        match self.command {
            Command::Show {
                report,
                file_tree,
                display,
            } => {
                let mut options = settings.ingest_options(&workspace_dir);
                if file_tree {
                    options.path_strategy = PathStrategy::FilePath;
                }
                let mut session = Session::new(&workspace_dir, &settings, options);
                session.load_report(&report)?;
                session.write_results(&display, output, output_writer)?;
                Ok(AtestExitCode::OK)
            }
            Command::Run {
                targets,
                runner,
                display,
            } => {
                if let Some(runner) = runner {
                    settings.runner = runner.into();
                }
                let options = settings.ingest_options(&workspace_dir);
                let mut session = Session::new(&workspace_dir, &settings, options);
                let targets: Vec<_> = targets.into_iter().map(RunTarget::Path).collect();
                session.run(&targets, RunMode::Replace, output)?;
                session.write_results(&display, output, output_writer)?;
                Ok(session.exit_code())
            }
            Command::RerunFailed { report, display } => {
                let options = settings.ingest_options(&workspace_dir);
                let mut session = Session::new(&workspace_dir, &settings, options);
                session.load_report(&report)?;

                let tree = session.tree();
                let targets = RunTarget::failed_under(tree, tree.root(), &workspace_dir);
                if targets.is_empty() {
                    info!("no failed tests in `{report}`, nothing to re-run");
                } else {
                    info!("re-running {} failed tests", targets.len());
                    session.run(&targets, RunMode::Merge, output)?;
                }
                session.write_results(&display, output, output_writer)?;
                Ok(session.exit_code())
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the results in an existing JUnit report
    Show {
        /// Path to the JUnit XML report
        #[arg(value_name = "REPORT")]
        report: Utf8PathBuf,

        /// Arrange results by folder and file rather than by class path
        #[arg(long)]
        file_tree: bool,

        #[command(flatten)]
        display: DisplayOpts,
    },

    /// Run tests and show their results
    Run {
        /// Files, directories or test ids to run [default: everything]
        #[arg(value_name = "TARGET")]
        targets: Vec<Utf8PathBuf>,

        /// Test runner to use, overriding the workspace settings
        #[arg(long, value_enum, value_name = "NAME")]
        runner: Option<RunnerOpt>,

        #[command(flatten)]
        display: DisplayOpts,
    },

    /// Re-run the failed tests from an existing JUnit report
    ///
    /// Results for tests that are re-run replace those in the report. Other results are kept.
    RerunFailed {
        /// Path to the JUnit XML report
        #[arg(value_name = "REPORT")]
        report: Utf8PathBuf,

        #[command(flatten)]
        display: DisplayOpts,
    },
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Display options")]
struct DisplayOpts {
    /// Only show results that contain failed tests
    #[arg(long)]
    failed: bool,

    /// Print results as JSON
    #[arg(long, conflicts_with = "failed")]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RunnerOpt {
    Pytest,
    Generic,
}

impl From<RunnerOpt> for RunnerKind {
    fn from(opt: RunnerOpt) -> Self {
        match opt {
            RunnerOpt::Pytest => RunnerKind::Pytest,
            RunnerOpt::Generic => RunnerKind::Generic,
        }
    }
}

fn resolve_workspace(workspace: Option<Utf8PathBuf>) -> Result<Utf8PathBuf, ExpectedError> {
    let workspace_dir = match workspace {
        Some(workspace_dir) => workspace_dir,
        None => {
            let current_dir =
                std::env::current_dir().map_err(|error| ExpectedError::CurrentDir { error })?;
            Utf8PathBuf::try_from(current_dir).map_err(|error| {
                ExpectedError::WorkspaceDirInvalidUtf8 {
                    path: error.into_path_buf(),
                }
            })?
        }
    };
    if !workspace_dir.is_dir() {
        return Err(ExpectedError::WorkspaceDirNotFound { workspace_dir });
    }
    Ok(workspace_dir)
}

/// A single tree for one workspace and runner, updated by reports and runs.
struct Session<'a> {
    workspace_dir: &'a Utf8Path,
    settings: &'a WorkspaceSettings,
    options: IngestOptions,
    key: RootKey,
    registry: ResultRegistry,
}

impl<'a> Session<'a> {
    fn new(
        workspace_dir: &'a Utf8Path,
        settings: &'a WorkspaceSettings,
        options: IngestOptions,
    ) -> Self {
        let workspace_name = workspace_dir.file_name().unwrap_or(workspace_dir.as_str());
        let key = RootKey::new(workspace_name, settings.runner.name());
        let mut registry = ResultRegistry::new();
        // Create the tree up front so that it can be shown even if nothing is ingested.
        let handle = registry
            .begin_run(key.clone(), workspace_dir, RunMode::Replace)
            .expect("a new registry has no runs in progress");
        registry.abort_run(handle);

        Self {
            workspace_dir,
            settings,
            options,
            key,
            registry,
        }
    }

    fn tree(&self) -> &ResultTree {
        self.registry
            .get(&self.key)
            .expect("the session tree is created up front")
    }

    fn load_report(&mut self, path: &Utf8Path) -> Result<(), ExpectedError> {
        let report = Report::from_path(path)?;
        self.ingest(records_from_report(&report), RunMode::Replace)
    }

    fn ingest(&mut self, records: Vec<ReportRecord>, mode: RunMode) -> Result<(), ExpectedError> {
        match self.begin(mode) {
            Some(handle) => self.complete(handle, records),
            None => Ok(()),
        }
    }

    /// Starts a run, or logs a warning and returns `None` if one is already in progress.
    fn begin(&mut self, mode: RunMode) -> Option<RunHandle> {
        match self
            .registry
            .begin_run(self.key.clone(), self.workspace_dir, mode)
        {
            Ok(handle) => Some(handle),
            Err(rejected) => {
                warn!("{rejected}, skipping");
                None
            }
        }
    }

    fn complete(
        &mut self,
        handle: RunHandle,
        records: Vec<ReportRecord>,
    ) -> Result<(), ExpectedError> {
        let mut observer = |_: &ResultTree| {};
        let outcome = self
            .registry
            .complete_run(handle, records, &self.options, &mut observer)?;
        if !outcome.ingest.skipped.is_empty() {
            warn!(
                "skipped {} malformed records (see warnings above)",
                outcome.ingest.skipped.len()
            );
        }
        Ok(())
    }

    fn run(
        &mut self,
        targets: &[RunTarget],
        mode: RunMode,
        output: OutputContext,
    ) -> Result<(), ExpectedError> {
        let Some(handle) = self.begin(mode) else {
            return Ok(());
        };

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(error) => {
                self.registry.abort_run(handle);
                return Err(ExpectedError::RuntimeBuild { error });
            }
        };

        let runner = TestRunner::new(self.settings, self.workspace_dir);
        let stderr_styles = output.stderr_styles();
        let mut forwarder = StderrForwarder::new(&stderr_styles);
        let completion = match runtime.block_on(runner.execute(targets, &mut forwarder)) {
            Ok(completion) => completion,
            Err(err) => {
                self.registry.abort_run(handle);
                return Err(err.into());
            }
        };
        info!(
            "`{}` exited with {}",
            completion.command,
            completion
                .exit_code
                .map_or_else(|| "a signal".to_owned(), |code| format!("code {code}"))
        );

        match completion.report {
            Some(report) => self.complete(handle, records_from_report(&report)),
            None => {
                warn!("no report is configured for the {} runner", runner.kind());
                self.registry.abort_run(handle);
                Ok(())
            }
        }
    }

    fn exit_code(&self) -> i32 {
        let tree = self.tree();
        if tree[tree.root()].failed_test_count() > 0 {
            AtestExitCode::TEST_RUN_FAILED
        } else {
            AtestExitCode::OK
        }
    }

    fn write_results(
        &self,
        display: &DisplayOpts,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<(), ExpectedError> {
        let tree = self.tree();
        let root = tree.root();

        let mut out = if display.json {
            let mut json = tree
                .to_json(root)
                .map_err(|err| ExpectedError::SerializeJson { err })?;
            json.push('\n');
            json
        } else {
            let view = if display.failed {
                TreeView::FailedOnly
            } else {
                TreeView::All
            };
            let mut displayer = TreeDisplayer::new(tree, view);
            if output.colorize_stdout() {
                displayer.colorize();
            }
            displayer.render(root)
        };

        if !display.json && tree[root].failed_test_count() > 0 {
            let style = if output.verbose {
                SummaryStyle::Verbose
            } else {
                SummaryStyle::Compact
            };
            out.push('\n');
            write_failure_summaries(&mut out, tree, root, style);
        }

        let mut writer = output_writer.stdout_writer();
        writer
            .write_all(out.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|error| ExpectedError::WriteOutput { error })
    }
}
